//! Runs a list of metrics against one record.
//!
//! A metric that errors never aborts the run: it is recorded as unscored and
//! the remaining metrics still execute, in order.

use crate::explain::explain;
use crate::metrics::MetricSpec;
use crate::record::EvaluationRecord;
use serde::Serialize;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MetricOutcome {
    Scored { score: f64, passed: bool },
    Unscored { reason: String },
}

impl MetricOutcome {
    pub fn score(&self) -> Option<f64> {
        match self {
            MetricOutcome::Scored { score, .. } => Some(*score),
            MetricOutcome::Unscored { .. } => None,
        }
    }

    pub fn passed(&self) -> Option<bool> {
        match self {
            MetricOutcome::Scored { passed, .. } => Some(*passed),
            MetricOutcome::Unscored { .. } => None,
        }
    }
}

/// One metric's result, ready for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricResult {
    pub metric_name: String,
    pub threshold: f64,
    #[serde(flatten)]
    pub outcome: MetricOutcome,
    pub explanation: String,
}

impl MetricResult {
    pub fn score(&self) -> Option<f64> {
        self.outcome.score()
    }

    pub fn passed(&self) -> Option<bool> {
        self.outcome.passed()
    }

    /// `⚠️ <name> failed: <reason>` for unscored results.
    pub fn warning(&self) -> Option<String> {
        match &self.outcome {
            MetricOutcome::Unscored { reason } => {
                Some(format!("⚠️ {} failed: {}", self.metric_name, reason))
            }
            MetricOutcome::Scored { .. } => None,
        }
    }
}

/// Run each spec against `record`, one after another. The result list has
/// the same length and order as `specs`.
pub async fn run_metrics(record: &EvaluationRecord, specs: &[MetricSpec]) -> Vec<MetricResult> {
    let mut results = Vec::with_capacity(specs.len());

    for spec in specs {
        debug!("Measuring {}", spec.name());

        let outcome = match spec.metric().measure(record).await {
            Ok(score) => MetricOutcome::Scored {
                score,
                passed: score >= spec.threshold(),
            },
            Err(e) => {
                warn!("⚠️ {} failed: {}", spec.name(), e);
                MetricOutcome::Unscored {
                    reason: e.to_string(),
                }
            }
        };

        results.push(MetricResult {
            metric_name: spec.name().to_string(),
            threshold: spec.threshold(),
            explanation: explain(spec.name(), outcome.score()).to_string(),
            outcome,
        });
    }

    let scored = results.iter().filter(|r| r.score().is_some()).count();
    info!("Scored {}/{} metrics", scored, results.len());

    results
}
