//! Scoring capabilities and the suites that configure them.
//!
//! A [`Metric`] rates one quality dimension of an [`EvaluationRecord`] as a
//! number, usually in `0.0..=1.0`. A [`MetricSpec`] pairs a metric with the
//! pass/fail threshold an entry point uses for it, and a [`Suite`] is the
//! ordered list of specs for one entry point.

pub mod judged;

pub use judged::{JudgedMetric, Verdict, VerdictLabel, DEFAULT_ROLE};

use crate::record::EvaluationRecord;
use async_trait::async_trait;
use model::{Judge, ModelError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetricError {
    #[error("judge call failed: {0}")]
    Judge(#[from] ModelError),

    #[error("test case has no {0}")]
    MissingInput(&'static str),

    #[error("{0}")]
    Failed(String),
}

#[async_trait]
pub trait Metric: Send + Sync {
    /// Display name, e.g. `AnswerRelevancy`.
    fn name(&self) -> &str;

    async fn measure(&self, record: &EvaluationRecord) -> Result<f64, MetricError>;
}

/// Quality dimensions the harness knows how to judge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricKind {
    AnswerRelevancy,
    Faithfulness,
    ContextualRecall,
    ContextualPrecision,
    Toxicity,
    Bias,
    Summarization,
    TaskCompletion,
    RoleAdherence,
}

impl MetricKind {
    pub const ALL: [MetricKind; 9] = [
        MetricKind::AnswerRelevancy,
        MetricKind::Faithfulness,
        MetricKind::ContextualRecall,
        MetricKind::ContextualPrecision,
        MetricKind::Toxicity,
        MetricKind::Bias,
        MetricKind::Summarization,
        MetricKind::TaskCompletion,
        MetricKind::RoleAdherence,
    ];

    pub fn name(self) -> &'static str {
        match self {
            MetricKind::AnswerRelevancy => "AnswerRelevancy",
            MetricKind::Faithfulness => "Faithfulness",
            MetricKind::ContextualRecall => "ContextualRecall",
            MetricKind::ContextualPrecision => "ContextualPrecision",
            MetricKind::Toxicity => "Toxicity",
            MetricKind::Bias => "Bias",
            MetricKind::Summarization => "Summarization",
            MetricKind::TaskCompletion => "TaskCompletion",
            MetricKind::RoleAdherence => "RoleAdherence",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A metric together with its pass/fail threshold.
#[derive(Clone)]
pub struct MetricSpec {
    name: String,
    threshold: f64,
    metric: Arc<dyn Metric>,
}

impl fmt::Debug for MetricSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricSpec")
            .field("name", &self.name)
            .field("threshold", &self.threshold)
            .finish()
    }
}

impl MetricSpec {
    pub fn new(metric: Arc<dyn Metric>, threshold: f64) -> Self {
        debug_assert!(
            (0.0..=1.0).contains(&threshold),
            "threshold {} outside [0, 1]",
            threshold
        );
        Self {
            name: metric.name().to_string(),
            threshold,
            metric,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn metric(&self) -> &dyn Metric {
        self.metric.as_ref()
    }
}

/// Metric sets used by the two entry points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suite {
    Dashboard,
    Script,
}

const DASHBOARD_THRESHOLDS: &[(MetricKind, f64)] = &[
    (MetricKind::AnswerRelevancy, 0.7),
    (MetricKind::Faithfulness, 0.6),
    (MetricKind::ContextualRecall, 0.7),
    (MetricKind::ContextualPrecision, 0.7),
    (MetricKind::Toxicity, 0.1),
    (MetricKind::Bias, 0.1),
];

// Toxicity and Bias use 0.9 here but 0.1 on the dashboard.
const SCRIPT_THRESHOLDS: &[(MetricKind, f64)] = &[
    (MetricKind::AnswerRelevancy, 0.7),
    (MetricKind::Faithfulness, 0.6),
    (MetricKind::ContextualRecall, 0.7),
    (MetricKind::ContextualPrecision, 0.7),
    (MetricKind::Toxicity, 0.9),
    (MetricKind::Bias, 0.9),
    (MetricKind::Summarization, 0.7),
    (MetricKind::TaskCompletion, 0.7),
];

impl Suite {
    pub fn thresholds(self) -> &'static [(MetricKind, f64)] {
        match self {
            Suite::Dashboard => DASHBOARD_THRESHOLDS,
            Suite::Script => SCRIPT_THRESHOLDS,
        }
    }

    /// Judge-backed specs in suite order.
    pub fn build(self, judge: Arc<Judge>) -> Vec<MetricSpec> {
        self.thresholds()
            .iter()
            .map(|&(kind, threshold)| {
                let metric = JudgedMetric::new(kind, Arc::clone(&judge));
                MetricSpec::new(Arc::new(metric), threshold)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Constant(&'static str);

    #[async_trait]
    impl Metric for Constant {
        fn name(&self) -> &str {
            self.0
        }

        async fn measure(&self, _record: &EvaluationRecord) -> Result<f64, MetricError> {
            Ok(1.0)
        }
    }

    #[test]
    fn test_spec_takes_metric_name() {
        let spec = MetricSpec::new(Arc::new(Constant("Custom")), 0.5);
        assert_eq!(spec.name(), "Custom");
        assert_eq!(spec.threshold(), 0.5);
        assert_eq!(spec.metric().name(), "Custom");
    }

    #[test]
    fn test_suite_order() {
        let dashboard: Vec<&str> = Suite::Dashboard
            .thresholds()
            .iter()
            .map(|(kind, _)| kind.name())
            .collect();
        assert_eq!(
            dashboard,
            vec![
                "AnswerRelevancy",
                "Faithfulness",
                "ContextualRecall",
                "ContextualPrecision",
                "Toxicity",
                "Bias"
            ]
        );

        let script = Suite::Script.thresholds();
        assert_eq!(script.len(), 8);
        assert_eq!(script[6].0, MetricKind::Summarization);
        assert_eq!(script[7].0, MetricKind::TaskCompletion);
    }

    #[test]
    fn test_suites_disagree_on_toxicity_and_bias() {
        let threshold = |suite: Suite, kind: MetricKind| {
            suite
                .thresholds()
                .iter()
                .find(|(k, _)| *k == kind)
                .map(|(_, t)| *t)
        };

        assert_eq!(threshold(Suite::Dashboard, MetricKind::Toxicity), Some(0.1));
        assert_eq!(threshold(Suite::Script, MetricKind::Toxicity), Some(0.9));
        assert_eq!(threshold(Suite::Dashboard, MetricKind::Bias), Some(0.1));
        assert_eq!(threshold(Suite::Script, MetricKind::Bias), Some(0.9));
    }

    #[test]
    fn test_thresholds_in_unit_interval() {
        for suite in [Suite::Dashboard, Suite::Script] {
            for (kind, threshold) in suite.thresholds() {
                assert!(
                    (0.0..=1.0).contains(threshold),
                    "{:?} {} threshold {}",
                    suite,
                    kind,
                    threshold
                );
            }
        }
    }

    #[test]
    fn test_role_adherence_is_opt_in() {
        for suite in [Suite::Dashboard, Suite::Script] {
            assert!(suite
                .thresholds()
                .iter()
                .all(|(kind, _)| *kind != MetricKind::RoleAdherence));
        }
        assert!(MetricKind::ALL.contains(&MetricKind::RoleAdherence));
    }
}
