//! One end-to-end run: ask the agent, build the record, score it.

use crate::agent::{AgentClient, AgentResult};
use crate::metrics::MetricSpec;
use crate::record::{EvaluationRecord, TestInputs};
use crate::runner::{run_metrics, MetricResult};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

/// The agent's answer paired with the inputs it was asked about.
#[derive(Debug, Clone, Serialize)]
pub struct AnsweredCase {
    pub conversation_id: String,
    pub answered_at: DateTime<Utc>,
    pub record: EvaluationRecord,
}

/// Everything a run produced.
#[derive(Debug, Clone, Serialize)]
pub struct Evaluation {
    pub conversation_id: String,
    pub answered_at: DateTime<Utc>,
    pub record: EvaluationRecord,
    pub results: Vec<MetricResult>,
}

impl Evaluation {
    pub fn passed_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.passed() == Some(true))
            .count()
    }

    pub fn unscored_count(&self) -> usize {
        self.results.iter().filter(|r| r.score().is_none()).count()
    }
}

/// Ask the agent the inputs' question. An agent failure ends the run here,
/// before any metric is built or judged.
pub async fn assemble(client: &AgentClient, inputs: TestInputs) -> AgentResult<AnsweredCase> {
    let reply = client.ask(&inputs.question).await?;

    Ok(AnsweredCase {
        conversation_id: reply.conversation_id,
        answered_at: Utc::now(),
        record: inputs.into_record(reply.answer),
    })
}

/// Score an answered case with `specs`.
pub async fn evaluate(case: AnsweredCase, specs: &[MetricSpec]) -> Evaluation {
    let results = run_metrics(&case.record, specs).await;

    let evaluation = Evaluation {
        conversation_id: case.conversation_id,
        answered_at: case.answered_at,
        record: case.record,
        results,
    };

    info!(
        "Conversation {}: {}/{} metrics passed, {} unscored",
        evaluation.conversation_id,
        evaluation.passed_count(),
        evaluation.results.len(),
        evaluation.unscored_count()
    );

    evaluation
}
