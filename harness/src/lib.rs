pub mod agent;
pub mod config;
pub mod dashboard;
pub mod explain;
pub mod metrics;
pub mod pipeline;
pub mod present;
pub mod record;
pub mod runner;

pub use agent::{AgentClient, AgentError, AgentReply, AgentRequest, AgentResult};
pub use config::{AgentEndpoint, ConfigError, HarnessConfig, JudgeBackend, JudgeSettings};
pub use dashboard::Dashboard;
pub use explain::explain;
pub use metrics::{
    JudgedMetric, Metric, MetricError, MetricKind, MetricSpec, Suite, Verdict, VerdictLabel,
    DEFAULT_ROLE,
};
pub use pipeline::{assemble, evaluate, AnsweredCase, Evaluation};
pub use record::{EvaluationRecord, TestInputs};
pub use runner::{run_metrics, MetricOutcome, MetricResult};
