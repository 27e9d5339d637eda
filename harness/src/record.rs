//! Test inputs and the evaluation record every metric receives.

use crate::config::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

const DASHBOARD_QUESTION: &str = "Is ServiceFabric available at JFK10?";

const DASHBOARD_CONTEXT: &str = "
ServiceFabric is available at JFK10…
– Location: 111 8th Avenue, New York, NY
– Deployment Type: Colo & Scale
– 100G Port Availability: Yes
";

const DASHBOARD_EXPECTED: &str = "Yes, ServiceFabric is available at JFK10 (operational site code for NYC2, also called JFK010). The site is \"SF Enabled,\" indicating that digital connectivity via ServiceFabric is supported. Key details include:
Location: 111 8th Avenue, New York, NY
Deployment Type: Colo & Scale
Platform Diversity: Metro Connect links primary location (32 Avenue of the Americas) and redundant location (60 Hudson Street)
Availability of 100G Ports: Yes
This means clients at JFK10 can leverage ServiceFabric for virtual network interconnectivity alongside physical and metro connect options.
Would you like me to walk you through the best-fit Digital Realty offering for leveraging ServiceFabric at JFK10 or explore connectivity options there?";

const SCRIPT_CONTEXT: &str = "ServiceFabric is available at JFK10 (operational site code NYC2, also called JFK010). \
The site is 'SF Enabled,' supporting digital connectivity via ServiceFabric. Key details include:
- Location: 111 8th Avenue, New York, NY
- Deployment Type: Colo & Scale
- Platform Diversity: Metro Connect links primary and redundant locations
- 100G Port Availability: Yes
Clients at JFK10 can leverage ServiceFabric for virtual interconnectivity.";

const SCRIPT_EXPECTED: &str = "Yes, ServiceFabric is available at JFK10 (also known as JFK010, site code NYC2). \
The site supports digital connectivity via ServiceFabric. Key details:
- Location: 111 8th Avenue, New York, NY
- Deployment Type: Colo & Scale
- Metro Connect: links to primary and redundant sites
- 100G Ports: Available
This enables clients to use ServiceFabric for virtual and physical interconnection.";

/// What the user supplies before the agent is called.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestInputs {
    pub question: String,
    pub expected_output: String,
    #[serde(deserialize_with = "one_or_many")]
    pub context: Vec<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(passage) => vec![passage],
        OneOrMany::Many(passages) => passages,
    })
}

impl TestInputs {
    pub fn new(
        question: impl Into<String>,
        expected_output: impl Into<String>,
        context: Vec<String>,
    ) -> Self {
        Self {
            question: question.into(),
            expected_output: expected_output.into(),
            context,
        }
    }

    /// Prefilled values of the interactive dashboard's fields.
    pub fn dashboard_defaults() -> Self {
        Self::new(
            DASHBOARD_QUESTION,
            DASHBOARD_EXPECTED,
            vec![DASHBOARD_CONTEXT.to_string()],
        )
    }

    /// Fixed inputs of the one-shot script.
    pub fn script_defaults() -> Self {
        Self::new(
            DASHBOARD_QUESTION,
            SCRIPT_EXPECTED,
            vec![SCRIPT_CONTEXT.to_string()],
        )
    }

    /// Load a TOML case file with `question`, `expected_output` and `context`
    /// keys. `context` may be a single passage or a list of passages.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let case_error = |message: String| ConfigError::CaseFile {
            path: path.display().to_string(),
            message,
        };

        let raw = std::fs::read_to_string(path).map_err(|e| case_error(e.to_string()))?;
        let inputs: Self = toml::from_str(&raw).map_err(|e| case_error(e.to_string()))?;

        if inputs.question.trim().is_empty() {
            return Err(case_error("question cannot be empty".to_string()));
        }

        Ok(inputs)
    }

    /// Pair the inputs with the agent's answer.
    pub fn into_record(self, actual_answer: impl Into<String>) -> EvaluationRecord {
        EvaluationRecord {
            question: self.question,
            actual_answer: actual_answer.into(),
            expected_answer: self.expected_output,
            context: self.context,
        }
    }
}

/// The test case handed to every metric. Fields are private so a record
/// cannot change after it is built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationRecord {
    question: String,
    actual_answer: String,
    expected_answer: String,
    context: Vec<String>,
}

impl EvaluationRecord {
    pub fn new(
        question: impl Into<String>,
        actual_answer: impl Into<String>,
        expected_answer: impl Into<String>,
        context: Vec<String>,
    ) -> Self {
        Self {
            question: question.into(),
            actual_answer: actual_answer.into(),
            expected_answer: expected_answer.into(),
            context,
        }
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn actual_answer(&self) -> &str {
        &self.actual_answer
    }

    pub fn expected_answer(&self) -> &str {
        &self.expected_answer
    }

    pub fn context(&self) -> &[String] {
        &self.context
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_share_the_question() {
        let dashboard = TestInputs::dashboard_defaults();
        let script = TestInputs::script_defaults();

        assert_eq!(dashboard.question, "Is ServiceFabric available at JFK10?");
        assert_eq!(dashboard.question, script.question);
        assert_eq!(dashboard.context.len(), 1);
        assert_eq!(script.context.len(), 1);
        assert_ne!(dashboard.expected_output, script.expected_output);
        assert!(script.context[0].contains("111 8th Avenue"));
    }

    #[test]
    fn test_into_record() {
        let record = TestInputs::new("Q?", "Expected.", vec!["ctx".to_string()])
            .into_record("Actual.");

        assert_eq!(record.question(), "Q?");
        assert_eq!(record.actual_answer(), "Actual.");
        assert_eq!(record.expected_answer(), "Expected.");
        assert_eq!(record.context(), &["ctx".to_string()]);
    }

    #[test]
    fn test_load_case_with_single_context() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
question = "Is ServiceFabric available at IAD39?"
expected_output = "No."
context = "ServiceFabric is not offered at IAD39."
"#
        )
        .unwrap();

        let inputs = TestInputs::from_toml_file(file.path()).unwrap();
        assert_eq!(inputs.question, "Is ServiceFabric available at IAD39?");
        assert_eq!(inputs.context, vec!["ServiceFabric is not offered at IAD39."]);
    }

    #[test]
    fn test_load_case_with_context_list() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
question = "Q?"
expected_output = "A."
context = ["first passage", "second passage"]
"#
        )
        .unwrap();

        let inputs = TestInputs::from_toml_file(file.path()).unwrap();
        assert_eq!(inputs.context.len(), 2);
        assert_eq!(inputs.context[1], "second passage");
    }

    #[test]
    fn test_load_case_errors() {
        let missing = TestInputs::from_toml_file(Path::new("/definitely/not/here.toml"));
        assert!(matches!(missing, Err(ConfigError::CaseFile { .. })));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "question = \"  \"\nexpected_output = \"\"\ncontext = []").unwrap();
        let blank = TestInputs::from_toml_file(file.path());
        assert!(matches!(blank, Err(ConfigError::CaseFile { message, .. }) if message.contains("question")));
    }
}
