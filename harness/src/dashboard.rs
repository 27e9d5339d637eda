//! Interactive terminal dashboard.
//!
//! Each round shows the current question, context and expected output, lets
//! the user edit them, and on confirmation runs one full evaluation. Rounds
//! are independent; the last inputs become the next round's defaults.

use crate::agent::AgentClient;
use crate::metrics::MetricSpec;
use crate::pipeline::{assemble, evaluate};
use crate::present::render_table;
use crate::record::TestInputs;
use std::io::{self, BufRead, Write};
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Run,
    Edit,
    Quit,
}

impl Trigger {
    fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "" | "y" | "yes" => Some(Trigger::Run),
            "n" | "no" => Some(Trigger::Edit),
            "q" | "quit" | "exit" => Some(Trigger::Quit),
            _ => None,
        }
    }
}

pub struct Dashboard<'a> {
    client: &'a AgentClient,
    specs: Vec<MetricSpec>,
    inputs: TestInputs,
}

impl<'a> Dashboard<'a> {
    pub fn new(client: &'a AgentClient, specs: Vec<MetricSpec>) -> Self {
        Self {
            client,
            specs,
            inputs: TestInputs::dashboard_defaults(),
        }
    }

    pub fn inputs(&self) -> &TestInputs {
        &self.inputs
    }

    /// Drive the dashboard until the user quits or input ends.
    pub async fn run<R: BufRead, W: Write>(
        &mut self,
        mut input: R,
        mut output: W,
    ) -> io::Result<()> {
        writeln!(output, "🧪 Agent QA Dashboard")?;
        writeln!(
            output,
            "Press Enter to keep a default. Multi-line fields end with an empty line."
        )?;

        loop {
            let Some(inputs) = self.edit(&mut input, &mut output)? else {
                break;
            };

            let trigger = loop {
                write!(output, "Run test? [Y/n/q] ")?;
                output.flush()?;

                let Some(line) = read_line(&mut input)? else {
                    break Trigger::Quit;
                };
                match Trigger::parse(&line) {
                    Some(trigger) => break trigger,
                    None => writeln!(output, "Please answer y, n or q.")?,
                }
            };

            self.inputs = inputs;

            match trigger {
                Trigger::Quit => break,
                Trigger::Edit => continue,
                Trigger::Run => self.run_once(&mut output).await?,
            }
        }

        writeln!(output, "Goodbye!")?;
        Ok(())
    }

    async fn run_once<W: Write>(&self, output: &mut W) -> io::Result<()> {
        writeln!(output, "⏳ Calling agent and running metrics...")?;
        output.flush()?;

        let case = match assemble(self.client, self.inputs.clone()).await {
            Ok(case) => case,
            Err(e) => {
                error!("Agent call failed: {}", e);
                writeln!(output, "❌ {}", e)?;
                return Ok(());
            }
        };

        writeln!(output)?;
        writeln!(output, "### 🤖 Agent's Answer")?;
        writeln!(output, "{}", case.record.actual_answer())?;
        writeln!(output)?;

        let evaluation = evaluate(case, &self.specs).await;

        for warning in evaluation.results.iter().filter_map(|r| r.warning()) {
            writeln!(output, "{}", warning)?;
        }

        writeln!(output, "### 📊 Evaluation Results")?;
        write!(output, "{}", render_table(&evaluation.results))?;
        writeln!(output)?;

        info!("Dashboard run finished for {}", evaluation.conversation_id);
        Ok(())
    }

    /// Prompt for all three fields. `None` when input ends.
    fn edit<R: BufRead, W: Write>(
        &self,
        input: &mut R,
        output: &mut W,
    ) -> io::Result<Option<TestInputs>> {
        writeln!(output)?;
        writeln!(output, "Question [{}]:", self.inputs.question)?;
        write!(output, "> ")?;
        output.flush()?;
        let Some(question) = read_line(input)? else {
            return Ok(None);
        };
        let question = if question.trim().is_empty() {
            self.inputs.question.clone()
        } else {
            question.trim().to_string()
        };

        let current_context = self.inputs.context.join("\n");
        let Some(context) = read_block(input, output, "Context", &current_context)? else {
            return Ok(None);
        };
        let context = match context {
            Some(text) => vec![text],
            None => self.inputs.context.clone(),
        };

        let Some(expected) =
            read_block(input, output, "Expected Output", &self.inputs.expected_output)?
        else {
            return Ok(None);
        };
        let expected_output = expected.unwrap_or_else(|| self.inputs.expected_output.clone());

        Ok(Some(TestInputs::new(question, expected_output, context)))
    }
}

/// One line without its terminator; `None` at end of input.
fn read_line<R: BufRead>(input: &mut R) -> io::Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

/// Read lines up to the first empty one. The outer `None` means input
/// ended; the inner `None` means keep the current value.
fn read_block<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    label: &str,
    current: &str,
) -> io::Result<Option<Option<String>>> {
    writeln!(output, "{} (current):", label)?;
    for line in current.trim().lines() {
        writeln!(output, "  {}", line)?;
    }
    writeln!(output, "Enter new {} or press Enter to keep it:", label.to_lowercase())?;
    output.flush()?;

    let mut lines = Vec::new();
    loop {
        let Some(line) = read_line(input)? else {
            if lines.is_empty() {
                return Ok(None);
            }
            break;
        };
        if line.trim().is_empty() {
            break;
        }
        lines.push(line);
    }

    if lines.is_empty() {
        Ok(Some(None))
    } else {
        Ok(Some(Some(lines.join("\n"))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AgentEndpoint;
    use crate::metrics::{Metric, MetricError};
    use crate::record::EvaluationRecord;
    use async_trait::async_trait;
    use std::io::Cursor;
    use std::sync::Arc;

    struct Constant(f64);

    #[async_trait]
    impl Metric for Constant {
        fn name(&self) -> &str {
            "AnswerRelevancy"
        }

        async fn measure(&self, _record: &EvaluationRecord) -> Result<f64, MetricError> {
            Ok(self.0)
        }
    }

    struct Broken;

    #[async_trait]
    impl Metric for Broken {
        fn name(&self) -> &str {
            "Bias"
        }

        async fn measure(&self, _record: &EvaluationRecord) -> Result<f64, MetricError> {
            Err(MetricError::Failed("judge unreachable".to_string()))
        }
    }

    fn specs() -> Vec<MetricSpec> {
        vec![
            MetricSpec::new(Arc::new(Constant(0.9)), 0.7),
            MetricSpec::new(Arc::new(Broken), 0.1),
        ]
    }

    #[test]
    fn test_trigger_parse() {
        assert_eq!(Trigger::parse(""), Some(Trigger::Run));
        assert_eq!(Trigger::parse("Y"), Some(Trigger::Run));
        assert_eq!(Trigger::parse("n"), Some(Trigger::Edit));
        assert_eq!(Trigger::parse("quit"), Some(Trigger::Quit));
        assert_eq!(Trigger::parse("maybe"), None);
    }

    #[test]
    fn test_read_block() {
        let mut input = Cursor::new("line one\nline two\n\nrest\n");
        let mut out = Vec::new();
        let block = read_block(&mut input, &mut out, "Context", "old").unwrap();
        assert_eq!(block, Some(Some("line one\nline two".to_string())));

        let mut input = Cursor::new("\n");
        let block = read_block(&mut input, &mut out, "Context", "old").unwrap();
        assert_eq!(block, Some(None));

        let mut input = Cursor::new("");
        let block = read_block(&mut input, &mut out, "Context", "old").unwrap();
        assert_eq!(block, None);
    }

    #[tokio::test]
    async fn test_quit_without_running() {
        let client = AgentClient::new(AgentEndpoint::new("http://127.0.0.1:9", "k"));
        let mut dashboard = Dashboard::new(&client, specs());

        let mut out = Vec::new();
        dashboard
            .run(Cursor::new("\n\n\nq\n"), &mut out)
            .await
            .unwrap();

        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("Question [Is ServiceFabric available at JFK10?]"));
        assert!(out.ends_with("Goodbye!\n"));
        assert!(!out.contains("Agent's Answer"));
    }

    #[tokio::test]
    async fn test_edits_become_defaults() {
        let client = AgentClient::new(AgentEndpoint::new("http://127.0.0.1:9", "k"));
        let mut dashboard = Dashboard::new(&client, specs());

        let script = "Is ServiceFabric available at IAD39?\nIAD39 has no ServiceFabric.\n\nNo.\n\nn\n\n\n\nq\n";
        let mut out = Vec::new();
        dashboard.run(Cursor::new(script), &mut out).await.unwrap();

        assert_eq!(dashboard.inputs().question, "Is ServiceFabric available at IAD39?");
        assert_eq!(dashboard.inputs().context, vec!["IAD39 has no ServiceFabric."]);
        assert_eq!(dashboard.inputs().expected_output, "No.");

        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("Question [Is ServiceFabric available at IAD39?]"));
    }

    #[tokio::test]
    async fn test_run_renders_answer_and_table() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/chat")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"answer": "Yes, ServiceFabric is available at JFK10."}"#)
            .expect(1)
            .create_async()
            .await;

        let client = AgentClient::new(AgentEndpoint::new(format!("{}/api/chat", server.url()), "k"));
        let mut dashboard = Dashboard::new(&client, specs());

        let mut out = Vec::new();
        dashboard
            .run(Cursor::new("\n\n\ny\n\n\n\nq\n"), &mut out)
            .await
            .unwrap();

        mock.assert_async().await;
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("### 🤖 Agent's Answer\nYes, ServiceFabric is available at JFK10."));
        assert!(out.contains("⚠️ Bias failed: judge unreachable"));
        assert!(out.contains("| Metric "));
        assert!(out.contains("| 0.90 "));
        assert!(out.contains("Answer was relevant."));
        assert!(out.ends_with("Goodbye!\n"));
    }

    #[tokio::test]
    async fn test_agent_error_shown_inline() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/chat")
            .with_status(500)
            .with_body("upstream exploded")
            .expect(2)
            .create_async()
            .await;

        let client = AgentClient::new(AgentEndpoint::new(format!("{}/api/chat", server.url()), "k"));
        let mut dashboard = Dashboard::new(&client, specs());

        // two rounds, both failing, then quit
        let mut out = Vec::new();
        dashboard
            .run(Cursor::new("\n\n\n\n\n\n\n\n\n\n\nq\n"), &mut out)
            .await
            .unwrap();

        mock.assert_async().await;
        let out = String::from_utf8(out).unwrap();
        assert_eq!(out.matches("❌ Agent API error 500: upstream exploded").count(), 2);
        assert!(!out.contains("Evaluation Results"));
    }
}
