//! Text rendering of evaluation results for the terminal.

use crate::agent::AgentError;
use crate::config::AgentEndpoint;
use crate::record::EvaluationRecord;
use crate::runner::{MetricOutcome, MetricResult};

const HEADERS: [&str; 5] = ["Metric", "Score", "Passed", "Threshold", "What It Means"];

pub fn score_cell(score: Option<f64>) -> String {
    match score {
        Some(score) => format!("{:.2}", score),
        None => "⚠️".to_string(),
    }
}

pub fn passed_cell(passed: Option<bool>) -> &'static str {
    match passed {
        Some(true) => "✅",
        Some(false) => "❌",
        None => "⚠️",
    }
}

fn row(result: &MetricResult) -> [String; 5] {
    [
        result.metric_name.clone(),
        score_cell(result.score()),
        passed_cell(result.passed()).to_string(),
        format!("{}", result.threshold),
        result.explanation.clone(),
    ]
}

/// Pipe-delimited table with one row per result, columns padded to the
/// widest cell. Width is counted in chars, so emoji cells may sit a column
/// off in some terminals.
pub fn render_table(results: &[MetricResult]) -> String {
    let rows: Vec<[String; 5]> = results.iter().map(row).collect();

    let mut widths = HEADERS.map(|h| h.chars().count());
    for cells in &rows {
        for (width, cell) in widths.iter_mut().zip(cells) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let line = |cells: &[&str]| {
        let padded: Vec<String> = cells
            .iter()
            .zip(widths)
            .map(|(cell, width)| {
                let pad = width.saturating_sub(cell.chars().count());
                format!("{}{}", cell, " ".repeat(pad))
            })
            .collect();
        format!("| {} |", padded.join(" | "))
    };

    let mut out = String::new();
    out.push_str(&line(&HEADERS[..]));
    out.push('\n');
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(&format!("|-{}-|", rule.join("-|-")));
    out.push('\n');

    for cells in &rows {
        let cells: Vec<&str> = cells.iter().map(String::as_str).collect();
        out.push_str(&line(&cells));
        out.push('\n');
    }

    out
}

/// One console line per result.
pub fn console_line(result: &MetricResult) -> String {
    match &result.outcome {
        MetricOutcome::Scored { score, passed } => format!(
            "{} {}: {:.2} (Threshold: {}) - {}",
            if *passed { "✅" } else { "❌" },
            result.metric_name,
            score,
            result.threshold,
            result.explanation
        ),
        MetricOutcome::Unscored { reason } => {
            format!("⚠️ Error running {}: {}", result.metric_name, reason)
        }
    }
}

/// Sanity lines showing which endpoint is configured. The key itself is
/// never printed.
pub fn config_lines(endpoint: &AgentEndpoint) -> String {
    format!(
        "✅ API_URL = {}\n✅ API_KEY loaded = {}",
        endpoint.url,
        !endpoint.api_key.is_empty()
    )
}

pub fn debug_block(record: &EvaluationRecord) -> String {
    let mut out = String::from("--- DEBUG INFO ---\n");
    out.push_str(&format!("Question: {}\n", record.question()));
    out.push_str(&format!("Agent Answer: {}\n", record.actual_answer()));
    out.push_str(&format!("Expected Output: {}\n", record.expected_answer()));
    out.push_str("Context:\n");
    for chunk in record.context() {
        out.push_str(&format!("  {}\n", chunk.trim()));
    }
    out.push_str("------------------");
    out
}

/// Agent failure for `run`. With `json` this is a JSON object so stdout
/// stays machine-readable.
pub fn agent_failure(err: &AgentError, json: bool) -> String {
    if !json {
        return format!("❌ {}", err);
    }

    let status = match err {
        AgentError::Status { status, .. } => Some(*status),
        AgentError::Transport(_) => None,
    };
    serde_json::json!({
        "error": err.to_string(),
        "status": status,
    })
    .to_string()
}
