//! HTTP client for the conversational agent under test.
//!
//! One call is one POST: the question plus a freshly generated conversation
//! id, authenticated with the `x-functions-key` header. Nothing is retried.

use crate::config::AgentEndpoint;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info};
use uuid::Uuid;

pub const API_KEY_HEADER: &str = "x-functions-key";

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Agent API error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Agent request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

pub type AgentResult<T> = Result<T, AgentError>;

/// JSON body the agent endpoint expects.
#[derive(Debug, Clone, Serialize)]
pub struct AgentRequest {
    pub conversation: String,
    pub conversation_id: String,
}

impl AgentRequest {
    /// A request for `question` in a brand new conversation.
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            conversation: question.into(),
            conversation_id: Uuid::new_v4().to_string(),
        }
    }
}

/// What the agent said, and in which conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentReply {
    pub conversation_id: String,
    pub answer: String,
}

pub struct AgentClient {
    http: reqwest::Client,
    endpoint: AgentEndpoint,
}

impl AgentClient {
    /// Uses reqwest's defaults, which means no request timeout.
    pub fn new(endpoint: AgentEndpoint) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint,
        }
    }

    /// Ask the agent `question` and return its answer text.
    pub async fn call_agent(&self, question: &str) -> AgentResult<String> {
        self.ask(question).await.map(|reply| reply.answer)
    }

    /// Like [`call_agent`](Self::call_agent) but keeps the conversation id.
    pub async fn ask(&self, question: &str) -> AgentResult<AgentReply> {
        self.send(AgentRequest::new(question)).await
    }

    pub async fn send(&self, request: AgentRequest) -> AgentResult<AgentReply> {
        debug!(
            "Calling agent at {} (conversation {})",
            self.endpoint.url, request.conversation_id
        );

        let response = self
            .http
            .post(&self.endpoint.url)
            .header(API_KEY_HEADER, &self.endpoint.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Agent request failed: {}", e);
                AgentError::Transport(e)
            })?;

        let status = response.status().as_u16();
        let body = response.text().await?;

        if status != 200 {
            error!("Agent returned status {}", status);
            return Err(AgentError::Status { status, body });
        }

        info!(
            "Agent answered conversation {} ({} bytes)",
            request.conversation_id,
            body.len()
        );

        Ok(AgentReply {
            conversation_id: request.conversation_id,
            answer: extract_answer(body),
        })
    }
}

/// The `answer` field when the body is JSON carrying a non-empty one,
/// otherwise the body as-is.
pub fn extract_answer(body: String) -> String {
    let answer = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|json| match json.get("answer") {
            Some(serde_json::Value::String(answer)) if !answer.is_empty() => Some(answer.clone()),
            _ => None,
        });

    answer.unwrap_or(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_answer_field() {
        assert_eq!(extract_answer(r#"{"answer": "Yes."}"#.to_string()), "Yes.");
    }

    #[test]
    fn test_extract_answer_falls_back_to_body() {
        let empty = r#"{"answer": ""}"#.to_string();
        assert_eq!(extract_answer(empty.clone()), empty);

        let missing = r#"{"reply": "Yes."}"#.to_string();
        assert_eq!(extract_answer(missing.clone()), missing);

        let not_a_string = r#"{"answer": null}"#.to_string();
        assert_eq!(extract_answer(not_a_string.clone()), not_a_string);

        assert_eq!(extract_answer("plain text answer".to_string()), "plain text answer");
        assert_eq!(extract_answer(String::new()), "");
    }

    #[test]
    fn test_requests_get_fresh_conversation_ids() {
        let first = AgentRequest::new("Is ServiceFabric available at JFK10?");
        let second = AgentRequest::new("Is ServiceFabric available at JFK10?");

        assert_ne!(first.conversation_id, second.conversation_id);
        assert!(Uuid::parse_str(&first.conversation_id).is_ok());
    }

    #[test]
    fn test_request_body_shape() {
        let request = AgentRequest::new("Q?");
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["conversation"], "Q?");
        assert_eq!(json["conversation_id"], request.conversation_id.as_str());
        assert_eq!(json.as_object().unwrap().len(), 2);
    }

    #[test]
    fn test_status_error_message() {
        let err = AgentError::Status {
            status: 404,
            body: "Not Found".to_string(),
        };
        assert_eq!(err.to_string(), "Agent API error 404: Not Found");
    }
}
