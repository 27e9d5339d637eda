//! LLM-as-judge prompting
//!
//! A [`Judge`] wraps any [`ModelProvider`] and asks it for a JSON verdict.
//! Metrics in the harness build the prompt, the judge sends it with a fixed
//! grading system prompt, pulls the first JSON object out of the reply and
//! deserializes it into the caller's verdict type.
//!
//! # Examples
//!
//! ```rust,no_run
//! use model::judge::{Judge, JudgeConfig};
//! use model::{OpenAIConfig, OpenAIProvider};
//! use serde::Deserialize;
//! use std::sync::Arc;
//!
//! #[derive(Deserialize)]
//! struct Verdict {
//!     verdict: String,
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = OpenAIProvider::new(OpenAIConfig::default().with_api_key("sk-..."))?;
//! let judge = Judge::new(Arc::new(provider), JudgeConfig::new("gpt-4o"));
//!
//! let verdict: Verdict = judge
//!     .ask_json("Is 'Paris is in France' true? Answer {\"verdict\": \"yes\"|\"no\"}.")
//!     .await?;
//! println!("{}", verdict.verdict);
//! # Ok(())
//! # }
//! ```

use crate::provider::{ModelError, ModelProvider, ModelResult};
use crate::types::{ChatMessage, ChatRequest};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

const JUDGE_SYSTEM_PROMPT: &str = "You are a meticulous evaluator of AI assistant answers. \
Follow the instructions exactly and reply with a single JSON object and nothing else.";

/// Parameters for judge requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgeConfig {
    /// Model the provider should use for grading
    pub model: String,
    /// Sampling temperature; grading wants deterministic output
    pub temperature: f32,
    /// Upper bound on the judge's reply length
    pub max_tokens: Option<u32>,
    /// Log full prompts and replies at debug level
    pub verbose_logging: bool,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            temperature: 0.0,
            max_tokens: Some(2048),
            verbose_logging: false,
        }
    }
}

impl JudgeConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Enable verbose logging for debugging
    pub fn with_verbose_logging(mut self) -> Self {
        self.verbose_logging = true;
        self
    }
}

/// Sends grading prompts to a model and decodes its JSON verdicts.
pub struct Judge {
    provider: Arc<dyn ModelProvider>,
    config: JudgeConfig,
}

impl Judge {
    pub fn new(provider: Arc<dyn ModelProvider>, config: JudgeConfig) -> Self {
        Self { provider, config }
    }

    pub fn config(&self) -> &JudgeConfig {
        &self.config
    }

    pub fn provider(&self) -> &dyn ModelProvider {
        self.provider.as_ref()
    }

    /// Ask the judge and decode its reply into `T`.
    pub async fn ask_json<T: DeserializeOwned>(&self, prompt: &str) -> ModelResult<T> {
        let mut request = ChatRequest::new(
            &self.config.model,
            vec![
                ChatMessage::system(JUDGE_SYSTEM_PROMPT),
                ChatMessage::user(prompt),
            ],
        )
        .with_temperature(self.config.temperature)
        .with_json_mode();

        if let Some(max_tokens) = self.config.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }

        if self.config.verbose_logging {
            debug!(
                "Judge prompt ({}): {}",
                self.provider.provider_name(),
                prompt
            );
        }

        let response = self.provider.chat(request).await?;
        let content = response
            .first_content()
            .ok_or_else(|| ModelError::InvalidResponse {
                message: "judge returned no content".to_string(),
            })?;

        if self.config.verbose_logging {
            debug!("Judge reply: {}", content);
        }

        parse_verdict(content)
    }
}

/// Decode the first JSON object found in a judge reply.
pub fn parse_verdict<T: DeserializeOwned>(reply: &str) -> ModelResult<T> {
    let payload = extract_json_object(reply).ok_or_else(|| {
        warn!("Judge reply contained no JSON object");
        ModelError::InvalidResponse {
            message: "no JSON object in judge reply".to_string(),
        }
    })?;

    serde_json::from_str(payload).map_err(|e| ModelError::InvalidResponse {
        message: format!("unexpected verdict shape: {}", e),
    })
}

/// The first complete JSON object in `reply`. Models wrap JSON in code
/// fences or prose, and the prose may itself contain braces.
pub fn extract_json_object(reply: &str) -> Option<&str> {
    reply.match_indices('{').find_map(|(start, _)| {
        let tail = &reply[start..];
        let mut values = serde_json::Deserializer::from_str(tail).into_iter::<serde_json::Value>();
        match values.next() {
            Some(Ok(serde_json::Value::Object(_))) => Some(&tail[..values.byte_offset()]),
            _ => None,
        }
    })
}
