//! Judge backend for a local Ollama server.
//!
//! Chat goes straight to `/api/chat` so every request can carry
//! `format: "json"` and sampling options. Model listing uses ollama-rs.
//! Both are addressed from the same configured server root.

use crate::config::OllamaConfig;
use crate::provider::{ModelError, ModelProvider, ModelResult};
use crate::types::{
    ChatMessage, ChatRequest, ChatResponse, Choice, FinishReason, MessageRole, ModelInfo, Usage,
};
use async_trait::async_trait;
use ollama_rs::error::OllamaError;
use ollama_rs::Ollama;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

#[derive(Serialize)]
struct ChatBody<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<SamplingOptions>,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct SamplingOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Deserialize)]
struct ChatReply {
    message: ReplyMessage,
    #[serde(default)]
    prompt_eval_count: Option<u64>,
    #[serde(default)]
    eval_count: Option<u64>,
}

#[derive(Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: String,
}

impl<'a> ChatBody<'a> {
    fn from_request(request: &'a ChatRequest) -> Self {
        let messages = request
            .messages
            .iter()
            .map(|msg| WireMessage {
                role: match msg.role {
                    MessageRole::System => "system",
                    MessageRole::User => "user",
                    MessageRole::Assistant => "assistant",
                },
                content: msg.content.as_deref().unwrap_or_default(),
            })
            .collect();

        let options = (request.temperature.is_some() || request.max_tokens.is_some()).then(|| {
            SamplingOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            }
        });

        Self {
            model: &request.model,
            messages,
            stream: false,
            format: request.json_mode.then_some("json"),
            options,
        }
    }
}

impl From<ChatReply> for ChatResponse {
    fn from(reply: ChatReply) -> Self {
        let prompt_tokens = reply.prompt_eval_count.unwrap_or(0) as u32;
        let completion_tokens = reply.eval_count.unwrap_or(0) as u32;
        let content = Some(reply.message.content).filter(|c| !c.is_empty());

        ChatResponse {
            choices: vec![Choice {
                message: ChatMessage {
                    role: MessageRole::Assistant,
                    content,
                },
                finish_reason: Some(FinishReason::Stop),
            }],
            usage: Some(Usage {
                prompt_tokens,
                completion_tokens,
                total_tokens: prompt_tokens + completion_tokens,
            }),
        }
    }
}

/// Server root with a trailing slash. A trailing `/v1` (the OpenAI-compatible
/// prefix) is dropped so both URL styles point at the same server.
fn server_root(base_url: &str) -> ModelResult<reqwest::Url> {
    let trimmed = base_url.trim_end_matches('/');
    let trimmed = trimmed.strip_suffix("/v1").unwrap_or(trimmed);

    reqwest::Url::parse(&format!("{}/", trimmed)).map_err(|e| ModelError::InvalidConfig {
        message: format!("invalid Ollama URL '{}': {}", base_url, e),
    })
}

fn listing_error(err: OllamaError) -> ModelError {
    match err {
        OllamaError::ReqwestError(e) if e.is_timeout() => ModelError::ServiceUnavailable {
            message: "Request timeout".to_string(),
        },
        OllamaError::ReqwestError(e) if e.is_connect() => ModelError::ServiceUnavailable {
            message: "Cannot connect to Ollama service".to_string(),
        },
        OllamaError::JsonError(e) => ModelError::Serialization(e),
        other => ModelError::Unknown {
            message: format!("Ollama error: {}", other),
        },
    }
}

fn chat_error(err: reqwest::Error) -> ModelError {
    if err.is_timeout() {
        ModelError::ServiceUnavailable {
            message: "Request timeout".to_string(),
        }
    } else if err.is_connect() {
        ModelError::ServiceUnavailable {
            message: "Cannot connect to Ollama service".to_string(),
        }
    } else {
        ModelError::Network(err)
    }
}

pub struct OllamaProvider {
    models: Ollama,
    http: reqwest::Client,
    chat_url: reqwest::Url,
    config: OllamaConfig,
}

impl OllamaProvider {
    pub fn new(config: OllamaConfig) -> ModelResult<Self> {
        config
            .validate()
            .map_err(|message| ModelError::InvalidConfig { message })?;

        let root = server_root(&config.base_url)?;
        let chat_url = root
            .join("api/chat")
            .map_err(|e| ModelError::InvalidConfig {
                message: format!("invalid Ollama chat URL: {}", e),
            })?;

        // try_new keeps the port from the URL; Ollama::new would replace it.
        let models = Ollama::try_new(root.as_str()).map_err(|e| ModelError::InvalidConfig {
            message: format!("invalid Ollama URL '{}': {}", config.base_url, e),
        })?;

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(ModelError::Network)?;

        debug!("Ollama judge backend at {}", root);

        Ok(Self {
            models,
            http,
            chat_url,
            config,
        })
    }

    pub fn config(&self) -> &OllamaConfig {
        &self.config
    }
}

#[async_trait]
impl ModelProvider for OllamaProvider {
    async fn chat(&self, request: ChatRequest) -> ModelResult<ChatResponse> {
        debug!("Ollama chat with model {}", request.model);

        let response = self
            .http
            .post(self.chat_url.clone())
            .json(&ChatBody::from_request(&request))
            .send()
            .await
            .map_err(chat_error)?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ModelError::ModelNotFound {
                model: request.model,
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Unknown {
                message: format!("Ollama API returned {}: {}", status, body),
            });
        }

        let reply: ChatReply = response.json().await.map_err(ModelError::Network)?;
        info!("Ollama chat completed");

        Ok(reply.into())
    }

    async fn list_models(&self) -> ModelResult<Vec<ModelInfo>> {
        let models = self
            .models
            .list_local_models()
            .await
            .map_err(listing_error)?;

        info!("Ollama reports {} local models", models.len());

        Ok(models
            .into_iter()
            .map(|model| ModelInfo {
                name: model.name,
                size: Some(model.size),
                modified_at: Some(model.modified_at),
            })
            .collect())
    }

    async fn health_check(&self) -> ModelResult<()> {
        self.list_models().await.map(|_| ()).map_err(|e| {
            error!("Ollama health check failed: {}", e);
            e
        })
    }

    fn provider_name(&self) -> &'static str {
        "ollama"
    }
}
