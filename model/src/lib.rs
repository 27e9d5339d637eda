pub mod config;
pub mod judge;
#[cfg(feature = "ollama")]
pub mod ollama;
pub mod openai;
pub mod provider;
pub mod types;

pub use config::{OllamaConfig, OpenAIConfig};
pub use judge::{Judge, JudgeConfig};
pub use openai::OpenAIProvider;
pub use provider::{ModelError, ModelProvider, ModelResult};
pub use types::{
    ChatMessage, ChatRequest, ChatResponse, Choice, FinishReason, MessageRole, ModelInfo, Usage,
};

#[cfg(feature = "ollama")]
pub use ollama::OllamaProvider;

