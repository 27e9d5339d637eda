//! Process configuration, read once from the environment at startup.

use model::{
    Judge, JudgeConfig, ModelProvider, ModelResult, OllamaConfig, OllamaProvider, OpenAIConfig,
    OpenAIProvider,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

pub const API_URL: &str = "API_URL";
pub const API_KEY: &str = "API_KEY";
pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const OPENAI_BASE_URL: &str = "OPENAI_BASE_URL";
pub const OLLAMA_BASE_URL: &str = "OLLAMA_BASE_URL";
pub const JUDGE_BACKEND: &str = "JUDGE_BACKEND";
pub const JUDGE_MODEL: &str = "JUDGE_MODEL";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {message}")]
    Invalid { name: &'static str, message: String },

    #[error("Failed to read test case {path}: {message}")]
    CaseFile { path: String, message: String },
}

/// Where the agent under test lives.
#[derive(Clone, Serialize, Deserialize)]
pub struct AgentEndpoint {
    pub url: String,
    #[serde(skip_serializing)]
    pub api_key: String,
}

impl fmt::Debug for AgentEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentEndpoint")
            .field("url", &self.url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl AgentEndpoint {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: api_key.into(),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.url.is_empty() {
            return Err("Agent URL cannot be empty".to_string());
        }

        if !self.url.starts_with("http://") && !self.url.starts_with("https://") {
            return Err("Agent URL must start with http:// or https://".to_string());
        }

        if self.api_key.trim().is_empty() {
            return Err("Agent API key cannot be blank".to_string());
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JudgeBackend {
    OpenAI,
    Ollama,
}

impl FromStr for JudgeBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "ollama" => Ok(Self::Ollama),
            other => Err(format!("unknown judge backend '{}' (expected openai or ollama)", other)),
        }
    }
}

impl fmt::Display for JudgeBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpenAI => write!(f, "openai"),
            Self::Ollama => write!(f, "ollama"),
        }
    }
}

/// Which model grades the answers and how to reach it.
#[derive(Debug, Clone)]
pub struct JudgeSettings {
    pub backend: JudgeBackend,
    pub openai: OpenAIConfig,
    pub ollama: OllamaConfig,
}

impl JudgeSettings {
    /// Judge settings alone. `health` and `models` need nothing else.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let backend = match get(JUDGE_BACKEND) {
            Some(value) => value.parse().map_err(|message| ConfigError::Invalid {
                name: JUDGE_BACKEND,
                message,
            })?,
            None => JudgeBackend::OpenAI,
        };

        let mut openai = OpenAIConfig::default();
        if let Some(base_url) = get(OPENAI_BASE_URL) {
            openai = openai.with_base_url(base_url);
        }
        if let Some(key) = get(OPENAI_API_KEY) {
            openai = openai.with_api_key(key);
        }

        let mut ollama = OllamaConfig::default();
        if let Some(base_url) = get(OLLAMA_BASE_URL) {
            ollama = ollama.with_base_url(base_url);
        }

        if let Some(model) = get(JUDGE_MODEL) {
            match backend {
                JudgeBackend::OpenAI => openai = openai.with_model(model),
                JudgeBackend::Ollama => ollama = ollama.with_model(model),
            }
        }

        let (name, validation) = match backend {
            JudgeBackend::OpenAI => (OPENAI_BASE_URL, openai.validate()),
            JudgeBackend::Ollama => (OLLAMA_BASE_URL, ollama.validate()),
        };
        validation.map_err(|message| ConfigError::Invalid { name, message })?;

        Ok(Self {
            backend,
            openai,
            ollama,
        })
    }

    pub fn model(&self) -> &str {
        match self.backend {
            JudgeBackend::OpenAI => &self.openai.default_model,
            JudgeBackend::Ollama => &self.ollama.default_model,
        }
    }

    pub fn has_credential(&self) -> bool {
        match self.backend {
            JudgeBackend::OpenAI => self.openai.api_key.is_some(),
            JudgeBackend::Ollama => true,
        }
    }

    /// Client for the configured backend.
    pub fn provider(&self) -> ModelResult<Arc<dyn ModelProvider>> {
        if !self.has_credential() {
            warn!(
                "{} is not set; judge calls will fail with an authentication error",
                OPENAI_API_KEY
            );
        }

        let provider: Arc<dyn ModelProvider> = match self.backend {
            JudgeBackend::OpenAI => Arc::new(OpenAIProvider::new(self.openai.clone())?),
            JudgeBackend::Ollama => Arc::new(OllamaProvider::new(self.ollama.clone())?),
        };

        info!(
            "Judging with {} model {}",
            provider.provider_name(),
            self.model()
        );
        Ok(provider)
    }

    pub fn judge(&self) -> ModelResult<Arc<Judge>> {
        let provider = self.provider()?;
        Ok(Arc::new(Judge::new(provider, JudgeConfig::new(self.model()))))
    }
}

impl Default for JudgeSettings {
    fn default() -> Self {
        Self {
            backend: JudgeBackend::OpenAI,
            openai: OpenAIConfig::default(),
            ollama: OllamaConfig::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HarnessConfig {
    pub agent: AgentEndpoint,
    pub judge: JudgeSettings,
}

impl HarnessConfig {
    /// Build from the process environment. Call `dotenvy::dotenv()` first to
    /// pick up a `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let agent = AgentEndpoint::new(
            get(API_URL).ok_or(ConfigError::Missing(API_URL))?,
            get(API_KEY).ok_or(ConfigError::Missing(API_KEY))?,
        );
        agent.validate().map_err(|message| ConfigError::Invalid {
            name: API_URL,
            message,
        })?;

        let judge = JudgeSettings::from_lookup(&lookup)?;

        Ok(Self { agent, judge })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_minimal_environment() {
        let config = HarnessConfig::from_lookup(lookup(&[
            (API_URL, "https://agent.example.com/api/chat"),
            (API_KEY, "functions-key"),
        ]))
        .unwrap();

        assert_eq!(config.agent.url, "https://agent.example.com/api/chat");
        assert_eq!(config.agent.api_key, "functions-key");
        assert_eq!(config.judge.backend, JudgeBackend::OpenAI);
        assert_eq!(config.judge.model(), "gpt-4o");
        assert!(!config.judge.has_credential());
    }

    #[test]
    fn test_missing_required_values() {
        let err = HarnessConfig::from_lookup(lookup(&[(API_KEY, "k")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(API_URL)));

        let err =
            HarnessConfig::from_lookup(lookup(&[(API_URL, "https://a"), (API_KEY, "  ")]))
                .unwrap_err();
        assert!(matches!(err, ConfigError::Missing(API_KEY)));
    }

    #[test]
    fn test_invalid_agent_url() {
        let err = HarnessConfig::from_lookup(lookup(&[(API_URL, "agent.local"), (API_KEY, "k")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: API_URL, .. }));
    }

    #[test]
    fn test_openai_judge_settings() {
        let config = HarnessConfig::from_lookup(lookup(&[
            (API_URL, "https://a"),
            (API_KEY, "k"),
            (OPENAI_API_KEY, "sk-test"),
            (OPENAI_BASE_URL, "http://localhost:8000/"),
            (JUDGE_MODEL, "gpt-4o-mini"),
        ]))
        .unwrap();

        assert!(config.judge.has_credential());
        assert_eq!(config.judge.openai.base_url, "http://localhost:8000");
        assert_eq!(config.judge.model(), "gpt-4o-mini");
    }

    #[test]
    fn test_ollama_judge_settings() {
        let config = HarnessConfig::from_lookup(lookup(&[
            (API_URL, "https://a"),
            (API_KEY, "k"),
            (JUDGE_BACKEND, "Ollama"),
            (JUDGE_MODEL, "qwen3:8b"),
        ]))
        .unwrap();

        assert_eq!(config.judge.backend, JudgeBackend::Ollama);
        assert_eq!(config.judge.model(), "qwen3:8b");
        assert_eq!(config.judge.openai.default_model, "gpt-4o");
        assert!(config.judge.has_credential());
    }

    #[test]
    fn test_unknown_backend() {
        let err = HarnessConfig::from_lookup(lookup(&[
            (API_URL, "https://a"),
            (API_KEY, "k"),
            (JUDGE_BACKEND, "bedrock"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: JUDGE_BACKEND, .. }));
    }

    #[test]
    fn test_judge_uses_configured_model() {
        let config = HarnessConfig::from_lookup(lookup(&[
            (API_URL, "https://a"),
            (API_KEY, "k"),
            (JUDGE_BACKEND, "ollama"),
            (OLLAMA_BASE_URL, "http://127.0.0.1:11434"),
        ]))
        .unwrap();

        let judge = config.judge.judge().unwrap();
        assert_eq!(judge.config().model, "llama3.1:8b");
        assert_eq!(judge.provider().provider_name(), "ollama");
    }

    #[test]
    fn test_judge_settings_without_agent() {
        let judge = JudgeSettings::from_lookup(lookup(&[
            (JUDGE_BACKEND, "ollama"),
            (OLLAMA_BASE_URL, "http://127.0.0.1:46663"),
        ]))
        .unwrap();
        assert_eq!(judge.backend, JudgeBackend::Ollama);
        assert_eq!(judge.ollama.base_url, "http://127.0.0.1:46663");

        let judge = JudgeSettings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(judge.backend, JudgeBackend::OpenAI);
        assert_eq!(judge.model(), "gpt-4o");
    }

    #[test]
    fn test_hostless_ollama_url_is_rejected() {
        let err = JudgeSettings::from_lookup(lookup(&[
            (JUDGE_BACKEND, "ollama"),
            (OLLAMA_BASE_URL, "http://"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: OLLAMA_BASE_URL, .. }));
    }

    #[test]
    fn test_endpoint_debug_redacts_key() {
        let endpoint = AgentEndpoint::new("https://a", "super-secret");
        let debug = format!("{:?}", endpoint);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("https://a"));
    }
}
