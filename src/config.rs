use std::env;
use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Context};
use clap::ValueEnum;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LlmBackend {
    /// Native Ollama chat API.
    #[default]
    Ollama,
    /// Any OpenAI-compatible chat-completions server.
    #[value(name = "openai")]
    OpenAi,
    /// Returns the prompt unchanged.
    Echo,
}

impl fmt::Display for LlmBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LlmBackend::Ollama => "ollama",
            LlmBackend::OpenAi => "openai",
            LlmBackend::Echo => "echo",
        };

        write!(f, "{}", label)
    }
}

impl FromStr for LlmBackend {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(LlmBackend::Ollama),
            "openai" | "open_ai" | "openai-compatible" => Ok(LlmBackend::OpenAi),
            "echo" => Ok(LlmBackend::Echo),
            other => Err(anyhow!(
                "Unsupported LLM backend '{other}' (expected ollama, openai, or echo)"
            )),
        }
    }
}

/// Where and how to reach the inference endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmConfig {
    pub backend: LlmBackend,
    base_url: Option<String>,
    pub model: String,
    pub api_key: Option<String>,
    pub http_timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            backend: LlmBackend::default(),
            base_url: None,
            model: Self::DEFAULT_MODEL.to_string(),
            api_key: None,
            http_timeout_ms: Self::DEFAULT_TIMEOUT_MS,
        }
    }
}

impl LlmConfig {
    pub const DEFAULT_MODEL: &'static str = "llama3.2";
    pub const DEFAULT_OLLAMA_URL: &'static str = "http://localhost:11434";
    pub const DEFAULT_OPENAI_COMPAT_URL: &'static str = "http://localhost:11434/v1";
    const DEFAULT_TIMEOUT_MS: u64 = 120_000;

    const BACKEND_VARS: [&'static str; 1] = ["MEDPANEL_LLM_BACKEND"];
    const BASE_URL_VARS: [&'static str; 3] =
        ["MEDPANEL_LLM_BASE_URL", "OLLAMA_BASE_URL", "OLLAMA_HOST"];
    const MODEL_VARS: [&'static str; 2] = ["MEDPANEL_LLM_MODEL", "OLLAMA_MODEL"];
    const API_KEY_VARS: [&'static str; 2] = ["MEDPANEL_LLM_API_KEY", "OPENAI_API_KEY"];
    const TIMEOUT_VARS: [&'static str; 1] = ["MEDPANEL_LLM_TIMEOUT_MS"];

    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let read = |candidates: &[&'static str]| {
            candidates
                .iter()
                .find_map(|&key| lookup(key).filter(|value| !value.trim().is_empty()))
        };

        let backend = match read(&Self::BACKEND_VARS) {
            Some(raw) => raw
                .parse::<LlmBackend>()
                .context("MEDPANEL_LLM_BACKEND holds an unsupported value")?,
            None => LlmBackend::default(),
        };
        let http_timeout_ms = read(&Self::TIMEOUT_VARS)
            .and_then(|value| value.trim().parse::<u64>().ok())
            .unwrap_or(Self::DEFAULT_TIMEOUT_MS);

        Ok(Self {
            backend,
            base_url: read(&Self::BASE_URL_VARS).map(|url| normalize_base_url(&url)),
            model: read(&Self::MODEL_VARS).unwrap_or_else(|| Self::DEFAULT_MODEL.to_string()),
            api_key: read(&Self::API_KEY_VARS),
            http_timeout_ms,
        })
    }

    pub fn with_backend(mut self, backend: LlmBackend) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl AsRef<str>) -> Self {
        self.base_url = Some(normalize_base_url(base_url.as_ref()));
        self
    }

    /// Explicit base URL, or the local default for the selected backend.
    pub fn base_url(&self) -> &str {
        match (&self.base_url, self.backend) {
            (Some(url), _) => url.as_str(),
            (None, LlmBackend::OpenAi) => Self::DEFAULT_OPENAI_COMPAT_URL,
            (None, _) => Self::DEFAULT_OLLAMA_URL,
        }
    }
}

// OLLAMA_HOST is commonly set as bare `host:port`.
fn normalize_base_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    }
}
