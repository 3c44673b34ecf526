use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use async_openai::types::{ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs};
use async_openai::{config::OpenAIConfig, Client as AsyncOpenAiClient};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::config::{LlmBackend, LlmConfig};

/// Sampling is always deterministic.
pub const SAMPLING_TEMPERATURE: f32 = 0.0;

pub type SharedLlmClient = Arc<dyn LlmClient>;

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> anyhow::Result<String>;
}

/// Hands the prompt straight back. Backs `medpanel prompt` and `--backend echo`.
#[derive(Debug, Default, Clone)]
pub struct EchoLlmClient;

#[async_trait]
impl LlmClient for EchoLlmClient {
    async fn complete(&self, prompt: &str) -> anyhow::Result<String> {
        Ok(prompt.to_string())
    }
}

impl EchoLlmClient {
    pub fn shared() -> SharedLlmClient {
        Arc::new(Self)
    }
}

#[derive(Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaMessage<'a>>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    #[serde(default)]
    message: Option<OllamaReply>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct OllamaReply {
    content: String,
}

/// Talks to a local Ollama daemon over its native `/api/chat` endpoint.
pub struct OllamaLlmClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaLlmClient {
    pub fn new(config: &LlmConfig) -> anyhow::Result<Self> {
        let timeout = Duration::from_millis(config.http_timeout_ms.max(1));
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build Ollama HTTP client")?;

        Ok(Self {
            http,
            base_url: config.base_url().to_string(),
            model: config.model.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{base}/{path}")
    }

    #[instrument(level = "debug", skip_all, fields(model = %self.model))]
    async fn chat(&self, prompt: &str) -> anyhow::Result<String> {
        let request = OllamaChatRequest {
            model: &self.model,
            messages: vec![OllamaMessage {
                role: "user",
                content: prompt,
            }],
            stream: false,
            options: OllamaOptions {
                temperature: SAMPLING_TEMPERATURE,
            },
        };

        let response = self
            .http
            .post(self.endpoint("api/chat"))
            .json(&request)
            .send()
            .await
            .with_context(|| format!("Ollama request to {} failed", self.base_url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Ollama returned status {status}: {}", body.trim());
        }

        let body: OllamaChatResponse = response
            .json()
            .await
            .context("Failed to deserialize Ollama chat response")?;

        if let Some(err) = body.error {
            bail!("Ollama reported an error: {err}");
        }

        let reply = body
            .message
            .context("Ollama response did not contain a message")?;
        debug!(reply_chars = reply.content.len(), "Ollama replied");

        Ok(reply.content)
    }
}

#[async_trait]
impl LlmClient for OllamaLlmClient {
    async fn complete(&self, prompt: &str) -> anyhow::Result<String> {
        self.chat(prompt).await
    }
}

/// OpenAI-compatible client; points at Ollama's `/v1` surface unless told otherwise.
pub struct OpenAiLlmClient {
    client: AsyncOpenAiClient<OpenAIConfig>,
    model: String,
}

impl OpenAiLlmClient {
    // Ollama ignores the key but the client insists on one.
    const PLACEHOLDER_API_KEY: &'static str = "ollama";

    pub fn new(config: &LlmConfig) -> Self {
        let api_key = config
            .api_key
            .clone()
            .unwrap_or_else(|| Self::PLACEHOLDER_API_KEY.to_string());
        let openai_config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(config.base_url());

        Self {
            client: AsyncOpenAiClient::with_config(openai_config),
            model: config.model.clone(),
        }
    }

    #[instrument(level = "debug", skip_all, fields(model = %self.model))]
    async fn chat(&self, prompt: &str) -> anyhow::Result<String> {
        let user_message = ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .temperature(SAMPLING_TEMPERATURE)
            .messages(vec![user_message.into()])
            .build()?;

        let response = self.client.chat().create(request).await?;
        let choice = response
            .choices
            .first()
            .context("LLM response did not contain any choices")?;

        choice
            .message
            .content
            .clone()
            .context("LLM response choice carried no text")
    }
}

#[async_trait]
impl LlmClient for OpenAiLlmClient {
    async fn complete(&self, prompt: &str) -> anyhow::Result<String> {
        self.chat(prompt).await
    }
}

pub fn build_llm_client(config: &LlmConfig) -> anyhow::Result<SharedLlmClient> {
    tracing::info!(
        backend = %config.backend,
        base_url = config.base_url(),
        model = %config.model,
        "Configuring inference endpoint"
    );

    let client: SharedLlmClient = match config.backend {
        LlmBackend::Ollama => Arc::new(OllamaLlmClient::new(config)?),
        LlmBackend::OpenAi => Arc::new(OpenAiLlmClient::new(config)),
        LlmBackend::Echo => EchoLlmClient::shared(),
    };

    Ok(client)
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use anyhow::anyhow;
    use async_trait::async_trait;

    use super::LlmClient;

    /// Echoes prompts back and remembers them; fails for prompts containing `fail_on`.
    #[derive(Default)]
    pub(crate) struct RecordingLlmClient {
        prompts: Mutex<Vec<String>>,
        fail_on: Option<&'static str>,
    }

    impl RecordingLlmClient {
        pub(crate) fn failing_on(marker: &'static str) -> Self {
            Self {
                prompts: Mutex::new(Vec::new()),
                fail_on: Some(marker),
            }
        }

        pub(crate) fn prompts(&self) -> Vec<String> {
            self.prompts.lock().expect("lock poisoned").clone()
        }
    }

    #[async_trait]
    impl LlmClient for RecordingLlmClient {
        async fn complete(&self, prompt: &str) -> anyhow::Result<String> {
            self.prompts
                .lock()
                .expect("lock poisoned")
                .push(prompt.to_string());

            match self.fail_on {
                Some(marker) if prompt.contains(marker) => {
                    Err(anyhow!("connection refused (os error 111)"))
                }
                _ => Ok(prompt.to_string()),
            }
        }
    }
}
