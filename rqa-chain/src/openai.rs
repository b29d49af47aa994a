//! OpenAI chat-completions generator.
//!
//! This module is only available when the `openai` feature is enabled. Any
//! OpenAI-compatible server can be targeted with
//! [`OpenAIChatGenerator::with_base_url`].

use async_trait::async_trait;
use rqa_prompt::{ChatTranscript, Role};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::GenerationError;
use crate::generation::Generator;

const PROVIDER: &str = "OpenAI";

/// The default OpenAI API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// The default chat model.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// A [`Generator`] backed by the OpenAI `/v1/chat/completions` API.
///
/// # Example
///
/// ```rust,ignore
/// use rqa_chain::openai::OpenAIChatGenerator;
///
/// let generator = OpenAIChatGenerator::from_env()?.with_model("gpt-4o");
/// ```
pub struct OpenAIChatGenerator {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: Option<f32>,
}

fn generation_error(message: impl Into<String>) -> GenerationError {
    GenerationError::new(PROVIDER, message)
}

impl OpenAIChatGenerator {
    /// Create a generator with the given API key and default model.
    pub fn new(api_key: impl Into<String>) -> Result<Self, GenerationError> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(generation_error("API key must not be empty"));
        }
        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: None,
        })
    }

    /// Create a generator using the `OPENAI_API_KEY` environment variable.
    pub fn from_env() -> Result<Self, GenerationError> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| generation_error("OPENAI_API_KEY environment variable not set"))?;
        Self::new(api_key)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Point the generator at an OpenAI-compatible server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

fn api_role(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::Human => "user",
        Role::Ai => "assistant",
    }
}

// ── OpenAI API request/response types ──────────────────────────────

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

impl<'a> ChatRequest<'a> {
    fn new(
        model: &'a str,
        transcript: &'a ChatTranscript,
        temperature: Option<f32>,
    ) -> Self {
        let messages = transcript
            .iter()
            .map(|m| ChatMessage {
                role: api_role(m.role),
                content: &m.text,
            })
            .collect();
        Self {
            model,
            messages,
            temperature,
        }
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

// ── Generator implementation ───────────────────────────────────────

#[async_trait]
impl Generator for OpenAIChatGenerator {
    async fn generate(&self, transcript: &ChatTranscript) -> Result<String, GenerationError> {
        debug!(
            provider = PROVIDER,
            model = %self.model,
            message_count = transcript.len(),
            "requesting completion"
        );

        let request_body = ChatRequest::new(&self.model, transcript, self.temperature);
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = PROVIDER, error = %e, "request failed");
                generation_error(format!("request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);

            error!(provider = PROVIDER, %status, "API error");
            return Err(generation_error(format!("API returned {status}: {detail}")));
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "failed to parse response");
            generation_error(format!("failed to parse response: {e}"))
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| generation_error("API returned no answer"))
    }

    fn name(&self) -> &str {
        PROVIDER
    }
}
