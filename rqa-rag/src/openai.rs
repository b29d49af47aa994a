//! OpenAI embedding provider using the `/v1/embeddings` API.
//!
//! This module is only available when the `openai` feature is enabled. Any
//! OpenAI-compatible server can be targeted with
//! [`OpenAIEmbeddingProvider::with_base_url`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::embedding::EmbeddingProvider;
use crate::error::{Result, RetrievalError};

const PROVIDER: &str = "OpenAI";

/// The default OpenAI API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// The default model for OpenAI embeddings.
pub const DEFAULT_MODEL: &str = "text-embedding-3-small";

/// Native output width of the hosted embedding models.
const MODEL_DIMENSIONS: &[(&str, usize)] = &[
    ("text-embedding-3-small", 1536),
    ("text-embedding-3-large", 3072),
    ("text-embedding-ada-002", 1536),
];

/// Native output width of `model`, if it is a known OpenAI model.
pub fn known_dimensions(model: &str) -> Option<usize> {
    MODEL_DIMENSIONS
        .iter()
        .find(|(name, _)| *name == model)
        .map(|(_, dims)| *dims)
}

/// An [`EmbeddingProvider`] backed by the OpenAI embeddings API.
///
/// The reported [`dimensions()`](EmbeddingProvider::dimensions) follow the
/// model: known OpenAI models report their native width, an explicit
/// [`with_dimensions`](Self::with_dimensions) always wins, and any other
/// model keeps the previous value. The indexer sizes collections from the
/// vectors actually returned, so a self-hosted model with an unexpected
/// width still indexes correctly.
///
/// # Example
///
/// ```rust,ignore
/// use rqa_rag::openai::OpenAIEmbeddingProvider;
///
/// let provider = OpenAIEmbeddingProvider::from_env()?.with_model("text-embedding-3-large");
/// assert_eq!(provider.dimensions(), 3072);
/// ```
pub struct OpenAIEmbeddingProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    dimensions: usize,
    /// Requested truncation width, sent to the API when set.
    truncate_to: Option<usize>,
}

fn embed_error(message: impl Into<String>) -> RetrievalError {
    RetrievalError::Embed {
        provider: PROVIDER.to_string(),
        message: message.into(),
    }
}

impl OpenAIEmbeddingProvider {
    /// Create a provider for [`DEFAULT_MODEL`] with the given API key.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(embed_error("API key must not be empty"));
        }

        let model = DEFAULT_MODEL.to_string();
        let dimensions = known_dimensions(&model).unwrap_or_default();
        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            model,
            dimensions,
            truncate_to: None,
        })
    }

    /// Create a provider using the `OPENAI_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| embed_error("OPENAI_API_KEY environment variable not set"))?;
        Self::new(api_key)
    }

    /// Switch to another embedding model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        if let (None, Some(dims)) = (self.truncate_to, known_dimensions(&self.model)) {
            self.dimensions = dims;
        }
        self
    }

    /// Point the provider at an OpenAI-compatible server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Ask the API to truncate vectors to `dims` and report that width.
    pub fn with_dimensions(mut self, dims: usize) -> Self {
        self.dimensions = dims;
        self.truncate_to = Some(dims);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn post_embeddings(&self, request: &EmbeddingRequest<'_>) -> Result<EmbeddingResponse> {
        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                error!(provider = PROVIDER, model = %self.model, error = %e, "request failed");
                embed_error(format!("request failed: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(provider = PROVIDER, model = %self.model, %status, "embeddings API error");
            return Err(embed_error(format!("API returned {status}: {}", api_message(body))));
        }

        response.json().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "failed to parse embeddings response");
            embed_error(format!("failed to parse response: {e}"))
        })
    }
}

/// The `error.message` of an API error body, or the raw body.
fn api_message(body: String) -> String {
    match serde_json::from_str::<ApiError>(&body) {
        Ok(parsed) => parsed.error.message,
        Err(_) => body,
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct ApiError {
    error: ApiErrorBody,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    message: String,
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text])
            .await?
            .pop()
            .ok_or_else(|| embed_error("API returned no embedding"))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        debug!(
            provider = PROVIDER,
            model = %self.model,
            batch_size = texts.len(),
            "embedding batch"
        );

        let request = EmbeddingRequest {
            model: &self.model,
            input: texts,
            dimensions: self.truncate_to,
        };
        let mut response = self.post_embeddings(&request).await?;
        if response.data.len() != texts.len() {
            return Err(embed_error(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                response.data.len()
            )));
        }

        // The API may answer out of order; `index` points back at the input.
        response.data.sort_by_key(|item| item.index);
        Ok(response.data.into_iter().map(|item| item.embedding).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        PROVIDER
    }
}
