//! Configuration for indexing and retrieval.

use serde::{Deserialize, Serialize};

use crate::error::{RetrievalError, Result};

/// Configuration parameters for the indexer, splitter, and retriever.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    /// Base name of the vector store collections built from this config.
    pub index_name: String,
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Number of overlapping characters between consecutive chunks.
    pub chunk_overlap: usize,
    /// Number of top results to return from vector search.
    pub top_k: usize,
    /// Minimum similarity score for results; `None` keeps every result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity_threshold: Option<f32>,
    /// Number of documents sent per embedding call during a build.
    pub embed_batch_size: usize,
    /// Maximum number of embedding calls in flight during a build.
    pub embed_concurrency: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            index_name: "database".to_string(),
            chunk_size: 4000,
            chunk_overlap: 200,
            top_k: 5,
            similarity_threshold: None,
            embed_batch_size: 16,
            embed_concurrency: 4,
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// Re-run the builder validation on an existing config, e.g. one
    /// deserialized from a file.
    pub fn validate(&self) -> Result<()> {
        if self.index_name.trim().is_empty() {
            return Err(RetrievalError::Config("index_name must not be empty".to_string()));
        }
        if self.chunk_size == 0 {
            return Err(RetrievalError::Config("chunk_size must be greater than zero".to_string()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(RetrievalError::Config(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.top_k == 0 {
            return Err(RetrievalError::Config("top_k must be greater than zero".to_string()));
        }
        if self.embed_batch_size == 0 {
            return Err(RetrievalError::Config(
                "embed_batch_size must be greater than zero".to_string(),
            ));
        }
        if self.embed_concurrency == 0 {
            return Err(RetrievalError::Config(
                "embed_concurrency must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the base collection name.
    pub fn index_name(mut self, name: impl Into<String>) -> Self {
        self.config.index_name = name.into();
        self
    }

    /// Set the maximum chunk size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in characters.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the number of top results to return from vector search.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the minimum similarity threshold for filtering results.
    pub fn similarity_threshold(mut self, threshold: f32) -> Self {
        self.config.similarity_threshold = Some(threshold);
        self
    }

    /// Set how many documents are embedded per call during a build.
    pub fn embed_batch_size(mut self, size: usize) -> Self {
        self.config.embed_batch_size = size;
        self
    }

    /// Set how many embedding calls may run concurrently during a build.
    pub fn embed_concurrency(mut self, concurrency: usize) -> Self {
        self.config.embed_concurrency = concurrency;
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::Config`] if:
    /// - `index_name` is empty
    /// - `chunk_size == 0` or `chunk_overlap >= chunk_size`
    /// - `top_k`, `embed_batch_size` or `embed_concurrency` is zero
    pub fn build(self) -> Result<RagConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(RagConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_overlap_not_smaller_than_chunk_size() {
        let err = RagConfig::builder().chunk_size(100).chunk_overlap(100).build().unwrap_err();
        assert!(matches!(err, RetrievalError::Config(msg) if msg.contains("chunk_overlap")));
    }

    #[test]
    fn rejects_zero_top_k_and_concurrency() {
        assert!(RagConfig::builder().top_k(0).build().is_err());
        assert!(RagConfig::builder().embed_concurrency(0).build().is_err());
        assert!(RagConfig::builder().embed_batch_size(0).build().is_err());
        assert!(RagConfig::builder().index_name("  ").build().is_err());
    }

    #[test]
    fn builder_sets_every_field() {
        let config = RagConfig::builder()
            .index_name("war")
            .chunk_size(300)
            .chunk_overlap(30)
            .top_k(2)
            .similarity_threshold(0.25)
            .embed_concurrency(8)
            .build()
            .unwrap();
        assert_eq!(config.index_name, "war");
        assert_eq!(
            (config.chunk_size, config.chunk_overlap, config.top_k),
            (300, 30, 2)
        );
        assert_eq!(config.similarity_threshold, Some(0.25));
        assert_eq!(config.embed_concurrency, 8);
    }
}
