//! Command-line and environment configuration.
//!
//! Every flag falls back to an environment variable, which may in turn come
//! from a `.env` file loaded before parsing.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use rqa_rag::{RagConfig, RetrievalError};

use crate::console::{ConsoleOptions, FailurePolicy};
use crate::logging::LogFormat;

/// Ask questions about a text corpus from the terminal.
#[derive(Parser, Debug, Clone)]
#[command(name = "rqa", version, about, long_about = None)]
pub struct Args {
    /// Text file to index
    #[arg(value_name = "CORPUS", env = "RQA_CORPUS")]
    pub corpus: PathBuf,

    /// Base name of the vector store collection
    #[arg(long, env = "RQA_INDEX_NAME", default_value = "database")]
    pub index_name: String,

    /// Maximum chunk size in characters
    #[arg(long, env = "RQA_CHUNK_SIZE", default_value_t = 4000)]
    pub chunk_size: usize,

    /// Characters shared between consecutive chunks
    #[arg(long, env = "RQA_CHUNK_OVERLAP", default_value_t = 200)]
    pub chunk_overlap: usize,

    /// Number of chunks retrieved per question
    #[arg(short = 'k', long, env = "RQA_TOP_K", default_value_t = 5)]
    pub top_k: usize,

    /// Drop retrieved chunks scoring below this similarity
    #[arg(long, env = "RQA_SIMILARITY_THRESHOLD")]
    pub similarity_threshold: Option<f32>,

    /// Chunks sent per embedding request while indexing
    #[arg(long, env = "RQA_EMBED_BATCH_SIZE", default_value_t = 16)]
    pub embed_batch_size: usize,

    /// Embedding requests in flight while indexing
    #[arg(long, env = "RQA_EMBED_CONCURRENCY", default_value_t = 4)]
    pub embed_concurrency: usize,

    /// Embedding model identifier
    #[arg(long, env = "RQA_EMBEDDING_MODEL", default_value = rqa_rag::openai::DEFAULT_MODEL)]
    pub embedding_model: String,

    /// Output dimensions requested from the embedding model
    #[arg(long, env = "RQA_EMBEDDING_DIMENSIONS")]
    pub embedding_dimensions: Option<usize>,

    /// Chat model identifier
    #[arg(long, env = "RQA_CHAT_MODEL", default_value = rqa_chain::openai::DEFAULT_MODEL)]
    pub chat_model: String,

    /// Base URL of an OpenAI-compatible API
    #[arg(long, env = "RQA_OPENAI_BASE_URL")]
    pub openai_base_url: Option<String>,

    /// API key for the embedding and chat endpoints
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// Seconds before an unanswered question is cancelled (0 disables)
    #[arg(long, env = "RQA_QUERY_TIMEOUT", default_value_t = 120)]
    pub query_timeout: u64,

    /// What to do when answering a question fails
    #[arg(long, env = "RQA_ON_ERROR", value_enum, default_value_t = FailurePolicy::Exit)]
    pub on_error: FailurePolicy,

    /// Print the chunks each answer was based on
    #[arg(long, env = "RQA_SHOW_SOURCES")]
    pub show_sources: bool,

    /// Log line format
    #[arg(long, env = "RQA_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl Args {
    /// The validated retrieval configuration named by these arguments.
    pub fn rag_config(&self) -> Result<RagConfig, RetrievalError> {
        let mut builder = RagConfig::builder()
            .index_name(&self.index_name)
            .chunk_size(self.chunk_size)
            .chunk_overlap(self.chunk_overlap)
            .top_k(self.top_k)
            .embed_batch_size(self.embed_batch_size)
            .embed_concurrency(self.embed_concurrency);
        if let Some(threshold) = self.similarity_threshold {
            builder = builder.similarity_threshold(threshold);
        }
        builder.build()
    }

    pub fn console_options(&self) -> ConsoleOptions {
        ConsoleOptions {
            failure_policy: self.on_error,
            query_timeout: (self.query_timeout > 0)
                .then(|| Duration::from_secs(self.query_timeout)),
            show_sources: self.show_sources,
            ..ConsoleOptions::default()
        }
    }
}
