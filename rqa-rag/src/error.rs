//! Error types for the `rqa-rag` crate.

use std::fmt;

use thiserror::Error;

/// The capability operation a [`RetrievalError`] originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RetrievalOperation {
    Embed,
    StoreWrite,
    StoreQuery,
}

impl fmt::Display for RetrievalOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Embed => "embed",
            Self::StoreWrite => "store_write",
            Self::StoreQuery => "store_query",
        })
    }
}

/// Errors that can occur while indexing or retrieving documents.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// The embedding capability failed.
    #[error("Embedding error ({provider}): {message}")]
    Embed {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// Writing to the vector store failed.
    #[error("Vector store write error ({backend}): {message}")]
    StoreWrite {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// A collection with this name is already held by the store.
    #[error("Vector store write error ({backend}): collection '{collection}' already exists")]
    CollectionExists {
        /// The vector store backend that produced the error.
        backend: String,
        /// The name that could not be claimed.
        collection: String,
    },

    /// Querying the vector store failed.
    #[error("Vector store query error ({backend}): {message}")]
    StoreQuery {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The raw text could not be loaded.
    #[error("Text source error: {0}")]
    Source(String),

    /// The caller cancelled the operation before it completed.
    #[error("operation cancelled")]
    Cancelled,
}

impl RetrievalError {
    /// The capability operation this error is tagged with, if any.
    pub fn operation(&self) -> Option<RetrievalOperation> {
        match self {
            Self::Embed { .. } => Some(RetrievalOperation::Embed),
            Self::StoreWrite { .. } | Self::CollectionExists { .. } => {
                Some(RetrievalOperation::StoreWrite)
            }
            Self::StoreQuery { .. } => Some(RetrievalOperation::StoreQuery),
            Self::Config(_) | Self::Source(_) | Self::Cancelled => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// A convenience result type for retrieval operations.
pub type Result<T> = std::result::Result<T, RetrievalError>;
