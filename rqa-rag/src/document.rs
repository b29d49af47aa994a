//! Data types for documents, stored records, and search results.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A span of source text plus metadata; the unit of embedding and retrieval.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Document {
    /// The text content of the document.
    pub content: String,
    /// Key-value metadata associated with the document.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl Document {
    /// Create a document with no metadata.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: HashMap::new(),
        }
    }

    /// Add a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// The stable identifier used as the vector store key: the hex SHA-256
    /// of the content. Documents with equal content share an identifier.
    pub fn id(&self) -> String {
        format!("{:x}", Sha256::digest(self.content.as_bytes()))
    }
}

/// A [`Document`] with its vector embedding, as written to a vector store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Record {
    /// The key the record is stored under.
    pub id: String,
    /// The vector embedding of the document content.
    pub embedding: Vec<f32>,
    /// The stored document.
    pub document: Document,
}

impl Record {
    /// Pair a document with its embedding, keyed by [`Document::id`].
    pub fn new(document: Document, embedding: Vec<f32>) -> Self {
        Self {
            id: document.id(),
            embedding,
            document,
        }
    }
}

/// A retrieved [`Document`] paired with a relevance score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    /// The retrieved document.
    pub document: Document,
    /// The similarity score (higher is more relevant).
    pub score: f32,
}
