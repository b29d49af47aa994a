//! Vector store trait for storing and searching vector embeddings.

use async_trait::async_trait;

use crate::document::{Record, SearchResult};
use crate::error::Result;

/// A storage backend for vector embeddings with similarity search.
///
/// Implementations manage named collections of [`Record`]s keyed by
/// [`Record::id`]. Upserting an existing id replaces the stored record
/// in place; it never creates a duplicate. Write failures are reported as
/// [`RetrievalError::StoreWrite`](crate::RetrievalError::StoreWrite), query
/// failures as [`RetrievalError::StoreQuery`](crate::RetrievalError::StoreQuery).
///
/// # Example
///
/// ```rust,ignore
/// use rqa_rag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.create_collection("docs", 384).await?;
/// store.upsert("docs", &records).await?;
/// let results = store.query("docs", &query_embedding, 5).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create a named collection.
    ///
    /// Fails with [`RetrievalError::CollectionExists`](crate::RetrievalError::CollectionExists)
    /// if the name is already taken; an existing collection is never reused.
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()>;

    /// Delete a named collection and all its data. No-op if it does not exist.
    async fn delete_collection(&self, name: &str) -> Result<()>;

    /// Insert or replace records in a collection.
    async fn upsert(&self, collection: &str, records: &[Record]) -> Result<()>;

    /// Return the `top_k` records most similar to `embedding`.
    ///
    /// Results are ordered by descending similarity score; equal scores keep
    /// the order in which their ids were first inserted.
    async fn query(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>>;

    /// A short name used in logs and error messages.
    fn name(&self) -> &str {
        "vector_store"
    }
}
