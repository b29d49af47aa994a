//! In-memory vector store using cosine similarity.
//!
//! This module provides [`InMemoryVectorStore`], a vector store backed by a
//! `HashMap` protected by a `tokio::sync::RwLock`. It is suitable for
//! development, testing, and single-process use.

use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::document::{Record, SearchResult};
use crate::error::{Result, RetrievalError};
use crate::vectorstore::VectorStore;

const BACKEND: &str = "InMemory";

#[derive(Debug, Default)]
struct Collection {
    dimensions: usize,
    /// Record id → (insertion sequence, record).
    records: HashMap<String, (u64, Record)>,
    next_seq: u64,
}

/// An in-memory vector store using cosine similarity for search.
///
/// Collections are stored as nested `HashMap`s: collection name → record id →
/// record. Each id remembers the sequence number of its first insertion so
/// that equal scores are returned in insertion order, and so that replacing a
/// record keeps its original position.
///
/// # Example
///
/// ```rust,ignore
/// use rqa_rag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.create_collection("docs", 384).await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl InMemoryVectorStore {
    /// Create a new empty in-memory vector store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records in `collection`, or `None` if it does not exist.
    pub async fn len(&self, collection: &str) -> Option<usize> {
        self.collections.read().await.get(collection).map(|c| c.records.len())
    }

    /// Names of all collections, sorted.
    pub async fn collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.collections.read().await.keys().cloned().collect();
        names.sort();
        names
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        let mut collections = self.collections.write().await;
        if collections.contains_key(name) {
            return Err(RetrievalError::CollectionExists {
                backend: BACKEND.to_string(),
                collection: name.to_string(),
            });
        }
        collections.insert(
            name.to_string(),
            Collection {
                dimensions,
                ..Collection::default()
            },
        );
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        let mut collections = self.collections.write().await;
        collections.remove(name);
        Ok(())
    }

    async fn upsert(&self, collection: &str, records: &[Record]) -> Result<()> {
        let mut collections = self.collections.write().await;
        let store = collections.get_mut(collection).ok_or_else(|| RetrievalError::StoreWrite {
            backend: BACKEND.to_string(),
            message: format!("collection '{collection}' does not exist"),
        })?;

        // Validate the whole batch before touching the collection.
        if let Some(bad) = records.iter().find(|r| r.embedding.len() != store.dimensions) {
            return Err(RetrievalError::StoreWrite {
                backend: BACKEND.to_string(),
                message: format!(
                    "record '{}' has {} dimensions, collection '{collection}' expects {}",
                    bad.id,
                    bad.embedding.len(),
                    store.dimensions
                ),
            });
        }

        for record in records {
            match store.records.get_mut(&record.id) {
                Some((_, existing)) => *existing = record.clone(),
                None => {
                    let seq = store.next_seq;
                    store.next_seq += 1;
                    store.records.insert(record.id.clone(), (seq, record.clone()));
                }
            }
        }
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        let collections = self.collections.read().await;
        let store = collections.get(collection).ok_or_else(|| RetrievalError::StoreQuery {
            backend: BACKEND.to_string(),
            message: format!("collection '{collection}' does not exist"),
        })?;

        if embedding.len() != store.dimensions {
            return Err(RetrievalError::StoreQuery {
                backend: BACKEND.to_string(),
                message: format!(
                    "query has {} dimensions, collection '{collection}' expects {}",
                    embedding.len(),
                    store.dimensions
                ),
            });
        }

        let mut scored: Vec<(u64, SearchResult)> = store
            .records
            .values()
            .map(|(seq, record)| {
                let score = cosine_similarity(&record.embedding, embedding);
                (*seq, SearchResult {
                    document: record.document.clone(),
                    score,
                })
            })
            .collect();

        scored.sort_by(|(seq_a, a), (seq_b, b)| {
            b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal).then(seq_a.cmp(seq_b))
        });
        scored.truncate(top_k);
        Ok(scored.into_iter().map(|(_, result)| result).collect())
    }

    fn name(&self) -> &str {
        BACKEND
    }
}
