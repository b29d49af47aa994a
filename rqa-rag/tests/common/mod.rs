//! Deterministic test doubles for the embedding and storage capabilities.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use rqa_rag::{
    EmbeddingProvider, InMemoryVectorStore, Record, Result, RetrievalError, SearchResult,
    VectorStore,
};

/// Bag-of-words embeddings: each lowercase word is hashed into one of
/// `dimensions` buckets, then the vector is L2-normalised. Texts sharing
/// words score higher than texts that do not.
pub struct WordEmbedder {
    dimensions: usize,
    calls: AtomicUsize,
}

impl WordEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

pub fn word_embedding(text: &str, dimensions: usize) -> Vec<f32> {
    let mut emb = vec![0.0f32; dimensions];
    for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
        let hash = word
            .to_lowercase()
            .bytes()
            .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
        emb[(hash % dimensions as u64) as usize] += 1.0;
    }
    let norm: f32 = emb.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        emb.iter_mut().for_each(|x| *x /= norm);
    } else {
        emb[0] = 1.0;
    }
    emb
}

#[async_trait]
impl EmbeddingProvider for WordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(word_embedding(text, self.dimensions))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "word"
    }
}

/// Fails on any text containing `poison`.
pub struct PoisonEmbedder {
    pub inner: WordEmbedder,
}

impl PoisonEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            inner: WordEmbedder::new(dimensions),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for PoisonEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.contains("poison") {
            return Err(RetrievalError::Embed {
                provider: "poison".to_string(),
                message: "refused to embed".to_string(),
            });
        }
        self.inner.embed(text).await
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }
}

/// Returns `actual`-wide word embeddings while reporting `reported`
/// dimensions, like a remote model whose width was configured wrongly.
pub struct MisreportingEmbedder {
    pub reported: usize,
    pub actual: usize,
}

#[async_trait]
impl EmbeddingProvider for MisreportingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let width = if text.contains("wide") {
            self.actual * 2
        } else {
            self.actual
        };
        Ok(word_embedding(text, width))
    }

    fn dimensions(&self) -> usize {
        self.reported
    }

    fn name(&self) -> &str {
        "misreporting"
    }
}

/// Never finishes embedding; used to exercise cancellation.
pub struct StalledEmbedder {
    pub dimensions: usize,
}

#[async_trait]
impl EmbeddingProvider for StalledEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        std::future::pending().await
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// Wraps an [`InMemoryVectorStore`] and fails writes or queries on demand.
pub struct FlakyStore {
    pub inner: Arc<InMemoryVectorStore>,
    pub fail_upsert: bool,
    pub fail_query: bool,
}

impl FlakyStore {
    pub fn new(inner: Arc<InMemoryVectorStore>) -> Self {
        Self {
            inner,
            fail_upsert: false,
            fail_query: false,
        }
    }
}

#[async_trait]
impl VectorStore for FlakyStore {
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        self.inner.create_collection(name, dimensions).await
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        self.inner.delete_collection(name).await
    }

    async fn upsert(&self, collection: &str, records: &[Record]) -> Result<()> {
        if self.fail_upsert {
            return Err(RetrievalError::StoreWrite {
                backend: "flaky".to_string(),
                message: "disk full".to_string(),
            });
        }
        self.inner.upsert(collection, records).await
    }

    async fn query(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        if self.fail_query {
            return Err(RetrievalError::StoreQuery {
                backend: "flaky".to_string(),
                message: "connection reset".to_string(),
            });
        }
        self.inner.query(collection, embedding, top_k).await
    }

    fn name(&self) -> &str {
        "flaky"
    }
}
