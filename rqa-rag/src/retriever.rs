//! Query-side abstraction over a built index.

use std::sync::Arc;

use async_trait::async_trait;

use crate::document::Document;
use crate::error::Result;
use crate::indexer::{Indexer, RetrievalIndex};

/// Anything that can answer "which documents are most relevant to this query".
///
/// Implementations return at most `k` documents, most similar first.
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<Document>>;
}

/// A [`Retriever`] bound to one generation of an index.
///
/// Rebuilding the index through the same [`Indexer`] does not affect this
/// retriever; it keeps querying the generation it was created with.
#[derive(Clone)]
pub struct IndexRetriever {
    indexer: Arc<Indexer>,
    index: RetrievalIndex,
}

impl IndexRetriever {
    pub fn new(indexer: Arc<Indexer>, index: RetrievalIndex) -> Self {
        Self { indexer, index }
    }

    pub fn index(&self) -> &RetrievalIndex {
        &self.index
    }

    pub fn indexer(&self) -> &Arc<Indexer> {
        &self.indexer
    }
}

#[async_trait]
impl Retriever for IndexRetriever {
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<Document>> {
        self.indexer.retrieve(&self.index, query, k).await
    }
}
