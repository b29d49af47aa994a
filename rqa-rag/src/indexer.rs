//! Index builder and query-time retrieval.
//!
//! The [`Indexer`] turns a collection of [`Document`]s into a
//! [`RetrievalIndex`] by composing an [`EmbeddingProvider`] and a
//! [`VectorStore`], and answers top-k similarity queries against it.
//!
//! Builds are all-or-nothing. Every document is embedded before the store is
//! touched, and each build creates its own versioned collection
//! (`{index_name}-v{generation}`), skipping any name the store already holds.
//! The collection is sized from the embeddings the provider actually
//! returned. The handle is returned only after every write succeeded; a
//! failed or cancelled build removes the collection it created and nothing
//! else. Existing handles keep pointing at their own generation, so a rebuild
//! never disturbs queries running against an older index.
//!
//! # Example
//!
//! ```rust,ignore
//! use rqa_rag::{Indexer, RagConfig, InMemoryVectorStore};
//!
//! let indexer = Indexer::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(my_embedder))
//!     .vector_store(Arc::new(InMemoryVectorStore::new()))
//!     .build()?;
//!
//! let index = indexer.build(&documents).await?;
//! let hits = indexer.retrieve(&index, "search query", 4).await?;
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::{StreamExt, TryStreamExt, stream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::RagConfig;
use crate::document::{Document, Record, SearchResult};
use crate::embedding::EmbeddingProvider;
use crate::error::{Result, RetrievalError};
use crate::retriever::IndexRetriever;
use crate::vectorstore::VectorStore;

/// How many taken generations a build skips before giving up.
const MAX_CLAIM_ATTEMPTS: usize = 64;

/// Handle to one built generation of an index.
///
/// Cheap to clone and safe to share between concurrent queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalIndex {
    collection: String,
    generation: u64,
    document_count: usize,
    dimensions: usize,
}

impl RetrievalIndex {
    /// The vector store collection backing this index.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of distinct records stored (duplicate content is stored once).
    pub fn document_count(&self) -> usize {
        self.document_count
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// Builds retrieval indexes and runs similarity queries against them.
///
/// Construct one via [`Indexer::builder()`]. Several indexers may share a
/// vector store and an `index_name`; each build claims a generation no other
/// build holds.
pub struct Indexer {
    config: RagConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    generation: AtomicU64,
}

impl Indexer {
    /// Create a new [`IndexerBuilder`].
    pub fn builder() -> IndexerBuilder {
        IndexerBuilder::default()
    }

    /// Return a reference to the configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return a reference to the embedding provider.
    pub fn embedding_provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedding_provider
    }

    /// Return a reference to the vector store.
    pub fn vector_store(&self) -> &Arc<dyn VectorStore> {
        &self.vector_store
    }

    /// Embed and store `documents` as a new index generation.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::Embed`] if any document fails to embed or the
    /// embeddings disagree on their width, and [`RetrievalError::StoreWrite`]
    /// if the store rejects a write. In every case no index is produced.
    pub async fn build(&self, documents: &[Document]) -> Result<RetrievalIndex> {
        self.build_with_cancel(documents, &CancellationToken::new()).await
    }

    /// Like [`build`](Self::build), aborting with [`RetrievalError::Cancelled`]
    /// as soon as `cancel` fires. A cancelled build leaves nothing behind.
    pub async fn build_with_cancel(
        &self,
        documents: &[Document],
        cancel: &CancellationToken,
    ) -> Result<RetrievalIndex> {
        if cancel.is_cancelled() {
            return Err(RetrievalError::Cancelled);
        }

        // 1. Embed everything before any write
        let records = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!(index_name = %self.config.index_name, "build cancelled during embedding");
                return Err(RetrievalError::Cancelled);
            }
            records = self.embed_all(documents) => records?,
        };
        let dimensions = embedding_dimensions(self.embedding_provider.as_ref(), &records)?;

        // 2. Claim a collection no other build holds
        let (generation, collection) = self.claim_collection(dimensions).await?;

        // 3. Fill it; the collection is ours, so a failure removes it
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(RetrievalError::Cancelled),
            result = self.vector_store.upsert(&collection, &records) => {
                result.map_err(|e| store_write_error(self.vector_store.name(), e))
            }
        };

        if let Err(e) = outcome {
            error!(
                collection = %collection,
                error = %e,
                "build failed, discarding staged collection"
            );
            if let Err(cleanup) = self.vector_store.delete_collection(&collection).await {
                warn!(
                    collection = %collection,
                    error = %cleanup,
                    "failed to discard staged collection"
                );
            }
            return Err(e);
        }

        let document_count = records
            .iter()
            .map(|r| r.id.as_str())
            .collect::<std::collections::HashSet<_>>()
            .len();
        info!(collection = %collection, generation, document_count, "built index");

        Ok(RetrievalIndex {
            collection,
            generation,
            document_count,
            dimensions,
        })
    }

    /// Create a fresh collection for the next generation.
    ///
    /// Generations already taken in the store (for instance by another
    /// indexer sharing the same `index_name`) are skipped, never reused.
    async fn claim_collection(&self, dimensions: usize) -> Result<(u64, String)> {
        for _ in 0..MAX_CLAIM_ATTEMPTS {
            let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            let collection = format!("{}-v{generation}", self.config.index_name);
            match self.vector_store.create_collection(&collection, dimensions).await {
                Ok(()) => return Ok((generation, collection)),
                Err(RetrievalError::CollectionExists { .. }) => {
                    debug!(collection = %collection, "generation already taken");
                }
                Err(e) => {
                    error!(collection = %collection, error = %e, "failed to create collection");
                    return Err(store_write_error(self.vector_store.name(), e));
                }
            }
        }
        Err(RetrievalError::StoreWrite {
            backend: self.vector_store.name().to_string(),
            message: format!(
                "no free generation for '{}' after {MAX_CLAIM_ATTEMPTS} attempts",
                self.config.index_name
            ),
        })
    }

    /// Embed every document on a bounded worker pool, preserving input order.
    async fn embed_all(&self, documents: &[Document]) -> Result<Vec<Record>> {
        let provider = self.embedding_provider.as_ref();
        let batches = documents.chunks(self.config.embed_batch_size).enumerate();

        let mut embedded: Vec<(usize, Vec<Record>)> = stream::iter(batches)
            .map(|(batch_index, batch)| async move {
                let texts: Vec<&str> = batch.iter().map(|d| d.content.as_str()).collect();
                debug!(
                    provider = provider.name(),
                    batch_index,
                    batch_size = texts.len(),
                    "embedding batch"
                );

                let embeddings = provider.embed_batch(&texts).await.map_err(|e| {
                    error!(
                        provider = provider.name(),
                        batch_index,
                        error = %e,
                        "embedding failed during build"
                    );
                    embed_error(provider.name(), e)
                })?;
                if embeddings.len() != batch.len() {
                    return Err(RetrievalError::Embed {
                        provider: provider.name().to_string(),
                        message: format!(
                            "expected {} embeddings, got {}",
                            batch.len(),
                            embeddings.len()
                        ),
                    });
                }

                let records: Vec<Record> = batch
                    .iter()
                    .cloned()
                    .zip(embeddings)
                    .map(|(document, embedding)| Record::new(document, embedding))
                    .collect();
                Ok::<_, RetrievalError>((batch_index, records))
            })
            .buffer_unordered(self.config.embed_concurrency)
            .try_collect()
            .await?;

        embedded.sort_by_key(|(batch_index, _)| *batch_index);
        Ok(embedded.into_iter().flat_map(|(_, records)| records).collect())
    }

    /// Return the `k` documents most similar to `query`, most similar first.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::Config`] if `k == 0`,
    /// [`RetrievalError::Embed`] if the query cannot be embedded, and
    /// [`RetrievalError::StoreQuery`] if the search fails.
    pub async fn retrieve(
        &self,
        index: &RetrievalIndex,
        query: &str,
        k: usize,
    ) -> Result<Vec<Document>> {
        let results = self.retrieve_scored(index, query, k).await?;
        Ok(results.into_iter().map(|r| r.document).collect())
    }

    /// Like [`retrieve`](Self::retrieve), keeping the similarity scores.
    pub async fn retrieve_scored(
        &self,
        index: &RetrievalIndex,
        query: &str,
        k: usize,
    ) -> Result<Vec<SearchResult>> {
        if k == 0 {
            return Err(RetrievalError::Config("k must be greater than zero".to_string()));
        }

        // 1. Embed the query
        let provider = self.embedding_provider.as_ref();
        let query_embedding = provider.embed(query).await.map_err(|e| {
            error!(provider = provider.name(), error = %e, "embedding failed during query");
            embed_error(provider.name(), e)
        })?;

        // 2. Search the index generation
        let results = self
            .vector_store
            .query(&index.collection, &query_embedding, k)
            .await
            .map_err(|e| {
                error!(collection = %index.collection, error = %e, "vector store query failed");
                store_query_error(self.vector_store.name(), e)
            })?;

        // 3. Filter by similarity threshold
        let filtered: Vec<SearchResult> = match self.config.similarity_threshold {
            Some(threshold) => results.into_iter().filter(|r| r.score >= threshold).collect(),
            None => results,
        };

        debug!(
            collection = %index.collection,
            result_count = filtered.len(),
            "retrieval completed"
        );
        Ok(filtered)
    }

    /// Delete the collection behind an index generation that is no longer needed.
    pub async fn drop_index(&self, index: RetrievalIndex) -> Result<()> {
        self.vector_store.delete_collection(&index.collection).await.map_err(|e| {
            error!(collection = %index.collection, error = %e, "failed to drop index");
            store_write_error(self.vector_store.name(), e)
        })?;
        info!(collection = %index.collection, "dropped index");
        Ok(())
    }

    /// Bind `index` to this indexer as a [`Retriever`](crate::Retriever).
    pub fn retriever(self: &Arc<Self>, index: RetrievalIndex) -> IndexRetriever {
        IndexRetriever::new(Arc::clone(self), index)
    }
}

/// Vector width of the embeddings actually returned.
///
/// The provider's reported width is only used when there is nothing to
/// measure. Records of differing widths fail the build.
fn embedding_dimensions(provider: &dyn EmbeddingProvider, records: &[Record]) -> Result<usize> {
    let Some(first) = records.first() else {
        return Ok(provider.dimensions());
    };
    let dimensions = first.embedding.len();
    if let Some(bad) = records.iter().find(|r| r.embedding.len() != dimensions) {
        return Err(RetrievalError::Embed {
            provider: provider.name().to_string(),
            message: format!(
                "record '{}' has {} dimensions, expected {dimensions}",
                bad.id,
                bad.embedding.len()
            ),
        });
    }
    if dimensions != provider.dimensions() {
        debug!(
            provider = provider.name(),
            reported = provider.dimensions(),
            actual = dimensions,
            "sizing index from returned embeddings"
        );
    }
    Ok(dimensions)
}

fn embed_error(provider: &str, e: RetrievalError) -> RetrievalError {
    match e {
        RetrievalError::Embed { .. } | RetrievalError::Cancelled => e,
        other => RetrievalError::Embed {
            provider: provider.to_string(),
            message: other.to_string(),
        },
    }
}

fn store_write_error(backend: &str, e: RetrievalError) -> RetrievalError {
    match e {
        RetrievalError::StoreWrite { .. }
        | RetrievalError::CollectionExists { .. }
        | RetrievalError::Cancelled => e,
        other => RetrievalError::StoreWrite {
            backend: backend.to_string(),
            message: other.to_string(),
        },
    }
}

fn store_query_error(backend: &str, e: RetrievalError) -> RetrievalError {
    match e {
        RetrievalError::StoreQuery { .. } | RetrievalError::Cancelled => e,
        other => RetrievalError::StoreQuery {
            backend: backend.to_string(),
            message: other.to_string(),
        },
    }
}

/// Builder for constructing an [`Indexer`].
///
/// All fields are required. Call [`build()`](IndexerBuilder::build) to
/// validate and produce the indexer.
#[derive(Default)]
pub struct IndexerBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_store: Option<Arc<dyn VectorStore>>,
}

impl IndexerBuilder {
    /// Set the configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the vector store backend.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Build the [`Indexer`], validating that all required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::Config`] if any field is missing or the
    /// configuration is invalid.
    pub fn build(self) -> Result<Indexer> {
        let config = self
            .config
            .ok_or_else(|| RetrievalError::Config("config is required".to_string()))?;
        config.validate()?;
        let embedding_provider = self.embedding_provider.ok_or_else(|| {
            RetrievalError::Config("embedding_provider is required".to_string())
        })?;
        let vector_store = self
            .vector_store
            .ok_or_else(|| RetrievalError::Config("vector_store is required".to_string()))?;

        Ok(Indexer {
            config,
            embedding_provider,
            vector_store,
            generation: AtomicU64::new(0),
        })
    }
}
