//! # rqa-rag
//!
//! Document indexing and similarity retrieval for the retrieval QA pipeline.
//!
//! The crate is built from pluggable pieces:
//!
//! - [`EmbeddingProvider`] turns text into vectors.
//! - [`VectorStore`] stores vectors and answers similarity queries.
//! - [`TextSplitter`] cuts source text into overlapping chunks.
//! - [`Indexer`] composes the above into versioned [`RetrievalIndex`] builds.
//! - [`Retriever`] is the query-side interface consumed by QA chains.
//!
//! An in-memory store ([`InMemoryVectorStore`]) is always available. The
//! OpenAI embedding provider sits behind the `openai` feature.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use rqa_rag::*;
//!
//! let config = RagConfig::builder().chunk_size(300).chunk_overlap(30).build()?;
//! let splitter = RecursiveCharacterSplitter::from_config(&config)?;
//! let chunks = TextLoader::load_and_split(&FileSource::new("war.txt"), &splitter).await?;
//!
//! let indexer = Arc::new(
//!     Indexer::builder()
//!         .config(config)
//!         .embedding_provider(Arc::new(my_embedder))
//!         .vector_store(Arc::new(InMemoryVectorStore::new()))
//!         .build()?,
//! );
//! let index = indexer.build(&chunks).await?;
//! let retriever = indexer.retriever(index);
//! ```

pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod indexer;
pub mod inmemory;
pub mod loader;
pub mod retriever;
pub mod splitter;
pub mod vectorstore;

#[cfg(feature = "openai")]
pub mod openai;

pub use config::{RagConfig, RagConfigBuilder};
pub use document::{Document, Record, SearchResult};
pub use embedding::EmbeddingProvider;
pub use error::{Result, RetrievalError, RetrievalOperation};
pub use indexer::{Indexer, IndexerBuilder, RetrievalIndex};
pub use inmemory::InMemoryVectorStore;
pub use loader::{FileSource, SOURCE_KEY, TextLoader, TextSource};
pub use retriever::{IndexRetriever, Retriever};
pub use splitter::{
    CHUNK_INDEX_KEY, Chunks, DEFAULT_SEPARATORS, RecursiveCharacterSplitter, START_INDEX_KEY,
    TextSplitter,
};
pub use vectorstore::VectorStore;
