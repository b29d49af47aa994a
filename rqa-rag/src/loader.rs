//! Loading raw text and turning it into chunked documents.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{error, info};

use crate::document::Document;
use crate::error::{Result, RetrievalError};
use crate::splitter::TextSplitter;

/// Metadata key naming where a chunk's text was loaded from.
pub const SOURCE_KEY: &str = "source";

/// A source of raw text to be indexed.
#[async_trait]
pub trait TextSource: Send + Sync {
    /// Read the full text. Failures are reported as [`RetrievalError::Source`].
    async fn load(&self) -> Result<String>;

    /// Identifier recorded under [`SOURCE_KEY`] on every chunk.
    fn name(&self) -> String;
}

/// A UTF-8 text file on the local filesystem.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl TextSource for FileSource {
    async fn load(&self) -> Result<String> {
        tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            error!(path = %self.path.display(), error = %e, "failed to read text source");
            RetrievalError::Source(format!("failed to read '{}': {e}", self.path.display()))
        })
    }

    fn name(&self) -> String {
        self.path.display().to_string()
    }
}

/// Loads a [`TextSource`] and splits it into chunk documents.
pub struct TextLoader;

impl TextLoader {
    /// Load `source` and split it with `splitter`.
    ///
    /// Every chunk carries [`SOURCE_KEY`] plus the splitter's own metadata.
    pub async fn load_and_split(
        source: &dyn TextSource,
        splitter: &dyn TextSplitter,
    ) -> Result<Vec<Document>> {
        let text = source.load().await?;
        let document = Document::new(text).with_metadata(SOURCE_KEY, source.name());
        let chunks = splitter.split_document(&document);
        info!(source = %source.name(), chunk_count = chunks.len(), "loaded and split text");
        Ok(chunks)
    }
}
