//! Text splitting into bounded, overlapping chunks.
//!
//! [`RecursiveCharacterSplitter`] walks the text once, producing each chunk on
//! demand. For every chunk it looks for the furthest boundary that still fits
//! in `chunk_size`, trying separators from coarsest to finest (paragraph,
//! line, sentence, word) and falling back to a hard cut at the character
//! limit.
//!
//! Every chunk after the first starts with exactly `chunk_overlap` characters
//! copied from the end of the previous chunk, so stripping that prefix from
//! each later chunk and concatenating reconstructs the input byte for byte.
//! Lengths are measured in characters (Unicode scalar values).

use std::collections::HashMap;

use crate::config::RagConfig;
use crate::document::Document;
use crate::error::{Result, RetrievalError};

/// Separators tried in order, coarsest first.
pub const DEFAULT_SEPARATORS: &[&str] = &["\n\n", "\n", ". ", "! ", "? ", " "];

/// Metadata key holding the zero-based position of a chunk in its source.
pub const CHUNK_INDEX_KEY: &str = "chunk_index";

/// Metadata key holding the character offset at which a chunk starts.
pub const START_INDEX_KEY: &str = "start_index";

/// A strategy for splitting text into [`Document`] chunks.
pub trait TextSplitter: Send + Sync {
    /// Lazily split `text` into non-empty chunks, in text order.
    fn split<'a>(&'a self, text: &'a str) -> Box<dyn Iterator<Item = Document> + Send + 'a>;

    /// Split a document, copying its metadata onto every chunk.
    ///
    /// Chunk-specific keys ([`CHUNK_INDEX_KEY`], [`START_INDEX_KEY`]) take
    /// precedence over inherited ones.
    fn split_document(&self, document: &Document) -> Vec<Document> {
        self.split(&document.content)
            .map(|chunk| {
                let mut metadata = document.metadata.clone();
                metadata.extend(chunk.metadata);
                Document {
                    content: chunk.content,
                    metadata,
                }
            })
            .collect()
    }

    /// Split every document in order.
    fn split_documents(&self, documents: &[Document]) -> Vec<Document> {
        documents.iter().flat_map(|document| self.split_document(document)).collect()
    }
}

/// Splits text on a priority list of separators, coarsest first.
///
/// # Example
///
/// ```rust
/// use rqa_rag::RecursiveCharacterSplitter;
///
/// let splitter = RecursiveCharacterSplitter::new(20, 5)?;
/// let chunks: Vec<_> = splitter.chunks("First paragraph.\n\nSecond one here.").collect();
/// assert_eq!(chunks[0].content, "First paragraph.\n\n");
/// # Ok::<(), rqa_rag::RetrievalError>(())
/// ```
#[derive(Debug, Clone)]
pub struct RecursiveCharacterSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl RecursiveCharacterSplitter {
    /// Create a splitter with the default separators.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::Config`] unless `0 <= chunk_overlap < chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(RetrievalError::Config("chunk_size must be greater than zero".to_string()));
        }
        if chunk_overlap >= chunk_size {
            return Err(RetrievalError::Config(format!(
                "chunk_overlap ({chunk_overlap}) must be less than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        })
    }

    /// Create a splitter from the chunking fields of a [`RagConfig`].
    pub fn from_config(config: &RagConfig) -> Result<Self> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    /// Replace the separator list. Empty separators are ignored; the
    /// character-level fallback always applies last.
    pub fn with_separators<I, S>(mut self, separators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.separators =
            separators.into_iter().map(Into::<String>::into).filter(|s| !s.is_empty()).collect();
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Lazily split `text`. Empty text yields no chunks.
    pub fn chunks<'a>(&'a self, text: &'a str) -> Chunks<'a> {
        let mut offsets: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        offsets.push(text.len());
        Chunks {
            splitter: self,
            text,
            offsets,
            pos: 0,
            index: 0,
        }
    }
}

impl TextSplitter for RecursiveCharacterSplitter {
    fn split<'a>(&'a self, text: &'a str) -> Box<dyn Iterator<Item = Document> + Send + 'a> {
        Box::new(self.chunks(text))
    }
}

/// Iterator over the chunks of one text; see [`RecursiveCharacterSplitter::chunks`].
#[derive(Debug)]
pub struct Chunks<'a> {
    splitter: &'a RecursiveCharacterSplitter,
    text: &'a str,
    /// Byte offset of every character, plus `text.len()` at the end.
    offsets: Vec<usize>,
    /// Character index where the next chunk's new content begins.
    pos: usize,
    index: usize,
}

impl Chunks<'_> {
    fn char_count(&self) -> usize {
        self.offsets.len() - 1
    }

    fn char_at_byte(&self, byte: usize) -> usize {
        self.offsets.binary_search(&byte).unwrap_or_else(|i| i)
    }

    /// Character index where the segment starting at `self.pos` ends, given
    /// room for `window` new characters.
    fn segment_end(&self, window: usize) -> usize {
        let total = self.char_count();
        let hi = self.pos + window;
        if hi >= total {
            return total;
        }

        // The next chunk copies `chunk_overlap` characters from before its
        // start, so a boundary must leave at least that many behind it.
        let floor = self.pos.max(self.splitter.chunk_overlap);
        let region_start = self.offsets[self.pos];
        let region = &self.text[region_start..self.offsets[hi]];

        for separator in &self.splitter.separators {
            if let Some(found) = region.rfind(separator.as_str()) {
                let end = self.char_at_byte(region_start + found + separator.len());
                if end > floor {
                    return end;
                }
            }
        }
        hi
    }
}

impl Iterator for Chunks<'_> {
    type Item = Document;

    fn next(&mut self) -> Option<Document> {
        if self.pos >= self.char_count() {
            return None;
        }

        let overlap = self.splitter.chunk_overlap;
        let (start, window) = if self.index == 0 {
            (0, self.splitter.chunk_size)
        } else {
            (self.pos - overlap, self.splitter.chunk_size - overlap)
        };
        let end = self.segment_end(window);

        let metadata = HashMap::from([
            (CHUNK_INDEX_KEY.to_string(), self.index.to_string()),
            (START_INDEX_KEY.to_string(), start.to_string()),
        ]);
        let content = self.text[self.offsets[start]..self.offsets[end]].to_string();

        self.pos = end;
        self.index += 1;
        Some(Document { content, metadata })
    }
}
