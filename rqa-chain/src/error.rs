//! Error types for the `rqa-chain` crate.

use rqa_prompt::PromptError;
use rqa_rag::RetrievalError;
use thiserror::Error;

/// The generation capability failed to produce an answer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Generation error ({provider}): {message}")]
pub struct GenerationError {
    /// The generator that produced the error.
    pub provider: String,
    /// A description of the failure.
    pub message: String,
}

impl GenerationError {
    pub fn new(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            message: message.into(),
        }
    }
}

/// Errors surfaced by [`RetrievalQAChain`](crate::RetrievalQAChain).
///
/// Per-query variants (`Retrieval`, `Prompt`, `Generation`, `Cancelled`)
/// abort only the call that produced them; the chain stays usable.
#[derive(Debug, Error)]
pub enum ChainError {
    /// The chain was configured inconsistently and could not be built.
    #[error("Chain construction error: {0}")]
    Construction(String),

    /// Retrieving context documents failed.
    #[error(transparent)]
    Retrieval(RetrievalError),

    /// Building or rendering the prompt failed.
    #[error(transparent)]
    Prompt(#[from] PromptError),

    /// The generator failed.
    #[error(transparent)]
    Generation(#[from] GenerationError),

    /// The caller cancelled the query before it completed.
    #[error("query cancelled")]
    Cancelled,
}

impl ChainError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Name of the step that failed, for logs.
    pub fn step(&self) -> &'static str {
        match self {
            Self::Construction(_) => "construct",
            Self::Retrieval(_) => "retrieve",
            Self::Prompt(_) => "compose",
            Self::Generation(_) => "generate",
            Self::Cancelled => "cancelled",
        }
    }
}

impl From<RetrievalError> for ChainError {
    fn from(e: RetrievalError) -> Self {
        match e {
            RetrievalError::Cancelled => Self::Cancelled,
            other => Self::Retrieval(other),
        }
    }
}

/// A convenience result type for chain operations.
pub type Result<T> = std::result::Result<T, ChainError>;
