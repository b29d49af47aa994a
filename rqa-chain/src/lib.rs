//! # rqa-chain
//!
//! Retrieval question answering: retrieve relevant documents, compose them
//! into a prompt, and ask a [`Generator`] for the answer.
//!
//! - [`RetrievalQAChain`] runs the three steps and is built with
//!   [`RetrievalQAChain::builder()`].
//! - [`Generator`] is the language model capability.
//! - [`qa_prompt`] builds the default prompt.
//!
//! The OpenAI chat generator sits behind the `openai` feature.

pub mod error;
pub mod generation;
pub mod prompt;
pub mod retrieval_qa;

#[cfg(feature = "openai")]
pub mod openai;

pub use error::{ChainError, GenerationError, Result};
pub use generation::Generator;
pub use prompt::{QA_SYSTEM_TEMPLATE, qa_prompt};
pub use retrieval_qa::{
    CONTEXT_KEY, ChainOutput, DEFAULT_CONTEXT_SEPARATOR, DEFAULT_QUESTION_KEY, DEFAULT_TOP_K,
    RetrievalQAChain, RetrievalQAChainBuilder,
};
