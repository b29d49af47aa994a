//! The retrieval question answering chain.
//!
//! Each call runs three steps with no retry between them:
//!
//! 1. **Retrieve** the `top_k` documents most similar to the question.
//! 2. **Compose** their contents into a `context` binding and render the prompt.
//! 3. **Generate** the answer from the rendered transcript.
//!
//! The first failing step ends the call. The chain holds no per-call state,
//! so one instance can serve any number of concurrent queries.

use std::future::Future;
use std::sync::Arc;

use rqa_prompt::{Bindings, ChatTemplate};
use rqa_rag::{Document, Retriever};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::error::{ChainError, Result};
use crate::generation::Generator;
use crate::prompt::qa_prompt;

/// Prompt variable that receives the joined document contents.
pub const CONTEXT_KEY: &str = "context";

/// Prompt variable that receives the question, unless overridden.
pub const DEFAULT_QUESTION_KEY: &str = "question";

/// Text placed between document contents in the context.
pub const DEFAULT_CONTEXT_SEPARATOR: &str = "\n\n";

/// Number of documents retrieved per question, unless overridden.
pub const DEFAULT_TOP_K: usize = 5;

/// The result of one chain call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainOutput {
    /// The generated answer.
    pub text: String,
    /// The retrieved documents, when the chain was built with
    /// `return_source_documents(true)`; empty otherwise.
    pub source_documents: Vec<Document>,
}

/// Answers questions from retrieved context.
///
/// # Example
///
/// ```rust,ignore
/// use rqa_chain::RetrievalQAChain;
///
/// let chain = RetrievalQAChain::builder()
///     .retriever(Arc::new(indexer.retriever(index)))
///     .generator(Arc::new(OpenAIChatGenerator::from_env()?))
///     .top_k(5)
///     .build()?;
///
/// let answer = chain.run("Who is Pierre?").await?;
/// ```
pub struct RetrievalQAChain {
    retriever: Arc<dyn Retriever>,
    generator: Arc<dyn Generator>,
    prompt: ChatTemplate,
    top_k: usize,
    question_key: String,
    context_separator: String,
    return_source_documents: bool,
}

impl RetrievalQAChain {
    /// Create a new [`RetrievalQAChainBuilder`].
    pub fn builder() -> RetrievalQAChainBuilder {
        RetrievalQAChainBuilder::default()
    }

    pub fn prompt(&self) -> &ChatTemplate {
        &self.prompt
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn question_key(&self) -> &str {
        &self.question_key
    }

    /// Answer `question` and return just the text.
    pub async fn run(&self, question: &str) -> Result<String> {
        Ok(self.call(question, &Bindings::new()).await?.text)
    }

    /// Like [`run`](Self::run), aborting with [`ChainError::Cancelled`] once
    /// `cancel` fires.
    pub async fn run_with_cancel(
        &self,
        question: &str,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let output = self.call_with_cancel(question, &Bindings::new(), cancel).await?;
        Ok(output.text)
    }

    /// Answer `question`. `extra` supplies any prompt variables besides the
    /// context and the question.
    ///
    /// # Errors
    ///
    /// - [`ChainError::Retrieval`] if retrieval fails
    /// - [`ChainError::Prompt`] if `extra` lacks a declared variable
    /// - [`ChainError::Generation`] if the generator fails
    pub async fn call(&self, question: &str, extra: &Bindings) -> Result<ChainOutput> {
        self.call_with_cancel(question, extra, &CancellationToken::new()).await
    }

    /// Like [`call`](Self::call), aborting with [`ChainError::Cancelled`]
    /// once `cancel` fires. Cancellation is observed around each of the
    /// retrieve and generate steps.
    pub async fn call_with_cancel(
        &self,
        question: &str,
        extra: &Bindings,
        cancel: &CancellationToken,
    ) -> Result<ChainOutput> {
        // 1. Retrieve
        let documents = until_cancelled(cancel, self.retriever.retrieve(question, self.top_k))
            .await?
            .map_err(|e| {
                error!(step = "retrieve", error = %e, "retrieval failed");
                ChainError::from(e)
            })?;
        debug!(document_count = documents.len(), "retrieved context documents");

        // 2. Compose
        let context = documents
            .iter()
            .map(|d| d.content.as_str())
            .collect::<Vec<_>>()
            .join(&self.context_separator);
        let mut bindings = extra.clone();
        bindings.insert(self.question_key.as_str(), question);
        bindings.insert(CONTEXT_KEY, context);
        let transcript = self.prompt.render(&bindings).map_err(|e| {
            error!(step = "compose", error = %e, "prompt rendering failed");
            ChainError::from(e)
        })?;

        // 3. Generate
        let text = until_cancelled(cancel, self.generator.generate(&transcript))
            .await?
            .map_err(|e| {
                error!(
                    step = "generate",
                    generator = self.generator.name(),
                    error = %e,
                    "generation failed"
                );
                ChainError::from(e)
            })?;
        info!(
            document_count = documents.len(),
            answer_len = text.len(),
            "answered question"
        );

        let source_documents = if self.return_source_documents {
            documents
        } else {
            Vec::new()
        };
        Ok(ChainOutput {
            text,
            source_documents,
        })
    }
}

async fn until_cancelled<F: Future>(cancel: &CancellationToken, step: F) -> Result<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ChainError::Cancelled),
        output = step => Ok(output),
    }
}

/// Builder for constructing a [`RetrievalQAChain`].
///
/// `retriever` and `generator` are required. The prompt defaults to the
/// built-in QA prompt for the configured question key.
pub struct RetrievalQAChainBuilder {
    retriever: Option<Arc<dyn Retriever>>,
    generator: Option<Arc<dyn Generator>>,
    prompt: Option<ChatTemplate>,
    top_k: usize,
    question_key: String,
    context_separator: String,
    return_source_documents: bool,
}

impl Default for RetrievalQAChainBuilder {
    fn default() -> Self {
        Self {
            retriever: None,
            generator: None,
            prompt: None,
            top_k: DEFAULT_TOP_K,
            question_key: DEFAULT_QUESTION_KEY.to_string(),
            context_separator: DEFAULT_CONTEXT_SEPARATOR.to_string(),
            return_source_documents: false,
        }
    }
}

impl RetrievalQAChainBuilder {
    pub fn retriever(mut self, retriever: Arc<dyn Retriever>) -> Self {
        self.retriever = Some(retriever);
        self
    }

    pub fn generator(mut self, generator: Arc<dyn Generator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Use a custom prompt. It must declare `context` and the question key.
    pub fn prompt(mut self, prompt: ChatTemplate) -> Self {
        self.prompt = Some(prompt);
        self
    }

    pub fn top_k(mut self, k: usize) -> Self {
        self.top_k = k;
        self
    }

    /// Name of the prompt variable bound to the question, e.g. `"query"`.
    pub fn question_key(mut self, key: impl Into<String>) -> Self {
        self.question_key = key.into();
        self
    }

    pub fn context_separator(mut self, separator: impl Into<String>) -> Self {
        self.context_separator = separator.into();
        self
    }

    pub fn return_source_documents(mut self, enabled: bool) -> Self {
        self.return_source_documents = enabled;
        self
    }

    /// Build the chain.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::Construction`] if a capability is missing,
    /// `top_k` is zero, or the prompt does not declare `context` and the
    /// question key.
    pub fn build(self) -> Result<RetrievalQAChain> {
        let retriever = self
            .retriever
            .ok_or_else(|| ChainError::Construction("retriever is required".to_string()))?;
        let generator = self
            .generator
            .ok_or_else(|| ChainError::Construction("generator is required".to_string()))?;
        if self.top_k == 0 {
            return Err(ChainError::Construction("top_k must be greater than zero".to_string()));
        }
        if self.question_key == CONTEXT_KEY {
            return Err(ChainError::Construction(format!(
                "question key must differ from '{CONTEXT_KEY}'"
            )));
        }

        let prompt = match self.prompt {
            Some(prompt) => prompt,
            None => qa_prompt(&self.question_key)?,
        };
        for key in [CONTEXT_KEY, self.question_key.as_str()] {
            if !prompt.required_variables().contains(key) {
                return Err(ChainError::Construction(format!(
                    "prompt does not declare the '{key}' variable"
                )));
            }
        }

        Ok(RetrievalQAChain {
            retriever,
            generator,
            prompt,
            top_k: self.top_k,
            question_key: self.question_key,
            context_separator: self.context_separator,
            return_source_documents: self.return_source_documents,
        })
    }
}
