//! Deterministic capabilities for exercising the chain.

#![allow(dead_code)]

use std::sync::Mutex;

use async_trait::async_trait;
use rqa_chain::{GenerationError, Generator};
use rqa_prompt::ChatTranscript;
use rqa_rag::{Document, EmbeddingProvider, Retriever, RetrievalError};

/// Bag-of-words hash embeddings, L2-normalised.
pub struct WordEmbedder {
    pub dimensions: usize,
}

#[async_trait]
impl EmbeddingProvider for WordEmbedder {
    async fn embed(&self, text: &str) -> rqa_rag::Result<Vec<f32>> {
        let mut emb = vec![0.0f32; self.dimensions];
        for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
            let hash = word
                .to_lowercase()
                .bytes()
                .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
            emb[(hash % self.dimensions as u64) as usize] += 1.0;
        }
        let norm: f32 = emb.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            emb.iter_mut().for_each(|x| *x /= norm);
        } else {
            emb[0] = 1.0;
        }
        Ok(emb)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// Answers with the last line of the system message and records every
/// transcript it was given.
#[derive(Default)]
pub struct ContextEchoGenerator {
    pub seen: Mutex<Vec<ChatTranscript>>,
}

impl ContextEchoGenerator {
    pub fn transcripts(&self) -> Vec<ChatTranscript> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Generator for ContextEchoGenerator {
    async fn generate(&self, transcript: &ChatTranscript) -> Result<String, GenerationError> {
        self.seen.lock().unwrap().push(transcript.clone());
        let first = transcript.messages().first().map(|m| m.text.as_str()).unwrap_or_default();
        Ok(format!("Answer based on: {}", first.lines().last().unwrap_or_default()))
    }

    fn name(&self) -> &str {
        "echo"
    }
}

/// Always fails.
pub struct FailingGenerator;

#[async_trait]
impl Generator for FailingGenerator {
    async fn generate(&self, _transcript: &ChatTranscript) -> Result<String, GenerationError> {
        Err(GenerationError::new("failing", "quota exhausted"))
    }
}

/// Never answers.
pub struct StalledGenerator;

#[async_trait]
impl Generator for StalledGenerator {
    async fn generate(&self, _transcript: &ChatTranscript) -> Result<String, GenerationError> {
        std::future::pending().await
    }
}

/// Never returns any documents.
pub struct StalledRetriever;

#[async_trait]
impl Retriever for StalledRetriever {
    async fn retrieve(&self, _query: &str, _k: usize) -> rqa_rag::Result<Vec<Document>> {
        std::future::pending().await
    }
}

/// Returns a fixed document list, or a fixed error.
pub struct StaticRetriever {
    pub documents: Vec<Document>,
    pub fail: bool,
}

#[async_trait]
impl Retriever for StaticRetriever {
    async fn retrieve(&self, _query: &str, k: usize) -> rqa_rag::Result<Vec<Document>> {
        if self.fail {
            return Err(RetrievalError::StoreQuery {
                backend: "static".to_string(),
                message: "index unavailable".to_string(),
            });
        }
        Ok(self.documents.iter().take(k).cloned().collect())
    }
}
