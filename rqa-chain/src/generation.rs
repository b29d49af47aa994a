//! Generator capability: turns a rendered transcript into answer text.

use async_trait::async_trait;
use rqa_prompt::ChatTranscript;

use crate::error::GenerationError;

/// A language model that answers a role-tagged transcript.
///
/// Implementations may stream internally; the chain only needs the final
/// aggregated text.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, transcript: &ChatTranscript) -> Result<String, GenerationError>;

    /// A short name used in logs and error messages.
    fn name(&self) -> &str {
        "generator"
    }
}
