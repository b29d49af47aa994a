//! Ordered, role-tagged chat templates rendered as one atomic transcript.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::bindings::Bindings;
use crate::error::{ConstructionError, PromptError, Result};
use crate::message::{MessageTemplate, RenderedChatMessage};

/// An ordered sequence of [`MessageTemplate`]s with a declared variable set.
///
/// The declared set must equal the union of the variables used by every
/// message; both a subset and a superset are rejected at construction.
/// Rendering checks all declared variables up front, so a render either
/// produces every message or none.
///
/// # Example
///
/// ```rust
/// use rqa_prompt::{Bindings, ChatTemplate, MessageTemplate, PromptTemplate};
///
/// let chat = ChatTemplate::new(
///     vec![
///         MessageTemplate::system(PromptTemplate::new("Context: {context}", ["context"])?),
///         MessageTemplate::human(PromptTemplate::new("{question}", ["question"])?),
///     ],
///     ["context", "question"],
/// )?;
/// let transcript = chat.render(&Bindings::from([("context", "c"), ("question", "q")]))?;
/// assert_eq!(transcript.len(), 2);
/// # Ok::<(), rqa_prompt::PromptError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTemplate {
    messages: Vec<MessageTemplate>,
    declared: BTreeSet<String>,
}

impl ChatTemplate {
    /// Create a chat template from `messages` and the declared variable set.
    ///
    /// # Errors
    ///
    /// Returns [`PromptError::Construction`] when `messages` is empty or when
    /// `declared_variables` is not exactly the union of the messages'
    /// variables. The mismatch error lists the missing and the surplus names.
    pub fn new<I, S>(messages: Vec<MessageTemplate>, declared_variables: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if messages.is_empty() {
            return Err(ConstructionError::NoMessages.into());
        }

        let declared: BTreeSet<String> = declared_variables.into_iter().map(Into::into).collect();
        let required: BTreeSet<String> = messages
            .iter()
            .flat_map(|message| message.template().input_variables().iter().cloned())
            .collect();

        let missing: Vec<String> = required.difference(&declared).cloned().collect();
        let extra: Vec<String> = declared.difference(&required).cloned().collect();
        if !missing.is_empty() || !extra.is_empty() {
            return Err(ConstructionError::VariableMismatch { missing, extra }.into());
        }

        Ok(Self { messages, declared })
    }

    /// Create a chat template whose declared set is the union of the
    /// messages' variables.
    pub fn from_messages(messages: Vec<MessageTemplate>) -> Result<Self> {
        let union: BTreeSet<String> = messages
            .iter()
            .flat_map(|message| message.template().input_variables().iter().cloned())
            .collect();
        Self::new(messages, union)
    }

    pub fn messages(&self) -> &[MessageTemplate] {
        &self.messages
    }

    /// The declared variables, in name order.
    pub fn required_variables(&self) -> &BTreeSet<String> {
        &self.declared
    }

    /// Check that `bindings` covers every declared variable.
    ///
    /// # Errors
    ///
    /// Returns [`PromptError::MissingVariable`] naming the first missing
    /// variable in name order.
    pub fn validate(&self, bindings: &Bindings) -> Result<()> {
        match self.declared.iter().find(|name| !bindings.contains(name)) {
            Some(name) => Err(PromptError::MissingVariable { name: name.clone() }),
            None => Ok(()),
        }
    }

    /// Render every message, in declaration order.
    ///
    /// # Errors
    ///
    /// Returns [`PromptError::MissingVariable`] before any message is
    /// rendered if a declared variable is unbound.
    pub fn render(&self, bindings: &Bindings) -> Result<ChatTranscript> {
        self.validate(bindings)?;

        let messages = self
            .messages
            .iter()
            .map(|message| message.render(bindings))
            .collect::<Result<Vec<_>>>()?;

        debug!(message_count = messages.len(), "rendered chat template");
        Ok(ChatTranscript(messages))
    }
}

/// The rendered, ordered messages of a [`ChatTemplate`].
///
/// Serializes role-aware: `[{"role":"system","text":"..."}, ...]`. Use
/// [`to_text_json`](Self::to_text_json) for the role-less record form and
/// [`to_buffer_string`](Self::to_buffer_string) for completion-style prompts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatTranscript(Vec<RenderedChatMessage>);

#[derive(Serialize)]
struct TextRecord<'a> {
    text: &'a str,
}

impl ChatTranscript {
    pub fn messages(&self) -> &[RenderedChatMessage] {
        &self.0
    }

    pub fn into_messages(self) -> Vec<RenderedChatMessage> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RenderedChatMessage> {
        self.0.iter()
    }

    /// Serialize as `[{"text":"..."}, ...]`, dropping roles.
    pub fn to_text_json(&self) -> serde_json::Result<String> {
        let records: Vec<TextRecord<'_>> = self
            .0
            .iter()
            .map(|message| TextRecord {
                text: &message.text,
            })
            .collect();
        serde_json::to_string(&records)
    }

    /// Flatten to `Role: text` lines, e.g. `System: ...\nHuman: ...`.
    pub fn to_buffer_string(&self) -> String {
        self.0
            .iter()
            .map(|message| format!("{}: {}", message.role, message.text))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl From<Vec<RenderedChatMessage>> for ChatTranscript {
    fn from(messages: Vec<RenderedChatMessage>) -> Self {
        Self(messages)
    }
}

impl IntoIterator for ChatTranscript {
    type Item = RenderedChatMessage;
    type IntoIter = std::vec::IntoIter<RenderedChatMessage>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a ChatTranscript {
    type Item = &'a RenderedChatMessage;
    type IntoIter = std::slice::Iter<'a, RenderedChatMessage>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
