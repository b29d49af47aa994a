//! Role-tagged message templates and rendered chat messages.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::bindings::Bindings;
use crate::error::Result;
use crate::template::PromptTemplate;

/// The speaker of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    Human,
    Ai,
}

impl Role {
    /// The label used when a transcript is flattened to plain text.
    pub fn label(&self) -> &'static str {
        match self {
            Self::System => "System",
            Self::Human => "Human",
            Self::Ai => "AI",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A [`PromptTemplate`] bound to a fixed [`Role`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageTemplate {
    role: Role,
    template: PromptTemplate,
}

impl MessageTemplate {
    pub fn new(role: Role, template: PromptTemplate) -> Self {
        Self { role, template }
    }

    pub fn system(template: PromptTemplate) -> Self {
        Self::new(Role::System, template)
    }

    pub fn human(template: PromptTemplate) -> Self {
        Self::new(Role::Human, template)
    }

    pub fn ai(template: PromptTemplate) -> Self {
        Self::new(Role::Ai, template)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn template(&self) -> &PromptTemplate {
        &self.template
    }

    /// Render this message against `bindings`.
    pub fn render(&self, bindings: &Bindings) -> Result<RenderedChatMessage> {
        self.template.format_message(self.role, bindings)
    }
}

/// One rendered message of a chat transcript.
///
/// The role is kept as data so that role-aware consumers (chat completion
/// APIs, transcript printers) never have to infer it from position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RenderedChatMessage {
    pub role: Role,
    pub text: String,
}

impl RenderedChatMessage {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, text)
    }

    pub fn human(text: impl Into<String>) -> Self {
        Self::new(Role::Human, text)
    }

    pub fn ai(text: impl Into<String>) -> Self {
        Self::new(Role::Ai, text)
    }
}
