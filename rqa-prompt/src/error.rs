//! Error types for the `rqa-prompt` crate.

use thiserror::Error;

/// A template or chat template could not be constructed.
///
/// Construction errors are raised before any rendering is possible; a value
/// that failed construction never exists.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstructionError {
    /// The template text contains a brace sequence that is not a valid placeholder.
    #[error("malformed template at offset {offset}: {message}")]
    Malformed {
        /// Byte offset of the offending brace.
        offset: usize,
        /// A description of the problem.
        message: String,
    },

    /// The same name was declared more than once.
    #[error("input variable '{0}' is declared more than once")]
    DuplicateVariable(String),

    /// The declared variables differ from the variables the template(s) use.
    #[error("{}", mismatch_message(.missing, .extra))]
    VariableMismatch {
        /// Names that are used but not declared.
        missing: Vec<String>,
        /// Names that are declared but never used.
        extra: Vec<String>,
    },

    /// A chat template was created without any messages.
    #[error("chat template must contain at least one message")]
    NoMessages,
}

fn mismatch_message(missing: &[String], extra: &[String]) -> String {
    let mut parts = Vec::new();
    if !missing.is_empty() {
        parts.push(format!("missing declared variables [{}]", missing.join(", ")));
    }
    if !extra.is_empty() {
        parts.push(format!("unused declared variables [{}]", extra.join(", ")));
    }
    format!("variable mismatch: {}", parts.join("; "))
}

/// Errors that can occur in prompt operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PromptError {
    /// A template failed validation at construction time.
    #[error("invalid template: {0}")]
    Construction(#[from] ConstructionError),

    /// A render call did not bind a required variable.
    #[error("missing value for template variable '{name}'")]
    MissingVariable {
        /// The first required variable without a binding.
        name: String,
    },
}

impl PromptError {
    /// Whether this error was raised while building a template.
    pub fn is_construction(&self) -> bool {
        matches!(self, Self::Construction(_))
    }
}

/// A convenience result type for prompt operations.
pub type Result<T> = std::result::Result<T, PromptError>;
