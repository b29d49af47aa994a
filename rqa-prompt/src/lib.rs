//! Role-based prompt composition.
//!
//! This crate provides:
//! - [`PromptTemplate`]: a string template whose `{name}` placeholders are
//!   discovered and checked against the declared variables at construction
//! - [`MessageTemplate`]: a template tagged with a [`Role`]
//! - [`ChatTemplate`]: an ordered list of message templates rendered
//!   atomically into a [`ChatTranscript`]
//! - [`Bindings`]: the values supplied to a render call

mod bindings;
mod chat;
mod error;
mod message;
mod template;

pub use bindings::Bindings;
pub use chat::{ChatTemplate, ChatTranscript};
pub use error::{ConstructionError, PromptError, Result};
pub use message::{MessageTemplate, RenderedChatMessage, Role};
pub use template::PromptTemplate;
