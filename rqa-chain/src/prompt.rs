//! The built-in question answering prompt.

use rqa_prompt::{ChatTemplate, MessageTemplate, PromptTemplate, Result};

/// System message instructing the model to answer from the supplied context.
pub const QA_SYSTEM_TEMPLATE: &str = "Use the following pieces of context to answer the \
user's question. If you don't know the answer, just say that you don't know, don't try \
to make up an answer.\n----------------\n{context}";

/// Build the default QA prompt: a system message carrying `{context}` followed
/// by a human message carrying `{<question_key>}`.
pub fn qa_prompt(question_key: &str) -> Result<ChatTemplate> {
    ChatTemplate::from_messages(vec![
        MessageTemplate::system(PromptTemplate::new(QA_SYSTEM_TEMPLATE, ["context"])?),
        MessageTemplate::human(PromptTemplate::new(format!("{{{question_key}}}"), [question_key])?),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use rqa_prompt::{Bindings, Role};

    #[test]
    fn default_prompt_declares_context_and_question() {
        let prompt = qa_prompt("question").unwrap();
        let declared: Vec<&str> = prompt.required_variables().iter().map(String::as_str).collect();
        assert_eq!(declared, vec!["context", "question"]);
    }

    #[test]
    fn renders_system_then_human() {
        let prompt = qa_prompt("query").unwrap();
        let bindings = Bindings::from([
            ("context", "The quick brown fox"),
            ("query", "Which animal?"),
        ]);
        let transcript = prompt.render(&bindings).unwrap();
        let messages = transcript.messages();
        assert_eq!(messages[0].role, Role::System);
        assert!(messages[0].text.ends_with("----------------\nThe quick brown fox"));
        assert_eq!(messages[1].role, Role::Human);
        assert_eq!(messages[1].text, "Which animal?");
    }

    #[test]
    fn invalid_question_key_is_rejected() {
        assert!(qa_prompt("not a name").is_err());
    }
}
