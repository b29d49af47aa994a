//! Single string templates with `{name}` placeholders.
//!
//! A template is scanned once, at construction, into literal and variable
//! segments. Rendering walks those segments and never re-scans substituted
//! values, so a bound value that itself looks like `{other}` is inserted
//! verbatim.
//!
//! Placeholder names follow identifier rules (`[A-Za-z_][A-Za-z0-9_]*`).
//! Literal braces are written `{{` and `}}`.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::bindings::Bindings;
use crate::error::{ConstructionError, PromptError, Result};
use crate::message::{RenderedChatMessage, Role};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Variable(String),
}

/// A string template with a declared, validated set of input variables.
///
/// # Example
///
/// ```rust
/// use rqa_prompt::{Bindings, PromptTemplate};
///
/// let template = PromptTemplate::new("Hello AI. {question}", ["question"])?;
/// let text = template.render(&Bindings::from([("question", "bar")]))?;
/// assert_eq!(text, "Hello AI. bar");
/// # Ok::<(), rqa_prompt::PromptError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TemplateSource", into = "TemplateSource")]
pub struct PromptTemplate {
    template: String,
    input_variables: Vec<String>,
    segments: Vec<Segment>,
}

/// Serialized form of a [`PromptTemplate`]; re-validated on deserialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TemplateSource {
    template: String,
    input_variables: Vec<String>,
}

impl TryFrom<TemplateSource> for PromptTemplate {
    type Error = PromptError;

    fn try_from(source: TemplateSource) -> Result<Self> {
        Self::new(source.template, source.input_variables)
    }
}

impl From<PromptTemplate> for TemplateSource {
    fn from(template: PromptTemplate) -> Self {
        Self {
            template: template.template,
            input_variables: template.input_variables,
        }
    }
}

impl PromptTemplate {
    /// Create a template, checking that `input_variables` names exactly the
    /// placeholders used in `template`.
    ///
    /// # Errors
    ///
    /// Returns [`PromptError::Construction`] if the template text is
    /// malformed, a name is declared twice, or the declared and used
    /// variable sets differ.
    pub fn new<I, S>(template: impl Into<String>, input_variables: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let template = template.into();
        let segments = parse_segments(&template)?;

        let mut declared_names: Vec<String> = Vec::new();
        for name in input_variables.into_iter().map(Into::into) {
            if declared_names.contains(&name) {
                return Err(ConstructionError::DuplicateVariable(name).into());
            }
            declared_names.push(name);
        }

        let used = used_variables(&segments);
        let declared: BTreeSet<&str> = declared_names.iter().map(String::as_str).collect();
        let missing: Vec<String> =
            used.difference(&declared).map(|name| name.to_string()).collect();
        let extra: Vec<String> = declared.difference(&used).map(|name| name.to_string()).collect();
        if !missing.is_empty() || !extra.is_empty() {
            return Err(ConstructionError::VariableMismatch { missing, extra }.into());
        }

        Ok(Self {
            template,
            input_variables: declared_names,
            segments,
        })
    }

    /// Create a template whose input variables are the placeholders it uses,
    /// in order of first appearance.
    pub fn from_template(template: impl Into<String>) -> Result<Self> {
        let template = template.into();
        let segments = parse_segments(&template)?;
        let mut input_variables: Vec<String> = Vec::new();
        for segment in &segments {
            if let Segment::Variable(name) = segment {
                if !input_variables.contains(name) {
                    input_variables.push(name.clone());
                }
            }
        }
        Ok(Self {
            template,
            input_variables,
            segments,
        })
    }

    /// The raw template text.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// The declared input variables, in declaration order.
    pub fn input_variables(&self) -> &[String] {
        &self.input_variables
    }

    /// Substitute every placeholder with its bound value.
    ///
    /// Surplus bindings are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`PromptError::MissingVariable`] naming the first declared
    /// variable that has no binding.
    pub fn render(&self, bindings: &Bindings) -> Result<String> {
        if let Some(name) = self.input_variables.iter().find(|name| !bindings.contains(name)) {
            return Err(PromptError::MissingVariable { name: name.clone() });
        }

        let mut out = String::with_capacity(self.template.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Variable(name) => {
                    let value = bindings
                        .get(name)
                        .ok_or_else(|| PromptError::MissingVariable { name: name.clone() })?;
                    out.push_str(value);
                }
            }
        }
        Ok(out)
    }

    /// Render this template as a single message with the given role.
    pub fn format_message(&self, role: Role, bindings: &Bindings) -> Result<RenderedChatMessage> {
        Ok(RenderedChatMessage::new(role, self.render(bindings)?))
    }
}

fn used_variables(segments: &[Segment]) -> BTreeSet<&str> {
    segments
        .iter()
        .filter_map(|segment| match segment {
            Segment::Variable(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
        .collect()
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Scan template text into literal and variable segments.
fn parse_segments(template: &str) -> std::result::Result<Vec<Segment>, ConstructionError> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = template.char_indices().peekable();

    while let Some((offset, c)) = chars.next() {
        match c {
            '{' => {
                if matches!(chars.peek(), Some((_, '{'))) {
                    chars.next();
                    literal.push('{');
                    continue;
                }

                let mut name = String::new();
                let mut closed = false;
                for (_, c) in chars.by_ref() {
                    if c == '}' {
                        closed = true;
                        break;
                    }
                    name.push(c);
                }
                if !closed {
                    return Err(ConstructionError::Malformed {
                        offset,
                        message: "unclosed '{'".to_string(),
                    });
                }
                if !is_identifier(&name) {
                    return Err(ConstructionError::Malformed {
                        offset,
                        message: format!("invalid placeholder name '{name}'"),
                    });
                }

                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Variable(name));
            }
            '}' => {
                if matches!(chars.peek(), Some((_, '}'))) {
                    chars.next();
                    literal.push('}');
                    continue;
                }
                return Err(ConstructionError::Malformed {
                    offset,
                    message: "unmatched '}' (write '}}' for a literal brace)".to_string(),
                });
            }
            _ => literal.push(c),
        }
    }

    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mismatch(err: PromptError) -> (Vec<String>, Vec<String>) {
        match err {
            PromptError::Construction(ConstructionError::VariableMismatch { missing, extra }) => {
                (missing, extra)
            }
            other => panic!("expected variable mismatch, got {other:?}"),
        }
    }

    #[test]
    fn renders_placeholders_in_place() {
        let t = PromptTemplate::new("My answer to {question} is {answer}", ["answer", "question"])
            .unwrap();
        let text = t.render(&Bindings::from([("question", "bar"), ("answer", "foobar")])).unwrap();
        assert_eq!(text, "My answer to bar is foobar");
    }

    #[test]
    fn repeated_placeholder_is_declared_once() {
        let t = PromptTemplate::new("{x}-{x}", ["x"]).unwrap();
        assert_eq!(t.render(&Bindings::from([("x", "1")])).unwrap(), "1-1");
    }

    #[test]
    fn undeclared_placeholder_is_rejected() {
        let err = PromptTemplate::new("{context} {question}", ["context"]).unwrap_err();
        let (missing, extra) = mismatch(err);
        assert_eq!(missing, vec!["question"]);
        assert!(extra.is_empty());
    }

    #[test]
    fn unused_declaration_is_rejected() {
        let err = PromptTemplate::new("{context}", ["context", "foo"]).unwrap_err();
        let (missing, extra) = mismatch(err);
        assert!(missing.is_empty());
        assert_eq!(extra, vec!["foo"]);
    }

    #[test]
    fn duplicate_declaration_is_rejected() {
        let err = PromptTemplate::new("{a}", ["a", "a"]).unwrap_err();
        assert_eq!(
            err,
            PromptError::Construction(ConstructionError::DuplicateVariable("a".into()))
        );
    }

    #[test]
    fn escaped_braces_are_literal() {
        let t = PromptTemplate::new("{{\"q\": \"{q}\"}}", ["q"]).unwrap();
        assert_eq!(t.render(&Bindings::from([("q", "x")])).unwrap(), "{\"q\": \"x\"}");
    }

    #[test]
    fn malformed_braces_are_rejected() {
        for bad in ["{unclosed", "stray } brace", "{not valid}", "{}", "{1abc}"] {
            let err = PromptTemplate::from_template(bad).unwrap_err();
            assert!(
                matches!(err, PromptError::Construction(ConstructionError::Malformed { .. })),
                "{bad:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn missing_binding_names_the_variable() {
        let t = PromptTemplate::new("{a} {b}", ["a", "b"]).unwrap();
        let err = t.render(&Bindings::from([("a", "1")])).unwrap_err();
        assert_eq!(err, PromptError::MissingVariable { name: "b".into() });
    }

    #[test]
    fn surplus_bindings_are_ignored() {
        let t = PromptTemplate::new("{a}", ["a"]).unwrap();
        let text = t.render(&Bindings::from([("a", "1"), ("unused", "2")])).unwrap();
        assert_eq!(text, "1");
    }

    #[test]
    fn values_are_not_re_expanded() {
        let t = PromptTemplate::new("{a} and {b}", ["a", "b"]).unwrap();
        let text = t.render(&Bindings::from([("a", "{b}"), ("b", "two")])).unwrap();
        assert_eq!(text, "{b} and two");
    }

    #[test]
    fn from_template_infers_in_order_of_appearance() {
        let t = PromptTemplate::from_template("{question} / {context} / {question}").unwrap();
        assert_eq!(t.input_variables(), ["question", "context"]);
    }

    #[test]
    fn deserialization_revalidates() {
        let ok: PromptTemplate =
            serde_json::from_str(r#"{"template":"{a}","input_variables":["a"]}"#).unwrap();
        assert_eq!(ok.input_variables(), ["a"]);

        let bad = serde_json::from_str::<PromptTemplate>(
            r#"{"template":"{a}","input_variables":["b"]}"#,
        );
        assert!(bad.is_err());
    }
}
