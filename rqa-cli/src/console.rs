//! The interactive question loop.
//!
//! Each iteration reads one line, asks the chain, and prints the answer.
//! Read failures are reported and the loop carries on; end of input or an
//! interrupt ends it normally. What happens when a question fails is decided
//! by [`FailurePolicy`].

use std::collections::VecDeque;
use std::io::{self, Write};
use std::time::Duration;

use clap::ValueEnum;
use rqa_chain::{ChainError, ChainOutput, RetrievalQAChain};
use rqa_prompt::Bindings;
use rqa_rag::{CHUNK_INDEX_KEY, SOURCE_KEY};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Consecutive read failures tolerated before the loop gives up.
pub const MAX_CONSECUTIVE_READ_FAILURES: usize = 5;

/// How the loop reacts to a question that could not be answered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum FailurePolicy {
    /// Stop the loop and report the error.
    #[default]
    Exit,
    /// Report the error and read the next question.
    Continue,
}

/// Where questions come from.
pub trait LineSource {
    /// Read one line. `Ok(None)` means the user is done (end of input or
    /// interrupt).
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>>;
}

/// Terminal input with line editing and in-memory history.
pub struct EditorSource {
    editor: DefaultEditor,
}

impl EditorSource {
    pub fn new() -> Result<Self, ReadlineError> {
        Ok(Self {
            editor: DefaultEditor::new()?,
        })
    }
}

impl LineSource for EditorSource {
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                remember(&mut self.editor, &line);
                Ok(Some(line))
            }
            Err(ReadlineError::Eof | ReadlineError::Interrupted) => Ok(None),
            Err(ReadlineError::Io(e)) => Err(e),
            Err(e) => Err(io::Error::other(e.to_string())),
        }
    }
}

/// Add a non-blank line to the editor history.
fn remember(editor: &mut DefaultEditor, line: &str) {
    let entry = line.trim();
    if entry.is_empty() {
        return;
    }
    if let Err(e) = editor.add_history_entry(entry) {
        debug!(error = %e, "failed to record history entry");
    }
}

/// A fixed sequence of lines and read failures, for scripted sessions.
#[derive(Debug, Default)]
pub struct ScriptedLines {
    lines: VecDeque<io::Result<String>>,
}

impl ScriptedLines {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(|l| Ok(l.into())).collect(),
        }
    }

    pub fn push_line(&mut self, line: impl Into<String>) -> &mut Self {
        self.lines.push_back(Ok(line.into()));
        self
    }

    pub fn push_failure(&mut self, message: &str) -> &mut Self {
        let failure = io::Error::new(io::ErrorKind::InvalidData, message.to_string());
        self.lines.push_back(Err(failure));
        self
    }
}

impl LineSource for ScriptedLines {
    fn read_line(&mut self, _prompt: &str) -> io::Result<Option<String>> {
        self.lines.pop_front().transpose()
    }
}

/// Settings for [`run_console`].
#[derive(Debug, Clone)]
pub struct ConsoleOptions {
    pub prompt: String,
    pub failure_policy: FailurePolicy,
    /// Questions still unanswered after this long are cancelled.
    pub query_timeout: Option<Duration>,
    pub show_sources: bool,
}

impl Default for ConsoleOptions {
    fn default() -> Self {
        Self {
            prompt: "> ".to_string(),
            failure_policy: FailurePolicy::Exit,
            query_timeout: None,
            show_sources: false,
        }
    }
}

/// Counts of what happened during a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsoleSummary {
    pub answered: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub read_failures: usize,
}

#[derive(Debug, Error)]
pub enum ConsoleError {
    /// A question failed under [`FailurePolicy::Exit`].
    #[error("question failed: {0}")]
    Query(#[source] ChainError),

    #[error("giving up after {0} consecutive input failures")]
    Input(usize),

    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
}

/// Run the question loop until the input ends or the failure policy stops it.
pub async fn run_console<S, W>(
    chain: &RetrievalQAChain,
    source: &mut S,
    out: &mut W,
    options: &ConsoleOptions,
) -> Result<ConsoleSummary, ConsoleError>
where
    S: LineSource + ?Sized,
    W: Write + ?Sized,
{
    let mut summary = ConsoleSummary::default();
    let mut consecutive_read_failures = 0;

    loop {
        let line = match source.read_line(&options.prompt) {
            Ok(Some(line)) => {
                consecutive_read_failures = 0;
                line
            }
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "failed to read input");
                writeln!(out, "Could not read input: {e}")?;
                summary.read_failures += 1;
                consecutive_read_failures += 1;
                if consecutive_read_failures >= MAX_CONSECUTIVE_READ_FAILURES {
                    return Err(ConsoleError::Input(consecutive_read_failures));
                }
                continue;
            }
        };

        let question = line.trim();
        if question.is_empty() {
            continue;
        }

        match ask(chain, question, options.query_timeout).await {
            Ok(output) => {
                summary.answered += 1;
                print_answer(out, &output, options.show_sources)?;
            }
            Err(e) if e.is_cancelled() => {
                summary.cancelled += 1;
                warn!(question, "question cancelled");
                writeln!(out, "Cancelled: no answer within the time limit.")?;
            }
            Err(e) => {
                summary.failed += 1;
                error!(step = e.step(), error = %e, "question failed");
                writeln!(out, "Error: {e}")?;
                if options.failure_policy == FailurePolicy::Exit {
                    return Err(ConsoleError::Query(e));
                }
            }
        }
    }

    info!(
        answered = summary.answered,
        failed = summary.failed,
        cancelled = summary.cancelled,
        read_failures = summary.read_failures,
        "console session ended"
    );
    Ok(summary)
}

async fn ask(
    chain: &RetrievalQAChain,
    question: &str,
    timeout: Option<Duration>,
) -> Result<ChainOutput, ChainError> {
    let bindings = Bindings::new();
    let call = chain.call(question, &bindings);
    match timeout {
        Some(limit) => tokio::time::timeout(limit, call)
            .await
            .unwrap_or(Err(ChainError::Cancelled)),
        None => call.await,
    }
}

fn print_answer<W: Write + ?Sized>(
    out: &mut W,
    output: &ChainOutput,
    show_sources: bool,
) -> io::Result<()> {
    writeln!(out, "{}", output.text)?;
    if show_sources {
        for document in &output.source_documents {
            let source = document.metadata.get(SOURCE_KEY).map(String::as_str).unwrap_or("-");
            let chunk = document.metadata.get(CHUNK_INDEX_KEY).map(String::as_str).unwrap_or("-");
            writeln!(out, "  [{source} #{chunk}]")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustyline::history::History;

    #[test]
    fn only_non_blank_lines_enter_history() {
        let mut editor = DefaultEditor::new().unwrap();
        remember(&mut editor, "   ");
        remember(&mut editor, "  who is Pierre?  ");
        assert_eq!(editor.history().len(), 1);
    }
}
