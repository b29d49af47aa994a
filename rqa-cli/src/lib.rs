//! Library half of the `rqa` binary: configuration, logging setup and the
//! interactive question loop.

pub mod config;
pub mod console;
pub mod logging;

pub use config::Args;
pub use console::{
    ConsoleError, ConsoleOptions, ConsoleSummary, EditorSource, FailurePolicy, LineSource,
    ScriptedLines, run_console,
};
pub use logging::LogFormat;
