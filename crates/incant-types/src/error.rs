//! Error types for incant.

use std::io;

/// Errors produced while resolving, binding, or running a command line.
#[derive(Debug, thiserror::Error)]
pub enum IncantError {
    /// Malformed input: unknown command or parameter, bad argument order,
    /// too many arguments, or missing required parameters.
    #[error("syntax error: {0}")]
    Syntax(String),

    /// A raw value could not be converted to any of the declared types.
    #[error("type error: cannot convert {value:?} to any of: {}", types.join(", "))]
    TypeCoercion { value: String, types: Vec<String> },

    /// The invoked command failed while running.
    #[error("{command} raised an error: {cause}")]
    Execution { command: String, cause: String },

    /// Failure reported by a command body.
    #[error("command error: {0}")]
    Command(String),

    /// The user interrupted a line read.
    #[error("interrupted")]
    Interrupted,

    /// The line source has no more input.
    #[error("end of input")]
    EndOfInput,

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

impl IncantError {
    /// True for the conditions that end a dispatch loop.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Interrupted | Self::EndOfInput)
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, IncantError>;
