//! External transformation tool adapter.
//!
//! # Responsibility
//! - Run the tool with a vector of arguments and in-memory input bytes.
//! - Capture result and diagnostic streams separately.
//!
//! # Invariants
//! - Success means the diagnostic stream is empty (whitespace only).
//! - On failure the result stream is discarded; callers keep prior state.
//! - A tool running past the configured timeout is killed.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

mod adapter;
mod command;

pub use adapter::{PipelineAdapter, ToolOutput};
pub use command::{ExtractKind, FilterRequest, ToolCommand, ToolKind};

pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Debug)]
pub enum PipelineError {
    /// The tool wrote to its diagnostic stream; the text is carried verbatim.
    Diagnostics {
        kind: ToolKind,
        diagnostics: String,
        context: Option<String>,
    },
    Spawn {
        tool: PathBuf,
        error: std::io::Error,
    },
    Timeout {
        kind: ToolKind,
        seconds: u64,
    },
    Io(std::io::Error),
}

impl Display for PipelineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Diagnostics {
                kind,
                diagnostics,
                context,
            } => {
                write!(f, "{kind} failed: {}", diagnostics.trim_end())?;
                if let Some(context) = context {
                    write!(f, " for file {context}")?;
                }
                Ok(())
            }
            Self::Spawn { tool, error } => {
                write!(f, "cannot start `{}`: {error}", tool.display())
            }
            Self::Timeout { kind, seconds } => {
                write!(f, "{kind} did not finish within {seconds}s and was killed")
            }
            Self::Io(error) => write!(f, "pipeline file error: {error}"),
        }
    }
}

impl Error for PipelineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Spawn { error, .. } | Self::Io(error) => Some(error),
            Self::Diagnostics { .. } | Self::Timeout { .. } => None,
        }
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}
