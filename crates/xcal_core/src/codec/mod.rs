//! Calendar codec contract.
//!
//! # Responsibility
//! - Parse calendar text into a `ComponentStore`.
//! - Serialize a subset of a store back to text and report its line count.
//!
//! # Invariants
//! - Any diagnostic produced while parsing is a failure; no partial store is
//!   returned alongside an error.
//! - `serialize` with an empty index list writes nothing and returns `0`.

use crate::model::store::{ComponentStore, StoreHandle};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::Write;
use std::path::Path;

mod ics;

pub use ics::IcsCodec;

pub type CodecResult<T> = Result<T, CodecError>;

/// Codec failure. Parse variants carry the offending source name.
#[derive(Debug)]
pub enum CodecError {
    Io {
        source_name: String,
        error: std::io::Error,
    },
    Syntax {
        source_name: String,
        message: String,
    },
    /// Text parsed but violated calendar rules.
    Invalid {
        source_name: String,
        diagnostics: Vec<String>,
    },
    Write(std::io::Error),
}

impl CodecError {
    /// Source file name for parse failures.
    pub fn source_name(&self) -> Option<&str> {
        match self {
            Self::Io { source_name, .. }
            | Self::Syntax { source_name, .. }
            | Self::Invalid { source_name, .. } => Some(source_name),
            Self::Write(_) => None,
        }
    }
}

impl Display for CodecError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { source_name, error } => {
                write!(f, "cannot read calendar: {error} for file {source_name}")
            }
            Self::Syntax {
                source_name,
                message,
            } => write!(f, "malformed calendar: {message} for file {source_name}"),
            Self::Invalid {
                source_name,
                diagnostics,
            } => write!(
                f,
                "invalid calendar: {} for file {source_name}",
                diagnostics.join("; ")
            ),
            Self::Write(error) => write!(f, "cannot write calendar: {error}"),
        }
    }
}

impl Error for CodecError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { error, .. } | Self::Write(error) => Some(error),
            Self::Syntax { .. } | Self::Invalid { .. } => None,
        }
    }
}

/// Parser/serializer collaborator behind the component store.
pub trait CalendarCodec {
    /// Parses calendar text; `source_name` labels diagnostics.
    fn parse_str(&self, text: &str, source_name: &str) -> CodecResult<ComponentStore>;

    /// Serializes `indices` of `store`, in order, into `sink`.
    ///
    /// Returns the number of physical lines written.
    fn serialize(
        &self,
        store: &ComponentStore,
        indices: &[usize],
        sink: &mut dyn Write,
    ) -> CodecResult<usize>;

    /// Releases resources tied to a store handle.
    fn release(&self, handle: StoreHandle);

    /// Reads and parses a calendar file.
    fn parse_file(&self, path: &Path) -> CodecResult<ComponentStore> {
        let source_name = display_name(path);
        let text = std::fs::read_to_string(path).map_err(|error| CodecError::Io {
            source_name: source_name.clone(),
            error,
        })?;
        self.parse_str(&text, &source_name)
    }
}

/// File name component of `path`, or the whole path when it has none.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
