//! Tool invocations and their argument vectors.

use crate::validation::{TimeBound, ValidationResult};
use std::ffi::OsString;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Operation performed by the external tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    Info,
    Combine,
    Filter,
    Extract,
}

impl ToolKind {
    pub fn flag(self) -> &'static str {
        match self {
            Self::Info => "-info",
            Self::Combine => "-combine",
            Self::Filter => "-filter",
            Self::Extract => "-extract",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Combine => "combine",
            Self::Filter => "filter",
            Self::Extract => "extract",
        }
    }
}

impl Display for ToolKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Filter mode and bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterRequest {
    /// Keep to-dos; takes no bounds.
    Todos,
    /// Keep events, optionally bounded on either side.
    Events {
        from: Option<TimeBound>,
        to: Option<TimeBound>,
    },
}

impl FilterRequest {
    /// Builds an event filter from raw user text; blank bounds are dropped.
    pub fn events(from: &str, to: &str) -> ValidationResult<Self> {
        Ok(Self::Events {
            from: TimeBound::parse(from)?,
            to: TimeBound::parse(to)?,
        })
    }
}

/// What to extract from the working set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractKind {
    Events,
    XProperties,
}

impl ExtractKind {
    fn code(self) -> &'static str {
        match self {
            Self::Events => "e",
            Self::XProperties => "x",
        }
    }
}

/// One tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolCommand {
    Info,
    Combine { other: PathBuf },
    Filter(FilterRequest),
    Extract(ExtractKind),
}

impl ToolCommand {
    pub fn kind(&self) -> ToolKind {
        match self {
            Self::Info => ToolKind::Info,
            Self::Combine { .. } => ToolKind::Combine,
            Self::Filter(_) => ToolKind::Filter,
            Self::Extract(_) => ToolKind::Extract,
        }
    }

    /// Argument vector passed to the tool, flag first.
    pub fn args(&self) -> Vec<OsString> {
        let mut args = vec![OsString::from(self.kind().flag())];
        match self {
            Self::Info => {}
            Self::Combine { other } => args.push(non_flag_path(other)),
            Self::Filter(FilterRequest::Todos) => args.push("t".into()),
            Self::Filter(FilterRequest::Events { from, to }) => {
                args.push("e".into());
                if let Some(from) = from {
                    args.push("from".into());
                    args.push(from.as_str().into());
                }
                if let Some(to) = to {
                    args.push("to".into());
                    args.push(to.as_str().into());
                }
            }
            Self::Extract(kind) => args.push(kind.code().into()),
        }
        args
    }
}

fn non_flag_path(path: &Path) -> OsString {
    if path.as_os_str().to_string_lossy().starts_with('-') {
        Path::new(".").join(path).into_os_string()
    } else {
        path.as_os_str().to_os_string()
    }
}
