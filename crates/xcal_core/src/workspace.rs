//! Private scratch directory for working files.
//!
//! # Responsibility
//! - Give each engine instance uniquely named working files.
//! - Remove them on every exit path (the directory is deleted on drop).

use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Role of one working file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkFile {
    /// Current working set.
    WorkingSet,
    ToolInput,
    ToolOutput,
    ToolDiagnostics,
}

impl WorkFile {
    pub fn file_name(self) -> &'static str {
        match self {
            Self::WorkingSet => "working-set.ics",
            Self::ToolInput => "tool-input.ics",
            Self::ToolOutput => "tool-output.txt",
            Self::ToolDiagnostics => "tool-diagnostics.txt",
        }
    }
}

/// Scratch directory owned by one workbench.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn create() -> io::Result<Self> {
        let dir = tempfile::Builder::new().prefix("xcal-").tempdir()?;
        Ok(Self { dir })
    }

    pub fn path(&self, file: WorkFile) -> PathBuf {
        self.dir.path().join(file.file_name())
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }
}

#[cfg(test)]
mod tests {
    use super::{WorkFile, Workspace};

    #[test]
    fn directory_is_removed_on_drop() {
        let workspace = Workspace::create().unwrap();
        let root = workspace.root().to_path_buf();
        std::fs::write(workspace.path(WorkFile::ToolInput), b"x").unwrap();
        assert!(root.exists());

        drop(workspace);
        assert!(!root.exists());
    }

    #[test]
    fn workspaces_do_not_collide() {
        let first = Workspace::create().unwrap();
        let second = Workspace::create().unwrap();
        assert_ne!(
            first.path(WorkFile::WorkingSet),
            second.path(WorkFile::WorkingSet)
        );
    }
}
