//! Subprocess runner for the transformation tool.

use super::{PipelineError, PipelineResult, ToolCommand, ToolKind};
use crate::workspace::{WorkFile, Workspace};
use log::{info, warn};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use wait_timeout::ChildExt;

/// Result stream of a successful invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub kind: ToolKind,
    pub stdout: Vec<u8>,
}

impl ToolOutput {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }
}

/// Invokes the tool binary with file-backed standard streams.
#[derive(Debug, Clone)]
pub struct PipelineAdapter {
    tool_path: PathBuf,
    timeout: Duration,
    date_mask: Option<PathBuf>,
}

impl PipelineAdapter {
    pub fn new(tool_path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            tool_path: tool_path.into(),
            timeout,
            date_mask: None,
        }
    }

    /// Exports `path` to the tool as `DATEMSK`.
    pub fn with_date_mask(mut self, path: Option<PathBuf>) -> Self {
        self.date_mask = path;
        self
    }

    pub fn tool_path(&self) -> &Path {
        &self.tool_path
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Runs `command` with `input` on standard input.
    ///
    /// `context` names the calendar the input came from and is attached to
    /// diagnostic failures.
    pub fn invoke(
        &self,
        workspace: &Workspace,
        command: &ToolCommand,
        input: &[u8],
        context: Option<&str>,
    ) -> PipelineResult<ToolOutput> {
        let kind = command.kind();
        let started_at = Instant::now();
        info!(
            "event=pipeline_invoke module=pipeline status=start kind={} input_bytes={}",
            kind,
            input.len()
        );

        let input_path = workspace.path(WorkFile::ToolInput);
        let output_path = workspace.path(WorkFile::ToolOutput);
        let diagnostics_path = workspace.path(WorkFile::ToolDiagnostics);
        fs::write(&input_path, input)?;

        let mut process = Command::new(&self.tool_path);
        process
            .args(command.args())
            .stdin(Stdio::from(File::open(&input_path)?))
            .stdout(Stdio::from(File::create(&output_path)?))
            .stderr(Stdio::from(File::create(&diagnostics_path)?));
        if let Some(mask) = &self.date_mask {
            process.env("DATEMSK", mask);
        }

        let mut child = process.spawn().map_err(|error| {
            warn!(
                "event=pipeline_invoke module=pipeline status=error kind={} error_code=spawn_failed",
                kind
            );
            PipelineError::Spawn {
                tool: self.tool_path.clone(),
                error,
            }
        })?;

        let status = match child.wait_timeout(self.timeout) {
            Ok(Some(status)) => status,
            Ok(None) => {
                let _ = child.kill();
                let _ = child.wait();
                warn!(
                    "event=pipeline_invoke module=pipeline status=error kind={} error_code=timeout duration_ms={}",
                    kind,
                    started_at.elapsed().as_millis()
                );
                return Err(PipelineError::Timeout {
                    kind,
                    seconds: self.timeout.as_secs(),
                });
            }
            Err(error) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(PipelineError::Io(error));
            }
        };

        let diagnostics = fs::read(&diagnostics_path)?;
        if !diagnostics.is_empty() {
            warn!(
                "event=pipeline_invoke module=pipeline status=error kind={} error_code=diagnostics exit_code={:?} duration_ms={}",
                kind,
                status.code(),
                started_at.elapsed().as_millis()
            );
            return Err(PipelineError::Diagnostics {
                kind,
                diagnostics: String::from_utf8_lossy(&diagnostics).into_owned(),
                context: context.map(str::to_string),
            });
        }

        if !status.success() {
            warn!(
                "event=pipeline_invoke module=pipeline status=warn kind={} exit_code={:?} message=nonzero_exit_without_diagnostics",
                kind,
                status.code()
            );
        }

        let stdout = fs::read(&output_path)?;
        info!(
            "event=pipeline_invoke module=pipeline status=ok kind={} output_bytes={} duration_ms={}",
            kind,
            stdout.len(),
            started_at.elapsed().as_millis()
        );
        Ok(ToolOutput { kind, stdout })
    }
}
