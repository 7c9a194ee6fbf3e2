//! Calendar-side application context.
//!
//! # Responsibility
//! - Own the loaded store, its working set, the undo log and the line counter.
//! - Orchestrate open/save, pipeline round trips and to-do removal.
//!
//! # Invariants
//! - The working set always belongs to the currently loaded store.
//! - A replaced store is released before the next one is installed.
//! - Failed parses and failed pipeline runs leave every piece of state intact.
//! - Replacing the store clears the undo log.

use crate::codec::{display_name, CalendarCodec, CodecError, IcsCodec};
use crate::config::EngineConfig;
use crate::model::store::ComponentStore;
use crate::model::working_set::{SelectionError, WorkingSet};
use crate::pipeline::{ExtractKind, FilterRequest, PipelineAdapter, PipelineError, ToolCommand};
use crate::snapshot::{render, SnapshotWriter};
use crate::undo::{UndoEntry, UndoLog};
use crate::validation::ValidationError;
use crate::workspace::{WorkFile, Workspace};
use log::{info, warn};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub type WorkbenchResult<T> = Result<T, WorkbenchError>;

#[derive(Debug)]
pub enum WorkbenchError {
    Codec(CodecError),
    Pipeline(PipelineError),
    Selection(SelectionError),
    Validation(ValidationError),
    NothingLoaded,
    NoActiveFile,
    /// 1-based display position with no working-set member.
    InvalidPosition { position: usize, len: usize },
    NotATodo { position: usize },
    Io(std::io::Error),
}

impl Display for WorkbenchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Codec(err) => write!(f, "{err}"),
            Self::Pipeline(err) => write!(f, "{err}"),
            Self::Selection(err) => write!(f, "{err}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::NothingLoaded => write!(f, "no calendar is loaded"),
            Self::NoActiveFile => write!(f, "no active file; use save as"),
            Self::InvalidPosition { position, len } => {
                write!(f, "no component at position {position} (1..={len})")
            }
            Self::NotATodo { position } => {
                write!(f, "component at position {position} is not a to-do")
            }
            Self::Io(err) => write!(f, "workspace error: {err}"),
        }
    }
}

impl Error for WorkbenchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Codec(err) => Some(err),
            Self::Pipeline(err) => Some(err),
            Self::Selection(err) => Some(err),
            Self::Validation(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::NothingLoaded
            | Self::NoActiveFile
            | Self::InvalidPosition { .. }
            | Self::NotATodo { .. } => None,
        }
    }
}

impl From<CodecError> for WorkbenchError {
    fn from(value: CodecError) -> Self {
        Self::Codec(value)
    }
}

impl From<PipelineError> for WorkbenchError {
    fn from(value: PipelineError) -> Self {
        Self::Pipeline(value)
    }
}

impl From<SelectionError> for WorkbenchError {
    fn from(value: SelectionError) -> Self {
        Self::Selection(value)
    }
}

impl From<ValidationError> for WorkbenchError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<std::io::Error> for WorkbenchError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

/// Result of loading a calendar file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenReport {
    pub records: usize,
    pub delta: i64,
    /// Tool report when the file was validated before loading.
    pub info: Option<String>,
}

/// Result of replacing the store with pipeline output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReloadReport {
    pub records: usize,
    pub delta: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemovalReport {
    pub removed: usize,
    pub delta: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UndoReport {
    pub restored: usize,
    pub delta: i64,
}

/// A to-do offered for removal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TodoCandidate {
    pub position: usize,
    pub record_index: usize,
    pub summary: String,
}

/// One row of the component list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayRow {
    pub position: usize,
    pub kind: String,
    pub property_count: usize,
    pub subcomponent_count: usize,
    pub summary: String,
}

#[derive(Debug)]
struct LoadedCalendar {
    store: ComponentStore,
    working_set: WorkingSet,
}

/// Calendar-side engine state.
pub struct Workbench<C: CalendarCodec = IcsCodec> {
    codec: C,
    adapter: PipelineAdapter,
    workspace: Workspace,
    writer: SnapshotWriter,
    loaded: Option<LoadedCalendar>,
    undo: UndoLog,
    active_path: Option<PathBuf>,
    unsaved: bool,
    validate_on_open: bool,
}

impl Workbench<IcsCodec> {
    pub fn new(adapter: PipelineAdapter) -> WorkbenchResult<Self> {
        Self::with_codec(IcsCodec, adapter)
    }

    pub fn from_config(config: &EngineConfig) -> WorkbenchResult<Self> {
        let mut workbench = Self::new(config.pipeline_adapter())?;
        workbench.set_validate_on_open(config.validate_on_open);
        Ok(workbench)
    }
}

impl<C: CalendarCodec> Workbench<C> {
    pub fn with_codec(codec: C, adapter: PipelineAdapter) -> WorkbenchResult<Self> {
        Ok(Self {
            codec,
            adapter,
            workspace: Workspace::create()?,
            writer: SnapshotWriter::new(),
            loaded: None,
            undo: UndoLog::new(),
            active_path: None,
            unsaved: false,
            validate_on_open: false,
        })
    }

    /// Runs the tool's `-info` check before every open when enabled.
    pub fn set_validate_on_open(&mut self, enabled: bool) {
        self.validate_on_open = enabled;
    }

    /// Loads `path`, replacing any current calendar.
    ///
    /// The working file is rewritten and the line counter advanced. On any
    /// failure the previous calendar stays loaded.
    pub fn open(&mut self, path: &Path) -> WorkbenchResult<OpenReport> {
        let source_name = display_name(path);
        let info = if self.validate_on_open {
            let bytes = std::fs::read(path).map_err(|error| CodecError::Io {
                source_name: source_name.clone(),
                error,
            })?;
            let output =
                self.adapter
                    .invoke(&self.workspace, &ToolCommand::Info, &bytes, Some(&source_name))?;
            Some(output.text())
        } else {
            None
        };

        let store = self.codec.parse_file(path)?;
        let records = store.len();
        let delta = self.install(store)?;
        self.active_path = Some(path.to_path_buf());
        self.unsaved = false;

        info!(
            "event=calendar_load module=workbench status=ok records={} delta={}",
            records, delta
        );
        Ok(OpenReport {
            records,
            delta,
            info,
        })
    }

    /// Writes the working set to the active file.
    pub fn save(&mut self) -> WorkbenchResult<i64> {
        let path = self.active_path.clone().ok_or(WorkbenchError::NoActiveFile)?;
        let loaded = self.loaded.as_ref().ok_or(WorkbenchError::NothingLoaded)?;
        let delta = self
            .writer
            .write(&self.codec, &path, &loaded.store, &loaded.working_set)?;

        self.undo.clear();
        self.unsaved = false;
        info!(
            "event=calendar_save module=workbench status=ok members={} delta={}",
            loaded.working_set.len(),
            delta
        );
        Ok(delta)
    }

    /// Writes the working set to `path` and makes it the active file.
    pub fn save_as(&mut self, path: &Path) -> WorkbenchResult<i64> {
        if self.loaded.is_none() {
            return Err(WorkbenchError::NothingLoaded);
        }
        let previous = self.active_path.replace(path.to_path_buf());
        self.save().map_err(|err| {
            self.active_path = previous;
            err
        })
    }

    /// Merges the working set with `other` through the tool.
    pub fn combine(&mut self, other: &Path) -> WorkbenchResult<ReloadReport> {
        self.reload_through(ToolCommand::Combine {
            other: other.to_path_buf(),
        })
    }

    pub fn filter(&mut self, request: FilterRequest) -> WorkbenchResult<ReloadReport> {
        self.reload_through(ToolCommand::Filter(request))
    }

    /// Event filter from raw bound text; blank bounds are omitted.
    pub fn filter_events(&mut self, from: &str, to: &str) -> WorkbenchResult<ReloadReport> {
        let request = FilterRequest::events(from, to)?;
        self.filter(request)
    }

    /// Extraction output as text; the store is unchanged.
    pub fn extract(&self, kind: ExtractKind) -> WorkbenchResult<String> {
        self.text_through(ToolCommand::Extract(kind))
    }

    /// Tool report for the working set; the store is unchanged.
    pub fn info(&self) -> WorkbenchResult<String> {
        self.text_through(ToolCommand::Info)
    }

    /// Serializes the member at 1-based `position` without touching the counter.
    pub fn show_selected(&self, position: usize) -> WorkbenchResult<String> {
        let loaded = self.loaded()?;
        let index = member_at(&loaded.working_set, position)?;
        Ok(render(&self.codec, &loaded.store, &[index])?.text())
    }

    /// To-dos currently in the working set, by display position.
    pub fn todo_candidates(&self) -> Vec<TodoCandidate> {
        let Some(loaded) = self.loaded.as_ref() else {
            return Vec::new();
        };
        loaded
            .working_set
            .members()
            .iter()
            .enumerate()
            .filter_map(|(offset, &index)| {
                let record = loaded.store.record(index)?;
                record.kind.is_todo().then(|| TodoCandidate {
                    position: offset + 1,
                    record_index: index,
                    summary: record.summary.clone(),
                })
            })
            .collect()
    }

    /// Excludes the to-dos at 1-based `positions` as one undoable batch.
    ///
    /// Every position is checked before anything changes. If rewriting the
    /// working file fails, the working set and undo log are rolled back.
    pub fn remove_todos(&mut self, positions: &[usize]) -> WorkbenchResult<RemovalReport> {
        let mut positions = positions.to_vec();
        positions.sort_unstable();
        positions.dedup();

        let loaded = self.loaded.as_mut().ok_or(WorkbenchError::NothingLoaded)?;
        let mut entries = Vec::with_capacity(positions.len());
        for &position in &positions {
            let index = member_at(&loaded.working_set, position)?;
            let is_todo = loaded
                .store
                .record(index)
                .is_some_and(|record| record.kind.is_todo());
            if !is_todo {
                return Err(WorkbenchError::NotATodo { position });
            }
            entries.push(UndoEntry {
                display_position: position,
                record_index: index,
            });
        }
        if entries.is_empty() {
            return Ok(RemovalReport {
                removed: 0,
                delta: 0,
            });
        }

        let prior = loaded.working_set.clone();
        let previous_undo = self.undo.clone();
        for entry in &entries {
            loaded.working_set.exclude(entry.record_index)?;
        }
        let removed = entries.len();
        self.undo.begin(prior.clone(), entries);

        let path = self.workspace.path(WorkFile::WorkingSet);
        match self
            .writer
            .write(&self.codec, &path, &loaded.store, &loaded.working_set)
        {
            Ok(delta) => {
                self.unsaved = true;
                info!(
                    "event=todo_remove module=workbench status=ok removed={} delta={}",
                    removed, delta
                );
                Ok(RemovalReport { removed, delta })
            }
            Err(err) => {
                loaded.working_set = prior;
                self.undo = previous_undo;
                warn!("event=todo_remove module=workbench status=error error_code=write_failed");
                Err(err.into())
            }
        }
    }

    /// Restores the working set from before the last removal batch.
    ///
    /// Returns `Ok(None)` when nothing is pending. The frame is kept when the
    /// working file cannot be rewritten.
    pub fn undo(&mut self) -> WorkbenchResult<Option<UndoReport>> {
        let Some(loaded) = self.loaded.as_mut() else {
            self.undo.clear();
            return Ok(None);
        };
        let Some(prior) = self.undo.pending_restore() else {
            self.undo.clear();
            return Ok(None);
        };

        let path = self.workspace.path(WorkFile::WorkingSet);
        let delta = self
            .writer
            .write(&self.codec, &path, &loaded.store, prior)?;
        let restored = self.undo.len();
        if let Some(prior) = self.undo.take_restore() {
            loaded.working_set = prior;
        }
        info!(
            "event=todo_undo module=workbench status=ok restored={} delta={}",
            restored, delta
        );
        Ok(Some(UndoReport { restored, delta }))
    }

    pub fn clear_undo(&mut self) {
        self.undo.clear();
    }

    /// Active file name, suffixed with `*` when there are unsaved changes.
    pub fn display_title(&self) -> String {
        let name = self
            .active_path
            .as_deref()
            .map(display_name)
            .unwrap_or_else(|| "untitled".to_string());
        if self.unsaved {
            format!("{name}*")
        } else {
            name
        }
    }

    /// Display rows for every working-set member, in order.
    pub fn rows(&self) -> Vec<DisplayRow> {
        let Some(loaded) = self.loaded.as_ref() else {
            return Vec::new();
        };
        loaded
            .working_set
            .members()
            .iter()
            .enumerate()
            .filter_map(|(offset, &index)| {
                let record = loaded.store.record(index)?;
                Some(DisplayRow {
                    position: offset + 1,
                    kind: record.kind.to_string(),
                    property_count: record.property_count,
                    subcomponent_count: record.subcomponent_count,
                    summary: record.summary.clone(),
                })
            })
            .collect()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    pub fn is_unsaved(&self) -> bool {
        self.unsaved
    }

    pub fn store(&self) -> Option<&ComponentStore> {
        self.loaded.as_ref().map(|loaded| &loaded.store)
    }

    pub fn working_set(&self) -> Option<&WorkingSet> {
        self.loaded.as_ref().map(|loaded| &loaded.working_set)
    }

    pub fn undo_log(&self) -> &UndoLog {
        &self.undo
    }

    pub fn active_path(&self) -> Option<&Path> {
        self.active_path.as_deref()
    }

    pub fn previous_line_count(&self) -> i64 {
        self.writer.previous_line_count()
    }

    /// Location of the current working-set file.
    pub fn working_file(&self) -> PathBuf {
        self.workspace.path(WorkFile::WorkingSet)
    }

    /// Store and working set together, for persistence.
    pub fn selection(&self) -> Option<(&ComponentStore, &WorkingSet)> {
        self.loaded
            .as_ref()
            .map(|loaded| (&loaded.store, &loaded.working_set))
    }

    fn loaded(&self) -> WorkbenchResult<&LoadedCalendar> {
        self.loaded.as_ref().ok_or(WorkbenchError::NothingLoaded)
    }

    fn context_name(&self) -> Option<String> {
        self.active_path.as_deref().map(display_name)
    }

    fn text_through(&self, command: ToolCommand) -> WorkbenchResult<String> {
        let loaded = self.loaded()?;
        let input = render(&self.codec, &loaded.store, loaded.working_set.members())?;
        let context = self.context_name();
        let output =
            self.adapter
                .invoke(&self.workspace, &command, &input.bytes, context.as_deref())?;
        Ok(output.text())
    }

    fn reload_through(&mut self, command: ToolCommand) -> WorkbenchResult<ReloadReport> {
        let kind = command.kind();
        let loaded = self.loaded()?;
        let input = render(&self.codec, &loaded.store, loaded.working_set.members())?;
        let context = self.context_name();
        let output =
            self.adapter
                .invoke(&self.workspace, &command, &input.bytes, context.as_deref())?;

        let source_name = context.unwrap_or_else(|| format!("{kind} output"));
        let store = self.codec.parse_str(&output.text(), &source_name)?;
        let records = store.len();
        let delta = self.install(store)?;
        self.unsaved = true;

        info!(
            "event=calendar_reload module=workbench status=ok kind={} records={} delta={}",
            kind, records, delta
        );
        Ok(ReloadReport { records, delta })
    }

    /// Writes the working file for `store` with every record selected, then
    /// releases the current store and installs the new one with undo cleared.
    ///
    /// A failed write releases `store` and leaves the current state untouched.
    fn install(&mut self, store: ComponentStore) -> WorkbenchResult<i64> {
        let working_set = WorkingSet::select_all(&store);
        let path = self.workspace.path(WorkFile::WorkingSet);
        let delta = match self.writer.write(&self.codec, &path, &store, &working_set) {
            Ok(delta) => delta,
            Err(err) => {
                store.release(&self.codec);
                warn!("event=calendar_install module=workbench status=error error_code=write_failed");
                return Err(err.into());
            }
        };

        if let Some(previous) = self.loaded.take() {
            previous.store.release(&self.codec);
        }
        self.undo.clear();
        self.loaded = Some(LoadedCalendar { store, working_set });
        Ok(delta)
    }
}

impl<C: CalendarCodec> Drop for Workbench<C> {
    fn drop(&mut self) {
        if let Some(loaded) = self.loaded.take() {
            loaded.store.release(&self.codec);
        }
    }
}

fn member_at(ws: &WorkingSet, position: usize) -> WorkbenchResult<usize> {
    ws.member_at_display(position)
        .ok_or(WorkbenchError::InvalidPosition {
            position,
            len: ws.len(),
        })
}
