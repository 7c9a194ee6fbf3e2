//! Calendar working-set and synchronization engine.
//!
//! Loads calendar files into a component store, tracks which components are
//! live, round-trips the working set through an external transformation
//! tool, and persists components into SQLite with duplicate suppression.

pub mod codec;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod query;
pub mod repo;
pub mod service;
pub mod snapshot;
pub mod undo;
pub mod validation;
pub mod workspace;

pub use codec::{CalendarCodec, CodecError, CodecResult, IcsCodec};
pub use config::{ConfigError, EngineConfig};
pub use db::{connect_with_retry, open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::component::{ComponentKind, ComponentRecord};
pub use model::store::{ComponentStore, StoreHandle};
pub use model::working_set::{SelectionError, WorkingSet};
pub use pipeline::{
    ExtractKind, FilterRequest, PipelineAdapter, PipelineError, ToolCommand, ToolKind,
};
pub use query::{CannedQuery, QueryError, QueryReport};
pub use repo::calendar_repo::{RelationCounts, RepoError, MISSING_EVENT_START};
pub use service::commands::{available_commands, Command, CommandState};
pub use service::persistence_service::{
    ComponentOutcome, OrganizerOutcome, PersistenceSync, SkipReason, StoreFailure, StoreOutcome,
    StoreReport, StoreSummary, SyncError,
};
pub use service::session::{Session, SessionError, SharedSession};
pub use service::workbench::{Workbench, WorkbenchError};
pub use snapshot::{LineCounter, SnapshotWriter};
pub use undo::{UndoEntry, UndoLog, UndoState};
pub use validation::{TimeBound, ValidationError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
