//! Application session: the workbench plus the relational connection.
//!
//! # Responsibility
//! - Bind calendar-side state to one SQLite connection.
//! - Expose persistence, queries and command enablement in one place.
//!
//! # Invariants
//! - `SharedSession` always locks the workbench before the connection.

use crate::codec::{CalendarCodec, IcsCodec};
use crate::config::EngineConfig;
use crate::db::{connect_with_retry, DbError};
use crate::query::{self, CannedQuery, QueryError, QueryReport};
use crate::repo::calendar_repo::{
    CalendarRepository, RelationCounts, RepoError, SqliteCalendarRepository,
};
use crate::service::commands::{available_commands, Command, CommandState};
use crate::service::persistence_service::{PersistenceSync, StoreOutcome, StoreReport, SyncError};
use crate::service::workbench::{Workbench, WorkbenchError};
use rusqlite::Connection;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Mutex, MutexGuard, PoisonError};

pub type SessionResult<T> = Result<T, SessionError>;

#[derive(Debug)]
pub enum SessionError {
    Db(DbError),
    Workbench(WorkbenchError),
    Sync(SyncError),
    Query(QueryError),
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Workbench(err) => write!(f, "{err}"),
            Self::Sync(err) => write!(f, "{err}"),
            Self::Query(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SessionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Workbench(err) => Some(err),
            Self::Sync(err) => Some(err),
            Self::Query(err) => Some(err),
        }
    }
}

impl From<DbError> for SessionError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<WorkbenchError> for SessionError {
    fn from(value: WorkbenchError) -> Self {
        Self::Workbench(value)
    }
}

impl From<SyncError> for SessionError {
    fn from(value: SyncError) -> Self {
        Self::Sync(value)
    }
}

impl From<RepoError> for SessionError {
    fn from(value: RepoError) -> Self {
        Self::Sync(SyncError::Repo(value))
    }
}

impl From<QueryError> for SessionError {
    fn from(value: QueryError) -> Self {
        Self::Query(value)
    }
}

pub struct Session<C: CalendarCodec = IcsCodec> {
    workbench: Workbench<C>,
    conn: Connection,
}

impl Session<IcsCodec> {
    /// Connects to the configured database (with retries) and builds a workbench.
    pub fn open(config: &EngineConfig) -> SessionResult<Self> {
        let conn = connect_with_retry(&config.database_path, config.connect_attempts)?;
        let workbench = Workbench::from_config(config)?;
        Ok(Self::new(workbench, conn))
    }
}

impl<C: CalendarCodec> Session<C> {
    pub fn new(workbench: Workbench<C>, conn: Connection) -> Self {
        Self { workbench, conn }
    }

    pub fn workbench(&self) -> &Workbench<C> {
        &self.workbench
    }

    pub fn workbench_mut(&mut self) -> &mut Workbench<C> {
        &mut self.workbench
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Stores record `index` of the loaded store.
    pub fn store_one(&mut self, index: usize) -> SessionResult<StoreOutcome> {
        let (store, _) = self
            .workbench
            .selection()
            .ok_or(WorkbenchError::NothingLoaded)?;
        Ok(PersistenceSync::new(&mut self.conn).store_one(store, index)?)
    }

    /// Stores the working-set member at 1-based `position`.
    pub fn store_selected(&mut self, position: usize) -> SessionResult<StoreOutcome> {
        let (store, ws) = self
            .workbench
            .selection()
            .ok_or(WorkbenchError::NothingLoaded)?;
        Ok(PersistenceSync::new(&mut self.conn).store_selected(store, ws, position)?)
    }

    pub fn store_all(&mut self) -> SessionResult<StoreReport> {
        let (store, ws) = self
            .workbench
            .selection()
            .ok_or(WorkbenchError::NothingLoaded)?;
        Ok(PersistenceSync::new(&mut self.conn).store_all(store, ws))
    }

    pub fn count_db(&self) -> SessionResult<RelationCounts> {
        Ok(SqliteCalendarRepository::new(&self.conn).counts()?)
    }

    pub fn clear_db(&mut self) -> SessionResult<()> {
        Ok(PersistenceSync::new(&mut self.conn).clear_db()?)
    }

    pub fn run_query(&self, query: &CannedQuery) -> SessionResult<QueryReport> {
        Ok(query::run_canned(&self.conn, query)?)
    }

    pub fn run_custom_query(&self, sql: &str) -> SessionResult<QueryReport> {
        Ok(query::run_custom(&self.conn, sql)?)
    }

    pub fn describe_tables(&self) -> SessionResult<Vec<(&'static str, QueryReport)>> {
        Ok(query::describe_tables(&self.conn)?)
    }

    /// Engine state for command enablement; `focused` is a 1-based position.
    pub fn command_state(&self, focused: Option<usize>) -> SessionResult<CommandState> {
        Ok(command_state_of(&self.workbench, &self.conn, focused)?)
    }

    pub fn available_commands(&self, focused: Option<usize>) -> SessionResult<BTreeSet<Command>> {
        Ok(available_commands(&self.command_state(focused)?))
    }

    /// Splits the session for use across threads.
    pub fn into_shared(self) -> SharedSession<C> {
        SharedSession {
            workbench: Mutex::new(self.workbench),
            conn: Mutex::new(self.conn),
        }
    }
}

fn command_state_of<C: CalendarCodec>(
    workbench: &Workbench<C>,
    conn: &Connection,
    focused: Option<usize>,
) -> Result<CommandState, RepoError> {
    let has_selection = match (focused, workbench.working_set()) {
        (Some(position), Some(ws)) => ws.member_at_display(position).is_some(),
        _ => false,
    };
    Ok(CommandState {
        calendar_loaded: workbench.is_loaded(),
        has_selection,
        undo_pending: workbench.undo_log().is_pending(),
        database_non_empty: !SqliteCalendarRepository::new(conn).counts()?.is_empty(),
    })
}

/// Session split into a calendar lock and a database lock.
pub struct SharedSession<C: CalendarCodec = IcsCodec> {
    workbench: Mutex<Workbench<C>>,
    conn: Mutex<Connection>,
}

impl<C: CalendarCodec> SharedSession<C> {
    pub fn with_workbench<R>(&self, f: impl FnOnce(&mut Workbench<C>) -> R) -> R {
        let mut workbench = lock(&self.workbench);
        f(&mut *workbench)
    }

    pub fn with_connection<R>(&self, f: impl FnOnce(&mut Connection) -> R) -> R {
        let mut conn = lock(&self.conn);
        f(&mut *conn)
    }

    /// Locks the workbench, then the connection.
    pub fn with_both<R>(&self, f: impl FnOnce(&mut Workbench<C>, &mut Connection) -> R) -> R {
        let mut workbench = lock(&self.workbench);
        let mut conn = lock(&self.conn);
        f(&mut *workbench, &mut *conn)
    }

    pub fn store_all(&self) -> SessionResult<StoreReport> {
        self.with_both(|workbench, conn| -> SessionResult<StoreReport> {
            let (store, ws) = workbench
                .selection()
                .ok_or(WorkbenchError::NothingLoaded)?;
            Ok(PersistenceSync::new(conn).store_all(store, ws))
        })
    }

    pub fn store_selected(&self, position: usize) -> SessionResult<StoreOutcome> {
        self.with_both(|workbench, conn| -> SessionResult<StoreOutcome> {
            let (store, ws) = workbench
                .selection()
                .ok_or(WorkbenchError::NothingLoaded)?;
            Ok(PersistenceSync::new(conn).store_selected(store, ws, position)?)
        })
    }

    pub fn count_db(&self) -> SessionResult<RelationCounts> {
        self.with_connection(|conn| -> SessionResult<RelationCounts> {
            Ok(SqliteCalendarRepository::new(conn).counts()?)
        })
    }

    pub fn clear_db(&self) -> SessionResult<()> {
        self.with_connection(|conn| -> SessionResult<()> {
            Ok(PersistenceSync::new(conn).clear_db()?)
        })
    }

    pub fn command_state(&self, focused: Option<usize>) -> SessionResult<CommandState> {
        self.with_both(|workbench, conn| -> SessionResult<CommandState> {
            Ok(command_state_of(workbench, conn, focused)?)
        })
    }

    /// Joins the halves back into a single-threaded session.
    pub fn into_inner(self) -> Session<C> {
        Session {
            workbench: self
                .workbench
                .into_inner()
                .unwrap_or_else(PoisonError::into_inner),
            conn: self.conn.into_inner().unwrap_or_else(PoisonError::into_inner),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
