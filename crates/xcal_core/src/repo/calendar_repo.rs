//! Calendar relation repository and SQLite implementation.
//!
//! # Responsibility
//! - Insert organizers, events and to-dos with duplicate suppression.
//! - Convert raw record values into their stored form.
//!
//! # Invariants
//! - Dedup is enforced by unique indexes; inserts are insert-or-ignore, so
//!   concurrent writers never create a second row for one identity.
//! - Event start times are stored as `YYYY-MM-DD HH:MM:SS`.

use crate::db::DbError;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Stored start time for events whose `DTSTART` is blank.
pub const MISSING_EVENT_START: &str = "2016-05-08 00:00:00";

const STORED_START_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub type RepoResult<T> = Result<T, RepoError>;

#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    /// A record value cannot be converted to its column type.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid record data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Row counts of the three relations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RelationCounts {
    pub organizers: u64,
    pub events: u64,
    pub todos: u64,
}

impl RelationCounts {
    pub fn is_empty(&self) -> bool {
        self.organizers == 0 && self.events == 0 && self.todos == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent<'a> {
    pub summary: &'a str,
    pub start_time: String,
    pub location: Option<&'a str>,
    pub organizer: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTodo<'a> {
    pub summary: &'a str,
    pub priority: Option<i64>,
    pub organizer: Option<i64>,
}

/// Persistence contract for calendar relations.
pub trait CalendarRepository {
    /// Returns the organizer id for `(name, contact)` and whether it was new.
    fn resolve_organizer(&self, name: &str, contact: &str) -> RepoResult<(i64, bool)>;
    /// Returns `false` when an event with the same identity already exists.
    fn insert_event(&self, event: &NewEvent<'_>) -> RepoResult<bool>;
    /// Returns `false` when a to-do with the same summary already exists.
    fn insert_todo(&self, todo: &NewTodo<'_>) -> RepoResult<bool>;
    fn counts(&self) -> RepoResult<RelationCounts>;
    /// Deletes to-dos, events, then organizers.
    fn clear_all(&self) -> RepoResult<()>;
}

/// SQLite-backed calendar repository.
pub struct SqliteCalendarRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCalendarRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl CalendarRepository for SqliteCalendarRepository<'_> {
    fn resolve_organizer(&self, name: &str, contact: &str) -> RepoResult<(i64, bool)> {
        let inserted = self.conn.execute(
            "INSERT INTO ORGANIZER (name, contact) VALUES (?1, ?2)
             ON CONFLICT (name, contact) DO NOTHING;",
            params![name, contact],
        )? == 1;

        let id = self
            .conn
            .query_row(
                "SELECT org_id FROM ORGANIZER WHERE name = ?1 AND contact = ?2;",
                params![name, contact],
                |row| row.get::<_, i64>(0),
            )
            .optional()?
            .ok_or_else(|| RepoError::InvalidData("organizer row vanished after insert".into()))?;

        Ok((id, inserted))
    }

    fn insert_event(&self, event: &NewEvent<'_>) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "INSERT INTO EVENT (summary, start_time, location, organizer)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (summary, start_time) DO NOTHING;",
            params![
                event.summary,
                event.start_time,
                event.location,
                event.organizer
            ],
        )?;
        Ok(changed == 1)
    }

    fn insert_todo(&self, todo: &NewTodo<'_>) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "INSERT INTO TODO (summary, priority, organizer)
             VALUES (?1, ?2, ?3)
             ON CONFLICT (summary) DO NOTHING;",
            params![todo.summary, todo.priority, todo.organizer],
        )?;
        Ok(changed == 1)
    }

    fn counts(&self) -> RepoResult<RelationCounts> {
        let count = |table: &str| -> RepoResult<u64> {
            let value = self.conn.query_row(
                &format!("SELECT COUNT(*) FROM {table};"),
                [],
                |row| row.get::<_, i64>(0),
            )?;
            u64::try_from(value)
                .map_err(|_| RepoError::InvalidData(format!("negative row count in {table}")))
        };

        Ok(RelationCounts {
            organizers: count("ORGANIZER")?,
            events: count("EVENT")?,
            todos: count("TODO")?,
        })
    }

    fn clear_all(&self) -> RepoResult<()> {
        self.conn.execute_batch(
            "DELETE FROM TODO;
             DELETE FROM EVENT;
             DELETE FROM ORGANIZER;",
        )?;
        Ok(())
    }
}

/// Converts a raw `DTSTART` value into the stored start time.
///
/// Accepts `YYYYMMDDTHHMMSS` (optionally `Z`-suffixed) and `YYYYMMDD`
/// (midnight). Blank values map to [`MISSING_EVENT_START`].
pub fn normalize_event_start(raw: &str) -> RepoResult<String> {
    let value = raw.trim();
    if value.is_empty() {
        return Ok(MISSING_EVENT_START.to_string());
    }

    let without_zone = value.strip_suffix('Z').unwrap_or(value);
    if let Ok(moment) = NaiveDateTime::parse_from_str(without_zone, "%Y%m%dT%H%M%S") {
        return Ok(moment.format(STORED_START_FORMAT).to_string());
    }
    if let Ok(day) = NaiveDate::parse_from_str(without_zone, "%Y%m%d") {
        return Ok(day
            .and_time(NaiveTime::MIN)
            .format(STORED_START_FORMAT)
            .to_string());
    }

    Err(RepoError::InvalidData(format!("unsupported event start `{value}`")))
}

/// Converts a raw `PRIORITY` value; blank means no priority.
pub fn parse_todo_priority(raw: &str) -> RepoResult<Option<i64>> {
    let value = raw.trim();
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse::<i64>()
        .map(Some)
        .map_err(|_| RepoError::InvalidData(format!("unsupported priority `{value}`")))
}

#[cfg(test)]
mod tests {
    use super::{normalize_event_start, parse_todo_priority, MISSING_EVENT_START};

    #[test]
    fn event_start_accepts_date_time_and_date_forms() {
        assert_eq!(
            normalize_event_start("20160105T103000Z").unwrap(),
            "2016-01-05 10:30:00"
        );
        assert_eq!(
            normalize_event_start("20160105").unwrap(),
            "2016-01-05 00:00:00"
        );
        assert_eq!(normalize_event_start(" ").unwrap(), MISSING_EVENT_START);
        assert!(normalize_event_start("next tuesday").is_err());
    }

    #[test]
    fn priority_blank_is_null_and_text_is_rejected() {
        assert_eq!(parse_todo_priority("").unwrap(), None);
        assert_eq!(parse_todo_priority("5").unwrap(), Some(5));
        assert!(parse_todo_priority("urgent").is_err());
    }
}
