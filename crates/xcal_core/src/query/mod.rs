//! Canned and ad hoc queries over the calendar relations.
//!
//! # Responsibility
//! - Run the fixed set of reporting queries with validated parameters.
//! - Run user-written SQL that is a single read-only statement.
//! - Describe the column layout of the relations.
//!
//! # Invariants
//! - Queries never modify the database.
//! - Parameters are bound, never spliced into SQL text.

use crate::db::DbError;
use crate::validation::{parse_priority, parse_query_date, ValidationError};
use log::{info, warn};
use rusqlite::{params, Batch, Connection};
use std::error::Error;
use std::fmt::{Display, Formatter};

mod report;

pub use report::QueryReport;

/// Relations created by the schema, in dependency order.
pub const TABLES: [&str; 3] = ["ORGANIZER", "EVENT", "TODO"];

pub type QueryResult<T> = Result<T, QueryError>;

#[derive(Debug)]
pub enum QueryError {
    /// SQLite could not prepare or run the statement.
    Invalid { sql: String, message: String },
    /// Not a single read-only statement.
    Rejected { sql: String, reason: &'static str },
    Validation(ValidationError),
    Db(DbError),
}

impl Display for QueryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Invalid { sql, message } => write!(f, "invalid query `{sql}`: {message}"),
            Self::Rejected { sql, reason } => write!(f, "query `{sql}` rejected: {reason}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for QueryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Invalid { .. } | Self::Rejected { .. } => None,
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
        }
    }
}

impl From<ValidationError> for QueryError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<rusqlite::Error> for QueryError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Reporting queries with raw user parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CannedQuery {
    /// Event and to-do summaries of organizers whose name matches a `LIKE` pattern.
    ItemsOfOrganizer { name_pattern: String },
    EventCountAtLocation { location: String },
    /// Events starting on or after a `YYYY MM DD` date.
    EventsStartingAfter { date: String },
    TodosWithPriority { priority: String },
    /// To-dos sharing the lowest positive priority value.
    TodosWithHighestPriority,
}

impl CannedQuery {
    fn name(&self) -> &'static str {
        match self {
            Self::ItemsOfOrganizer { .. } => "items_of_organizer",
            Self::EventCountAtLocation { .. } => "event_count_at_location",
            Self::EventsStartingAfter { .. } => "events_starting_after",
            Self::TodosWithPriority { .. } => "todos_with_priority",
            Self::TodosWithHighestPriority => "todos_with_highest_priority",
        }
    }
}

/// Runs one canned query. Parameters are validated before any SQL runs.
pub fn run_canned(conn: &Connection, query: &CannedQuery) -> QueryResult<QueryReport> {
    let report = match query {
        CannedQuery::ItemsOfOrganizer { name_pattern } => {
            let mut stmt = conn.prepare(
                "SELECT summary FROM EVENT
                 WHERE organizer IN (SELECT org_id FROM ORGANIZER WHERE name LIKE ?1)
                 UNION
                 SELECT summary FROM TODO
                 WHERE organizer IN (SELECT org_id FROM ORGANIZER WHERE name LIKE ?1)
                 ORDER BY summary;",
            )?;
            QueryReport::collect(&mut stmt, params![name_pattern])?
        }
        CannedQuery::EventCountAtLocation { location } => {
            let mut stmt = conn.prepare("SELECT COUNT(*) FROM EVENT WHERE location = ?1;")?;
            QueryReport::collect(&mut stmt, params![location])?
        }
        CannedQuery::EventsStartingAfter { date } => {
            let since = parse_query_date(date)?.format("%Y-%m-%d 00:00:00").to_string();
            let mut stmt = conn.prepare(
                "SELECT summary FROM EVENT WHERE start_time >= ?1 ORDER BY start_time, summary;",
            )?;
            QueryReport::collect(&mut stmt, params![since])?
        }
        CannedQuery::TodosWithPriority { priority } => {
            let priority = parse_priority(priority)?;
            let mut stmt =
                conn.prepare("SELECT summary FROM TODO WHERE priority = ?1 ORDER BY summary;")?;
            QueryReport::collect(&mut stmt, params![priority])?
        }
        CannedQuery::TodosWithHighestPriority => {
            let mut stmt = conn.prepare(
                "SELECT summary FROM TODO
                 WHERE priority IN (SELECT MIN(priority) FROM TODO WHERE priority > 0)
                 ORDER BY summary;",
            )?;
            QueryReport::collect(&mut stmt, [])?
        }
    };

    info!(
        "event=query_run module=query status=ok query={} rows={}",
        query.name(),
        report.rows.len()
    );
    Ok(report)
}

/// Runs user-written SQL if it is a single read-only statement.
pub fn run_custom(conn: &Connection, sql: &str) -> QueryResult<QueryReport> {
    let sql = sql.trim();
    if sql.trim_end_matches(';').trim().is_empty() {
        return Err(QueryError::Rejected {
            sql: sql.to_string(),
            reason: "empty statement",
        });
    }

    let invalid = |err: rusqlite::Error| match err {
        rusqlite::Error::MultipleStatement => QueryError::Rejected {
            sql: sql.to_string(),
            reason: "only one statement is allowed",
        },
        other => QueryError::Invalid {
            sql: sql.to_string(),
            message: other.to_string(),
        },
    };

    let mut batch = Batch::new(conn, sql);
    let Some(mut stmt) = batch.next().map_err(invalid)? else {
        return Err(QueryError::Rejected {
            sql: sql.to_string(),
            reason: "empty statement",
        });
    };
    if batch.next().map_err(invalid)?.is_some() {
        return Err(QueryError::Rejected {
            sql: sql.to_string(),
            reason: "only one statement is allowed",
        });
    }

    if !stmt.readonly() {
        warn!("event=query_run module=query status=error query=custom error_code=not_readonly");
        return Err(QueryError::Rejected {
            sql: sql.to_string(),
            reason: "only read-only statements are allowed",
        });
    }

    let report = QueryReport::collect(&mut stmt, []).map_err(|err| QueryError::Invalid {
        sql: sql.to_string(),
        message: err.to_string(),
    })?;
    info!(
        "event=query_run module=query status=ok query=custom rows={}",
        report.rows.len()
    );
    Ok(report)
}

/// Column layout (`name`, `type`, `notnull`, `dflt_value`, `pk`) of each relation.
pub fn describe_tables(conn: &Connection) -> QueryResult<Vec<(&'static str, QueryReport)>> {
    TABLES
        .iter()
        .map(|table| -> QueryResult<(&'static str, QueryReport)> {
            let mut stmt = conn.prepare(&format!(
                "SELECT name, type, \"notnull\", dflt_value, pk FROM pragma_table_info('{table}');"
            ))?;
            Ok((*table, QueryReport::collect(&mut stmt, [])?))
        })
        .collect()
}
