//! Connection bootstrap for the calendar database.
//!
//! # Responsibility
//! - Open file or in-memory SQLite connections.
//! - Configure pragmas and apply migrations before handing a connection out.
//!
//! # Invariants
//! - Returned connections have `foreign_keys=ON`.
//! - Returned connections have migrations fully applied.

use super::migrations::apply_migrations;
use super::{DbError, DbResult};
use log::{error, info, warn};
use rusqlite::Connection;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

const RETRY_BACKOFF: Duration = Duration::from_millis(100);

/// Opens a SQLite database file and applies pending migrations.
///
/// # Side effects
/// - Emits `db_open` logging events with duration and status.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    bootstrap("file", || Connection::open(path.as_ref()))
}

/// Opens an in-memory SQLite database and applies pending migrations.
pub fn open_db_in_memory() -> DbResult<Connection> {
    bootstrap("memory", Connection::open_in_memory)
}

/// Opens `path`, retrying up to `attempts` times (at least once).
///
/// # Errors
/// - `DbError::Unreachable` with the last failure once every attempt failed.
pub fn connect_with_retry(path: impl AsRef<Path>, attempts: u32) -> DbResult<Connection> {
    let path = path.as_ref();
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        match open_db(path) {
            Ok(conn) => return Ok(conn),
            Err(err) if attempt < attempts => {
                warn!(
                    "event=db_connect module=db status=retry attempt={} max_attempts={} error={}",
                    attempt, attempts, err
                );
                thread::sleep(RETRY_BACKOFF * attempt);
                attempt += 1;
            }
            Err(err) => {
                error!(
                    "event=db_connect module=db status=error attempts={} error_code=connect_exhausted",
                    attempts
                );
                return Err(DbError::Unreachable {
                    path: path.to_path_buf(),
                    attempts,
                    last: Box::new(err),
                });
            }
        }
    }
}

fn bootstrap(
    mode: &str,
    connect: impl FnOnce() -> rusqlite::Result<Connection>,
) -> DbResult<Connection> {
    let started_at = Instant::now();
    info!("event=db_open module=db status=start mode={mode}");

    let result = connect()
        .map_err(DbError::from)
        .and_then(|mut conn| configure(&mut conn).map(|()| conn));
    match &result {
        Ok(_) => info!(
            "event=db_open module=db status=ok mode={mode} duration_ms={}",
            started_at.elapsed().as_millis()
        ),
        Err(err) => error!(
            "event=db_open module=db status=error mode={mode} duration_ms={} error={}",
            started_at.elapsed().as_millis(),
            err
        ),
    }
    result
}

fn configure(conn: &mut Connection) -> DbResult<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_secs(5))?;
    apply_migrations(conn)
}
