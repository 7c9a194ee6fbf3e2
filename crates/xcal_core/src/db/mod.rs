//! Calendar database: connection bootstrap and schema upgrades.
//!
//! # Responsibility
//! - Hand out configured connections to the ORGANIZER/EVENT/TODO relations.
//! - Upgrade the relations to the schema this build writes.
//! - Give up on an unreachable database after a bounded number of attempts.
//!
//! # Invariants
//! - `PRAGMA user_version` is the schema version; files written by a newer
//!   build are refused, never downgraded.
//! - No persistence or query code sees a connection whose schema is stale.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub mod migrations;
mod open;

pub use open::{connect_with_retry, open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// The file carries a schema newer than this build understands.
    SchemaTooNew { found: u32, supported: u32 },
    /// The database stayed unreachable; `last` is the final attempt's failure.
    Unreachable {
        path: PathBuf,
        attempts: u32,
        last: Box<DbError>,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "calendar database error: {err}"),
            Self::SchemaTooNew { found, supported } => write!(
                f,
                "calendar database uses schema v{found}; this build only writes up to v{supported}"
            ),
            Self::Unreachable {
                path,
                attempts,
                last,
            } => write!(
                f,
                "calendar database `{}` unreachable after {attempts} attempt(s): {last}",
                path.display()
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::SchemaTooNew { .. } => None,
            Self::Unreachable { last, .. } => Some(last.as_ref()),
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

#[cfg(test)]
mod tests {
    use super::DbError;
    use std::error::Error;
    use std::path::PathBuf;

    #[test]
    fn unreachable_names_the_file_and_keeps_the_cause() {
        let err = DbError::Unreachable {
            path: PathBuf::from("/srv/xcal.sqlite3"),
            attempts: 3,
            last: Box::new(DbError::SchemaTooNew {
                found: 4,
                supported: 1,
            }),
        };

        let message = err.to_string();
        assert!(message.starts_with("calendar database `/srv/xcal.sqlite3` unreachable after 3"));
        assert!(message.ends_with("this build only writes up to v1"));
        assert!(err.source().is_some());
    }
}
