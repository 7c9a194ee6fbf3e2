//! Persistence of working-set records into the calendar relations.
//!
//! # Responsibility
//! - Map one record to organizer/event/to-do rows with duplicate suppression.
//! - Store one record, one selected member, or the whole working set.
//! - Count and clear the relations.
//!
//! # Invariants
//! - All inserts for one record commit together or not at all.
//! - Storing the same record twice changes nothing the second time.
//! - A failure on one record never stops `store_all`.

use crate::model::component::{ComponentKind, ComponentRecord};
use crate::model::store::ComponentStore;
use crate::model::working_set::WorkingSet;
use crate::repo::calendar_repo::{
    normalize_event_start, parse_todo_priority, CalendarRepository, NewEvent, NewTodo,
    RelationCounts, RepoError, RepoResult, SqliteCalendarRepository,
};
use log::{info, warn};
use rusqlite::Connection;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

pub type SyncResult<T> = Result<T, SyncError>;

#[derive(Debug)]
pub enum SyncError {
    /// 1-based working-set position with no member.
    InvalidPosition { position: usize, len: usize },
    Repo(RepoError),
}

impl Display for SyncError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidPosition { position, len } => {
                write!(f, "no working-set member at position {position} (1..={len})")
            }
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SyncError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidPosition { .. } => None,
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<RepoError> for SyncError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<rusqlite::Error> for SyncError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Repo(value.into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "id")]
pub enum OrganizerOutcome {
    Absent,
    Inserted(i64),
    Existing(i64),
}

impl OrganizerOutcome {
    pub fn id(self) -> Option<i64> {
        match self {
            Self::Absent => None,
            Self::Inserted(id) | Self::Existing(id) => Some(id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    BlankSummary,
    UnsupportedKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentOutcome {
    Inserted,
    Duplicate,
    Skipped(SkipReason),
}

impl Display for ComponentOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Inserted => f.write_str("inserted"),
            Self::Duplicate => f.write_str("duplicate"),
            Self::Skipped(SkipReason::BlankSummary) => f.write_str("skipped (blank summary)"),
            Self::Skipped(SkipReason::UnsupportedKind) => f.write_str("skipped (unsupported kind)"),
        }
    }
}

/// What storing one record did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StoreOutcome {
    pub record_index: usize,
    pub organizer: OrganizerOutcome,
    pub component: ComponentOutcome,
}

impl Display for StoreOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "record {}: {}", self.record_index, self.component)?;
        match self.organizer {
            OrganizerOutcome::Absent => Ok(()),
            OrganizerOutcome::Inserted(id) => write!(f, ", new organizer #{id}"),
            OrganizerOutcome::Existing(id) => write!(f, ", organizer #{id}"),
        }
    }
}

/// One record `store_all` could not write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreFailure {
    pub record_index: usize,
    pub error: String,
}

/// Serializable totals of a [`StoreReport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreSummary {
    pub inserted: usize,
    pub duplicates: usize,
    pub skipped: usize,
    pub failures: Vec<StoreFailure>,
}

impl Display for StoreSummary {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "inserted={} duplicates={} skipped={} failed={}",
            self.inserted,
            self.duplicates,
            self.skipped,
            self.failures.len()
        )?;
        for failure in &self.failures {
            write!(f, "\nrecord {}: {}", failure.record_index, failure.error)?;
        }
        Ok(())
    }
}

/// Per-record results of [`PersistenceSync::store_all`], in working-set order.
#[derive(Debug, Default)]
pub struct StoreReport {
    pub results: Vec<(usize, RepoResult<StoreOutcome>)>,
}

impl StoreReport {
    pub fn inserted(&self) -> usize {
        self.outcomes()
            .filter(|outcome| outcome.component == ComponentOutcome::Inserted)
            .count()
    }

    pub fn duplicates(&self) -> usize {
        self.outcomes()
            .filter(|outcome| outcome.component == ComponentOutcome::Duplicate)
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes()
            .filter(|outcome| matches!(outcome.component, ComponentOutcome::Skipped(_)))
            .count()
    }

    pub fn failures(&self) -> impl Iterator<Item = (usize, &RepoError)> {
        self.results
            .iter()
            .filter_map(|(index, result)| result.as_ref().err().map(|err| (*index, err)))
    }

    pub fn summary(&self) -> StoreSummary {
        StoreSummary {
            inserted: self.inserted(),
            duplicates: self.duplicates(),
            skipped: self.skipped(),
            failures: self
                .failures()
                .map(|(record_index, err)| StoreFailure {
                    record_index,
                    error: err.to_string(),
                })
                .collect(),
        }
    }

    fn outcomes(&self) -> impl Iterator<Item = &StoreOutcome> {
        self.results.iter().filter_map(|(_, result)| result.as_ref().ok())
    }
}

/// Writes one record through `repo`.
///
/// The organizer is resolved before the kind check, so organizers of
/// unsupported components are still recorded.
pub fn store_record<R: CalendarRepository + ?Sized>(
    repo: &R,
    record_index: usize,
    record: &ComponentRecord,
) -> RepoResult<StoreOutcome> {
    let organizer = if record.has_organizer() {
        match repo.resolve_organizer(&record.organizer_name, &record.organizer_contact)? {
            (id, true) => OrganizerOutcome::Inserted(id),
            (id, false) => OrganizerOutcome::Existing(id),
        }
    } else {
        OrganizerOutcome::Absent
    };

    let component = match &record.kind {
        ComponentKind::Other(_) => ComponentOutcome::Skipped(SkipReason::UnsupportedKind),
        _ if record.summary.is_empty() => ComponentOutcome::Skipped(SkipReason::BlankSummary),
        ComponentKind::Event => {
            let event = NewEvent {
                summary: &record.summary,
                start_time: normalize_event_start(&record.date_or_priority)?,
                location: Some(record.location.as_str()).filter(|value| !value.is_empty()),
                organizer: organizer.id(),
            };
            inserted_or_duplicate(repo.insert_event(&event)?)
        }
        ComponentKind::Todo => {
            let todo = NewTodo {
                summary: &record.summary,
                priority: parse_todo_priority(&record.date_or_priority)?,
                organizer: organizer.id(),
            };
            inserted_or_duplicate(repo.insert_todo(&todo)?)
        }
    };

    Ok(StoreOutcome {
        record_index,
        organizer,
        component,
    })
}

fn inserted_or_duplicate(inserted: bool) -> ComponentOutcome {
    if inserted {
        ComponentOutcome::Inserted
    } else {
        ComponentOutcome::Duplicate
    }
}

/// Transactional store/count/clear over one SQLite connection.
pub struct PersistenceSync<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> PersistenceSync<'conn> {
    pub fn new(conn: &'conn mut Connection) -> Self {
        Self { conn }
    }

    /// Stores record `index` of `store` in its own transaction.
    ///
    /// # Panics
    /// - When `index` is outside the store.
    pub fn store_one(&mut self, store: &ComponentStore, index: usize) -> RepoResult<StoreOutcome> {
        let Some(record) = store.record(index) else {
            panic!(
                "record index {index} out of range for store of {} records",
                store.len()
            );
        };

        let started_at = Instant::now();
        let tx = self.conn.transaction()?;
        let outcome = store_record(&SqliteCalendarRepository::new(&tx), index, record);
        let outcome = match outcome {
            Ok(outcome) => {
                tx.commit()?;
                outcome
            }
            Err(err) => {
                warn!(
                    "event=store_record module=persistence status=error record_index={} error={}",
                    index, err
                );
                return Err(err);
            }
        };

        info!(
            "event=store_record module=persistence status=ok record_index={} kind={} component={:?} duration_ms={}",
            index,
            record.kind,
            outcome.component,
            started_at.elapsed().as_millis()
        );
        Ok(outcome)
    }

    /// Stores the working-set member shown at 1-based `position`.
    pub fn store_selected(
        &mut self,
        store: &ComponentStore,
        ws: &WorkingSet,
        position: usize,
    ) -> SyncResult<StoreOutcome> {
        ws.assert_matches(store);
        let index = ws
            .member_at_display(position)
            .ok_or(SyncError::InvalidPosition {
                position,
                len: ws.len(),
            })?;
        Ok(self.store_one(store, index)?)
    }

    /// Stores every working-set member, continuing past failures.
    pub fn store_all(&mut self, store: &ComponentStore, ws: &WorkingSet) -> StoreReport {
        ws.assert_matches(store);
        let started_at = Instant::now();
        let results: Vec<_> = ws
            .members()
            .iter()
            .map(|&index| (index, self.store_one(store, index)))
            .collect();
        let report = StoreReport { results };

        info!(
            "event=store_all module=persistence status=ok members={} inserted={} duplicates={} skipped={} failed={} duration_ms={}",
            ws.len(),
            report.inserted(),
            report.duplicates(),
            report.skipped(),
            report.failures().count(),
            started_at.elapsed().as_millis()
        );
        report
    }

    pub fn count_db(&self) -> RepoResult<RelationCounts> {
        SqliteCalendarRepository::new(&*self.conn).counts()
    }

    /// Deletes to-dos, events and organizers in one transaction.
    pub fn clear_db(&mut self) -> RepoResult<()> {
        let tx = self.conn.transaction()?;
        SqliteCalendarRepository::new(&tx).clear_all()?;
        tx.commit()?;
        info!("event=clear_db module=persistence status=ok");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{
        store_record, ComponentOutcome, OrganizerOutcome, SkipReason, StoreOutcome, StoreReport,
    };
    use crate::model::component::{ComponentKind, ComponentRecord};
    use crate::repo::calendar_repo::{
        CalendarRepository, NewEvent, NewTodo, RelationCounts, RepoError, RepoResult,
    };
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingRepo {
        calls: RefCell<Vec<String>>,
    }

    impl CalendarRepository for RecordingRepo {
        fn resolve_organizer(&self, name: &str, _contact: &str) -> RepoResult<(i64, bool)> {
            self.calls.borrow_mut().push(format!("organizer:{name}"));
            Ok((7, true))
        }

        fn insert_event(&self, event: &NewEvent<'_>) -> RepoResult<bool> {
            self.calls
                .borrow_mut()
                .push(format!("event:{}:{:?}", event.start_time, event.organizer));
            Ok(true)
        }

        fn insert_todo(&self, todo: &NewTodo<'_>) -> RepoResult<bool> {
            self.calls
                .borrow_mut()
                .push(format!("todo:{:?}", todo.priority));
            Ok(false)
        }

        fn counts(&self) -> RepoResult<RelationCounts> {
            Ok(RelationCounts::default())
        }

        fn clear_all(&self) -> RepoResult<()> {
            Ok(())
        }
    }

    fn record(kind: ComponentKind, summary: &str, date_or_priority: &str) -> ComponentRecord {
        ComponentRecord {
            kind,
            property_count: 3,
            subcomponent_count: 0,
            summary: summary.to_string(),
            organizer_name: "Alice".to_string(),
            organizer_contact: "mailto:alice@x.test".to_string(),
            date_or_priority: date_or_priority.to_string(),
            location: String::new(),
        }
    }

    #[test]
    fn blank_event_date_uses_sentinel_and_links_organizer() {
        let repo = RecordingRepo::default();
        let outcome = store_record(&repo, 0, &record(ComponentKind::Event, "Lunch", "")).unwrap();

        assert_eq!(outcome.organizer, OrganizerOutcome::Inserted(7));
        assert_eq!(outcome.component, ComponentOutcome::Inserted);
        assert_eq!(
            repo.calls.borrow().as_slice(),
            ["organizer:Alice", "event:2016-05-08 00:00:00:Some(7)"]
        );
    }

    #[test]
    fn organizer_is_stored_even_for_skipped_components() {
        let repo = RecordingRepo::default();
        let journal = record(ComponentKind::Other("VJOURNAL".into()), "Notes", "");
        let outcome = store_record(&repo, 2, &journal).unwrap();

        assert_eq!(
            outcome.component,
            ComponentOutcome::Skipped(SkipReason::UnsupportedKind)
        );
        assert_eq!(repo.calls.borrow().as_slice(), ["organizer:Alice"]);

        let blank = record(ComponentKind::Todo, "", "1");
        let outcome = store_record(&repo, 3, &blank).unwrap();
        assert_eq!(
            outcome.component,
            ComponentOutcome::Skipped(SkipReason::BlankSummary)
        );
    }

    #[test]
    fn existing_todo_is_reported_as_duplicate() {
        let repo = RecordingRepo::default();
        let outcome = store_record(&repo, 1, &record(ComponentKind::Todo, "Ship", "2")).unwrap();
        assert_eq!(outcome.component, ComponentOutcome::Duplicate);
        assert_eq!(repo.calls.borrow().last().unwrap(), "todo:Some(2)");
    }

    #[test]
    fn report_summary_lists_counts_and_failures() {
        let outcome = |component| StoreOutcome {
            record_index: 0,
            organizer: OrganizerOutcome::Existing(3),
            component,
        };
        let report = StoreReport {
            results: vec![
                (0, Ok(outcome(ComponentOutcome::Inserted))),
                (1, Ok(outcome(ComponentOutcome::Skipped(SkipReason::BlankSummary)))),
                (2, Err(RepoError::InvalidData("bad DTSTART".to_string()))),
            ],
        };

        let summary = report.summary();
        assert_eq!((summary.inserted, summary.duplicates, summary.skipped), (1, 0, 1));
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].record_index, 2);
        assert!(summary
            .to_string()
            .starts_with("inserted=1 duplicates=0 skipped=1 failed=1\nrecord 2: "));
        assert_eq!(
            outcome(ComponentOutcome::Duplicate).to_string(),
            "record 0: duplicate, organizer #3"
        );
    }
}
