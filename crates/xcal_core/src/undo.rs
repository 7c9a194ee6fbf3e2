//! Single-level undo for to-do removal.
//!
//! # Invariants
//! - At most one frame is pending; starting a new batch replaces it.
//! - Restoring returns the exact pre-removal working set and empties the log.

use crate::model::working_set::WorkingSet;

/// One excluded record and where it was shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UndoEntry {
    /// 1-based display position before removal.
    pub display_position: usize,
    pub record_index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UndoState {
    Empty,
    Pending,
}

#[derive(Debug, Clone)]
struct UndoFrame {
    entries: Vec<UndoEntry>,
    prior: WorkingSet,
}

#[derive(Debug, Clone, Default)]
pub struct UndoLog {
    frame: Option<UndoFrame>,
}

impl UndoLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a new frame holding `prior` and the removed `entries`.
    pub fn begin(&mut self, prior: WorkingSet, entries: Vec<UndoEntry>) {
        self.frame = Some(UndoFrame { entries, prior });
    }

    /// Takes the pending snapshot, leaving the log empty.
    ///
    /// Returns `None` when nothing was recorded.
    pub fn take_restore(&mut self) -> Option<WorkingSet> {
        match self.frame.take() {
            Some(frame) if !frame.entries.is_empty() => Some(frame.prior),
            _ => None,
        }
    }

    /// Snapshot `take_restore` would return, without consuming it.
    pub fn pending_restore(&self) -> Option<&WorkingSet> {
        match &self.frame {
            Some(frame) if !frame.entries.is_empty() => Some(&frame.prior),
            _ => None,
        }
    }

    pub fn clear(&mut self) {
        self.frame = None;
    }

    pub fn entries(&self) -> &[UndoEntry] {
        match &self.frame {
            Some(frame) => &frame.entries,
            None => &[],
        }
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_pending(&self) -> bool {
        !self.entries().is_empty()
    }

    pub fn state(&self) -> UndoState {
        if self.is_pending() {
            UndoState::Pending
        } else {
            UndoState::Empty
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{UndoEntry, UndoLog, UndoState};
    use crate::model::component::CalendarComponent;
    use crate::model::store::{ComponentStore, StoreHandle};
    use crate::model::working_set::WorkingSet;

    fn store_of(count: usize) -> ComponentStore {
        let components = (0..count)
            .map(|_| CalendarComponent {
                name: "VTODO".to_string(),
                properties: Vec::new(),
                components: Vec::new(),
            })
            .collect();
        ComponentStore::new(StoreHandle::new(), "mem", Vec::new(), components)
    }

    #[test]
    fn new_batch_replaces_previous_frame() {
        let store = store_of(3);
        let all = WorkingSet::select_all(&store);
        let mut log = UndoLog::new();

        log.begin(
            all.clone(),
            vec![UndoEntry {
                display_position: 1,
                record_index: 0,
            }],
        );
        let mut after_first = all.clone();
        after_first.exclude(0).unwrap();
        log.begin(
            after_first.clone(),
            vec![UndoEntry {
                display_position: 1,
                record_index: 1,
            }],
        );

        assert_eq!(log.len(), 1);
        assert_eq!(log.entries()[0].record_index, 1);
        assert_eq!(log.take_restore(), Some(after_first));
        assert_eq!(log.state(), UndoState::Empty);
    }

    #[test]
    fn pending_snapshot_is_visible_until_taken() {
        let store = store_of(2);
        let all = WorkingSet::select_all(&store);
        let mut log = UndoLog::new();
        log.begin(
            all.clone(),
            vec![UndoEntry {
                display_position: 2,
                record_index: 1,
            }],
        );

        assert_eq!(log.pending_restore(), Some(&all));
        assert_eq!(log.len(), 1);
        assert_eq!(log.take_restore(), Some(all));
        assert_eq!(log.pending_restore(), None);
    }

    #[test]
    fn empty_log_restores_nothing() {
        let mut log = UndoLog::new();
        assert_eq!(log.take_restore(), None);
        assert!(!log.is_pending());
    }
}
