//! Working-set selector over one component store generation.
//!
//! # Responsibility
//! - Track which record indices are currently included.
//! - Keep membership unique and ordered.
//!
//! # Invariants
//! - Members are unique and ascending unless restored from a snapshot.
//! - Every member is `< store.len()` for the generation it was built from.
//! - Using a working set with a different store generation is a programming
//!   error and panics.

use crate::model::store::ComponentStore;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Recoverable selection error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    /// The index is not a current member.
    NotSelected(usize),
}

impl Display for SelectionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotSelected(index) => write!(f, "record {index} is not in the working set"),
        }
    }
}

impl Error for SelectionError {}

/// Ordered, duplicate-free set of record indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingSet {
    generation: u64,
    members: Vec<usize>,
}

impl WorkingSet {
    /// Selects every record of `store` in ascending order.
    pub fn select_all(store: &ComponentStore) -> Self {
        Self {
            generation: store.generation(),
            members: (0..store.len()).collect(),
        }
    }

    /// Adds `index` back into the set, keeping ascending order.
    ///
    /// Returns `false` when the index was already selected.
    ///
    /// # Panics
    /// - When `store` is not the generation this set was built from.
    /// - When `index` is outside the store.
    pub fn include(&mut self, store: &ComponentStore, index: usize) -> bool {
        self.assert_matches(store);
        assert!(
            index < store.len(),
            "record index {index} out of range for store of {} records",
            store.len()
        );
        match self.members.binary_search(&index) {
            Ok(_) => false,
            Err(insert_at) => {
                self.members.insert(insert_at, index);
                true
            }
        }
    }

    /// Removes one index; returns the 0-based position it occupied.
    pub fn exclude(&mut self, index: usize) -> Result<usize, SelectionError> {
        let position = self
            .position_of(index)
            .ok_or(SelectionError::NotSelected(index))?;
        self.members.remove(position);
        Ok(position)
    }

    pub fn members(&self) -> &[usize] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, index: usize) -> bool {
        self.members.contains(&index)
    }

    pub fn position_of(&self, index: usize) -> Option<usize> {
        self.members.iter().position(|member| *member == index)
    }

    /// Record index shown at 1-based display `position`.
    pub fn member_at_display(&self, position: usize) -> Option<usize> {
        position
            .checked_sub(1)
            .and_then(|offset| self.members.get(offset).copied())
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Panics when this set was derived from a different store generation.
    pub fn assert_matches(&self, store: &ComponentStore) {
        assert_eq!(
            self.generation,
            store.generation(),
            "stale working set: built for generation {}, store is generation {}",
            self.generation,
            store.generation()
        );
    }
}
