//! In-memory calendar model.
//!
//! # Responsibility
//! - Define the component tree, its record projection and the store holding
//!   one parsed calendar generation.
//! - Define the working set that selects live records from a store.
//!
//! # Invariants
//! - A working set is only valid for the store generation it was built from.
//! - Records are fixed-shape; empty values are empty strings.

pub mod component;
pub mod store;
pub mod working_set;
