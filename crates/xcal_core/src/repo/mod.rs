//! Repository layer for the calendar relations.
//!
//! # Responsibility
//! - Define the persistence contract used by the store-sync service.
//! - Keep SQL details out of service orchestration.
//!
//! # Invariants
//! - Duplicate identities are ignored, never reported as errors.

pub mod calendar_repo;
