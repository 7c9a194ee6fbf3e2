//! Use-case services.
//!
//! # Responsibility
//! - Orchestrate model, codec, pipeline and repository calls.
//! - Keep front ends decoupled from storage and file details.

pub mod commands;
pub mod persistence_service;
pub mod session;
pub mod workbench;
