//! Domain layer for the Buildline backend.
//!
//! This crate contains:
//! - Domain models (Journey, Bin, Location, Technician, checklist schema)
//! - Pure workflow rules (status transitions, zone derivation, QC evaluation,
//!   queue ordering)
//! - Domain error types

pub mod errors;
pub mod models;
pub mod services;

pub use errors::BuildlineError;
