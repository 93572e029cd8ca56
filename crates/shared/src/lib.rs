//! Shared utilities for the Buildline backend.
//!
//! This crate provides helpers used across all other crates:
//! - Input validation (barcodes, facility codes, part lists, photo references)
//! - Operator-local calendar day arithmetic

pub mod time;
pub mod validation;
