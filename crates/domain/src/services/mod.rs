//! Pure workflow rules for Buildline.
//!
//! Nothing here performs I/O. The engine services in the api crate load rows,
//! consult these rules, and then issue conditional updates.

pub mod qc_gate;
pub mod queue;
pub mod transitions;

pub use qc_gate::{evaluate_submission, QcDecision};
pub use queue::{queue_order, sort_queue};
pub use transitions::Action;
