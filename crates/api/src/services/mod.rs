//! Buildline engine services.
//!
//! Each service wraps the repositories it needs and turns the pure rules of
//! the domain crate into committed state changes.

pub mod assignment_queue;
pub mod bin_capacity;
pub mod bootstrap;
pub mod checklist_tracker;
pub mod floor_board;
pub mod journey_engine;
pub mod qc_gate;

pub use assignment_queue::AssignmentQueue;
pub use bin_capacity::BinCapacityManager;
pub use checklist_tracker::ChecklistTracker;
pub use floor_board::FloorBoard;
pub use journey_engine::JourneyEngine;
pub use qc_gate::QcGate;

use domain::models::journey::BulkFailure;
use domain::BuildlineError;
use tracing::error;

/// Per-item failure of a bulk operation. Storage failures are logged and
/// reported without their database detail.
pub(crate) fn bulk_failure(barcode: String, err: &BuildlineError) -> BulkFailure {
    match err {
        BuildlineError::Storage(e) => {
            error!(barcode = %barcode, error = %e, "Bulk item failed on storage");
            BulkFailure {
                barcode,
                error: "internal_error".to_string(),
                message: "An internal error occurred".to_string(),
            }
        }
        other => BulkFailure::new(barcode, other),
    }
}

/// Rejects empty and oversized batches before any item is processed.
pub(crate) fn check_bulk_size(len: usize, max: usize) -> Result<(), BuildlineError> {
    if len == 0 {
        return Err(BuildlineError::Validation(
            "batch must contain at least one item".to_string(),
        ));
    }
    if len > max {
        return Err(BuildlineError::Validation(format!(
            "batch of {} items exceeds the maximum of {}",
            len, max
        )));
    }
    Ok(())
}
