//! Error kinds surfaced by the assembly workflow.

use thiserror::Error;
use uuid::Uuid;

use crate::models::bin::Zone;
use crate::models::journey::JourneyStatus;

/// Errors raised by Buildline operations.
///
/// Every kind carries a stable snake_case [`code`](BuildlineError::code) so
/// clients and bulk reports can render an actionable message.
#[derive(Debug, Error)]
pub enum BuildlineError {
    #[error("Barcode {barcode} is already registered")]
    DuplicateBarcode { barcode: String },

    #[error("Cannot {action} unit {barcode} while it is {status}")]
    InvalidTransition {
        barcode: String,
        status: JourneyStatus,
        action: &'static str,
    },

    #[error("Unit {barcode} is assigned to another technician")]
    OwnershipViolation { barcode: String },

    #[error("Technician {technician_id} not found or cannot take assembly work")]
    TechnicianNotFound { technician_id: Uuid },

    #[error("Bin {bin_id} is full ({occupancy}/{capacity})")]
    BinFull {
        bin_id: Uuid,
        capacity: i32,
        occupancy: i32,
    },

    #[error("Checklist incomplete: {} item(s) outstanding", .missing.len())]
    IncompleteChecklist { missing: Vec<String> },

    /// Warning-level: a release asked for more slots than the bin held.
    #[error("Bin {bin_id} released {requested} slot(s) while holding {previous}")]
    BinAccountingAnomaly {
        bin_id: Uuid,
        previous: i32,
        requested: i32,
    },

    #[error("Unit {barcode} not found")]
    JourneyNotFound { barcode: String },

    #[error("Location {location_id} not found")]
    LocationNotFound { location_id: Uuid },

    #[error("Bin {bin_id} not found")]
    BinNotFound { bin_id: Uuid },

    #[error("Bin {bin_id} is inactive")]
    BinInactive { bin_id: Uuid },

    #[error("Bin {bin_id} belongs to {actual}, expected {expected}")]
    BinZoneMismatch {
        bin_id: Uuid,
        expected: Zone,
        actual: Zone,
    },

    #[error("Bin {bin_id} is not at location {location_id}")]
    BinLocationMismatch { bin_id: Uuid, location_id: Uuid },

    #[error("Unit {barcode} has open parts-missing or damage flags")]
    CompletionBlocked { barcode: String },

    #[error("Unknown checklist item(s): {}", .keys.join(", "))]
    UnknownChecklistItem { keys: Vec<String> },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

impl BuildlineError {
    /// Stable machine-readable code for this error kind.
    pub fn code(&self) -> &'static str {
        match self {
            BuildlineError::DuplicateBarcode { .. } => "duplicate_barcode",
            BuildlineError::InvalidTransition { .. } => "invalid_transition",
            BuildlineError::OwnershipViolation { .. } => "ownership_violation",
            BuildlineError::TechnicianNotFound { .. } => "technician_not_found",
            BuildlineError::BinFull { .. } => "bin_full",
            BuildlineError::IncompleteChecklist { .. } => "incomplete_checklist",
            BuildlineError::BinAccountingAnomaly { .. } => "bin_accounting_anomaly",
            BuildlineError::JourneyNotFound { .. } => "journey_not_found",
            BuildlineError::LocationNotFound { .. } => "location_not_found",
            BuildlineError::BinNotFound { .. } => "bin_not_found",
            BuildlineError::BinInactive { .. } => "bin_inactive",
            BuildlineError::BinZoneMismatch { .. } => "bin_zone_mismatch",
            BuildlineError::BinLocationMismatch { .. } => "bin_location_mismatch",
            BuildlineError::CompletionBlocked { .. } => "completion_blocked",
            BuildlineError::UnknownChecklistItem { .. } => "unknown_checklist_item",
            BuildlineError::Validation(_) => "validation_error",
            BuildlineError::Storage(_) => "internal_error",
        }
    }

    /// Whether this is a bin placement failure that callers treat as best-effort.
    pub fn is_bin_placement_failure(&self) -> bool {
        matches!(
            self,
            BuildlineError::BinFull { .. }
                | BuildlineError::BinNotFound { .. }
                | BuildlineError::BinInactive { .. }
                | BuildlineError::BinZoneMismatch { .. }
                | BuildlineError::BinLocationMismatch { .. }
        )
    }

    /// Builds a [`BuildlineError::Validation`] from `validator` output.
    pub fn from_validation(errors: &validator::ValidationErrors) -> Self {
        let messages: Vec<String> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(m) => format!("{}: {}", field, m),
                    None => format!("{}: invalid value", field),
                })
            })
            .collect();
        BuildlineError::Validation(messages.join(", "))
    }
}
