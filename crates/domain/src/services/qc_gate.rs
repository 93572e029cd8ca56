//! Decision rules of the QC checkpoint.

use crate::errors::BuildlineError;
use crate::models::journey::{Journey, JourneyStatus};
use crate::models::qc::QcResult;
use crate::services::transitions::Action;

/// What a QC submission does to a unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QcDecision {
    /// The unit goes to sale and its technician is released.
    Pass,
    /// The unit returns to its technician for another rework loop.
    Fail { reason: String },
}

impl QcDecision {
    pub fn result(&self) -> QcResult {
        match self {
            QcDecision::Pass => QcResult::Passed,
            QcDecision::Fail { .. } => QcResult::Failed,
        }
    }

    /// Status the unit holds after the decision is applied.
    pub fn next_status(&self) -> JourneyStatus {
        match self {
            QcDecision::Pass => JourneyStatus::ReadyForSale,
            QcDecision::Fail { .. } => JourneyStatus::Assigned,
        }
    }
}

/// Checks a submission against the unit and returns its effect.
///
/// The unit must be awaiting QC. A failure needs a non-blank reason. A pass
/// is refused while a parts-missing or damage flag is open, even if it was
/// raised after completion.
pub fn evaluate_submission(
    journey: &Journey,
    result: QcResult,
    failure_reason: Option<&str>,
) -> Result<QcDecision, BuildlineError> {
    if !journey.is_awaiting_qc() {
        return Err(BuildlineError::InvalidTransition {
            barcode: journey.barcode.clone(),
            status: journey.current_status,
            action: Action::SubmitQc.verb(),
        });
    }

    match result {
        QcResult::Passed => {
            if journey.has_open_flags() {
                return Err(BuildlineError::CompletionBlocked {
                    barcode: journey.barcode.clone(),
                });
            }
            Ok(QcDecision::Pass)
        }
        QcResult::Failed => {
            let reason = failure_reason
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .ok_or_else(|| {
                    BuildlineError::Validation(
                        "failure_reason: required when result is failed".to_string(),
                    )
                })?;
            Ok(QcDecision::Fail {
                reason: reason.to_string(),
            })
        }
    }
}
