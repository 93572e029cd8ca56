//! Transition guards for the journey state machine.
//!
//! The storage layer applies every transition as a compare-and-set update.
//! When that update matches no row, the engine reloads the unit and runs the
//! matching guard here to report why. Guards check ownership before status so
//! a losing concurrent caller sees the same error as a sequential one.

use uuid::Uuid;

use crate::errors::BuildlineError;
use crate::models::checklist::{Checklist, ChecklistSchema};
use crate::models::journey::{Journey, JourneyStatus};

/// Operations that act on a journey.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Assign,
    Start,
    UpdateChecklist,
    Complete,
    SetPriority,
    Flag,
    SubmitQc,
}

impl Action {
    /// Verb phrase used in [`BuildlineError::InvalidTransition`] messages.
    pub fn verb(&self) -> &'static str {
        match self {
            Action::Assign => "assign",
            Action::Start => "start",
            Action::UpdateChecklist => "update the checklist of",
            Action::Complete => "complete",
            Action::SetPriority => "set priority on",
            Action::Flag => "flag",
            Action::SubmitQc => "submit QC for",
        }
    }

    /// Statuses from which the action is accepted.
    pub fn allowed_from(&self) -> &'static [JourneyStatus] {
        match self {
            Action::Assign => &[JourneyStatus::Inwarded],
            Action::Start => &[JourneyStatus::Assigned],
            Action::UpdateChecklist | Action::Complete | Action::SubmitQc => {
                &[JourneyStatus::InProgress]
            }
            Action::SetPriority | Action::Flag => {
                &[JourneyStatus::Assigned, JourneyStatus::InProgress]
            }
        }
    }
}

fn invalid(journey: &Journey, action: Action) -> BuildlineError {
    BuildlineError::InvalidTransition {
        barcode: journey.barcode.clone(),
        status: journey.current_status,
        action: action.verb(),
    }
}

fn ensure_status(journey: &Journey, action: Action) -> Result<(), BuildlineError> {
    if action.allowed_from().contains(&journey.current_status) {
        Ok(())
    } else {
        Err(invalid(journey, action))
    }
}

/// Another technician holds the unit.
fn ensure_not_foreign(journey: &Journey, requester: Uuid) -> Result<(), BuildlineError> {
    match journey.technician_id {
        Some(owner) if owner != requester => Err(BuildlineError::OwnershipViolation {
            barcode: journey.barcode.clone(),
        }),
        _ => Ok(()),
    }
}

pub fn ensure_can_assign(journey: &Journey) -> Result<(), BuildlineError> {
    ensure_status(journey, Action::Assign)
}

pub fn ensure_can_start(journey: &Journey, requester: Uuid) -> Result<(), BuildlineError> {
    ensure_not_foreign(journey, requester)?;
    ensure_status(journey, Action::Start)
}

/// Guard shared by checklist edits and completion: owner, in progress,
/// not yet handed to QC.
pub fn ensure_can_work(
    journey: &Journey,
    requester: Uuid,
    action: Action,
) -> Result<(), BuildlineError> {
    ensure_not_foreign(journey, requester)?;
    ensure_status(journey, action)?;
    if !journey.is_assigned_to(requester) || journey.is_awaiting_qc() {
        return Err(invalid(journey, action));
    }
    Ok(())
}

/// Completion needs closed flags and every schema item ticked.
pub fn ensure_can_complete(
    journey: &Journey,
    checklist: &Checklist,
    schema: &ChecklistSchema,
) -> Result<(), BuildlineError> {
    if journey.has_open_flags() {
        return Err(BuildlineError::CompletionBlocked {
            barcode: journey.barcode.clone(),
        });
    }
    let missing = schema.missing_items(checklist);
    if !missing.is_empty() {
        return Err(BuildlineError::IncompleteChecklist {
            missing: missing.into_iter().map(String::from).collect(),
        });
    }
    Ok(())
}

pub fn ensure_can_set_priority(journey: &Journey) -> Result<(), BuildlineError> {
    ensure_status(journey, Action::SetPriority)
}

/// Supervisors may flag any unit; technicians only their own.
pub fn ensure_can_flag(
    journey: &Journey,
    actor_id: Uuid,
    is_supervisor: bool,
) -> Result<(), BuildlineError> {
    if !is_supervisor && !journey.is_assigned_to(actor_id) {
        return Err(BuildlineError::OwnershipViolation {
            barcode: journey.barcode.clone(),
        });
    }
    ensure_status(journey, Action::Flag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::journey::test_support::journey;

    #[test]
    fn test_assign_only_from_inwarded() {
        assert!(ensure_can_assign(&journey(JourneyStatus::Inwarded)).is_ok());
        for status in [
            JourneyStatus::Assigned,
            JourneyStatus::InProgress,
            JourneyStatus::ReadyForSale,
        ] {
            let err = ensure_can_assign(&journey(status)).unwrap_err();
            assert_eq!(err.code(), "invalid_transition");
        }
    }

    #[test]
    fn test_start_checks_ownership_before_status() {
        let mut j = journey(JourneyStatus::InProgress);
        let owner = j.technician_id.unwrap();
        let stranger = Uuid::new_v4();

        // Already started: the owner gets a transition error, anyone else ownership.
        assert_eq!(ensure_can_start(&j, owner).unwrap_err().code(), "invalid_transition");
        assert_eq!(ensure_can_start(&j, stranger).unwrap_err().code(), "ownership_violation");

        j.current_status = JourneyStatus::Assigned;
        assert!(ensure_can_start(&j, owner).is_ok());
        assert_eq!(ensure_can_start(&j, stranger).unwrap_err().code(), "ownership_violation");
    }

    #[test]
    fn test_start_unassigned_unit_is_invalid_transition() {
        let j = journey(JourneyStatus::Inwarded);
        let err = ensure_can_start(&j, Uuid::new_v4()).unwrap_err();
        assert_eq!(err.code(), "invalid_transition");
    }

    #[test]
    fn test_work_refused_while_awaiting_qc() {
        let mut j = journey(JourneyStatus::InProgress);
        let owner = j.technician_id.unwrap();
        assert!(ensure_can_work(&j, owner, Action::UpdateChecklist).is_ok());

        j.assembly_completed_at = Some(chrono::Utc::now());
        let err = ensure_can_work(&j, owner, Action::Complete).unwrap_err();
        assert_eq!(err.code(), "invalid_transition");
    }

    #[test]
    fn test_work_requires_in_progress() {
        let j = journey(JourneyStatus::Assigned);
        let owner = j.technician_id.unwrap();
        let err = ensure_can_work(&j, owner, Action::UpdateChecklist).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot update the checklist of unit BIKE-001 while it is assigned"
        );
    }

    #[test]
    fn test_complete_blocked_by_flags_before_checklist() {
        let mut j = journey(JourneyStatus::InProgress);
        j.parts_missing.flagged = true;
        let schema = ChecklistSchema::current();
        let err = ensure_can_complete(&j, &Checklist::default(), schema).unwrap_err();
        assert_eq!(err.code(), "completion_blocked");
    }

    #[test]
    fn test_complete_reports_missing_items() {
        let j = journey(JourneyStatus::InProgress);
        let schema = ChecklistSchema::current();
        let mut checklist = Checklist::default();
        for key in schema.item_keys() {
            checklist.merge(&[(key.to_string(), true)].into_iter().collect());
        }
        assert!(ensure_can_complete(&j, &checklist, schema).is_ok());

        checklist.merge(&[("test_ride".to_string(), false)].into_iter().collect());
        match ensure_can_complete(&j, &checklist, schema).unwrap_err() {
            BuildlineError::IncompleteChecklist { missing } => {
                assert_eq!(missing, vec!["test_ride".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_flag_permissions() {
        let j = journey(JourneyStatus::Assigned);
        let owner = j.technician_id.unwrap();
        let supervisor = Uuid::new_v4();
        assert!(ensure_can_flag(&j, owner, false).is_ok());
        assert!(ensure_can_flag(&j, supervisor, true).is_ok());
        assert_eq!(
            ensure_can_flag(&j, Uuid::new_v4(), false).unwrap_err().code(),
            "ownership_violation"
        );

        let ready = journey(JourneyStatus::ReadyForSale);
        assert_eq!(
            ensure_can_flag(&ready, supervisor, true).unwrap_err().code(),
            "invalid_transition"
        );
    }

    #[test]
    fn test_set_priority_statuses() {
        assert!(ensure_can_set_priority(&journey(JourneyStatus::Assigned)).is_ok());
        assert!(ensure_can_set_priority(&journey(JourneyStatus::InProgress)).is_ok());
        assert!(ensure_can_set_priority(&journey(JourneyStatus::Inwarded)).is_err());
    }
}
