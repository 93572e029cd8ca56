//! Journey domain model: one physical, serially-tracked bicycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;
use validator::Validate;

use super::bin::Zone;
use super::checklist::{Checklist, ChecklistPatch, ChecklistVersion};

// ============================================================================
// Status Enums
// ============================================================================

/// Workflow status of a journey.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JourneyStatus {
    Inwarded,
    Assigned,
    InProgress,
    ReadyForSale,
}

impl JourneyStatus {
    pub const ALL: [JourneyStatus; 4] = [
        JourneyStatus::Inwarded,
        JourneyStatus::Assigned,
        JourneyStatus::InProgress,
        JourneyStatus::ReadyForSale,
    ];

    /// Returns the string representation for database storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            JourneyStatus::Inwarded => "inwarded",
            JourneyStatus::Assigned => "assigned",
            JourneyStatus::InProgress => "in_progress",
            JourneyStatus::ReadyForSale => "ready_for_sale",
        }
    }

    /// The bin zone a unit in this status must occupy.
    pub fn zone(&self) -> Zone {
        match self {
            JourneyStatus::Inwarded => Zone::InwardZone,
            JourneyStatus::Assigned | JourneyStatus::InProgress => Zone::AssemblyZone,
            JourneyStatus::ReadyForSale => Zone::ReadyZone,
        }
    }

    /// Whether a technician must be attached in this status.
    pub fn requires_technician(&self) -> bool {
        matches!(self, JourneyStatus::Assigned | JourneyStatus::InProgress)
    }

    /// Edges of the workflow graph. `InProgress -> Assigned` is the QC rework loop.
    pub fn can_transition_to(&self, target: JourneyStatus) -> bool {
        matches!(
            (self, target),
            (JourneyStatus::Inwarded, JourneyStatus::Assigned)
                | (JourneyStatus::Assigned, JourneyStatus::InProgress)
                | (JourneyStatus::InProgress, JourneyStatus::ReadyForSale)
                | (JourneyStatus::InProgress, JourneyStatus::Assigned)
        )
    }
}

impl fmt::Display for JourneyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for JourneyStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inwarded" => Ok(JourneyStatus::Inwarded),
            "assigned" => Ok(JourneyStatus::Assigned),
            "in_progress" => Ok(JourneyStatus::InProgress),
            "ready_for_sale" => Ok(JourneyStatus::ReadyForSale),
            _ => Err(format!("Invalid journey status: {}", s)),
        }
    }
}

/// Outcome of the most recent QC inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QcStatus {
    None,
    Passed,
    Failed,
}

impl QcStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QcStatus::None => "none",
            QcStatus::Passed => "passed",
            QcStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for QcStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for QcStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(QcStatus::None),
            "passed" => Ok(QcStatus::Passed),
            "failed" => Ok(QcStatus::Failed),
            _ => Err(format!("Invalid QC status: {}", s)),
        }
    }
}

// ============================================================================
// Core Model
// ============================================================================

/// Parts-missing side flag.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartsMissingFlag {
    pub flagged: bool,
    pub parts: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Damage side flag.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DamageFlag {
    pub flagged: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub photos: Vec<String>,
}

/// A unit travelling through intake, assembly and QC.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Journey {
    pub id: Uuid,
    pub barcode: String,
    pub model_sku: String,
    pub frame_number: Option<String>,
    pub grn_reference: Option<String>,
    pub current_status: JourneyStatus,
    pub checklist: Checklist,
    pub checklist_version: ChecklistVersion,
    pub priority: bool,
    pub rework_count: i32,
    pub parts_missing: PartsMissingFlag,
    pub damage: DamageFlag,
    pub qc_status: QcStatus,
    pub qc_failure_reason: Option<String>,
    pub technician_id: Option<Uuid>,
    pub supervisor_id: Option<Uuid>,
    pub assembled_by: Option<Uuid>,
    pub current_location_id: Uuid,
    pub current_bin_id: Option<Uuid>,
    pub inwarded_at: DateTime<Utc>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub assembly_started_at: Option<DateTime<Utc>>,
    pub assembly_completed_at: Option<DateTime<Utc>>,
    pub qc_completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl Journey {
    /// Zone implied by the current status.
    pub fn zone(&self) -> Zone {
        self.current_status.zone()
    }

    /// Assembly is complete and the unit waits for a QC decision.
    pub fn is_awaiting_qc(&self) -> bool {
        self.current_status == JourneyStatus::InProgress && self.assembly_completed_at.is_some()
    }

    /// Parts-missing or damage flags that block completion.
    pub fn has_open_flags(&self) -> bool {
        self.parts_missing.flagged || self.damage.flagged
    }

    pub fn is_assigned_to(&self, technician_id: Uuid) -> bool {
        self.technician_id == Some(technician_id)
    }

    /// Billing may invoice only units that passed QC and are sale-ready.
    pub fn can_invoice(&self) -> bool {
        self.current_status == JourneyStatus::ReadyForSale && self.qc_status == QcStatus::Passed
    }
}

// ============================================================================
// Request DTOs
// ============================================================================

/// Request payload for inwarding one unit.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct InwardRequest {
    #[validate(custom(function = "shared::validation::validate_barcode"))]
    pub barcode: String,

    #[validate(length(min = 1, max = 64, message = "model_sku must be 1-64 characters"))]
    pub model_sku: String,

    pub location_id: Uuid,

    #[validate(length(min = 1, max = 64, message = "frame_number must be 1-64 characters"))]
    pub frame_number: Option<String>,

    #[validate(length(min = 1, max = 64, message = "grn_reference must be 1-64 characters"))]
    pub grn_reference: Option<String>,

    /// Inward-zone bin to reserve a slot in. Best-effort.
    pub bin_location_id: Option<Uuid>,
}

/// Request payload for inwarding many units at once.
#[derive(Debug, Clone, Deserialize)]
pub struct BulkInwardRequest {
    pub units: Vec<InwardRequest>,
}

/// Request payload for assigning a unit to a technician.
#[derive(Debug, Clone, Deserialize)]
pub struct AssignRequest {
    pub barcode: String,
    pub technician_id: Uuid,
    /// Assembly-zone bin to move into; auto-selected when absent.
    pub target_bin_id: Option<Uuid>,
}

/// Request payload for assigning many units to one technician.
#[derive(Debug, Clone, Deserialize)]
pub struct BulkAssignRequest {
    pub barcodes: Vec<String>,
    pub technician_id: Uuid,
}

/// Request payload carrying only a barcode.
#[derive(Debug, Clone, Deserialize)]
pub struct BarcodeRequest {
    pub barcode: String,
}

/// Partial checklist save.
#[derive(Debug, Clone, Deserialize)]
pub struct ChecklistUpdateRequest {
    pub barcode: String,
    pub checklist: ChecklistPatch,
}

/// Completion request with the final checklist state.
#[derive(Debug, Clone, Deserialize)]
pub struct CompleteRequest {
    pub barcode: String,
    #[serde(default)]
    pub checklist: ChecklistPatch,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetPriorityRequest {
    pub barcode: String,
    pub priority: bool,
}

fn default_true() -> bool {
    true
}

/// Raise or clear the parts-missing flag.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PartsMissingRequest {
    pub barcode: String,

    #[serde(default = "default_true")]
    pub parts_missing: bool,

    #[serde(default)]
    #[validate(custom(function = "shared::validation::validate_part_names"))]
    pub missing_parts: Vec<String>,

    #[validate(length(max = 2000, message = "notes must be at most 2000 characters"))]
    pub notes: Option<String>,
}

/// Raise or clear the damage flag.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct DamageReportRequest {
    pub barcode: String,

    #[serde(default = "default_true")]
    pub damage_reported: bool,

    #[validate(length(max = 2000, message = "notes must be at most 2000 characters"))]
    pub notes: Option<String>,

    #[serde(default)]
    #[validate(custom(function = "shared::validation::validate_photo_refs"))]
    pub photos: Vec<String>,
}

// ============================================================================
// Response DTOs
// ============================================================================

/// Journey with derived read-model fields.
#[derive(Debug, Clone, Serialize)]
pub struct JourneyResponse {
    #[serde(flatten)]
    pub journey: Journey,
    pub zone: Zone,
    pub awaiting_qc: bool,
    pub can_invoice: bool,
}

impl From<Journey> for JourneyResponse {
    fn from(journey: Journey) -> Self {
        Self {
            zone: journey.zone(),
            awaiting_qc: journey.is_awaiting_qc(),
            can_invoice: journey.can_invoice(),
            journey,
        }
    }
}

/// Ownership block returned by a scan.
#[derive(Debug, Clone, Serialize)]
pub struct Ownership {
    pub is_assigned_to_me: bool,
    pub assigned_technician_name: Option<String>,
}

/// Scan result for the requesting actor.
#[derive(Debug, Clone, Serialize)]
pub struct ScanResponse {
    pub journey: JourneyResponse,
    pub ownership: Ownership,
    pub checklist_progress: Vec<super::checklist::CategoryProgress>,
}

/// Short error description used in bulk and best-effort reports.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ErrorSummary {
    pub error: String,
    pub message: String,
}

impl From<&crate::BuildlineError> for ErrorSummary {
    fn from(err: &crate::BuildlineError) -> Self {
        Self {
            error: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

/// Result of a transition that places the unit in a bin (inward, assign).
#[derive(Debug, Clone, Serialize)]
pub struct TransitionResponse {
    pub journey: JourneyResponse,
    /// Set when no bin could be reserved; the unit is left unbinned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bin_warning: Option<ErrorSummary>,
}

/// One failed item in a bulk operation.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BulkFailure {
    pub barcode: String,
    pub error: String,
    pub message: String,
}

impl BulkFailure {
    pub fn new(barcode: impl Into<String>, err: &crate::BuildlineError) -> Self {
        Self {
            barcode: barcode.into(),
            error: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

/// Partial-success report of a bulk operation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BulkResult {
    pub successful: Vec<String>,
    pub failed: Vec<BulkFailure>,
    /// Units created without their requested bin (bulk inward only).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub bin_warnings: Vec<BulkFailure>,
}

/// Billing boundary answer.
#[derive(Debug, Clone, Serialize)]
pub struct CanInvoiceResponse {
    pub barcode: String,
    pub can_invoice: bool,
    pub current_status: JourneyStatus,
    pub qc_status: QcStatus,
}

impl From<&Journey> for CanInvoiceResponse {
    fn from(j: &Journey) -> Self {
        Self {
            barcode: j.barcode.clone(),
            can_invoice: j.can_invoice(),
            current_status: j.current_status,
            qc_status: j.qc_status,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::journey;
    use super::*;

    #[test]
    fn test_status_round_trips_through_storage_strings() {
        for status in JourneyStatus::ALL {
            assert_eq!(status.as_str().parse::<JourneyStatus>(), Ok(status));
        }
        assert!("shipped".parse::<JourneyStatus>().is_err());
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&JourneyStatus::ReadyForSale).unwrap();
        assert_eq!(json, "\"ready_for_sale\"");
        let status: JourneyStatus = serde_json::from_str("\"in_progress\"").unwrap();
        assert_eq!(status, JourneyStatus::InProgress);
    }

    #[test]
    fn test_zone_derivation() {
        assert_eq!(JourneyStatus::Inwarded.zone(), Zone::InwardZone);
        assert_eq!(JourneyStatus::Assigned.zone(), Zone::AssemblyZone);
        assert_eq!(JourneyStatus::InProgress.zone(), Zone::AssemblyZone);
        assert_eq!(JourneyStatus::ReadyForSale.zone(), Zone::ReadyZone);
    }

    #[test]
    fn test_requires_technician() {
        assert!(!JourneyStatus::Inwarded.requires_technician());
        assert!(JourneyStatus::Assigned.requires_technician());
        assert!(JourneyStatus::InProgress.requires_technician());
        assert!(!JourneyStatus::ReadyForSale.requires_technician());
    }

    #[test]
    fn test_transition_graph() {
        use JourneyStatus::*;
        assert!(Inwarded.can_transition_to(Assigned));
        assert!(Assigned.can_transition_to(InProgress));
        assert!(InProgress.can_transition_to(ReadyForSale));
        assert!(InProgress.can_transition_to(Assigned));

        assert!(!Inwarded.can_transition_to(InProgress));
        assert!(!Assigned.can_transition_to(ReadyForSale));
        assert!(!ReadyForSale.can_transition_to(Assigned));
        assert!(!ReadyForSale.can_transition_to(Inwarded));
    }

    #[test]
    fn test_qc_status_parse() {
        assert_eq!("passed".parse::<QcStatus>(), Ok(QcStatus::Passed));
        assert_eq!("none".parse::<QcStatus>(), Ok(QcStatus::None));
        assert!("maybe".parse::<QcStatus>().is_err());
    }

    #[test]
    fn test_awaiting_qc() {
        let mut j = journey(JourneyStatus::InProgress);
        assert!(!j.is_awaiting_qc());
        j.assembly_completed_at = Some(Utc::now());
        assert!(j.is_awaiting_qc());
    }

    #[test]
    fn test_can_invoice_requires_passed_qc_and_ready_status() {
        let mut j = journey(JourneyStatus::ReadyForSale);
        assert!(!j.can_invoice());
        j.qc_status = QcStatus::Passed;
        assert!(j.can_invoice());

        let mut j = journey(JourneyStatus::InProgress);
        j.qc_status = QcStatus::Passed;
        assert!(!j.can_invoice());
    }

    #[test]
    fn test_inward_request_validation() {
        let json = r#"{
            "barcode": "BIKE-001",
            "model_sku": "MTB-26-BLK",
            "location_id": "550e8400-e29b-41d4-a716-446655440000"
        }"#;
        let request: InwardRequest = serde_json::from_str(json).unwrap();
        assert!(request.validate().is_ok());
        assert!(request.bin_location_id.is_none());

        let bad = InwardRequest {
            barcode: "no spaces allowed".to_string(),
            ..request
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_parts_missing_request_defaults_to_flagging() {
        let json = r#"{"barcode": "BIKE-001", "missing_parts": ["Pedals"]}"#;
        let request: PartsMissingRequest = serde_json::from_str(json).unwrap();
        assert!(request.parts_missing);
        assert_eq!(request.missing_parts, vec!["Pedals".to_string()]);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_journey_response_includes_derived_fields() {
        let j = journey(JourneyStatus::Inwarded);
        let json = serde_json::to_value(JourneyResponse::from(j)).unwrap();
        assert_eq!(json["barcode"], "BIKE-001");
        assert_eq!(json["zone"], "inward_zone");
        assert_eq!(json["awaiting_qc"], false);
        assert_eq!(json["can_invoice"], false);
        assert_eq!(json["current_status"], "inwarded");
    }

    #[test]
    fn test_bulk_failure_carries_error_code() {
        let err = crate::BuildlineError::JourneyNotFound {
            barcode: "B".to_string(),
        };
        let failure = BulkFailure::new("B", &err);
        assert_eq!(failure.error, "journey_not_found");
        assert_eq!(failure.barcode, "B");
    }
}
