//! Journey entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::journey::{DamageFlag, PartsMissingFlag};
use domain::models::{Checklist, ChecklistVersion, Journey, JourneyStatus, QcStatus};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the bike_journeys table.
#[derive(Debug, Clone, FromRow)]
pub struct JourneyEntity {
    pub id: Uuid,
    pub barcode: String,
    pub model_sku: String,
    pub frame_number: Option<String>,
    pub grn_reference: Option<String>,
    pub current_status: String,
    pub checklist: serde_json::Value,
    pub checklist_version: i32,
    pub priority: bool,
    pub rework_count: i32,
    pub parts_missing: bool,
    pub missing_parts: Vec<String>,
    pub parts_missing_notes: Option<String>,
    pub damage_reported: bool,
    pub damage_notes: Option<String>,
    pub damage_photos: Vec<String>,
    pub qc_status: String,
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

impl JourneyEntity {
    /// Convert to domain model.
    ///
    /// Checklists recorded under an older schema version are migrated forward.
    pub fn into_domain(self) -> Journey {
        let current_status = self
            .current_status
            .parse::<JourneyStatus>()
            .unwrap_or(JourneyStatus::Inwarded);
        let qc_status = self.qc_status.parse::<QcStatus>().unwrap_or(QcStatus::None);
        let stored_version =
            ChecklistVersion::from_i32(self.checklist_version).unwrap_or(ChecklistVersion::CURRENT);
        let checklist = stored_version.migrate(Checklist::from_json(&self.checklist));

        Journey {
            id: self.id,
            barcode: self.barcode,
            model_sku: self.model_sku,
            frame_number: self.frame_number,
            grn_reference: self.grn_reference,
            current_status,
            checklist,
            checklist_version: ChecklistVersion::CURRENT,
            priority: self.priority,
            rework_count: self.rework_count,
            parts_missing: PartsMissingFlag {
                flagged: self.parts_missing,
                parts: self.missing_parts,
                notes: self.parts_missing_notes,
            },
            damage: DamageFlag {
                flagged: self.damage_reported,
                notes: self.damage_notes,
                photos: self.damage_photos,
            },
            qc_status,
            qc_failure_reason: self.qc_failure_reason,
            technician_id: self.technician_id,
            supervisor_id: self.supervisor_id,
            assembled_by: self.assembled_by,
            current_location_id: self.current_location_id,
            current_bin_id: self.current_bin_id,
            inwarded_at: self.inwarded_at,
            assigned_at: self.assigned_at,
            assembly_started_at: self.assembly_started_at,
            assembly_completed_at: self.assembly_completed_at,
            qc_completed_at: self.qc_completed_at,
            updated_at: self.updated_at,
        }
    }
}

impl From<JourneyEntity> for Journey {
    fn from(entity: JourneyEntity) -> Self {
        entity.into_domain()
    }
}

/// Journey row joined with the assigned technician's name.
#[derive(Debug, Clone, FromRow)]
pub struct JourneyWithTechnicianEntity {
    #[sqlx(flatten)]
    pub journey: JourneyEntity,
    pub technician_name: Option<String>,
}

/// Journey row after a zone-crossing update, with the bin it held before.
#[derive(Debug, Clone, FromRow)]
pub struct TransitionedJourneyEntity {
    #[sqlx(flatten)]
    pub journey: JourneyEntity,
    pub previous_bin_id: Option<Uuid>,
}

#[derive(Debug, Clone, FromRow)]
pub struct StatusCountEntity {
    pub current_status: String,
    pub count: i64,
}

/// Floor-wide counters for the dashboard.
#[derive(Debug, Clone, FromRow)]
pub struct DashboardCountsEntity {
    pub inwarded: i64,
    pub assigned: i64,
    pub in_progress: i64,
    pub awaiting_qc: i64,
    pub ready_for_sale: i64,
    pub priority_open: i64,
    pub parts_missing_open: i64,
    pub damage_open: i64,
    pub qc_failed_open: i64,
    pub completed_today: i64,
}
