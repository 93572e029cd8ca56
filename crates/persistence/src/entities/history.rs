//! Audit trail entities (database row mappings).

use chrono::{DateTime, Utc};
use domain::models::{BinMovement, JourneyStatus, MovementOutcome, StatusHistoryEntry};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the journey_status_history table.
#[derive(Debug, Clone, FromRow)]
pub struct StatusHistoryEntity {
    pub id: i64,
    pub journey_id: Uuid,
    pub from_status: Option<String>,
    pub to_status: String,
    pub changed_by: Option<Uuid>,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<StatusHistoryEntity> for StatusHistoryEntry {
    fn from(entity: StatusHistoryEntity) -> Self {
        StatusHistoryEntry {
            id: entity.id,
            journey_id: entity.journey_id,
            from_status: entity
                .from_status
                .and_then(|s| s.parse::<JourneyStatus>().ok()),
            to_status: entity
                .to_status
                .parse::<JourneyStatus>()
                .unwrap_or(JourneyStatus::Inwarded),
            changed_by: entity.changed_by,
            reason: entity.reason,
            created_at: entity.created_at,
        }
    }
}

/// Database row mapping for the bin_movement_history table.
#[derive(Debug, Clone, FromRow)]
pub struct BinMovementEntity {
    pub id: i64,
    pub journey_id: Uuid,
    pub from_bin_id: Option<Uuid>,
    pub to_bin_id: Option<Uuid>,
    pub outcome: String,
    pub failure_code: Option<String>,
    pub moved_by: Option<Uuid>,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<BinMovementEntity> for BinMovement {
    fn from(entity: BinMovementEntity) -> Self {
        BinMovement {
            id: entity.id,
            journey_id: entity.journey_id,
            from_bin_id: entity.from_bin_id,
            to_bin_id: entity.to_bin_id,
            outcome: entity
                .outcome
                .parse::<MovementOutcome>()
                .unwrap_or(MovementOutcome::Failed),
            failure_code: entity.failure_code,
            moved_by: entity.moved_by,
            reason: entity.reason,
            created_at: entity.created_at,
        }
    }
}
