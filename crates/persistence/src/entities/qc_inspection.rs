//! QC inspection entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{QcInspection, QcResult};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the qc_inspections table.
#[derive(Debug, Clone, FromRow)]
pub struct QcInspectionEntity {
    pub id: i64,
    pub journey_id: Uuid,
    pub attempt: i32,
    pub result: String,
    pub failure_reason: Option<String>,
    pub photos: Vec<String>,
    pub inspected_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<QcInspectionEntity> for QcInspection {
    fn from(entity: QcInspectionEntity) -> Self {
        QcInspection {
            id: entity.id,
            journey_id: entity.journey_id,
            attempt: entity.attempt,
            result: entity.result.parse::<QcResult>().unwrap_or(QcResult::Failed),
            failure_reason: entity.failure_reason,
            photos: entity.photos,
            inspected_by: entity.inspected_by,
            created_at: entity.created_at,
        }
    }
}
