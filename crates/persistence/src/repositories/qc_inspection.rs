//! QC inspection repository.

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::entities::QcInspectionEntity;
use crate::metrics::QueryTimer;

#[derive(Clone)]
pub struct QcInspectionRepository {
    pool: PgPool,
}

impl QcInspectionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Appends an inspection with the next attempt number. Must run on the
    /// connection holding the journey row lock so attempts stay sequential.
    pub async fn record_in(
        conn: &mut PgConnection,
        journey_id: Uuid,
        result: &str,
        failure_reason: Option<&str>,
        photos: &[String],
        inspected_by: Uuid,
    ) -> Result<QcInspectionEntity, sqlx::Error> {
        sqlx::query_as::<_, QcInspectionEntity>(
            r#"
            INSERT INTO qc_inspections (journey_id, attempt, result, failure_reason, photos, inspected_by)
            VALUES (
                $1,
                COALESCE((SELECT MAX(attempt) FROM qc_inspections WHERE journey_id = $1), 0) + 1,
                $2, $3, $4, $5
            )
            RETURNING id, journey_id, attempt, result, failure_reason, photos, inspected_by, created_at
            "#,
        )
        .bind(journey_id)
        .bind(result)
        .bind(failure_reason)
        .bind(photos)
        .bind(inspected_by)
        .fetch_one(conn)
        .await
    }

    pub async fn list_for_journey(
        &self,
        journey_id: Uuid,
    ) -> Result<Vec<QcInspectionEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_qc_inspections");
        let result = sqlx::query_as::<_, QcInspectionEntity>(
            r#"
            SELECT id, journey_id, attempt, result, failure_reason, photos, inspected_by, created_at
            FROM qc_inspections
            WHERE journey_id = $1
            ORDER BY attempt ASC
            "#,
        )
        .bind(journey_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }
}
