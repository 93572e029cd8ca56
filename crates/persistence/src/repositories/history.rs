//! Append-only audit trail repositories.

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::entities::{BinMovementEntity, StatusHistoryEntity};
use crate::metrics::QueryTimer;

/// Repository for the journey status history.
#[derive(Clone)]
pub struct StatusHistoryRepository {
    pool: PgPool,
}

impl StatusHistoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Appends a status change on the caller's connection so it commits with
    /// the status update itself.
    pub async fn record_in(
        conn: &mut PgConnection,
        journey_id: Uuid,
        from_status: Option<&str>,
        to_status: &str,
        changed_by: Option<Uuid>,
        reason: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO journey_status_history (journey_id, from_status, to_status, changed_by, reason)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(journey_id)
        .bind(from_status)
        .bind(to_status)
        .bind(changed_by)
        .bind(reason)
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Status history of a unit, oldest first.
    pub async fn list_for_journey(
        &self,
        journey_id: Uuid,
    ) -> Result<Vec<StatusHistoryEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_status_history");
        let result = sqlx::query_as::<_, StatusHistoryEntity>(
            r#"
            SELECT id, journey_id, from_status, to_status, changed_by, reason, created_at
            FROM journey_status_history
            WHERE journey_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(journey_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }
}

/// Input data for a bin movement row.
#[derive(Debug, Clone)]
pub struct NewBinMovement {
    pub journey_id: Uuid,
    pub from_bin_id: Option<Uuid>,
    pub to_bin_id: Option<Uuid>,
    pub outcome: &'static str,
    pub failure_code: Option<&'static str>,
    pub moved_by: Option<Uuid>,
    pub reason: Option<String>,
}

/// Repository for the bin movement history.
#[derive(Clone)]
pub struct BinMovementRepository {
    pool: PgPool,
}

impl BinMovementRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn record(&self, input: NewBinMovement) -> Result<BinMovementEntity, sqlx::Error> {
        let timer = QueryTimer::new("insert_bin_movement");
        let result = sqlx::query_as::<_, BinMovementEntity>(
            r#"
            INSERT INTO bin_movement_history
                (journey_id, from_bin_id, to_bin_id, outcome, failure_code, moved_by, reason)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, journey_id, from_bin_id, to_bin_id, outcome, failure_code, moved_by, reason, created_at
            "#,
        )
        .bind(input.journey_id)
        .bind(input.from_bin_id)
        .bind(input.to_bin_id)
        .bind(input.outcome)
        .bind(input.failure_code)
        .bind(input.moved_by)
        .bind(input.reason)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Movement attempts of a unit, oldest first.
    pub async fn list_for_journey(
        &self,
        journey_id: Uuid,
    ) -> Result<Vec<BinMovementEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_bin_movements");
        let result = sqlx::query_as::<_, BinMovementEntity>(
            r#"
            SELECT id, journey_id, from_bin_id, to_bin_id, outcome, failure_code, moved_by, reason, created_at
            FROM bin_movement_history
            WHERE journey_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(journey_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }
}
