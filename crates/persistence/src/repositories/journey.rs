//! Journey repository: compare-and-set status transitions.
//!
//! Every transition is a single UPDATE whose WHERE clause carries the guard
//! (expected status, owner, flags). `None` means the guard did not hold and
//! nothing changed; the caller reloads the row to explain why.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::entities::{
    BinReleaseEntity, DashboardCountsEntity, JourneyEntity, JourneyWithTechnicianEntity,
    QcInspectionEntity, StatusCountEntity, TransitionedJourneyEntity,
};
use crate::metrics::QueryTimer;
use crate::repositories::{BinRepository, QcInspectionRepository, StatusHistoryRepository};

/// Input data for inwarding a unit.
#[derive(Debug, Clone)]
pub struct NewJourney {
    pub barcode: String,
    pub model_sku: String,
    pub frame_number: Option<String>,
    pub grn_reference: Option<String>,
    pub location_id: Uuid,
    pub checklist_version: i32,
}

/// Side-flag update. `owner` restricts the update to units held by that
/// technician; `None` is the supervisor path.
#[derive(Debug, Clone)]
pub struct FlagUpdate {
    pub owner: Option<Uuid>,
    pub flagged: bool,
    pub notes: Option<String>,
    /// Part names or photo references, depending on the flag.
    pub items: Vec<String>,
}

/// A unit that left its zone, with the release of the bin it held.
#[derive(Debug, Clone)]
pub struct ZoneExit {
    pub journey: JourneyEntity,
    pub released_bin_id: Option<Uuid>,
    pub release: Option<BinReleaseEntity>,
}

#[derive(Clone)]
pub struct JourneyRepository {
    pool: PgPool,
}

impl JourneyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts an `inwarded` unit and its first history row in one transaction.
    /// A duplicate barcode surfaces as a unique violation (SQLSTATE 23505).
    pub async fn create(
        &self,
        input: &NewJourney,
        created_by: Option<Uuid>,
    ) -> Result<JourneyEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_journey");
        let mut tx = self.pool.begin().await?;

        let journey = sqlx::query_as::<_, JourneyEntity>(
            r#"
            INSERT INTO bike_journeys
                (barcode, model_sku, frame_number, grn_reference, current_location_id, checklist_version)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(&input.barcode)
        .bind(&input.model_sku)
        .bind(&input.frame_number)
        .bind(&input.grn_reference)
        .bind(input.location_id)
        .bind(input.checklist_version)
        .fetch_one(&mut *tx)
        .await?;

        StatusHistoryRepository::record_in(&mut tx, journey.id, None, "inwarded", created_by, None)
            .await?;

        tx.commit().await?;
        timer.record();
        Ok(journey)
    }

    pub async fn find_by_barcode(&self, barcode: &str) -> Result<Option<JourneyEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_journey_by_barcode");
        let result = sqlx::query_as::<_, JourneyEntity>("SELECT * FROM bike_journeys WHERE barcode = $1")
            .bind(barcode)
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        result
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<JourneyEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_journey_by_id");
        let result = sqlx::query_as::<_, JourneyEntity>("SELECT * FROM bike_journeys WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        result
    }

    /// Unit by barcode with the assigned technician's name.
    pub async fn find_with_technician(
        &self,
        barcode: &str,
    ) -> Result<Option<JourneyWithTechnicianEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_journey_with_technician");
        let result = sqlx::query_as::<_, JourneyWithTechnicianEntity>(
            r#"
            SELECT j.*, t.name AS technician_name
            FROM bike_journeys j
            LEFT JOIN buildline_technicians t ON t.id = j.technician_id
            WHERE j.barcode = $1
            "#,
        )
        .bind(barcode)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// `inwarded -> assigned`. Leaves the inward bin in the same transaction.
    pub async fn assign(
        &self,
        barcode: &str,
        technician_id: Uuid,
        supervisor_id: Uuid,
    ) -> Result<Option<ZoneExit>, sqlx::Error> {
        let timer = QueryTimer::new("assign_journey");
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, TransitionedJourneyEntity>(
            r#"
            WITH prev AS (
                SELECT id, current_bin_id FROM bike_journeys
                WHERE barcode = $1 AND current_status = 'inwarded'
                FOR UPDATE
            )
            UPDATE bike_journeys j
            SET current_status = 'assigned',
                technician_id = $2,
                supervisor_id = $3,
                assigned_at = NOW(),
                current_bin_id = NULL,
                updated_at = NOW()
            FROM prev
            WHERE j.id = prev.id
            RETURNING j.*, prev.current_bin_id AS previous_bin_id
            "#,
        )
        .bind(barcode)
        .bind(technician_id)
        .bind(supervisor_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        StatusHistoryRepository::record_in(
            &mut tx,
            row.journey.id,
            Some("inwarded"),
            "assigned",
            Some(supervisor_id),
            None,
        )
        .await?;
        let exit = Self::leave_bin(&mut tx, row).await?;

        tx.commit().await?;
        timer.record();
        Ok(Some(exit))
    }

    /// `assigned -> in_progress`, only for the assigned technician.
    pub async fn start(
        &self,
        barcode: &str,
        technician_id: Uuid,
    ) -> Result<Option<JourneyEntity>, sqlx::Error> {
        let timer = QueryTimer::new("start_journey");
        let mut tx = self.pool.begin().await?;

        let journey = sqlx::query_as::<_, JourneyEntity>(
            r#"
            UPDATE bike_journeys
            SET current_status = 'in_progress', assembly_started_at = NOW(), updated_at = NOW()
            WHERE barcode = $1 AND current_status = 'assigned' AND technician_id = $2
            RETURNING *
            "#,
        )
        .bind(barcode)
        .bind(technician_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(journey) = journey else {
            return Ok(None);
        };

        StatusHistoryRepository::record_in(
            &mut tx,
            journey.id,
            Some("assigned"),
            "in_progress",
            Some(technician_id),
            None,
        )
        .await?;

        tx.commit().await?;
        timer.record();
        Ok(Some(journey))
    }

    /// Per-key checklist merge done by PostgreSQL (`jsonb ||`), so concurrent
    /// saves of different keys never overwrite each other.
    pub async fn merge_checklist(
        &self,
        barcode: &str,
        technician_id: Uuid,
        patch: &serde_json::Value,
    ) -> Result<Option<JourneyEntity>, sqlx::Error> {
        let timer = QueryTimer::new("merge_journey_checklist");
        let result = sqlx::query_as::<_, JourneyEntity>(
            r#"
            UPDATE bike_journeys
            SET checklist = checklist || $2::jsonb, updated_at = NOW()
            WHERE barcode = $1
              AND current_status = 'in_progress'
              AND technician_id = $3
              AND assembly_completed_at IS NULL
            RETURNING *
            "#,
        )
        .bind(barcode)
        .bind(patch)
        .bind(technician_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Marks assembly complete when no flag is open and the stored checklist
    /// contains `required` (every item `true`). Status stays `in_progress`.
    /// The completion is also appended to `assembly_completions`, which QC
    /// rework never touches.
    pub async fn complete(
        &self,
        barcode: &str,
        technician_id: Uuid,
        required: &serde_json::Value,
    ) -> Result<Option<JourneyEntity>, sqlx::Error> {
        let timer = QueryTimer::new("complete_journey");
        let mut tx = self.pool.begin().await?;

        let journey = sqlx::query_as::<_, JourneyEntity>(
            r#"
            UPDATE bike_journeys
            SET assembly_completed_at = NOW(), assembled_by = $2, updated_at = NOW()
            WHERE barcode = $1
              AND current_status = 'in_progress'
              AND technician_id = $2
              AND assembly_completed_at IS NULL
              AND NOT parts_missing
              AND NOT damage_reported
              AND checklist @> $3::jsonb
            RETURNING *
            "#,
        )
        .bind(barcode)
        .bind(technician_id)
        .bind(required)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(journey) = journey else {
            return Ok(None);
        };

        sqlx::query(
            r#"
            INSERT INTO assembly_completions (journey_id, technician_id, completed_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(journey.id)
        .bind(technician_id)
        .bind(journey.assembly_completed_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        timer.record();
        Ok(Some(journey))
    }

    pub async fn set_priority(
        &self,
        barcode: &str,
        priority: bool,
    ) -> Result<Option<JourneyEntity>, sqlx::Error> {
        let timer = QueryTimer::new("set_journey_priority");
        let result = sqlx::query_as::<_, JourneyEntity>(
            r#"
            UPDATE bike_journeys
            SET priority = $2, updated_at = NOW()
            WHERE barcode = $1 AND current_status IN ('assigned', 'in_progress')
            RETURNING *
            "#,
        )
        .bind(barcode)
        .bind(priority)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn flag_parts_missing(
        &self,
        barcode: &str,
        update: &FlagUpdate,
    ) -> Result<Option<JourneyEntity>, sqlx::Error> {
        let timer = QueryTimer::new("flag_journey_parts_missing");
        let result = sqlx::query_as::<_, JourneyEntity>(
            r#"
            UPDATE bike_journeys
            SET parts_missing = $2, missing_parts = $3, parts_missing_notes = $4, updated_at = NOW()
            WHERE barcode = $1
              AND current_status IN ('assigned', 'in_progress')
              AND ($5::uuid IS NULL OR technician_id = $5)
            RETURNING *
            "#,
        )
        .bind(barcode)
        .bind(update.flagged)
        .bind(&update.items)
        .bind(&update.notes)
        .bind(update.owner)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn report_damage(
        &self,
        barcode: &str,
        update: &FlagUpdate,
    ) -> Result<Option<JourneyEntity>, sqlx::Error> {
        let timer = QueryTimer::new("report_journey_damage");
        let result = sqlx::query_as::<_, JourneyEntity>(
            r#"
            UPDATE bike_journeys
            SET damage_reported = $2, damage_photos = $3, damage_notes = $4, updated_at = NOW()
            WHERE barcode = $1
              AND current_status IN ('assigned', 'in_progress')
              AND ($5::uuid IS NULL OR technician_id = $5)
            RETURNING *
            "#,
        )
        .bind(barcode)
        .bind(update.flagged)
        .bind(&update.items)
        .bind(&update.notes)
        .bind(update.owner)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// QC pass: `in_progress -> ready_for_sale`, technician released, assembly
    /// bin freed, inspection recorded. One transaction.
    pub async fn qc_pass(
        &self,
        barcode: &str,
        inspected_by: Uuid,
        photos: &[String],
    ) -> Result<Option<(ZoneExit, QcInspectionEntity)>, sqlx::Error> {
        let timer = QueryTimer::new("qc_pass_journey");
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, TransitionedJourneyEntity>(
            r#"
            WITH prev AS (
                SELECT id, current_bin_id FROM bike_journeys
                WHERE barcode = $1
                  AND current_status = 'in_progress'
                  AND assembly_completed_at IS NOT NULL
                  AND NOT parts_missing
                  AND NOT damage_reported
                FOR UPDATE
            )
            UPDATE bike_journeys j
            SET current_status = 'ready_for_sale',
                qc_status = 'passed',
                qc_failure_reason = NULL,
                qc_completed_at = NOW(),
                technician_id = NULL,
                current_bin_id = NULL,
                updated_at = NOW()
            FROM prev
            WHERE j.id = prev.id
            RETURNING j.*, prev.current_bin_id AS previous_bin_id
            "#,
        )
        .bind(barcode)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        StatusHistoryRepository::record_in(
            &mut tx,
            row.journey.id,
            Some("in_progress"),
            "ready_for_sale",
            Some(inspected_by),
            Some("qc_passed"),
        )
        .await?;
        let inspection = QcInspectionRepository::record_in(
            &mut tx,
            row.journey.id,
            "passed",
            None,
            photos,
            inspected_by,
        )
        .await?;
        let exit = Self::leave_bin(&mut tx, row).await?;

        tx.commit().await?;
        timer.record();
        Ok(Some((exit, inspection)))
    }

    /// QC fail: `in_progress -> assigned` for rework. The unit keeps its
    /// technician and its assembly bin.
    pub async fn qc_fail(
        &self,
        barcode: &str,
        inspected_by: Uuid,
        reason: &str,
        photos: &[String],
    ) -> Result<Option<(JourneyEntity, QcInspectionEntity)>, sqlx::Error> {
        let timer = QueryTimer::new("qc_fail_journey");
        let mut tx = self.pool.begin().await?;

        let journey = sqlx::query_as::<_, JourneyEntity>(
            r#"
            UPDATE bike_journeys
            SET current_status = 'assigned',
                qc_status = 'failed',
                qc_failure_reason = $2,
                qc_completed_at = NOW(),
                rework_count = rework_count + 1,
                assembly_started_at = NULL,
                assembly_completed_at = NULL,
                updated_at = NOW()
            WHERE barcode = $1
              AND current_status = 'in_progress'
              AND assembly_completed_at IS NOT NULL
            RETURNING *
            "#,
        )
        .bind(barcode)
        .bind(reason)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(journey) = journey else {
            return Ok(None);
        };

        StatusHistoryRepository::record_in(
            &mut tx,
            journey.id,
            Some("in_progress"),
            "assigned",
            Some(inspected_by),
            Some(reason),
        )
        .await?;
        let inspection = QcInspectionRepository::record_in(
            &mut tx,
            journey.id,
            "failed",
            Some(reason),
            photos,
            inspected_by,
        )
        .await?;

        tx.commit().await?;
        timer.record();
        Ok(Some((journey, inspection)))
    }

    /// Points an unbinned unit at `bin_id` if it is still in one of
    /// `statuses`. Returns whether the unit was attached.
    pub async fn attach_bin(
        &self,
        journey_id: Uuid,
        bin_id: Uuid,
        statuses: &[&str],
    ) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("attach_journey_bin");
        let statuses: Vec<String> = statuses.iter().map(|s| s.to_string()).collect();
        let result = sqlx::query(
            r#"
            UPDATE bike_journeys
            SET current_bin_id = $2, updated_at = NOW()
            WHERE id = $1 AND current_bin_id IS NULL AND current_status = ANY($3)
            "#,
        )
        .bind(journey_id)
        .bind(bin_id)
        .bind(statuses)
        .execute(&self.pool)
        .await;
        timer.record();
        result.map(|r| r.rows_affected() == 1)
    }

    /// Takes a unit out of `bin_id` and frees the slot in one transaction.
    /// `None` when the unit was not in that bin.
    pub async fn detach_bin(
        &self,
        journey_id: Uuid,
        bin_id: Uuid,
    ) -> Result<Option<Option<BinReleaseEntity>>, sqlx::Error> {
        let timer = QueryTimer::new("detach_journey_bin");
        let mut tx = self.pool.begin().await?;

        let detached = sqlx::query(
            r#"
            UPDATE bike_journeys
            SET current_bin_id = NULL, updated_at = NOW()
            WHERE id = $1 AND current_bin_id = $2
            "#,
        )
        .bind(journey_id)
        .bind(bin_id)
        .execute(&mut *tx)
        .await?;

        if detached.rows_affected() == 0 {
            return Ok(None);
        }

        let release = BinRepository::release_in(&mut tx, bin_id, 1).await?;
        tx.commit().await?;
        timer.record();
        Ok(Some(release))
    }

    async fn leave_bin(
        conn: &mut PgConnection,
        row: TransitionedJourneyEntity,
    ) -> Result<ZoneExit, sqlx::Error> {
        let release = match row.previous_bin_id {
            Some(bin_id) => BinRepository::release_in(conn, bin_id, 1).await?,
            None => None,
        };
        Ok(ZoneExit {
            journey: row.journey,
            released_bin_id: row.previous_bin_id,
            release,
        })
    }

    /// Assigned and in-progress units held by a technician.
    pub async fn list_for_technician(
        &self,
        technician_id: Uuid,
    ) -> Result<Vec<JourneyEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_journeys_for_technician");
        let result = sqlx::query_as::<_, JourneyEntity>(
            r#"
            SELECT * FROM bike_journeys
            WHERE technician_id = $1 AND current_status IN ('assigned', 'in_progress')
            "#,
        )
        .bind(technician_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Up to `limit` units in `status`, priority and most recently touched first.
    pub async fn list_by_status(
        &self,
        status: &str,
        location_id: Option<Uuid>,
        limit: i64,
    ) -> Result<Vec<JourneyWithTechnicianEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_journeys_by_status");
        let result = sqlx::query_as::<_, JourneyWithTechnicianEntity>(
            r#"
            SELECT j.*, t.name AS technician_name
            FROM bike_journeys j
            LEFT JOIN buildline_technicians t ON t.id = j.technician_id
            WHERE j.current_status = $1
              AND ($2::uuid IS NULL OR j.current_location_id = $2)
            ORDER BY j.priority DESC, j.updated_at DESC, j.barcode ASC
            LIMIT $3
            "#,
        )
        .bind(status)
        .bind(location_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn count_by_status(
        &self,
        location_id: Option<Uuid>,
    ) -> Result<Vec<StatusCountEntity>, sqlx::Error> {
        let timer = QueryTimer::new("count_journeys_by_status");
        let result = sqlx::query_as::<_, StatusCountEntity>(
            r#"
            SELECT current_status, COUNT(*) AS count
            FROM bike_journeys
            WHERE ($1::uuid IS NULL OR current_location_id = $1)
            GROUP BY current_status
            "#,
        )
        .bind(location_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn dashboard_counts(
        &self,
        location_id: Option<Uuid>,
        day_start: DateTime<Utc>,
        day_end: DateTime<Utc>,
    ) -> Result<DashboardCountsEntity, sqlx::Error> {
        let timer = QueryTimer::new("journey_dashboard_counts");
        let result = sqlx::query_as::<_, DashboardCountsEntity>(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE current_status = 'inwarded') AS inwarded,
                COUNT(*) FILTER (WHERE current_status = 'assigned') AS assigned,
                COUNT(*) FILTER (
                    WHERE current_status = 'in_progress' AND assembly_completed_at IS NULL
                ) AS in_progress,
                COUNT(*) FILTER (
                    WHERE current_status = 'in_progress' AND assembly_completed_at IS NOT NULL
                ) AS awaiting_qc,
                COUNT(*) FILTER (WHERE current_status = 'ready_for_sale') AS ready_for_sale,
                COUNT(*) FILTER (
                    WHERE priority AND current_status IN ('assigned', 'in_progress')
                ) AS priority_open,
                COUNT(*) FILTER (WHERE parts_missing) AS parts_missing_open,
                COUNT(*) FILTER (WHERE damage_reported) AS damage_open,
                COUNT(*) FILTER (
                    WHERE qc_status = 'failed' AND current_status IN ('assigned', 'in_progress')
                ) AS qc_failed_open,
                (
                    SELECT COUNT(*)
                    FROM assembly_completions c
                    JOIN bike_journeys cj ON cj.id = c.journey_id
                    WHERE c.completed_at >= $2 AND c.completed_at < $3
                      AND ($1::uuid IS NULL OR cj.current_location_id = $1)
                ) AS completed_today
            FROM bike_journeys
            WHERE ($1::uuid IS NULL OR current_location_id = $1)
            "#,
        )
        .bind(location_id)
        .bind(day_start)
        .bind(day_end)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }
}
