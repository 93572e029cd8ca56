//! Bin repository: capacity accounting with row-level conditional updates.
//!
//! Occupancy is only ever changed by single UPDATE statements that check the
//! bound in their WHERE clause, so concurrent reservations cannot overfill a
//! bin. The table CHECK constraint is the storage backstop.

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::entities::{BinEntity, BinReleaseEntity, ZoneStatisticsEntity};
use crate::metrics::QueryTimer;

const BIN_COLUMNS: &str =
    "id, location_id, code, name, zone, capacity, current_occupancy, is_active, created_at, updated_at";

/// Input data for creating a bin.
#[derive(Debug, Clone)]
pub struct NewBin {
    pub location_id: Uuid,
    pub code: String,
    pub name: Option<String>,
    pub zone: &'static str,
    pub capacity: i32,
    pub is_active: bool,
}

#[derive(Clone)]
pub struct BinRepository {
    pool: PgPool,
}

impl BinRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, input: &NewBin) -> Result<BinEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_bin");
        let sql = format!(
            "INSERT INTO buildline_bins (location_id, code, name, zone, capacity, is_active) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {BIN_COLUMNS}"
        );
        let result = sqlx::query_as::<_, BinEntity>(&sql)
            .bind(input.location_id)
            .bind(&input.code)
            .bind(&input.name)
            .bind(input.zone)
            .bind(input.capacity)
            .bind(input.is_active)
            .fetch_one(&self.pool)
            .await;
        timer.record();
        result
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<BinEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_bin_by_id");
        let sql = format!("SELECT {BIN_COLUMNS} FROM buildline_bins WHERE id = $1");
        let result = sqlx::query_as::<_, BinEntity>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        result
    }

    pub async fn list(
        &self,
        location_id: Option<Uuid>,
        zone: Option<&str>,
        include_inactive: bool,
    ) -> Result<Vec<BinEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_bins");
        let sql = format!(
            "SELECT {BIN_COLUMNS} FROM buildline_bins \
             WHERE ($1::uuid IS NULL OR location_id = $1) \
               AND ($2::text IS NULL OR zone = $2) \
               AND ($3 OR is_active) \
             ORDER BY location_id, zone, code"
        );
        let result = sqlx::query_as::<_, BinEntity>(&sql)
            .bind(location_id)
            .bind(zone)
            .bind(include_inactive)
            .fetch_all(&self.pool)
            .await;
        timer.record();
        result
    }

    /// Partial update. Returns `None` when the bin does not exist or the new
    /// capacity would fall below the current occupancy.
    pub async fn update(
        &self,
        id: Uuid,
        name: Option<&str>,
        capacity: Option<i32>,
        is_active: Option<bool>,
    ) -> Result<Option<BinEntity>, sqlx::Error> {
        let timer = QueryTimer::new("update_bin");
        let sql = format!(
            "UPDATE buildline_bins SET \
                 name = COALESCE($2, name), \
                 capacity = COALESCE($3, capacity), \
                 is_active = COALESCE($4, is_active), \
                 updated_at = NOW() \
             WHERE id = $1 AND COALESCE($3, capacity) >= current_occupancy \
             RETURNING {BIN_COLUMNS}"
        );
        let result = sqlx::query_as::<_, BinEntity>(&sql)
            .bind(id)
            .bind(name)
            .bind(capacity)
            .bind(is_active)
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        result
    }

    /// Takes `count` slots if the bin is active, has room and, when given,
    /// belongs to `zone` and `location_id`. Returns `None` and changes nothing
    /// otherwise.
    pub async fn try_reserve(
        &self,
        bin_id: Uuid,
        count: i32,
        zone: Option<&str>,
        location_id: Option<Uuid>,
    ) -> Result<Option<BinEntity>, sqlx::Error> {
        let timer = QueryTimer::new("reserve_bin_slot");
        let sql = format!(
            "UPDATE buildline_bins \
             SET current_occupancy = current_occupancy + $2, updated_at = NOW() \
             WHERE id = $1 \
               AND is_active \
               AND ($3::text IS NULL OR zone = $3) \
               AND ($4::uuid IS NULL OR location_id = $4) \
               AND current_occupancy + $2 <= capacity \
             RETURNING {BIN_COLUMNS}"
        );
        let result = sqlx::query_as::<_, BinEntity>(&sql)
            .bind(bin_id)
            .bind(count)
            .bind(zone)
            .bind(location_id)
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        result
    }

    /// Frees `count` slots, floored at zero. Reports the occupancy before the
    /// release so callers can detect an over-release.
    pub async fn release(
        &self,
        bin_id: Uuid,
        count: i32,
    ) -> Result<Option<BinReleaseEntity>, sqlx::Error> {
        let timer = QueryTimer::new("release_bin_slot");
        let mut conn = self.pool.acquire().await?;
        let result = Self::release_in(&mut conn, bin_id, count).await;
        timer.record();
        result
    }

    /// Same as [`release`](Self::release) on the caller's connection, so a
    /// release can commit together with a status change.
    pub async fn release_in(
        conn: &mut PgConnection,
        bin_id: Uuid,
        count: i32,
    ) -> Result<Option<BinReleaseEntity>, sqlx::Error> {
        sqlx::query_as::<_, BinReleaseEntity>(
            r#"
            WITH target AS (
                SELECT id, current_occupancy FROM buildline_bins WHERE id = $1 FOR UPDATE
            )
            UPDATE buildline_bins b
            SET current_occupancy = GREATEST(b.current_occupancy - $2, 0), updated_at = NOW()
            FROM target
            WHERE b.id = target.id
            RETURNING target.current_occupancy AS previous_occupancy, b.current_occupancy
            "#,
        )
        .bind(bin_id)
        .bind(count)
        .fetch_optional(conn)
        .await
    }

    /// Active bin with free room in `zone` at `location_id`, least utilised
    /// first. `exclude` skips bins that already refused a reservation.
    pub async fn find_placement_candidate(
        &self,
        location_id: Uuid,
        zone: &str,
        exclude: &[Uuid],
    ) -> Result<Option<BinEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_bin_placement_candidate");
        let sql = format!(
            "SELECT {BIN_COLUMNS} FROM buildline_bins \
             WHERE location_id = $1 \
               AND zone = $2 \
               AND is_active \
               AND current_occupancy < capacity \
               AND NOT (id = ANY($3)) \
             ORDER BY current_occupancy::float8 / capacity::float8 ASC, current_occupancy ASC, code ASC \
             LIMIT 1"
        );
        let result = sqlx::query_as::<_, BinEntity>(&sql)
            .bind(location_id)
            .bind(zone)
            .bind(exclude)
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        result
    }

    /// Per-zone totals over committed rows.
    pub async fn statistics(
        &self,
        location_id: Option<Uuid>,
        zone: Option<&str>,
    ) -> Result<Vec<ZoneStatisticsEntity>, sqlx::Error> {
        let timer = QueryTimer::new("bin_statistics");
        let result = sqlx::query_as::<_, ZoneStatisticsEntity>(
            r#"
            SELECT
                zone,
                COUNT(*) AS total_bins,
                COALESCE(SUM(capacity), 0)::BIGINT AS total_capacity,
                COALESCE(SUM(current_occupancy), 0)::BIGINT AS total_occupancy
            FROM buildline_bins
            WHERE ($1::uuid IS NULL OR location_id = $1)
              AND ($2::text IS NULL OR zone = $2)
            GROUP BY zone
            "#,
        )
        .bind(location_id)
        .bind(zone)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }
}
