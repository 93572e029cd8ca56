//! Technician repository: floor actors and their derived workload.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{TechnicianEntity, WorkloadEntity};
use crate::metrics::QueryTimer;

/// Workload aggregation shared by the single and list queries. `$1`/`$2`
/// bound the operator day. Completions come from the append-only
/// `assembly_completions` ledger so QC rework does not erase them.
const WORKLOAD_SELECT: &str = r#"
    SELECT
        t.id AS technician_id,
        t.name AS technician_name,
        (SELECT COUNT(*) FROM bike_journeys j
            WHERE j.technician_id = t.id AND j.current_status = 'assigned') AS assigned_count,
        (SELECT COUNT(*) FROM bike_journeys j
            WHERE j.technician_id = t.id AND j.current_status = 'in_progress') AS in_progress_count,
        (SELECT COUNT(*) FROM assembly_completions c
            WHERE c.technician_id = t.id
              AND c.completed_at >= $1
              AND c.completed_at < $2) AS completed_today,
        (SELECT COUNT(*) FROM assembly_completions c
            WHERE c.technician_id = t.id) AS total_completed
    FROM buildline_technicians t
"#;

#[derive(Clone)]
pub struct TechnicianRepository {
    pool: PgPool,
}

impl TechnicianRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, name: &str, role: &str) -> Result<TechnicianEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_technician");
        let result = sqlx::query_as::<_, TechnicianEntity>(
            r#"
            INSERT INTO buildline_technicians (name, buildline_role)
            VALUES ($1, $2)
            RETURNING id, name, buildline_role, is_active, created_at
            "#,
        )
        .bind(name)
        .bind(role)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<TechnicianEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_technician_by_id");
        let result = sqlx::query_as::<_, TechnicianEntity>(
            r#"
            SELECT id, name, buildline_role, is_active, created_at
            FROM buildline_technicians
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Lists actors, optionally narrowed to one role.
    pub async fn list(&self, role: Option<&str>) -> Result<Vec<TechnicianEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_technicians");
        let result = sqlx::query_as::<_, TechnicianEntity>(
            r#"
            SELECT id, name, buildline_role, is_active, created_at
            FROM buildline_technicians
            WHERE ($1::text IS NULL OR buildline_role = $1)
            ORDER BY name ASC, id ASC
            "#,
        )
        .bind(role)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn exists_active_with_role(&self, role: &str) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("exists_active_technician_role");
        let result: Result<(bool,), sqlx::Error> = sqlx::query_as(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM buildline_technicians WHERE buildline_role = $1 AND is_active
            )
            "#,
        )
        .bind(role)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result.map(|(exists,)| exists)
    }

    /// Derived workload of one actor within the given operator day.
    pub async fn workload(
        &self,
        technician_id: Uuid,
        day_start: DateTime<Utc>,
        day_end: DateTime<Utc>,
    ) -> Result<Option<WorkloadEntity>, sqlx::Error> {
        let timer = QueryTimer::new("technician_workload");
        let sql = format!("{WORKLOAD_SELECT} WHERE t.id = $3");
        let result = sqlx::query_as::<_, WorkloadEntity>(&sql)
            .bind(day_start)
            .bind(day_end)
            .bind(technician_id)
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        result
    }

    /// Workloads of every active technician, by name.
    pub async fn workloads(
        &self,
        day_start: DateTime<Utc>,
        day_end: DateTime<Utc>,
    ) -> Result<Vec<WorkloadEntity>, sqlx::Error> {
        let timer = QueryTimer::new("technician_workloads");
        let sql = format!(
            "{WORKLOAD_SELECT} WHERE t.buildline_role = 'technician' AND t.is_active \
             ORDER BY t.name ASC, t.id ASC"
        );
        let result = sqlx::query_as::<_, WorkloadEntity>(&sql)
            .bind(day_start)
            .bind(day_end)
            .fetch_all(&self.pool)
            .await;
        timer.record();
        result
    }
}
