//! Technician entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{BuildlineRole, Technician, Workload};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the buildline_technicians table.
#[derive(Debug, Clone, FromRow)]
pub struct TechnicianEntity {
    pub id: Uuid,
    pub name: String,
    pub buildline_role: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl TechnicianEntity {
    /// Role stored on the row; unknown roles map to the least privileged one.
    pub fn role(&self) -> BuildlineRole {
        self.buildline_role
            .parse::<BuildlineRole>()
            .unwrap_or(BuildlineRole::Technician)
    }
}

impl From<TechnicianEntity> for Technician {
    fn from(entity: TechnicianEntity) -> Self {
        Technician {
            buildline_role: entity.role(),
            id: entity.id,
            name: entity.name,
            is_active: entity.is_active,
            created_at: entity.created_at,
        }
    }
}

/// Derived workload row.
#[derive(Debug, Clone, FromRow)]
pub struct WorkloadEntity {
    pub technician_id: Uuid,
    pub technician_name: String,
    pub assigned_count: i64,
    pub in_progress_count: i64,
    pub completed_today: i64,
    pub total_completed: i64,
}

impl From<WorkloadEntity> for Workload {
    fn from(entity: WorkloadEntity) -> Self {
        Workload {
            technician_id: entity.technician_id,
            technician_name: entity.technician_name,
            assigned_count: entity.assigned_count,
            in_progress_count: entity.in_progress_count,
            completed_today: entity.completed_today,
            total_completed: entity.total_completed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_role_is_least_privileged() {
        let entity = TechnicianEntity {
            id: Uuid::new_v4(),
            name: "Sam".to_string(),
            buildline_role: "owner".to_string(),
            is_active: true,
            created_at: Utc::now(),
        };
        assert_eq!(entity.role(), BuildlineRole::Technician);
    }
}
