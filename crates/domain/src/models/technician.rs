//! Floor actors and their derived workload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;
use validator::Validate;

/// Role of an actor on the assembly floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildlineRole {
    Technician,
    Supervisor,
    QcInspector,
}

impl BuildlineRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildlineRole::Technician => "technician",
            BuildlineRole::Supervisor => "supervisor",
            BuildlineRole::QcInspector => "qc_inspector",
        }
    }
}

impl fmt::Display for BuildlineRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for BuildlineRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "technician" => Ok(BuildlineRole::Technician),
            "supervisor" => Ok(BuildlineRole::Supervisor),
            "qc_inspector" => Ok(BuildlineRole::QcInspector),
            _ => Err(format!("Invalid buildline role: {}", s)),
        }
    }
}

/// An actor record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Technician {
    pub id: Uuid,
    pub name: String,
    pub buildline_role: BuildlineRole,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Technician {
    /// Only active actors in the technician role can own assembly work.
    pub fn can_take_assembly_work(&self) -> bool {
        self.is_active && self.buildline_role == BuildlineRole::Technician
    }
}

/// Request payload for registering an actor.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateTechnicianRequest {
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    pub name: String,

    pub buildline_role: BuildlineRole,
}

/// Derived, non-persisted workload of a technician.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Workload {
    pub technician_id: Uuid,
    pub technician_name: String,
    pub assigned_count: i64,
    pub in_progress_count: i64,
    pub completed_today: i64,
    pub total_completed: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use fake::{faker::name::en::Name, Fake};

    fn technician(role: BuildlineRole) -> Technician {
        Technician {
            id: Uuid::new_v4(),
            name: Name().fake(),
            buildline_role: role,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_role_round_trip() {
        for role in [
            BuildlineRole::Technician,
            BuildlineRole::Supervisor,
            BuildlineRole::QcInspector,
        ] {
            assert_eq!(role.as_str().parse::<BuildlineRole>(), Ok(role));
        }
        assert_eq!(
            serde_json::to_string(&BuildlineRole::QcInspector).unwrap(),
            "\"qc_inspector\""
        );
    }

    #[test]
    fn test_only_active_technicians_take_work() {
        assert!(technician(BuildlineRole::Technician).can_take_assembly_work());
        assert!(!technician(BuildlineRole::Supervisor).can_take_assembly_work());
        assert!(!technician(BuildlineRole::QcInspector).can_take_assembly_work());

        let mut inactive = technician(BuildlineRole::Technician);
        inactive.is_active = false;
        assert!(!inactive.can_take_assembly_work());
    }
}
