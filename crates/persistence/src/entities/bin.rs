//! Bin entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::bin::ZoneStatistics;
use domain::models::{Bin, Zone};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the buildline_bins table.
#[derive(Debug, Clone, FromRow)]
pub struct BinEntity {
    pub id: Uuid,
    pub location_id: Uuid,
    pub code: String,
    pub name: Option<String>,
    pub zone: String,
    pub capacity: i32,
    pub current_occupancy: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BinEntity {
    /// Zone stored on the row. The CHECK constraint keeps the fallback unreachable.
    pub fn zone(&self) -> Zone {
        self.zone.parse::<Zone>().unwrap_or(Zone::InwardZone)
    }

    pub fn into_domain(self) -> Bin {
        Bin {
            zone: self.zone(),
            id: self.id,
            location_id: self.location_id,
            code: self.code,
            name: self.name,
            capacity: self.capacity,
            current_occupancy: self.current_occupancy,
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl From<BinEntity> for Bin {
    fn from(entity: BinEntity) -> Self {
        entity.into_domain()
    }
}

/// Occupancy before and after a release.
#[derive(Debug, Clone, Copy, FromRow)]
pub struct BinReleaseEntity {
    pub previous_occupancy: i32,
    pub current_occupancy: i32,
}

impl BinReleaseEntity {
    /// The release asked for more slots than the bin held and was clamped at zero.
    pub fn was_clamped(&self, requested: i32) -> bool {
        self.previous_occupancy < requested
    }
}

/// Aggregated row of the per-zone statistics query.
#[derive(Debug, Clone, FromRow)]
pub struct ZoneStatisticsEntity {
    pub zone: String,
    pub total_bins: i64,
    pub total_capacity: i64,
    pub total_occupancy: i64,
}

impl ZoneStatisticsEntity {
    /// Rows with an unknown zone are skipped.
    pub fn into_domain(self) -> Option<ZoneStatistics> {
        let zone = self.zone.parse::<Zone>().ok()?;
        Some(ZoneStatistics::new(
            zone,
            self.total_bins,
            self.total_capacity,
            self.total_occupancy,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_to_domain() {
        let entity = BinEntity {
            id: Uuid::new_v4(),
            location_id: Uuid::new_v4(),
            code: "ASM-01".to_string(),
            name: Some("Assembly bay 1".to_string()),
            zone: "assembly_zone".to_string(),
            capacity: 4,
            current_occupancy: 3,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let bin: Bin = entity.into();
        assert_eq!(bin.zone, Zone::AssemblyZone);
        assert_eq!(bin.available(), 1);
    }

    #[test]
    fn test_release_clamp_detection() {
        let release = BinReleaseEntity {
            previous_occupancy: 0,
            current_occupancy: 0,
        };
        assert!(release.was_clamped(1));

        let release = BinReleaseEntity {
            previous_occupancy: 2,
            current_occupancy: 1,
        };
        assert!(!release.was_clamped(1));
    }

    #[test]
    fn test_zone_statistics_conversion() {
        let row = ZoneStatisticsEntity {
            zone: "ready_zone".to_string(),
            total_bins: 2,
            total_capacity: 8,
            total_occupancy: 2,
        };
        let stats = row.into_domain().unwrap();
        assert_eq!(stats.zone, Zone::ReadyZone);
        assert_eq!(stats.utilization_pct, 25.0);
    }
}
