//! Bin storage model: bounded-capacity slots grouped into zones.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;
use validator::Validate;

/// Storage zone of a bin. Every journey status implies exactly one zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Zone {
    InwardZone,
    AssemblyZone,
    ReadyZone,
}

impl Zone {
    pub const ALL: [Zone; 3] = [Zone::InwardZone, Zone::AssemblyZone, Zone::ReadyZone];

    pub fn as_str(&self) -> &'static str {
        match self {
            Zone::InwardZone => "inward_zone",
            Zone::AssemblyZone => "assembly_zone",
            Zone::ReadyZone => "ready_zone",
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Zone {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inward_zone" => Ok(Zone::InwardZone),
            "assembly_zone" => Ok(Zone::AssemblyZone),
            "ready_zone" => Ok(Zone::ReadyZone),
            _ => Err(format!(
                "Invalid zone: {}. Must be one of: inward_zone, assembly_zone, ready_zone",
                s
            )),
        }
    }
}

/// A storage bin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bin {
    pub id: Uuid,
    pub location_id: Uuid,
    pub code: String,
    pub name: Option<String>,
    pub zone: Zone,
    pub capacity: i32,
    pub current_occupancy: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Bin {
    /// Free slots left.
    pub fn available(&self) -> i32 {
        (self.capacity - self.current_occupancy).max(0)
    }

    pub fn can_accept(&self, count: i32) -> bool {
        self.is_active && self.current_occupancy + count <= self.capacity
    }
}

/// Outcome of a recorded bin movement attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementOutcome {
    /// Unit now occupies the destination bin.
    Moved,
    /// Unit left its bin and no destination was reserved.
    Released,
    /// Reservation at the destination failed; unit is unbinned.
    Failed,
}

impl MovementOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementOutcome::Moved => "moved",
            MovementOutcome::Released => "released",
            MovementOutcome::Failed => "failed",
        }
    }
}

impl std::str::FromStr for MovementOutcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "moved" => Ok(MovementOutcome::Moved),
            "released" => Ok(MovementOutcome::Released),
            "failed" => Ok(MovementOutcome::Failed),
            _ => Err(format!("Invalid movement outcome: {}", s)),
        }
    }
}

/// Append-only audit row for a bin movement attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinMovement {
    pub id: i64,
    pub journey_id: Uuid,
    pub from_bin_id: Option<Uuid>,
    pub to_bin_id: Option<Uuid>,
    pub outcome: MovementOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_code: Option<String>,
    pub moved_by: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Request DTOs
// ============================================================================

fn default_active() -> bool {
    true
}

/// Request payload for creating a bin.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateBinRequest {
    pub location_id: Uuid,

    #[validate(custom(function = "shared::validation::validate_code"))]
    pub code: String,

    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    pub name: Option<String>,

    pub zone: Zone,

    #[validate(range(min = 0, max = 10000, message = "capacity must be between 0 and 10000"))]
    pub capacity: i32,

    #[serde(default = "default_active")]
    pub is_active: bool,
}

/// Partial update of a bin. Capacity may not drop below current occupancy.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateBinRequest {
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    pub name: Option<String>,

    #[validate(range(min = 0, max = 10000, message = "capacity must be between 0 and 10000"))]
    pub capacity: Option<i32>,

    pub is_active: Option<bool>,
}

/// Query parameters for listing bins.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListBinsQuery {
    pub location_id: Option<Uuid>,
    pub zone: Option<Zone>,
    #[serde(default)]
    pub include_inactive: bool,
}

/// Manual relocation of a unit between bins.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct MoveBinRequest {
    pub barcode: String,
    pub from_bin_id: Option<Uuid>,
    pub to_bin_id: Uuid,
    #[validate(length(max = 500, message = "reason must be at most 500 characters"))]
    pub reason: Option<String>,
}

/// Query parameters for bin statistics.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatisticsQuery {
    pub location_id: Option<Uuid>,
    pub zone: Option<Zone>,
}

// ============================================================================
// Read models
// ============================================================================

/// Aggregated capacity figures for one zone.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZoneStatistics {
    pub zone: Zone,
    pub total_bins: i64,
    pub total_capacity: i64,
    pub total_occupancy: i64,
    pub utilization_pct: f64,
}

impl ZoneStatistics {
    pub fn new(zone: Zone, total_bins: i64, total_capacity: i64, total_occupancy: i64) -> Self {
        Self {
            zone,
            total_bins,
            total_capacity,
            total_occupancy,
            utilization_pct: utilization_pct(total_occupancy, total_capacity),
        }
    }
}

/// Rounded to one decimal; zero-capacity reports 0%.
pub fn utilization_pct(occupancy: i64, capacity: i64) -> f64 {
    if capacity <= 0 {
        return 0.0;
    }
    ((occupancy as f64 / capacity as f64) * 1000.0).round() / 10.0
}

/// Per-zone capacity statistics.
#[derive(Debug, Clone, Serialize)]
pub struct BinStatistics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_id: Option<Uuid>,
    pub zones: Vec<ZoneStatistics>,
}

impl BinStatistics {
    /// Fills zones without bins with zeros so clients always get every
    /// requested zone, in zone order.
    pub fn from_zone_rows(
        location_id: Option<Uuid>,
        zone_filter: Option<Zone>,
        rows: Vec<ZoneStatistics>,
    ) -> Self {
        let zones = Zone::ALL
            .iter()
            .filter(|z| zone_filter.map_or(true, |f| f == **z))
            .map(|z| {
                rows.iter()
                    .find(|r| r.zone == *z)
                    .cloned()
                    .unwrap_or_else(|| ZoneStatistics::new(*z, 0, 0, 0))
            })
            .collect();
        Self { location_id, zones }
    }
}

/// Result of a manual bin move.
#[derive(Debug, Clone, Serialize)]
pub struct MoveBinResponse {
    pub barcode: String,
    pub current_bin_id: Option<Uuid>,
    pub movement: BinMovement,
}
