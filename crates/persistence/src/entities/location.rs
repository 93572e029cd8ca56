//! Location entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{Location, LocationType};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the buildline_locations table.
#[derive(Debug, Clone, FromRow)]
pub struct LocationEntity {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub location_type: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<LocationEntity> for Location {
    fn from(entity: LocationEntity) -> Self {
        Location {
            id: entity.id,
            location_type: entity
                .location_type
                .parse::<LocationType>()
                .unwrap_or(LocationType::Warehouse),
            code: entity.code,
            name: entity.name,
            is_active: entity.is_active,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}
