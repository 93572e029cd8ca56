//! Facility (warehouse, showroom, workshop) model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationType {
    Warehouse,
    Showroom,
    Workshop,
}

impl LocationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocationType::Warehouse => "warehouse",
            LocationType::Showroom => "showroom",
            LocationType::Workshop => "workshop",
        }
    }
}

impl fmt::Display for LocationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for LocationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "warehouse" => Ok(LocationType::Warehouse),
            "showroom" => Ok(LocationType::Showroom),
            "workshop" => Ok(LocationType::Workshop),
            _ => Err(format!("Invalid location type: {}", s)),
        }
    }
}

/// A named facility owning bins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub location_type: LocationType,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request payload for creating a location.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateLocationRequest {
    #[validate(custom(function = "shared::validation::validate_code"))]
    pub code: String,

    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    pub name: String,

    pub location_type: LocationType,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_type_parse() {
        assert_eq!("workshop".parse::<LocationType>(), Ok(LocationType::Workshop));
        assert!("depot".parse::<LocationType>().is_err());
    }

    #[test]
    fn test_create_location_request() {
        let json = r#"{"code": "WH-MAIN", "name": "Main warehouse", "location_type": "warehouse"}"#;
        let request: CreateLocationRequest = serde_json::from_str(json).unwrap();
        assert!(request.validate().is_ok());
        assert_eq!(request.location_type, LocationType::Warehouse);
    }
}
