//! Database entity definitions.
//!
//! Entities map directly to database rows and are converted to domain models.

pub mod bin;
pub mod history;
pub mod journey;
pub mod location;
pub mod qc_inspection;
pub mod technician;

pub use bin::{BinEntity, BinReleaseEntity, ZoneStatisticsEntity};
pub use history::{BinMovementEntity, StatusHistoryEntity};
pub use journey::{
    DashboardCountsEntity, JourneyEntity, JourneyWithTechnicianEntity, StatusCountEntity,
    TransitionedJourneyEntity,
};
pub use location::LocationEntity;
pub use qc_inspection::QcInspectionEntity;
pub use technician::{TechnicianEntity, WorkloadEntity};
