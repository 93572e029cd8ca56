//! Repository implementations for database operations.

pub mod bin;
pub mod history;
pub mod journey;
pub mod location;
pub mod qc_inspection;
pub mod technician;

pub use bin::{BinRepository, NewBin};
pub use history::{BinMovementRepository, NewBinMovement, StatusHistoryRepository};
pub use journey::{FlagUpdate, JourneyRepository, NewJourney, ZoneExit};
pub use location::LocationRepository;
pub use qc_inspection::QcInspectionRepository;
pub use technician::TechnicianRepository;
