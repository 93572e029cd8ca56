//! Domain models for Buildline.

pub mod bin;
pub mod board;
pub mod checklist;
pub mod history;
pub mod journey;
pub mod location;
pub mod qc;
pub mod technician;

pub use bin::{Bin, BinMovement, MovementOutcome, Zone};
pub use checklist::{Checklist, ChecklistPatch, ChecklistSchema, ChecklistVersion, ChecklistView};
pub use history::StatusHistoryEntry;
pub use journey::{Journey, JourneyStatus, QcStatus};
pub use location::{Location, LocationType};
pub use qc::{QcInspection, QcResult};
pub use technician::{BuildlineRole, Technician, Workload};
