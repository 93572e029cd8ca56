//! Read side of the assembly checklist. Writes go through the journey engine
//! because they are guarded by status and ownership.

use domain::models::{ChecklistSchema, ChecklistView, Journey};
use domain::BuildlineError;
use persistence::repositories::JourneyRepository;
use shared::validation::normalize_barcode;
use sqlx::PgPool;

#[derive(Clone)]
pub struct ChecklistTracker {
    journeys: JourneyRepository,
}

impl ChecklistTracker {
    pub fn new(pool: PgPool) -> Self {
        Self {
            journeys: JourneyRepository::new(pool),
        }
    }

    /// The schema new checklist entries are validated against.
    pub fn schema() -> &'static ChecklistSchema {
        ChecklistSchema::current()
    }

    /// Recorded items and per-category progress of one unit.
    pub async fn progress(&self, barcode: &str) -> Result<ChecklistView, BuildlineError> {
        let barcode = normalize_barcode(barcode);
        let journey: Journey = self
            .journeys
            .find_by_barcode(&barcode)
            .await?
            .map(Into::into)
            .ok_or_else(|| BuildlineError::JourneyNotFound {
                barcode: barcode.clone(),
            })?;
        Ok(ChecklistView::new(
            &journey.barcode,
            &journey.checklist,
            Self::schema(),
        ))
    }
}
