//! Append-only status history and the views rebuilt from it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::bin::BinMovement;
use super::journey::JourneyStatus;
use super::qc::QcInspection;

/// One recorded status transition. `from_status` is `None` for inward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusHistoryEntry {
    pub id: i64,
    pub journey_id: Uuid,
    pub from_status: Option<JourneyStatus>,
    pub to_status: JourneyStatus,
    pub changed_by: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl StatusHistoryEntry {
    /// A QC failure sends the unit from in_progress back to assigned.
    pub fn is_rework(&self) -> bool {
        self.from_status == Some(JourneyStatus::InProgress)
            && self.to_status == JourneyStatus::Assigned
    }
}

/// Number of rework loops visible in a history trail.
pub fn count_rework_attempts(entries: &[StatusHistoryEntry]) -> usize {
    entries.iter().filter(|e| e.is_rework()).count()
}

/// Full audit trail of one unit.
#[derive(Debug, Clone, Serialize)]
pub struct JourneyHistory {
    pub journey_id: Uuid,
    pub barcode: String,
    pub status_history: Vec<StatusHistoryEntry>,
    pub bin_movements: Vec<BinMovement>,
    pub qc_inspections: Vec<QcInspection>,
    pub rework_attempts: usize,
}

impl JourneyHistory {
    pub fn new(
        journey_id: Uuid,
        barcode: String,
        status_history: Vec<StatusHistoryEntry>,
        bin_movements: Vec<BinMovement>,
        qc_inspections: Vec<QcInspection>,
    ) -> Self {
        let rework_attempts = count_rework_attempts(&status_history);
        Self {
            journey_id,
            barcode,
            status_history,
            bin_movements,
            qc_inspections,
            rework_attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(from: Option<JourneyStatus>, to: JourneyStatus) -> StatusHistoryEntry {
        StatusHistoryEntry {
            id: 1,
            journey_id: Uuid::nil(),
            from_status: from,
            to_status: to,
            changed_by: None,
            reason: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_rework_attempts_counted_from_trail() {
        use JourneyStatus::*;
        let trail = vec![
            entry(None, Inwarded),
            entry(Some(Inwarded), Assigned),
            entry(Some(Assigned), InProgress),
            entry(Some(InProgress), Assigned),
            entry(Some(Assigned), InProgress),
            entry(Some(InProgress), Assigned),
            entry(Some(Assigned), InProgress),
            entry(Some(InProgress), ReadyForSale),
        ];
        assert_eq!(count_rework_attempts(&trail), 2);
    }

    #[test]
    fn test_inward_entry_has_no_source_status() {
        let json = serde_json::to_value(entry(None, JourneyStatus::Inwarded)).unwrap();
        assert!(json["from_status"].is_null());
        assert_eq!(json["to_status"], "inwarded");
        assert!(json.get("reason").is_none());
    }
}
