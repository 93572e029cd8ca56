//! Read models for the floor: kanban board, dashboard, bike detail, queues.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::bin::{Bin, BinStatistics};
use super::checklist::CategoryProgress;
use super::history::StatusHistoryEntry;
use super::journey::{Journey, JourneyResponse, JourneyStatus, QcStatus};
use super::qc::QcInspection;
use super::technician::Workload;

/// Query parameters shared by the board endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BoardQuery {
    pub location_id: Option<Uuid>,
}

/// Compact unit card on the kanban board.
#[derive(Debug, Clone, Serialize)]
pub struct KanbanCard {
    pub id: Uuid,
    pub barcode: String,
    pub model_sku: String,
    pub priority: bool,
    pub awaiting_qc: bool,
    pub qc_status: QcStatus,
    pub rework_count: i32,
    pub parts_missing: bool,
    pub damage_reported: bool,
    pub technician_id: Option<Uuid>,
    pub technician_name: Option<String>,
    pub current_bin_id: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
}

impl KanbanCard {
    pub fn new(journey: &Journey, technician_name: Option<String>) -> Self {
        Self {
            id: journey.id,
            barcode: journey.barcode.clone(),
            model_sku: journey.model_sku.clone(),
            priority: journey.priority,
            awaiting_qc: journey.is_awaiting_qc(),
            qc_status: journey.qc_status,
            rework_count: journey.rework_count,
            parts_missing: journey.parts_missing.flagged,
            damage_reported: journey.damage.flagged,
            technician_id: journey.technician_id,
            technician_name,
            current_bin_id: journey.current_bin_id,
            updated_at: journey.updated_at,
        }
    }
}

/// One status column. `count` is the full column size; `cards` may be capped.
#[derive(Debug, Clone, Serialize)]
pub struct KanbanColumn {
    pub status: JourneyStatus,
    pub count: i64,
    pub cards: Vec<KanbanCard>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Kanban {
    pub columns: Vec<KanbanColumn>,
}

impl Kanban {
    /// Builds one column per status in workflow order. `counts` holds the
    /// uncapped total per status.
    pub fn assemble(cards: Vec<(JourneyStatus, KanbanCard)>, counts: &[(JourneyStatus, i64)]) -> Self {
        let mut columns: Vec<KanbanColumn> = JourneyStatus::ALL
            .iter()
            .map(|status| KanbanColumn {
                status: *status,
                count: counts
                    .iter()
                    .find(|(s, _)| s == status)
                    .map_or(0, |(_, c)| *c),
                cards: Vec::new(),
            })
            .collect();
        for (status, card) in cards {
            if let Some(column) = columns.iter_mut().find(|c| c.status == status) {
                column.cards.push(card);
            }
        }
        Self { columns }
    }
}

/// Unit counts per floor stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StageCounts {
    pub inwarded: i64,
    pub assigned: i64,
    pub in_progress: i64,
    pub awaiting_qc: i64,
    pub ready_for_sale: i64,
}

/// Open exceptions on the floor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExceptionCounts {
    pub priority: i64,
    pub parts_missing: i64,
    pub damage_reported: i64,
    pub qc_failed_rework: i64,
}

/// Supervisor dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub stages: StageCounts,
    pub exceptions: ExceptionCounts,
    pub completed_today: i64,
    pub technicians: Vec<Workload>,
    pub bins: BinStatistics,
    pub generated_at: DateTime<Utc>,
}

/// Everything the floor knows about one unit.
#[derive(Debug, Clone, Serialize)]
pub struct BikeDetail {
    pub journey: JourneyResponse,
    pub technician_name: Option<String>,
    pub current_bin: Option<Bin>,
    pub checklist_progress: Vec<CategoryProgress>,
    pub missing_checklist_items: Vec<String>,
    pub status_history: Vec<StatusHistoryEntry>,
    pub qc_inspections: Vec<QcInspection>,
}

/// Ordered work queue of one technician.
#[derive(Debug, Clone, Serialize)]
pub struct TechnicianQueue {
    pub workload: Workload,
    pub units: Vec<JourneyResponse>,
}
