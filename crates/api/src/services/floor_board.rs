//! Floor read models: kanban board and supervisor dashboard.

use std::str::FromStr;

use chrono::Utc;
use domain::models::board::{
    BoardQuery, Dashboard, ExceptionCounts, Kanban, KanbanCard, StageCounts,
};
use domain::models::{Journey, JourneyStatus};
use domain::BuildlineError;
use persistence::repositories::JourneyRepository;
use shared::time::operator_day_bounds;
use sqlx::PgPool;
use tracing::warn;

use super::assignment_queue::AssignmentQueue;
use super::bin_capacity::BinCapacityManager;
use crate::config::BuildlineConfig;

#[derive(Clone)]
pub struct FloorBoard {
    journeys: JourneyRepository,
    bins: BinCapacityManager,
    queue: AssignmentQueue,
    column_limit: i64,
    utc_offset_minutes: i32,
}

impl FloorBoard {
    pub fn new(pool: PgPool, config: &BuildlineConfig) -> Self {
        Self {
            journeys: JourneyRepository::new(pool.clone()),
            bins: BinCapacityManager::new(pool.clone()),
            queue: AssignmentQueue::new(pool, config),
            column_limit: config.kanban_column_limit,
            utc_offset_minutes: config.operator_utc_offset_minutes,
        }
    }

    /// One column per status. Column counts are exact; cards are capped at
    /// the configured column limit.
    pub async fn kanban(&self, query: &BoardQuery) -> Result<Kanban, BuildlineError> {
        let counts: Vec<(JourneyStatus, i64)> = self
            .journeys
            .count_by_status(query.location_id)
            .await?
            .into_iter()
            .filter_map(|row| match JourneyStatus::from_str(&row.current_status) {
                Ok(status) => Some((status, row.count)),
                Err(e) => {
                    warn!(error = %e, "Skipping unknown status in kanban counts");
                    None
                }
            })
            .collect();

        let mut cards = Vec::new();
        for status in JourneyStatus::ALL {
            let rows = self
                .journeys
                .list_by_status(status.as_str(), query.location_id, self.column_limit)
                .await?;
            for row in rows {
                let journey: Journey = row.journey.into();
                cards.push((status, KanbanCard::new(&journey, row.technician_name)));
            }
        }

        Ok(Kanban::assemble(cards, &counts))
    }

    pub async fn dashboard(&self, query: &BoardQuery) -> Result<Dashboard, BuildlineError> {
        let now = Utc::now();
        let (day_start, day_end) = operator_day_bounds(now, self.utc_offset_minutes);
        let counts = self
            .journeys
            .dashboard_counts(query.location_id, day_start, day_end)
            .await?;
        let technicians = self.queue.workloads().await?;
        let bins = self.bins.statistics(query.location_id, None).await?;

        Ok(Dashboard {
            stages: StageCounts {
                inwarded: counts.inwarded,
                assigned: counts.assigned,
                in_progress: counts.in_progress,
                awaiting_qc: counts.awaiting_qc,
                ready_for_sale: counts.ready_for_sale,
            },
            exceptions: ExceptionCounts {
                priority: counts.priority_open,
                parts_missing: counts.parts_missing_open,
                damage_reported: counts.damage_open,
                qc_failed_rework: counts.qc_failed_open,
            },
            completed_today: counts.completed_today,
            technicians,
            bins,
            generated_at: now,
        })
    }
}
