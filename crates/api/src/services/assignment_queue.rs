//! Assignment of inwarded units to technicians, and what each technician
//! holds afterwards.

use chrono::Utc;
use domain::models::board::TechnicianQueue;
use domain::models::journey::{AssignRequest, BulkAssignRequest, BulkFailure, BulkResult};
use domain::models::{Journey, Workload};
use domain::services::sort_queue;
use domain::BuildlineError;
use persistence::repositories::{JourneyRepository, TechnicianRepository};
use shared::time::operator_day_bounds;
use shared::validation::normalize_barcode;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use super::journey_engine::JourneyEngine;
use super::{bulk_failure, check_bulk_size};
use crate::config::BuildlineConfig;

#[derive(Clone)]
pub struct AssignmentQueue {
    engine: JourneyEngine,
    journeys: JourneyRepository,
    technicians: TechnicianRepository,
    utc_offset_minutes: i32,
    max_bulk_size: usize,
}

impl AssignmentQueue {
    pub fn new(pool: PgPool, config: &BuildlineConfig) -> Self {
        Self {
            engine: JourneyEngine::new(pool.clone(), config),
            journeys: JourneyRepository::new(pool.clone()),
            technicians: TechnicianRepository::new(pool),
            utc_offset_minutes: config.operator_utc_offset_minutes,
            max_bulk_size: config.max_bulk_size,
        }
    }

    /// Assigns each barcode to the same technician. Items are independent:
    /// one failure never rolls back another.
    pub async fn bulk_assign(
        &self,
        request: BulkAssignRequest,
        supervisor: Uuid,
    ) -> Result<BulkResult, BuildlineError> {
        check_bulk_size(request.barcodes.len(), self.max_bulk_size)?;

        let mut result = BulkResult::default();
        for raw in request.barcodes {
            let barcode = normalize_barcode(&raw);
            let assign = AssignRequest {
                barcode: barcode.clone(),
                technician_id: request.technician_id,
                target_bin_id: None,
            };
            match self.engine.assign(assign, supervisor).await {
                Ok(response) => {
                    if let Some(warning) = response.bin_warning {
                        result.bin_warnings.push(BulkFailure {
                            barcode: barcode.clone(),
                            error: warning.error,
                            message: warning.message,
                        });
                    }
                    result.successful.push(barcode);
                }
                // A barcode with no unit behind it has no unit for the
                // technician to take, and is reported under that kind.
                Err(BuildlineError::JourneyNotFound { .. }) => {
                    let err = BuildlineError::TechnicianNotFound {
                        technician_id: request.technician_id,
                    };
                    result.failed.push(BulkFailure {
                        message: format!("Unit {} not found; nothing to assign", barcode),
                        error: err.code().to_string(),
                        barcode,
                    });
                }
                Err(err) => result.failed.push(bulk_failure(barcode, &err)),
            }
        }

        info!(
            technician_id = %request.technician_id,
            supervisor_id = %supervisor,
            successful = result.successful.len(),
            failed = result.failed.len(),
            "Bulk assign processed"
        );
        Ok(result)
    }

    /// Derived workload of one technician for the current operator day.
    pub async fn workload(&self, technician_id: Uuid) -> Result<Workload, BuildlineError> {
        let (day_start, day_end) = operator_day_bounds(Utc::now(), self.utc_offset_minutes);
        self.technicians
            .workload(technician_id, day_start, day_end)
            .await?
            .map(Into::into)
            .ok_or(BuildlineError::TechnicianNotFound { technician_id })
    }

    /// Workloads of every active technician.
    pub async fn workloads(&self) -> Result<Vec<Workload>, BuildlineError> {
        let (day_start, day_end) = operator_day_bounds(Utc::now(), self.utc_offset_minutes);
        let rows = self.technicians.workloads(day_start, day_end).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Assigned and in-progress units of a technician, in work order.
    pub async fn queue(&self, technician_id: Uuid) -> Result<TechnicianQueue, BuildlineError> {
        let workload = self.workload(technician_id).await?;
        let mut units: Vec<Journey> = self
            .journeys
            .list_for_technician(technician_id)
            .await?
            .into_iter()
            .map(Into::into)
            .collect();
        sort_queue(&mut units);

        Ok(TechnicianQueue {
            workload,
            units: units.into_iter().map(Into::into).collect(),
        })
    }
}
