//! QC checkpoint.
//!
//! A pass sends the unit to the ready zone and releases the technician. A
//! fail sends it back to `assigned` with the same technician for another
//! start/complete round; rework is not capped.

use domain::models::qc::{QcSubmitRequest, QcSubmitResponse};
use domain::models::{Journey, QcResult};
use domain::services::{evaluate_submission, Action, QcDecision};
use domain::BuildlineError;
use persistence::repositories::JourneyRepository;
use shared::validation::normalize_barcode;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use super::bin_capacity::BinCapacityManager;
use crate::middleware::metrics::{record_qc_result, record_transition};

#[derive(Clone)]
pub struct QcGate {
    journeys: JourneyRepository,
    bins: BinCapacityManager,
}

impl QcGate {
    pub fn new(pool: PgPool) -> Self {
        Self {
            journeys: JourneyRepository::new(pool.clone()),
            bins: BinCapacityManager::new(pool),
        }
    }

    async fn load(&self, barcode: &str) -> Result<Journey, BuildlineError> {
        self.journeys
            .find_by_barcode(barcode)
            .await?
            .map(Into::into)
            .ok_or_else(|| BuildlineError::JourneyNotFound {
                barcode: barcode.to_string(),
            })
    }

    /// Records a QC decision for a unit awaiting QC.
    pub async fn submit(
        &self,
        request: QcSubmitRequest,
        inspector: Uuid,
    ) -> Result<QcSubmitResponse, BuildlineError> {
        request
            .validate()
            .map_err(|e| BuildlineError::from_validation(&e))?;
        let barcode = normalize_barcode(&request.barcode);

        let journey = self.load(&barcode).await?;
        let decision = evaluate_submission(&journey, request.result, request.reason())?;

        let from = journey.current_status.as_str();
        let to = decision.next_status().as_str();
        match decision {
            QcDecision::Pass => {
                let Some((exit, inspection)) = self
                    .journeys
                    .qc_pass(&barcode, inspector, &request.photos)
                    .await?
                else {
                    return Err(self.explain_refusal(&barcode, request.result, request.reason()).await);
                };

                BinCapacityManager::note_zone_exit(&exit);
                record_transition(from, to);
                record_qc_result(QcResult::Passed.as_str());
                info!(
                    barcode = %barcode,
                    inspector_id = %inspector,
                    attempt = inspection.attempt,
                    "QC passed, unit ready for sale"
                );

                let released_from = exit.released_bin_id;
                let (journey, bin_warning) = self
                    .bins
                    .settle(
                        exit.journey.into(),
                        released_from,
                        request.target_bin_id,
                        inspector,
                    )
                    .await;

                Ok(QcSubmitResponse {
                    journey: journey.into(),
                    inspection: inspection.into(),
                    bin_warning,
                })
            }
            QcDecision::Fail { reason } => {
                let Some((entity, inspection)) = self
                    .journeys
                    .qc_fail(&barcode, inspector, &reason, &request.photos)
                    .await?
                else {
                    return Err(self.explain_refusal(&barcode, request.result, request.reason()).await);
                };

                record_transition(from, to);
                record_qc_result(QcResult::Failed.as_str());
                let journey: Journey = entity.into();
                warn!(
                    barcode = %barcode,
                    inspector_id = %inspector,
                    rework_count = journey.rework_count,
                    reason = %reason,
                    "QC failed, unit returned for rework"
                );

                Ok(QcSubmitResponse {
                    journey: journey.into(),
                    inspection: inspection.into(),
                    bin_warning: None,
                })
            }
        }
    }

    /// Re-evaluates against the current row after a lost compare-and-set.
    async fn explain_refusal(
        &self,
        barcode: &str,
        result: QcResult,
        reason: Option<&str>,
    ) -> BuildlineError {
        let journey = match self.load(barcode).await {
            Ok(journey) => journey,
            Err(err) => return err,
        };
        match evaluate_submission(&journey, result, reason) {
            Err(err) => err,
            Ok(_) => BuildlineError::InvalidTransition {
                barcode: journey.barcode,
                status: journey.current_status,
                action: Action::SubmitQc.verb(),
            },
        }
    }
}
