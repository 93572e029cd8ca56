//! Journey state machine.
//!
//! Every transition is one compare-and-set in the journey repository. When it
//! does not apply, the unit is reloaded and the pure guards in
//! `domain::services::transitions` explain why. Bin placement after a zone
//! crossing is best-effort: the transition stands and a warning is returned.

use domain::models::board::BikeDetail;
use domain::models::history::JourneyHistory;
use domain::models::journey::{
    AssignRequest, BulkFailure, BulkInwardRequest, BulkResult, CanInvoiceResponse, ChecklistUpdateRequest,
    CompleteRequest, DamageReportRequest, InwardRequest, JourneyResponse, Ownership,
    PartsMissingRequest, ScanResponse, SetPriorityRequest, TransitionResponse,
};
use domain::models::{ChecklistSchema, ChecklistVersion, ChecklistView, Journey, Technician};
use domain::services::transitions::{
    ensure_can_assign, ensure_can_complete, ensure_can_flag, ensure_can_set_priority,
    ensure_can_start, ensure_can_work,
};
use domain::services::Action;
use domain::BuildlineError;
use persistence::repositories::{
    FlagUpdate, JourneyRepository, LocationRepository, NewJourney, QcInspectionRepository,
    StatusHistoryRepository, TechnicianRepository,
};
use persistence::{is_foreign_key_violation, is_unique_violation};
use shared::validation::normalize_barcode;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use super::bin_capacity::BinCapacityManager;
use super::{bulk_failure, check_bulk_size};
use crate::config::BuildlineConfig;
use crate::middleware::metrics::record_transition;

/// The guard held when reloaded, so the compare-and-set lost a race.
fn concurrent_change(journey: &Journey, action: Action) -> BuildlineError {
    BuildlineError::InvalidTransition {
        barcode: journey.barcode.clone(),
        status: journey.current_status,
        action: action.verb(),
    }
}

/// Trims free text and drops it when blank.
fn clean_notes(notes: Option<String>) -> Option<String> {
    notes
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
}

#[derive(Clone)]
pub struct JourneyEngine {
    journeys: JourneyRepository,
    technicians: TechnicianRepository,
    locations: LocationRepository,
    history: StatusHistoryRepository,
    inspections: QcInspectionRepository,
    bins: BinCapacityManager,
    max_bulk_size: usize,
}

impl JourneyEngine {
    pub fn new(pool: PgPool, config: &BuildlineConfig) -> Self {
        Self {
            journeys: JourneyRepository::new(pool.clone()),
            technicians: TechnicianRepository::new(pool.clone()),
            locations: LocationRepository::new(pool.clone()),
            history: StatusHistoryRepository::new(pool.clone()),
            inspections: QcInspectionRepository::new(pool.clone()),
            bins: BinCapacityManager::new(pool),
            max_bulk_size: config.max_bulk_size,
        }
    }

    /// Loads a unit by barcode.
    pub async fn load(&self, barcode: &str) -> Result<Journey, BuildlineError> {
        self.journeys
            .find_by_barcode(barcode)
            .await?
            .map(Into::into)
            .ok_or_else(|| BuildlineError::JourneyNotFound {
                barcode: barcode.to_string(),
            })
    }

    // ------------------------------------------------------------------
    // Intake
    // ------------------------------------------------------------------

    /// Creates a unit in `inwarded`. A requested inward bin is reserved
    /// best-effort: if it refuses, the unit is still created, unbinned.
    pub async fn inward(
        &self,
        mut request: InwardRequest,
        actor: Uuid,
    ) -> Result<TransitionResponse, BuildlineError> {
        request.barcode = normalize_barcode(&request.barcode);
        request
            .validate()
            .map_err(|e| BuildlineError::from_validation(&e))?;

        let location_id = request.location_id;
        if self.locations.find_by_id(location_id).await?.is_none() {
            return Err(BuildlineError::LocationNotFound { location_id });
        }

        let created = self
            .journeys
            .create(
                &NewJourney {
                    barcode: request.barcode.clone(),
                    model_sku: request.model_sku.trim().to_string(),
                    frame_number: request.frame_number.clone(),
                    grn_reference: request.grn_reference.clone(),
                    location_id,
                    checklist_version: ChecklistVersion::CURRENT.as_i32(),
                },
                Some(actor),
            )
            .await;

        let journey: Journey = match created {
            Ok(entity) => entity.into(),
            Err(e) if is_unique_violation(&e) => {
                return Err(BuildlineError::DuplicateBarcode {
                    barcode: request.barcode,
                })
            }
            Err(e) if is_foreign_key_violation(&e) => {
                return Err(BuildlineError::LocationNotFound { location_id })
            }
            Err(e) => return Err(e.into()),
        };

        record_transition("none", "inwarded");
        info!(
            barcode = %journey.barcode,
            journey_id = %journey.id,
            location_id = %location_id,
            inwarded_by = %actor,
            "Unit inwarded"
        );

        let (journey, bin_warning) = match request.bin_location_id {
            Some(bin_id) => self.bins.settle(journey, None, Some(bin_id), actor).await,
            None => (journey, None),
        };

        Ok(TransitionResponse {
            journey: journey.into(),
            bin_warning,
        })
    }

    /// Inwards each unit independently.
    pub async fn bulk_inward(
        &self,
        request: BulkInwardRequest,
        actor: Uuid,
    ) -> Result<BulkResult, BuildlineError> {
        check_bulk_size(request.units.len(), self.max_bulk_size)?;

        let mut result = BulkResult::default();
        for unit in request.units {
            let barcode = normalize_barcode(&unit.barcode);
            match self.inward(unit, actor).await {
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
                Err(err) => result.failed.push(bulk_failure(barcode, &err)),
            }
        }

        info!(
            successful = result.successful.len(),
            failed = result.failed.len(),
            "Bulk inward processed"
        );
        Ok(result)
    }

    // ------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------

    /// `inwarded -> assigned`. Moves the unit from its inward bin to the
    /// requested or least utilised assembly bin.
    pub async fn assign(
        &self,
        request: AssignRequest,
        supervisor: Uuid,
    ) -> Result<TransitionResponse, BuildlineError> {
        let barcode = normalize_barcode(&request.barcode);
        let technician_id = request.technician_id;

        let technician: Option<Technician> = self
            .technicians
            .find_by_id(technician_id)
            .await?
            .map(Into::into);
        if !technician.is_some_and(|t| t.can_take_assembly_work()) {
            return Err(BuildlineError::TechnicianNotFound { technician_id });
        }

        let Some(exit) = self
            .journeys
            .assign(&barcode, technician_id, supervisor)
            .await?
        else {
            let journey = self.load(&barcode).await?;
            ensure_can_assign(&journey)?;
            return Err(concurrent_change(&journey, Action::Assign));
        };

        BinCapacityManager::note_zone_exit(&exit);
        record_transition("inwarded", "assigned");
        info!(
            barcode = %barcode,
            technician_id = %technician_id,
            supervisor_id = %supervisor,
            "Unit assigned"
        );

        let released_from = exit.released_bin_id;
        let (journey, bin_warning) = self
            .bins
            .settle(
                exit.journey.into(),
                released_from,
                request.target_bin_id,
                supervisor,
            )
            .await;

        Ok(TransitionResponse {
            journey: journey.into(),
            bin_warning,
        })
    }

    /// `assigned -> in_progress` for the assigned technician only.
    pub async fn start(
        &self,
        barcode: &str,
        requester: Uuid,
    ) -> Result<JourneyResponse, BuildlineError> {
        let barcode = normalize_barcode(barcode);

        match self.journeys.start(&barcode, requester).await? {
            Some(entity) => {
                record_transition("assigned", "in_progress");
                info!(barcode = %barcode, technician_id = %requester, "Assembly started");
                Ok(Journey::from(entity).into())
            }
            None => {
                let journey = self.load(&barcode).await?;
                ensure_can_start(&journey, requester)?;
                Err(concurrent_change(&journey, Action::Start))
            }
        }
    }

    /// Per-key checklist save. Never changes status.
    pub async fn update_checklist(
        &self,
        request: ChecklistUpdateRequest,
        requester: Uuid,
    ) -> Result<ChecklistView, BuildlineError> {
        let barcode = normalize_barcode(&request.barcode);
        if request.checklist.is_empty() {
            return Err(BuildlineError::Validation(
                "checklist: at least one item is required".to_string(),
            ));
        }

        let journey = self
            .merge_checklist(&barcode, requester, &request.checklist, Action::UpdateChecklist)
            .await?;
        info!(
            barcode = %barcode,
            technician_id = %requester,
            items = request.checklist.len(),
            "Checklist saved"
        );
        Ok(ChecklistView::new(
            &journey.barcode,
            &journey.checklist,
            ChecklistSchema::current(),
        ))
    }

    async fn merge_checklist(
        &self,
        barcode: &str,
        requester: Uuid,
        patch: &domain::models::ChecklistPatch,
        action: Action,
    ) -> Result<Journey, BuildlineError> {
        ChecklistSchema::current().validate_patch(patch)?;
        let patch_json = serde_json::to_value(patch)
            .map_err(|e| BuildlineError::Validation(format!("checklist: {}", e)))?;

        match self
            .journeys
            .merge_checklist(barcode, requester, &patch_json)
            .await?
        {
            Some(entity) => Ok(entity.into()),
            None => {
                let journey = self.load(barcode).await?;
                ensure_can_work(&journey, requester, action)?;
                Err(concurrent_change(&journey, action))
            }
        }
    }

    /// Marks assembly complete and hands the unit to QC. The final checklist
    /// is merged first, so progress is kept even when completion is refused.
    pub async fn complete(
        &self,
        request: CompleteRequest,
        requester: Uuid,
    ) -> Result<JourneyResponse, BuildlineError> {
        let barcode = normalize_barcode(&request.barcode);
        let schema = ChecklistSchema::current();

        let journey = if request.checklist.is_empty() {
            let journey = self.load(&barcode).await?;
            ensure_can_work(&journey, requester, Action::Complete)?;
            journey
        } else {
            self.merge_checklist(&barcode, requester, &request.checklist, Action::Complete)
                .await?
        };

        ensure_can_complete(&journey, &journey.checklist, schema)?;

        match self
            .journeys
            .complete(&barcode, requester, &schema.completion_json())
            .await?
        {
            Some(entity) => {
                info!(barcode = %barcode, technician_id = %requester, "Assembly completed, awaiting QC");
                Ok(Journey::from(entity).into())
            }
            None => {
                let journey = self.load(&barcode).await?;
                ensure_can_work(&journey, requester, Action::Complete)?;
                ensure_can_complete(&journey, &journey.checklist, schema)?;
                Err(concurrent_change(&journey, Action::Complete))
            }
        }
    }

    // ------------------------------------------------------------------
    // Side attributes
    // ------------------------------------------------------------------

    pub async fn set_priority(
        &self,
        request: SetPriorityRequest,
        supervisor: Uuid,
    ) -> Result<JourneyResponse, BuildlineError> {
        let barcode = normalize_barcode(&request.barcode);

        match self
            .journeys
            .set_priority(&barcode, request.priority)
            .await?
        {
            Some(entity) => {
                info!(
                    barcode = %barcode,
                    priority = request.priority,
                    supervisor_id = %supervisor,
                    "Priority updated"
                );
                Ok(Journey::from(entity).into())
            }
            None => {
                let journey = self.load(&barcode).await?;
                ensure_can_set_priority(&journey)?;
                Err(concurrent_change(&journey, Action::SetPriority))
            }
        }
    }

    /// Raises or clears the parts-missing flag. Technicians may only flag
    /// units they hold; supervisors may flag any.
    pub async fn flag_parts_missing(
        &self,
        request: PartsMissingRequest,
        actor: Uuid,
        is_supervisor: bool,
    ) -> Result<JourneyResponse, BuildlineError> {
        request
            .validate()
            .map_err(|e| BuildlineError::from_validation(&e))?;
        let barcode = normalize_barcode(&request.barcode);

        let update = FlagUpdate {
            owner: (!is_supervisor).then_some(actor),
            flagged: request.parts_missing,
            notes: clean_notes(request.notes),
            items: if request.parts_missing {
                request
                    .missing_parts
                    .iter()
                    .map(|p| p.trim().to_string())
                    .collect()
            } else {
                Vec::new()
            },
        };

        match self.journeys.flag_parts_missing(&barcode, &update).await? {
            Some(entity) => {
                info!(
                    barcode = %barcode,
                    flagged = update.flagged,
                    parts = update.items.len(),
                    actor_id = %actor,
                    "Parts-missing flag updated"
                );
                Ok(Journey::from(entity).into())
            }
            None => {
                let journey = self.load(&barcode).await?;
                ensure_can_flag(&journey, actor, is_supervisor)?;
                Err(concurrent_change(&journey, Action::Flag))
            }
        }
    }

    /// Raises or clears the damage flag, with photo references.
    pub async fn report_damage(
        &self,
        request: DamageReportRequest,
        actor: Uuid,
        is_supervisor: bool,
    ) -> Result<JourneyResponse, BuildlineError> {
        request
            .validate()
            .map_err(|e| BuildlineError::from_validation(&e))?;
        let barcode = normalize_barcode(&request.barcode);

        let update = FlagUpdate {
            owner: (!is_supervisor).then_some(actor),
            flagged: request.damage_reported,
            notes: clean_notes(request.notes),
            items: if request.damage_reported {
                request.photos
            } else {
                Vec::new()
            },
        };

        match self.journeys.report_damage(&barcode, &update).await? {
            Some(entity) => {
                if update.flagged {
                    warn!(barcode = %barcode, actor_id = %actor, photos = update.items.len(), "Damage reported");
                } else {
                    info!(barcode = %barcode, actor_id = %actor, "Damage flag cleared");
                }
                Ok(Journey::from(entity).into())
            }
            None => {
                let journey = self.load(&barcode).await?;
                ensure_can_flag(&journey, actor, is_supervisor)?;
                Err(concurrent_change(&journey, Action::Flag))
            }
        }
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// The unit as seen by the scanning actor.
    pub async fn scan(&self, barcode: &str, actor: Uuid) -> Result<ScanResponse, BuildlineError> {
        let barcode = normalize_barcode(barcode);
        let row = self
            .journeys
            .find_with_technician(&barcode)
            .await?
            .ok_or_else(|| BuildlineError::JourneyNotFound {
                barcode: barcode.clone(),
            })?;

        let journey: Journey = row.journey.into();
        let ownership = Ownership {
            is_assigned_to_me: journey.is_assigned_to(actor),
            assigned_technician_name: row.technician_name,
        };
        let checklist_progress = ChecklistSchema::current().progress(&journey.checklist);

        Ok(ScanResponse {
            journey: journey.into(),
            ownership,
            checklist_progress,
        })
    }

    /// Billing boundary: sale-ready and QC-passed.
    pub async fn can_invoice(&self, barcode: &str) -> Result<CanInvoiceResponse, BuildlineError> {
        let journey = self.load(&normalize_barcode(barcode)).await?;
        Ok(CanInvoiceResponse::from(&journey))
    }

    pub async fn bike_detail(&self, barcode: &str) -> Result<BikeDetail, BuildlineError> {
        let barcode = normalize_barcode(barcode);
        let row = self
            .journeys
            .find_with_technician(&barcode)
            .await?
            .ok_or_else(|| BuildlineError::JourneyNotFound {
                barcode: barcode.clone(),
            })?;
        let journey: Journey = row.journey.into();

        let current_bin = match journey.current_bin_id {
            Some(bin_id) => self.bins.find_bin(bin_id).await?,
            None => None,
        };
        let status_history = self.history.list_for_journey(journey.id).await?;
        let qc_inspections = self.inspections.list_for_journey(journey.id).await?;

        let schema = ChecklistSchema::current();
        Ok(BikeDetail {
            technician_name: row.technician_name,
            current_bin,
            checklist_progress: schema.progress(&journey.checklist),
            missing_checklist_items: schema
                .missing_items(&journey.checklist)
                .into_iter()
                .map(String::from)
                .collect(),
            status_history: status_history.into_iter().map(Into::into).collect(),
            qc_inspections: qc_inspections.into_iter().map(Into::into).collect(),
            journey: journey.into(),
        })
    }

    /// Audit trail of a unit: status changes, bin movements, QC attempts.
    pub async fn history(&self, journey_id: Uuid) -> Result<JourneyHistory, BuildlineError> {
        let journey: Journey = self
            .journeys
            .find_by_id(journey_id)
            .await?
            .map(Into::into)
            .ok_or_else(|| BuildlineError::JourneyNotFound {
                barcode: journey_id.to_string(),
            })?;

        let status_history = self.history.list_for_journey(journey.id).await?;
        let bin_movements = self.bins.movement_history(journey.id).await?;
        let qc_inspections = self.inspections.list_for_journey(journey.id).await?;

        Ok(JourneyHistory::new(
            journey.id,
            journey.barcode,
            status_history.into_iter().map(Into::into).collect(),
            bin_movements,
            qc_inspections.into_iter().map(Into::into).collect(),
        ))
    }
}
