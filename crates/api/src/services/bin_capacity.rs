//! Bin capacity manager.
//!
//! Occupancy is only ever changed by single conditional UPDATEs on the bin
//! row, so no in-process lock is needed. Reservations are bounded by capacity
//! and gated on `is_active`; releases are floored at zero and never fail on an
//! over-release, which is reported as an accounting anomaly instead.

use domain::models::bin::{
    BinStatistics, CreateBinRequest, ListBinsQuery, MoveBinRequest, MoveBinResponse,
    UpdateBinRequest,
};
use domain::models::journey::ErrorSummary;
use domain::models::location::CreateLocationRequest;
use domain::models::{Bin, BinMovement, Journey, JourneyStatus, Location, MovementOutcome, Zone};
use domain::BuildlineError;
use persistence::entities::BinReleaseEntity;
use persistence::repositories::{
    BinMovementRepository, BinRepository, JourneyRepository, LocationRepository, NewBin,
    NewBinMovement, ZoneExit,
};
use shared::validation::normalize_barcode;
use sqlx::PgPool;
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::error::ApiError;
use crate::middleware::metrics::{record_bin_accounting_anomaly, record_bin_reservation};

/// Candidates tried when auto-selecting a bin before giving up.
const MAX_PLACEMENT_ATTEMPTS: usize = 3;

/// Statuses whose implied zone is `zone`.
pub fn statuses_in_zone(zone: Zone) -> Vec<&'static str> {
    JourneyStatus::ALL
        .iter()
        .filter(|s| s.zone() == zone)
        .map(|s| s.as_str())
        .collect()
}

/// Why a conditional reservation on `bin` did not apply.
pub fn reservation_refusal(
    bin: &Bin,
    zone: Option<Zone>,
    location_id: Option<Uuid>,
) -> BuildlineError {
    if !bin.is_active {
        return BuildlineError::BinInactive { bin_id: bin.id };
    }
    if let Some(expected) = zone.filter(|z| *z != bin.zone) {
        return BuildlineError::BinZoneMismatch {
            bin_id: bin.id,
            expected,
            actual: bin.zone,
        };
    }
    if let Some(location_id) = location_id.filter(|l| *l != bin.location_id) {
        return BuildlineError::BinLocationMismatch {
            bin_id: bin.id,
            location_id,
        };
    }
    BuildlineError::BinFull {
        bin_id: bin.id,
        capacity: bin.capacity,
        occupancy: bin.current_occupancy,
    }
}

/// Movement row to write. `to_bin_id` is the intended target, even on failure.
struct MovementRecord<'a> {
    journey_id: Uuid,
    from_bin_id: Option<Uuid>,
    to_bin_id: Option<Uuid>,
    outcome: MovementOutcome,
    failure_code: Option<&'static str>,
    moved_by: Option<Uuid>,
    reason: Option<&'a str>,
}

#[derive(Clone)]
pub struct BinCapacityManager {
    bins: BinRepository,
    journeys: JourneyRepository,
    movements: BinMovementRepository,
    locations: LocationRepository,
}

impl BinCapacityManager {
    pub fn new(pool: PgPool) -> Self {
        Self {
            bins: BinRepository::new(pool.clone()),
            journeys: JourneyRepository::new(pool.clone()),
            movements: BinMovementRepository::new(pool.clone()),
            locations: LocationRepository::new(pool),
        }
    }

    /// Takes `count` slots in a bin, or fails without changing anything.
    pub async fn reserve(&self, bin_id: Uuid, count: i32) -> Result<Bin, BuildlineError> {
        self.reserve_checked(bin_id, count, None, None).await
    }

    /// Reservation restricted to a zone and location, used for placements.
    pub async fn reserve_in_zone(
        &self,
        bin_id: Uuid,
        count: i32,
        zone: Zone,
        location_id: Uuid,
    ) -> Result<Bin, BuildlineError> {
        self.reserve_checked(bin_id, count, Some(zone), Some(location_id))
            .await
    }

    async fn reserve_checked(
        &self,
        bin_id: Uuid,
        count: i32,
        zone: Option<Zone>,
        location_id: Option<Uuid>,
    ) -> Result<Bin, BuildlineError> {
        if count < 1 {
            return Err(BuildlineError::Validation(
                "count: must be at least 1".to_string(),
            ));
        }

        let reserved = self
            .bins
            .try_reserve(bin_id, count, zone.map(|z| z.as_str()), location_id)
            .await?;

        match reserved {
            Some(bin) => {
                record_bin_reservation("reserved");
                debug!(bin_id = %bin_id, occupancy = bin.current_occupancy, "Bin slot reserved");
                Ok(bin.into())
            }
            None => {
                let err = match self.bins.find_by_id(bin_id).await? {
                    Some(bin) => reservation_refusal(&bin.into(), zone, location_id),
                    None => BuildlineError::BinNotFound { bin_id },
                };
                record_bin_reservation(err.code());
                Err(err)
            }
        }
    }

    /// Frees `count` slots, floored at zero. Returns the occupancy afterwards.
    pub async fn release(&self, bin_id: Uuid, count: i32) -> Result<i32, BuildlineError> {
        if count < 1 {
            return Err(BuildlineError::Validation(
                "count: must be at least 1".to_string(),
            ));
        }

        let release = self
            .bins
            .release(bin_id, count)
            .await?
            .ok_or(BuildlineError::BinNotFound { bin_id })?;
        Self::note_release(bin_id, count, &release);
        Ok(release.current_occupancy)
    }

    /// Reports an over-release. Never an error for the caller.
    pub fn note_release(bin_id: Uuid, requested: i32, release: &BinReleaseEntity) {
        if release.was_clamped(requested) {
            let anomaly = BuildlineError::BinAccountingAnomaly {
                bin_id,
                previous: release.previous_occupancy,
                requested,
            };
            record_bin_accounting_anomaly();
            warn!(
                bin_id = %bin_id,
                previous_occupancy = release.previous_occupancy,
                requested,
                code = anomaly.code(),
                "{}",
                anomaly
            );
        }
    }

    /// Checks the release done inside a zone-crossing transaction.
    pub fn note_zone_exit(exit: &ZoneExit) {
        match (exit.released_bin_id, exit.release.as_ref()) {
            (Some(bin_id), Some(release)) => Self::note_release(bin_id, 1, release),
            (Some(bin_id), None) => {
                warn!(bin_id = %bin_id, "Unit left a bin that no longer exists")
            }
            _ => {}
        }
    }

    /// Puts a unit that just entered its zone into a bin: `preferred` if
    /// given, otherwise the least utilised active bin of the zone at the
    /// unit's location. `released_from` is the bin it left, for the movement
    /// log.
    ///
    /// `Ok(None)` means no bin had room; the unit stays unbinned. A refused
    /// preferred bin is returned as the error.
    pub async fn place(
        &self,
        journey: &Journey,
        released_from: Option<Uuid>,
        preferred: Option<Uuid>,
        moved_by: Option<Uuid>,
    ) -> Result<Option<Bin>, BuildlineError> {
        let zone = journey.zone();
        let location_id = journey.current_location_id;

        let reserved = match preferred {
            Some(bin_id) => self
                .reserve_in_zone(bin_id, 1, zone, location_id)
                .await
                .map(Some),
            None => self.reserve_least_utilised(zone, location_id).await,
        };

        let bin = match reserved {
            Ok(Some(bin)) => bin,
            Ok(None) => {
                warn!(
                    barcode = %journey.barcode,
                    zone = %zone,
                    location_id = %location_id,
                    "No bin with free capacity; unit left unbinned"
                );
                if released_from.is_some() {
                    self.record_movement(MovementRecord {
                        journey_id: journey.id,
                        from_bin_id: released_from,
                        to_bin_id: None,
                        outcome: MovementOutcome::Released,
                        failure_code: None,
                        moved_by,
                        reason: Some(journey.current_status.as_str()),
                    })
                    .await?;
                }
                return Ok(None);
            }
            Err(err) => {
                if err.is_bin_placement_failure() {
                    warn!(barcode = %journey.barcode, error = %err, "Bin placement failed");
                    self.record_movement(MovementRecord {
                        journey_id: journey.id,
                        from_bin_id: released_from,
                        to_bin_id: preferred,
                        outcome: MovementOutcome::Failed,
                        failure_code: Some(err.code()),
                        moved_by,
                        reason: Some(journey.current_status.as_str()),
                    })
                    .await?;
                }
                return Err(err);
            }
        };

        let attached = self
            .journeys
            .attach_bin(journey.id, bin.id, &statuses_in_zone(zone))
            .await?;

        if !attached {
            // The unit moved on or got a bin concurrently; hand the slot back.
            self.release(bin.id, 1).await?;
            warn!(barcode = %journey.barcode, bin_id = %bin.id, "Unit changed during placement");
            return Ok(None);
        }

        self.record_movement(MovementRecord {
            journey_id: journey.id,
            from_bin_id: released_from,
            to_bin_id: Some(bin.id),
            outcome: MovementOutcome::Moved,
            failure_code: None,
            moved_by,
            reason: Some(journey.current_status.as_str()),
        })
        .await?;

        info!(
            barcode = %journey.barcode,
            bin_id = %bin.id,
            bin_code = %bin.code,
            zone = %zone,
            "Unit placed in bin"
        );
        Ok(Some(bin))
    }

    /// [`place`](Self::place) after a committed zone change: failures become a
    /// warning for the response instead of an error.
    pub async fn settle(
        &self,
        mut journey: Journey,
        released_from: Option<Uuid>,
        preferred: Option<Uuid>,
        actor: Uuid,
    ) -> (Journey, Option<ErrorSummary>) {
        match self
            .place(&journey, released_from, preferred, Some(actor))
            .await
        {
            Ok(bin) => {
                journey.current_bin_id = bin.map(|b| b.id);
                (journey, None)
            }
            Err(err) if err.is_bin_placement_failure() => {
                journey.current_bin_id = None;
                (journey, Some(ErrorSummary::from(&err)))
            }
            Err(err) => {
                // The transition already committed; report, don't fail it.
                error!(barcode = %journey.barcode, error = %err, "Bin placement aborted");
                journey.current_bin_id = None;
                (
                    journey,
                    Some(ErrorSummary {
                        error: err.code().to_string(),
                        message: "Bin placement could not be completed".to_string(),
                    }),
                )
            }
        }
    }

    async fn reserve_least_utilised(
        &self,
        zone: Zone,
        location_id: Uuid,
    ) -> Result<Option<Bin>, BuildlineError> {
        let mut refused: Vec<Uuid> = Vec::new();

        for _ in 0..MAX_PLACEMENT_ATTEMPTS {
            let Some(candidate) = self
                .bins
                .find_placement_candidate(location_id, zone.as_str(), &refused)
                .await?
            else {
                return Ok(None);
            };

            match self
                .bins
                .try_reserve(candidate.id, 1, Some(zone.as_str()), Some(location_id))
                .await?
            {
                Some(bin) => {
                    record_bin_reservation("reserved");
                    return Ok(Some(bin.into()));
                }
                None => {
                    // Filled up between the read and the update.
                    record_bin_reservation("contended");
                    refused.push(candidate.id);
                }
            }
        }

        Ok(None)
    }

    /// Manual relocation: release the current bin, then reserve the target.
    ///
    /// The two steps are separate. If the target refuses, the release stands
    /// and the unit is left unbinned. A movement row is written either way.
    pub async fn move_unit(
        &self,
        request: MoveBinRequest,
        moved_by: Uuid,
    ) -> Result<MoveBinResponse, BuildlineError> {
        request
            .validate()
            .map_err(|e| BuildlineError::from_validation(&e))?;

        let barcode = normalize_barcode(&request.barcode);
        let journey: Journey = self
            .journeys
            .find_by_barcode(&barcode)
            .await?
            .ok_or_else(|| BuildlineError::JourneyNotFound {
                barcode: barcode.clone(),
            })?
            .into();

        let reason = request.reason.as_deref();
        let to_bin_id = request.to_bin_id;
        let from_bin_id = journey.current_bin_id;

        let rejection = if request.from_bin_id.is_some() && request.from_bin_id != from_bin_id {
            Some(BuildlineError::Validation(format!(
                "from_bin_id: unit {} is not in that bin",
                barcode
            )))
        } else if from_bin_id == Some(to_bin_id) {
            Some(BuildlineError::Validation(format!(
                "to_bin_id: unit {} is already in that bin",
                barcode
            )))
        } else {
            None
        };

        if let Some(err) = rejection {
            self.record_failed_move(journey.id, from_bin_id, to_bin_id, &err, moved_by, reason)
                .await;
            return Err(err);
        }

        if let Some(from) = from_bin_id {
            match self.journeys.detach_bin(journey.id, from).await? {
                Some(release) => {
                    if let Some(release) = release {
                        Self::note_release(from, 1, &release);
                    }
                }
                None => {
                    return Err(BuildlineError::Validation(format!(
                        "unit {} changed bins concurrently; retry",
                        barcode
                    )));
                }
            }
        }

        let zone = journey.zone();
        match self
            .reserve_in_zone(to_bin_id, 1, zone, journey.current_location_id)
            .await
        {
            Ok(bin) => {
                let attached = self
                    .journeys
                    .attach_bin(journey.id, bin.id, &statuses_in_zone(zone))
                    .await?;

                if !attached {
                    self.release(bin.id, 1).await?;
                    let err = BuildlineError::Validation(format!(
                        "unit {} changed status during the move; retry",
                        barcode
                    ));
                    self.record_failed_move(journey.id, from_bin_id, to_bin_id, &err, moved_by, reason)
                        .await;
                    return Err(err);
                }

                let movement = self
                    .record_movement(MovementRecord {
                        journey_id: journey.id,
                        from_bin_id,
                        to_bin_id: Some(bin.id),
                        outcome: MovementOutcome::Moved,
                        failure_code: None,
                        moved_by: Some(moved_by),
                        reason,
                    })
                    .await?;

                info!(
                    barcode = %barcode,
                    from_bin_id = ?from_bin_id,
                    to_bin_id = %bin.id,
                    moved_by = %moved_by,
                    "Unit moved between bins"
                );

                Ok(MoveBinResponse {
                    barcode,
                    current_bin_id: Some(bin.id),
                    movement,
                })
            }
            Err(err) => {
                self.record_failed_move(journey.id, from_bin_id, to_bin_id, &err, moved_by, reason)
                    .await;
                warn!(
                    barcode = %barcode,
                    to_bin_id = %to_bin_id,
                    error = %err,
                    "Bin move failed after release; unit left unbinned"
                );
                Err(err)
            }
        }
    }

    /// Writes the `failed` movement row for a refused move. The refusal is
    /// what the caller reports, so a failed write is only logged. An unknown
    /// target bin is recorded without a target.
    async fn record_failed_move(
        &self,
        journey_id: Uuid,
        from_bin_id: Option<Uuid>,
        to_bin_id: Uuid,
        err: &BuildlineError,
        moved_by: Uuid,
        reason: Option<&str>,
    ) -> Option<BinMovement> {
        let to_bin_id = match err {
            BuildlineError::BinNotFound { .. } => None,
            _ => Some(to_bin_id),
        };
        let recorded = self
            .record_movement(MovementRecord {
                journey_id,
                from_bin_id,
                to_bin_id,
                outcome: MovementOutcome::Failed,
                failure_code: Some(err.code()),
                moved_by: Some(moved_by),
                reason,
            })
            .await;
        match recorded {
            Ok(movement) => Some(movement),
            Err(write_err) => {
                error!(
                    journey_id = %journey_id,
                    failure_code = err.code(),
                    error = %write_err,
                    "Could not record failed bin move"
                );
                None
            }
        }
    }

    async fn record_movement(
        &self,
        record: MovementRecord<'_>,
    ) -> Result<BinMovement, BuildlineError> {
        let entity = self
            .movements
            .record(NewBinMovement {
                journey_id: record.journey_id,
                from_bin_id: record.from_bin_id,
                to_bin_id: record.to_bin_id,
                outcome: record.outcome.as_str(),
                failure_code: record.failure_code,
                moved_by: record.moved_by,
                reason: record.reason.map(str::to_string),
            })
            .await?;
        Ok(entity.into())
    }

    pub async fn find_bin(&self, bin_id: Uuid) -> Result<Option<Bin>, BuildlineError> {
        Ok(self.bins.find_by_id(bin_id).await?.map(Into::into))
    }

    pub async fn movement_history(
        &self,
        journey_id: Uuid,
    ) -> Result<Vec<BinMovement>, BuildlineError> {
        let movements = self.movements.list_for_journey(journey_id).await?;
        Ok(movements.into_iter().map(Into::into).collect())
    }

    /// Per-zone totals read from committed rows.
    pub async fn statistics(
        &self,
        location_id: Option<Uuid>,
        zone: Option<Zone>,
    ) -> Result<BinStatistics, BuildlineError> {
        let rows = self
            .bins
            .statistics(location_id, zone.map(|z| z.as_str()))
            .await?;
        let zones = rows.into_iter().filter_map(|r| r.into_domain()).collect();
        Ok(BinStatistics::from_zone_rows(location_id, zone, zones))
    }

    // ------------------------------------------------------------------
    // Locations and bins
    // ------------------------------------------------------------------

    pub async fn create_location(
        &self,
        request: CreateLocationRequest,
    ) -> Result<Location, ApiError> {
        request.validate()?;
        let location = self
            .locations
            .create(
                &request.code,
                request.name.trim(),
                request.location_type.as_str(),
            )
            .await?;
        info!(location_id = %location.id, code = %location.code, "Location created");
        Ok(location.into())
    }

    pub async fn list_locations(&self) -> Result<Vec<Location>, ApiError> {
        let locations = self.locations.list().await?;
        Ok(locations.into_iter().map(Into::into).collect())
    }

    pub async fn get_location(&self, location_id: Uuid) -> Result<Location, ApiError> {
        self.locations
            .find_by_id(location_id)
            .await?
            .map(Into::into)
            .ok_or_else(|| BuildlineError::LocationNotFound { location_id }.into())
    }

    pub async fn create_bin(&self, request: CreateBinRequest) -> Result<Bin, ApiError> {
        request.validate()?;
        if self.locations.find_by_id(request.location_id).await?.is_none() {
            return Err(BuildlineError::LocationNotFound {
                location_id: request.location_id,
            }
            .into());
        }

        let bin = self
            .bins
            .create(&NewBin {
                location_id: request.location_id,
                code: request.code,
                name: request.name,
                zone: request.zone.as_str(),
                capacity: request.capacity,
                is_active: request.is_active,
            })
            .await?;
        info!(
            bin_id = %bin.id,
            code = %bin.code,
            zone = %bin.zone,
            capacity = bin.capacity,
            "Bin created"
        );
        Ok(bin.into())
    }

    pub async fn list_bins(&self, query: ListBinsQuery) -> Result<Vec<Bin>, ApiError> {
        let bins = self
            .bins
            .list(
                query.location_id,
                query.zone.map(|z| z.as_str()),
                query.include_inactive,
            )
            .await?;
        Ok(bins.into_iter().map(Into::into).collect())
    }

    pub async fn get_bin(&self, bin_id: Uuid) -> Result<Bin, ApiError> {
        self.bins
            .find_by_id(bin_id)
            .await?
            .map(Into::into)
            .ok_or_else(|| BuildlineError::BinNotFound { bin_id }.into())
    }

    /// Capacity may not drop below the bin's current occupancy.
    pub async fn update_bin(
        &self,
        bin_id: Uuid,
        request: UpdateBinRequest,
    ) -> Result<Bin, ApiError> {
        request.validate()?;
        let updated = self
            .bins
            .update(
                bin_id,
                request.name.as_deref(),
                request.capacity,
                request.is_active,
            )
            .await?;

        match updated {
            Some(bin) => {
                info!(bin_id = %bin_id, capacity = bin.capacity, is_active = bin.is_active, "Bin updated");
                Ok(bin.into())
            }
            None => {
                let current = self
                    .bins
                    .find_by_id(bin_id)
                    .await?
                    .ok_or(BuildlineError::BinNotFound { bin_id })?;
                Err(BuildlineError::Validation(format!(
                    "capacity: cannot be below current occupancy {}",
                    current.current_occupancy
                ))
                .into())
            }
        }
    }
}
