//! Bin endpoints: registry, capacity statistics, manual moves.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use domain::models::bin::{
    BinStatistics, CreateBinRequest, ListBinsQuery, MoveBinRequest, MoveBinResponse,
    StatisticsQuery, UpdateBinRequest,
};
use domain::models::{Bin, BinMovement};
use tracing::info;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::Actor;
use crate::services::BinCapacityManager;

fn manager(state: &AppState) -> BinCapacityManager {
    BinCapacityManager::new(state.pool.clone())
}

/// POST /api/v1/buildline/bins
pub async fn create_bin(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<CreateBinRequest>,
) -> Result<(StatusCode, Json<Bin>), ApiError> {
    let bin = manager(&state).create_bin(request).await?;
    info!(
        bin_id = %bin.id,
        code = %bin.code,
        zone = %bin.zone,
        capacity = bin.capacity,
        created_by = %actor.id,
        "Bin created"
    );
    Ok((StatusCode::CREATED, Json(bin)))
}

/// GET /api/v1/buildline/bins
pub async fn list_bins(
    State(state): State<AppState>,
    Query(query): Query<ListBinsQuery>,
) -> Result<Json<Vec<Bin>>, ApiError> {
    Ok(Json(manager(&state).list_bins(query).await?))
}

/// GET /api/v1/buildline/bins/:id
pub async fn get_bin(
    State(state): State<AppState>,
    Path(bin_id): Path<Uuid>,
) -> Result<Json<Bin>, ApiError> {
    Ok(Json(manager(&state).get_bin(bin_id).await?))
}

/// Change capacity or retire a bin. Capacity may not drop below the
/// current occupancy.
///
/// PATCH /api/v1/buildline/bins/:id
pub async fn update_bin(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(bin_id): Path<Uuid>,
    Json(request): Json<UpdateBinRequest>,
) -> Result<Json<Bin>, ApiError> {
    let bin = manager(&state).update_bin(bin_id, request).await?;
    info!(
        bin_id = %bin.id,
        capacity = bin.capacity,
        is_active = bin.is_active,
        updated_by = %actor.id,
        "Bin updated"
    );
    Ok(Json(bin))
}

/// GET /api/v1/buildline/bins/statistics
pub async fn statistics(
    State(state): State<AppState>,
    Query(query): Query<StatisticsQuery>,
) -> Result<Json<BinStatistics>, ApiError> {
    let stats = manager(&state)
        .statistics(query.location_id, query.zone)
        .await?;
    Ok(Json(stats))
}

/// Move a unit to another bin by hand.
///
/// POST /api/v1/buildline/bins/move
pub async fn move_unit(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<MoveBinRequest>,
) -> Result<Json<MoveBinResponse>, ApiError> {
    Ok(Json(manager(&state).move_unit(request, actor.id).await?))
}

/// GET /api/v1/buildline/bins/movement-history/:journey_id
pub async fn movement_history(
    State(state): State<AppState>,
    Path(journey_id): Path<Uuid>,
) -> Result<Json<Vec<BinMovement>>, ApiError> {
    Ok(Json(manager(&state).movement_history(journey_id).await?))
}
