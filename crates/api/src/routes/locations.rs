//! Facility endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use domain::models::location::CreateLocationRequest;
use domain::models::Location;
use tracing::info;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::Actor;
use crate::services::BinCapacityManager;

/// POST /api/v1/buildline/locations
pub async fn create_location(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<CreateLocationRequest>,
) -> Result<(StatusCode, Json<Location>), ApiError> {
    let location = BinCapacityManager::new(state.pool.clone())
        .create_location(request)
        .await?;
    info!(
        location_id = %location.id,
        code = %location.code,
        created_by = %actor.id,
        "Location created"
    );
    Ok((StatusCode::CREATED, Json(location)))
}

/// GET /api/v1/buildline/locations
pub async fn list_locations(
    State(state): State<AppState>,
) -> Result<Json<Vec<Location>>, ApiError> {
    let locations = BinCapacityManager::new(state.pool.clone())
        .list_locations()
        .await?;
    Ok(Json(locations))
}

/// GET /api/v1/buildline/locations/:id
pub async fn get_location(
    State(state): State<AppState>,
    Path(location_id): Path<Uuid>,
) -> Result<Json<Location>, ApiError> {
    let location = BinCapacityManager::new(state.pool.clone())
        .get_location(location_id)
        .await?;
    Ok(Json(location))
}
