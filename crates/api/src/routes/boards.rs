//! Floor read models: kanban, dashboard, bike detail, history, queues.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use domain::models::board::{BikeDetail, BoardQuery, Dashboard, Kanban, TechnicianQueue};
use domain::models::history::JourneyHistory;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::Actor;
use crate::services::{AssignmentQueue, FloorBoard, JourneyEngine};

/// GET /api/v1/buildline/kanban
pub async fn kanban(
    State(state): State<AppState>,
    Query(query): Query<BoardQuery>,
) -> Result<Json<Kanban>, ApiError> {
    let board = FloorBoard::new(state.pool.clone(), &state.config.buildline);
    Ok(Json(board.kanban(&query).await?))
}

/// GET /api/v1/buildline/dashboard
pub async fn dashboard(
    State(state): State<AppState>,
    Query(query): Query<BoardQuery>,
) -> Result<Json<Dashboard>, ApiError> {
    let board = FloorBoard::new(state.pool.clone(), &state.config.buildline);
    Ok(Json(board.dashboard(&query).await?))
}

/// GET /api/v1/buildline/bike/:barcode
pub async fn bike_detail(
    State(state): State<AppState>,
    Path(barcode): Path<String>,
) -> Result<Json<BikeDetail>, ApiError> {
    let engine = JourneyEngine::new(state.pool.clone(), &state.config.buildline);
    Ok(Json(engine.bike_detail(&barcode).await?))
}

/// GET /api/v1/buildline/history/:journey_id
pub async fn journey_history(
    State(state): State<AppState>,
    Path(journey_id): Path<Uuid>,
) -> Result<Json<JourneyHistory>, ApiError> {
    let engine = JourneyEngine::new(state.pool.clone(), &state.config.buildline);
    Ok(Json(engine.history(journey_id).await?))
}

/// The caller's own work queue.
///
/// GET /api/v1/buildline/my-queue
pub async fn my_queue(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<TechnicianQueue>, ApiError> {
    let queue = AssignmentQueue::new(state.pool.clone(), &state.config.buildline);
    Ok(Json(queue.queue(actor.id).await?))
}
