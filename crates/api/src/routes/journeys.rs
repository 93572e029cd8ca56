//! Unit workflow endpoints: intake, assignment, assembly, flags, lookups.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use domain::models::journey::{
    AssignRequest, BarcodeRequest, BulkAssignRequest, BulkInwardRequest, BulkResult,
    CanInvoiceResponse, ChecklistUpdateRequest, CompleteRequest, DamageReportRequest,
    InwardRequest, JourneyResponse, PartsMissingRequest, ScanResponse, SetPriorityRequest,
    TransitionResponse,
};
use domain::models::{ChecklistSchema, ChecklistView};
use tracing::info;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::Actor;
use crate::services::{AssignmentQueue, ChecklistTracker, JourneyEngine};

fn engine(state: &AppState) -> JourneyEngine {
    JourneyEngine::new(state.pool.clone(), &state.config.buildline)
}

/// Register a unit on the floor.
///
/// POST /api/v1/buildline/inward
pub async fn inward(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<InwardRequest>,
) -> Result<(StatusCode, Json<TransitionResponse>), ApiError> {
    let response = engine(&state).inward(request, actor.id).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /api/v1/buildline/inward/bulk
pub async fn bulk_inward(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<BulkInwardRequest>,
) -> Result<Json<BulkResult>, ApiError> {
    let result = engine(&state).bulk_inward(request, actor.id).await?;
    Ok(Json(result))
}

/// Look a unit up by barcode, with the caller's relation to it.
///
/// GET /api/v1/buildline/scan/:barcode
pub async fn scan(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(barcode): Path<String>,
) -> Result<Json<ScanResponse>, ApiError> {
    let response = engine(&state).scan(&barcode, actor.id).await?;
    Ok(Json(response))
}

/// POST /api/v1/buildline/assign
pub async fn assign(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<AssignRequest>,
) -> Result<Json<TransitionResponse>, ApiError> {
    let response = engine(&state).assign(request, actor.id).await?;
    Ok(Json(response))
}

/// Assign many units to one technician. Always 200; per-unit failures are
/// listed in the body.
///
/// POST /api/v1/buildline/assign-bulk
pub async fn assign_bulk(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<BulkAssignRequest>,
) -> Result<Json<BulkResult>, ApiError> {
    let queue = AssignmentQueue::new(state.pool.clone(), &state.config.buildline);
    let result = queue.bulk_assign(request, actor.id).await?;
    Ok(Json(result))
}

/// POST /api/v1/buildline/start
pub async fn start(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<BarcodeRequest>,
) -> Result<Json<JourneyResponse>, ApiError> {
    let response = engine(&state).start(&request.barcode, actor.id).await?;
    Ok(Json(response))
}

/// Save part of the checklist.
///
/// PUT /api/v1/buildline/checklist
pub async fn update_checklist(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<ChecklistUpdateRequest>,
) -> Result<Json<ChecklistView>, ApiError> {
    let view = engine(&state).update_checklist(request, actor.id).await?;
    Ok(Json(view))
}

/// GET /api/v1/buildline/checklist/schema
pub async fn checklist_schema() -> Json<&'static ChecklistSchema> {
    Json(ChecklistTracker::schema())
}

/// GET /api/v1/buildline/checklist/:barcode
pub async fn checklist_progress(
    State(state): State<AppState>,
    Path(barcode): Path<String>,
) -> Result<Json<ChecklistView>, ApiError> {
    let view = ChecklistTracker::new(state.pool.clone())
        .progress(&barcode)
        .await?;
    Ok(Json(view))
}

/// Finish assembly and hand the unit to QC.
///
/// POST /api/v1/buildline/complete
pub async fn complete(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<CompleteRequest>,
) -> Result<Json<JourneyResponse>, ApiError> {
    let response = engine(&state).complete(request, actor.id).await?;
    Ok(Json(response))
}

/// POST /api/v1/buildline/set-priority
pub async fn set_priority(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<SetPriorityRequest>,
) -> Result<Json<JourneyResponse>, ApiError> {
    let response = engine(&state).set_priority(request, actor.id).await?;
    Ok(Json(response))
}

/// POST /api/v1/buildline/flag-parts-missing
pub async fn flag_parts_missing(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<PartsMissingRequest>,
) -> Result<Json<JourneyResponse>, ApiError> {
    let response = engine(&state)
        .flag_parts_missing(request, actor.id, actor.is_supervisor())
        .await?;
    Ok(Json(response))
}

/// POST /api/v1/buildline/report-damage
pub async fn report_damage(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<DamageReportRequest>,
) -> Result<Json<JourneyResponse>, ApiError> {
    let response = engine(&state)
        .report_damage(request, actor.id, actor.is_supervisor())
        .await?;
    Ok(Json(response))
}

/// Billing boundary check.
///
/// GET /api/v1/buildline/can-invoice/:barcode
pub async fn can_invoice(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(barcode): Path<String>,
) -> Result<Json<CanInvoiceResponse>, ApiError> {
    let response = engine(&state).can_invoice(&barcode).await?;
    info!(
        barcode = %response.barcode,
        can_invoice = response.can_invoice,
        actor_id = %actor.id,
        "Invoice check"
    );
    Ok(Json(response))
}
