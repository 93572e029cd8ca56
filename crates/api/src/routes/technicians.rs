//! Actor registry endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use domain::models::technician::CreateTechnicianRequest;
use domain::models::{BuildlineRole, Technician, Workload};
use persistence::repositories::TechnicianRepository;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::Actor;
use crate::services::AssignmentQueue;

/// Query parameters for listing actors.
#[derive(Debug, Default, Deserialize)]
pub struct ListTechniciansQuery {
    pub role: Option<BuildlineRole>,
}

/// GET /api/v1/buildline/technicians
pub async fn list_technicians(
    State(state): State<AppState>,
    Query(query): Query<ListTechniciansQuery>,
) -> Result<Json<Vec<Technician>>, ApiError> {
    let repo = TechnicianRepository::new(state.pool.clone());
    let rows = repo.list(query.role.as_ref().map(|r| r.as_str())).await?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

/// Register a technician, supervisor or QC inspector.
///
/// POST /api/v1/buildline/technicians
pub async fn create_technician(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<CreateTechnicianRequest>,
) -> Result<(StatusCode, Json<Technician>), ApiError> {
    request.validate()?;
    let name = request.name.trim();
    if name.is_empty() {
        return Err(ApiError::Validation("name: must not be blank".to_string()));
    }

    let repo = TechnicianRepository::new(state.pool.clone());
    let technician: Technician = repo
        .create(name, request.buildline_role.as_str())
        .await?
        .into();

    info!(
        technician_id = %technician.id,
        role = %technician.buildline_role,
        created_by = %actor.id,
        "Technician registered"
    );
    Ok((StatusCode::CREATED, Json(technician)))
}

/// GET /api/v1/buildline/technicians/:id/workload
pub async fn workload(
    State(state): State<AppState>,
    Path(technician_id): Path<Uuid>,
) -> Result<Json<Workload>, ApiError> {
    let queue = AssignmentQueue::new(state.pool.clone(), &state.config.buildline);
    Ok(Json(queue.workload(technician_id).await?))
}
