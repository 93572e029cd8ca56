//! QC checkpoint endpoint.

use axum::{extract::State, Extension, Json};
use domain::models::qc::{QcSubmitRequest, QcSubmitResponse};

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::Actor;
use crate::services::QcGate;

/// Record a QC pass or fail for a unit awaiting QC.
///
/// POST /api/v1/buildline/qc/submit
pub async fn submit(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<QcSubmitRequest>,
) -> Result<Json<QcSubmitResponse>, ApiError> {
    let response = QcGate::new(state.pool.clone())
        .submit(request, actor.id)
        .await?;
    Ok(Json(response))
}
