use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domain::BuildlineError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Buildline(#[from] BuildlineError),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct ValidationDetail {
    pub field: String,
    pub message: String,
}

/// HTTP status for a workflow error kind.
pub fn buildline_status(err: &BuildlineError) -> StatusCode {
    match err {
        BuildlineError::JourneyNotFound { .. }
        | BuildlineError::LocationNotFound { .. }
        | BuildlineError::BinNotFound { .. }
        | BuildlineError::TechnicianNotFound { .. } => StatusCode::NOT_FOUND,
        BuildlineError::DuplicateBarcode { .. }
        | BuildlineError::InvalidTransition { .. }
        | BuildlineError::BinFull { .. }
        | BuildlineError::CompletionBlocked { .. } => StatusCode::CONFLICT,
        BuildlineError::OwnershipViolation { .. } => StatusCode::FORBIDDEN,
        BuildlineError::IncompleteChecklist { .. }
        | BuildlineError::UnknownChecklistItem { .. }
        | BuildlineError::BinInactive { .. }
        | BuildlineError::BinZoneMismatch { .. }
        | BuildlineError::BinLocationMismatch { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        BuildlineError::Validation(_) => StatusCode::BAD_REQUEST,
        BuildlineError::BinAccountingAnomaly { .. } | BuildlineError::Storage(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn buildline_details(err: &BuildlineError) -> Option<serde_json::Value> {
    match err {
        BuildlineError::IncompleteChecklist { missing } => {
            Some(serde_json::json!({ "missing": missing }))
        }
        BuildlineError::UnknownChecklistItem { keys } => {
            Some(serde_json::json!({ "unknown_items": keys }))
        }
        BuildlineError::BinFull {
            bin_id,
            capacity,
            occupancy,
        } => Some(serde_json::json!({
            "bin_id": bin_id,
            "capacity": capacity,
            "occupancy": occupancy,
        })),
        _ => None,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, details) = match &self {
            ApiError::Unauthorized(msg) => {
                (StatusCode::UNAUTHORIZED, "unauthorized", msg.clone(), None)
            }
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg.clone(), None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone(), None),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone(), None),
            ApiError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                "validation_error",
                msg.clone(),
                None,
            ),
            ApiError::Buildline(err) => {
                let status = buildline_status(err);
                if status == StatusCode::INTERNAL_SERVER_ERROR {
                    tracing::error!(error = %err, "Workflow storage failure");
                    (
                        status,
                        err.code(),
                        "An internal error occurred".to_string(),
                        None,
                    )
                } else {
                    (status, err.code(), err.to_string(), buildline_details(err))
                }
            }
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".into(),
                    None,
                )
            }
        };

        let body = ErrorBody {
            error: error_code.into(),
            message,
            details,
        };

        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Resource not found".into()),
            sqlx::Error::Database(db_err) => {
                if let Some(code) = db_err.code() {
                    match code.as_ref() {
                        "23505" => ApiError::Conflict("Resource already exists".into()),
                        "23503" => ApiError::NotFound("Referenced resource not found".into()),
                        _ => ApiError::Internal(format!("Database error: {}", db_err)),
                    }
                } else {
                    ApiError::Internal(format!("Database error: {}", db_err))
                }
            }
            _ => ApiError::Internal(format!("Database error: {}", err)),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let details: Vec<ValidationDetail> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |e| ValidationDetail {
                    field: field.to_string(),
                    message: e.message.clone().map(|m| m.to_string()).unwrap_or_default(),
                })
            })
            .collect();

        let message = match details.as_slice() {
            [only] => format!("{}: {}", only.field, only.message),
            _ => format!("{} validation errors", details.len()),
        };

        ApiError::Validation(message)
    }
}
