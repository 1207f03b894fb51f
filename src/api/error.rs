use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::error;
use validator::ValidationErrors;

use crate::scheduler::InvalidScheduleError;

/// Errors surfaced synchronously to API callers, rendered as JSON bodies
/// with an `error` field. Execution-time failures never appear here: they
/// happen after the caller already received 201 and are only observable
/// through the job's status and history.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid JSON body")]
    InvalidJson(#[from] JsonRejection),
    #[error("Validation failed")]
    Validation(ValidationErrors),
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
    #[error("Invalid value for field: {0}")]
    MalformedField(&'static str),
    #[error("Job not found")]
    NotFound,
    #[error(transparent)]
    InvalidSchedule(#[from] InvalidScheduleError),
    #[error("Database error")]
    Database(#[from] sea_orm::DbErr),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::InvalidJson(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            Self::Validation(errors) => {
                let field = errors
                    .field_errors()
                    .into_keys()
                    .next()
                    .map_or_else(|| "request".to_string(), |field| field.to_string());
                (
                    StatusCode::BAD_REQUEST,
                    format!("Invalid value for field: {field}"),
                )
            }
            Self::MissingField(_) | Self::MalformedField(_) | Self::InvalidSchedule(_) => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            Self::NotFound => (StatusCode::NOT_FOUND, self.to_string()),
            Self::Database(e) => {
                error!("Database error while handling request: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
