use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use lockerdesk_occupancy::{OccupancyError, ResolveError, StoreError};
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`OccupancyError`] and adds request-level failures. Implements
/// [`IntoResponse`] to produce consistent JSON error responses of the form
/// `{ "error": ..., "code": ... }`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Occupancy(#[from] OccupancyError),

    /// The request body could not be read as the expected JSON.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Occupancy(err) => classify_occupancy_error(err),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}

/// Classify an occupancy error into an HTTP status, error code, and message.
///
/// - Conflicts (`DoorNotAvailable`, `InvalidTransition`) map to 409 and are
///   never presented as retryable.
/// - Transient store and transport failures map to 503, as does a guest
///   resolution that may succeed on a later attempt.
/// - A guest resolution that cannot succeed as asked maps to 422.
/// - Everything else in the store maps to 500 with a sanitized message.
fn classify_occupancy_error(err: &OccupancyError) -> (StatusCode, &'static str, String) {
    match err {
        OccupancyError::DoorNotFound { .. } => {
            (StatusCode::NOT_FOUND, "DOOR_NOT_FOUND", err.to_string())
        }
        OccupancyError::LockerNotFound { .. } => {
            (StatusCode::NOT_FOUND, "LOCKER_NOT_FOUND", err.to_string())
        }
        OccupancyError::DoorNotAvailable { .. } => (
            StatusCode::CONFLICT,
            "DOOR_NOT_AVAILABLE",
            format!("{err}. Someone else just assigned this door; refresh and try again"),
        ),
        OccupancyError::InvalidAssignee(msg) => {
            (StatusCode::BAD_REQUEST, "INVALID_ASSIGNEE", msg.clone())
        }
        OccupancyError::InvalidTransition { .. } => {
            (StatusCode::CONFLICT, "INVALID_TRANSITION", err.to_string())
        }
        OccupancyError::AssigneeResolutionFailed(resolve) => {
            let status = if resolve.is_retryable() {
                StatusCode::SERVICE_UNAVAILABLE
            } else {
                StatusCode::UNPROCESSABLE_ENTITY
            };
            let message = match resolve {
                ResolveError::InvalidName | ResolveError::UnknownClient(_) => err.to_string(),
                ResolveError::LookupFailed(_) | ResolveError::CreateFailed(_) => {
                    tracing::warn!(
                        error = %resolve,
                        retryable = resolve.is_retryable(),
                        "Assignee resolution failed"
                    );
                    "The guest could not be looked up or created".to_string()
                }
            };
            (status, "ASSIGNEE_RESOLUTION_FAILED", message)
        }
        OccupancyError::TransportUnavailable => (
            StatusCode::SERVICE_UNAVAILABLE,
            "TRANSPORT_UNAVAILABLE",
            err.to_string(),
        ),
        OccupancyError::Store(StoreError::Unavailable(msg)) => {
            tracing::warn!(error = %msg, "Store unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "STORE_UNAVAILABLE",
                "The store is temporarily unavailable".to_string(),
            )
        }
        OccupancyError::Store(store) => {
            tracing::error!(error = %store, "Store error");
            internal()
        }
    }
}
