//! Handlers for door occupancy.
//!
//! Mutations go through the [`AssignmentOrchestrator`](lockerdesk_occupancy::AssignmentOrchestrator);
//! reads go straight to the engine.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use lockerdesk_core::assignee::AssigneeInput;
use lockerdesk_core::types::DbId;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Body of `POST /doors/{id}/assign`.
#[derive(Debug, Deserialize)]
pub struct AssignDoorRequest {
    /// Client on whose behalf the door is assigned; scopes guest lookup.
    pub client_id: DbId,
    pub assignee: AssigneeInput,
}

/// GET /api/v1/doors/{id}
pub async fn get_door(
    State(state): State<AppState>,
    Path(door_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let view = state.engine.get(door_id).await?;

    Ok(Json(DataResponse { data: view }))
}

/// POST /api/v1/doors/{id}/assign
///
/// Assign an available door to a user or a guest. A door that is occupied
/// or overdue is rejected with 409; it is never overwritten. An unreadable
/// body is rejected with 400 in the usual error shape.
pub async fn assign_door(
    State(state): State<AppState>,
    Path(door_id): Path<DbId>,
    payload: Result<Json<AssignDoorRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(input) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let event = state
        .orchestrator
        .request_assignment(door_id, input.client_id, input.assignee)
        .await?;

    tracing::info!(
        door_id,
        client_id = input.client_id,
        locker_id = event.locker_id,
        "Door assignment requested"
    );

    Ok(Json(DataResponse { data: event }))
}

/// POST /api/v1/doors/{id}/unassign
///
/// Release a door. Releasing an available door succeeds. Returns the door
/// as it stands afterwards.
pub async fn unassign_door(
    State(state): State<AppState>,
    Path(door_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    state.orchestrator.request_unassignment(door_id).await?;
    let view = state.engine.get(door_id).await?;

    Ok(Json(DataResponse { data: view }))
}

/// POST /api/v1/doors/{id}/overdue
///
/// External overdue signal for an occupied door. Idempotent.
pub async fn mark_overdue(
    State(state): State<AppState>,
    Path(door_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let view = state.orchestrator.request_overdue(door_id).await?;

    Ok(Json(DataResponse { data: view }))
}
