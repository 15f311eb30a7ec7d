//! Handlers for locker views.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use lockerdesk_core::types::DbId;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/lockers/{id}
pub async fn get_locker(
    State(state): State<AppState>,
    Path(locker_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let locker = state.engine.locker(locker_id).await?;

    Ok(Json(DataResponse { data: locker }))
}

/// GET /api/v1/lockers/{id}/doors
///
/// Every door of the locker with its assignee summary, by door number.
pub async fn list_doors(
    State(state): State<AppState>,
    Path(locker_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let doors = state.engine.list_doors(locker_id).await?;

    Ok(Json(DataResponse { data: doors }))
}

/// GET /api/v1/lockers/{id}/occupancy
pub async fn get_occupancy(
    State(state): State<AppState>,
    Path(locker_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let summary = state.engine.occupancy(locker_id).await?;

    Ok(Json(DataResponse { data: summary }))
}

/// GET /api/v1/clients/{client_id}/lockers
pub async fn list_client_lockers(
    State(state): State<AppState>,
    Path(client_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let lockers = state.engine.lockers_for_client(client_id).await?;

    Ok(Json(DataResponse { data: lockers }))
}
