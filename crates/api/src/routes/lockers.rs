//! Route definitions for locker views.
//!
//! Two routers are provided:
//! - `router()` for locker routes mounted at `/lockers`
//! - `client_router()` for client-scoped locker listing mounted at `/clients`

use axum::routing::get;
use axum::Router;

use crate::handlers::lockers;
use crate::state::AppState;
use crate::ws;

/// Locker routes mounted at `/lockers`.
///
/// ```text
/// GET    /{id}              -> get_locker
/// GET    /{id}/doors        -> list_doors
/// GET    /{id}/occupancy    -> get_occupancy
/// GET    /{id}/live         -> live socket upgrade
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}", get(lockers::get_locker))
        .route("/{id}/doors", get(lockers::list_doors))
        .route("/{id}/occupancy", get(lockers::get_occupancy))
        .route("/{id}/live", get(ws::live_handler))
}

/// Client-scoped routes mounted at `/clients`.
///
/// ```text
/// GET    /{client_id}/lockers   -> list_client_lockers
/// ```
pub fn client_router() -> Router<AppState> {
    Router::new().route("/{client_id}/lockers", get(lockers::list_client_lockers))
}
