//! Route definitions for door occupancy.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::doors;
use crate::state::AppState;

/// Door routes mounted at `/doors`.
///
/// ```text
/// GET    /{id}              -> get_door
/// POST   /{id}/assign       -> assign_door
/// POST   /{id}/unassign     -> unassign_door
/// POST   /{id}/overdue      -> mark_overdue
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}", get(doors::get_door))
        .route("/{id}/assign", post(doors::assign_door))
        .route("/{id}/unassign", post(doors::unassign_door))
        .route("/{id}/overdue", post(doors::mark_overdue))
}
