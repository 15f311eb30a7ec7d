pub mod doors;
pub mod health;
pub mod lockers;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /doors/{id}                       get door
/// /doors/{id}/assign                assign (POST)
/// /doors/{id}/unassign              unassign (POST)
/// /doors/{id}/overdue               external overdue signal (POST)
///
/// /lockers/{id}                     get locker
/// /lockers/{id}/doors               every door, by door number
/// /lockers/{id}/occupancy           counts per status
/// /lockers/{id}/live                live WebSocket
///
/// /clients/{client_id}/lockers      lockers of a client
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/doors", doors::router())
        .nest("/lockers", lockers::router())
        .nest("/clients", lockers::client_router())
}
