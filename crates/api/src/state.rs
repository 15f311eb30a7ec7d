use std::sync::Arc;

use lockerdesk_events::LiveSyncChannel;
use lockerdesk_occupancy::{AssignmentOrchestrator, GuestResolver, OccupancyEngine, OccupancyStore};

use crate::config::ServerConfig;
use crate::ws::WsManager;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything inside is behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Door reads, the overdue hook and live-sync access.
    pub engine: Arc<OccupancyEngine>,
    /// Entry point for assign/unassign requests.
    pub orchestrator: Arc<AssignmentOrchestrator>,
    pub config: Arc<ServerConfig>,
    /// Live locker socket connections.
    pub ws_manager: Arc<WsManager>,
}

impl AppState {
    /// Wire the occupancy core on top of `store`.
    pub fn new(store: Arc<dyn OccupancyStore>, config: ServerConfig) -> Self {
        let channel = Arc::new(LiveSyncChannel::new(config.live_channel_capacity));
        let engine = Arc::new(OccupancyEngine::new(Arc::clone(&store), channel));
        let orchestrator = Arc::new(AssignmentOrchestrator::new(
            Arc::clone(&engine),
            GuestResolver::new(store),
            config.retry_policy(),
        ));

        Self {
            engine,
            orchestrator,
            config: Arc::new(config),
            ws_manager: Arc::new(WsManager::new()),
        }
    }
}
