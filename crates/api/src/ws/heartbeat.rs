use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use crate::ws::manager::WsManager;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Ping live sockets on a fixed interval, pruning any whose send task has
/// already ended. Runs until the returned handle is aborted.
pub fn start_heartbeat(ws_manager: Arc<WsManager>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(HEARTBEAT_INTERVAL);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        interval.tick().await;

        loop {
            interval.tick().await;
            let pruned = ws_manager.ping_and_prune().await;
            let viewers = ws_manager.connection_count().await;
            if pruned > 0 {
                tracing::info!(pruned, viewers, "Heartbeat pruned dead live sockets");
            } else {
                tracing::trace!(viewers, "Heartbeat");
            }
        }
    })
}
