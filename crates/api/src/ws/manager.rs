use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::ws::Message;
use lockerdesk_core::delta::LiveMessage;
use lockerdesk_core::types::{DbId, Timestamp};
use tokio::sync::{mpsc, RwLock};

/// Channel sender half for pushing messages to a WebSocket connection.
pub type WsSender = mpsc::UnboundedSender<Message>;

/// Metadata for a single live connection.
pub struct WsConnection {
    /// Locker this viewer is watching.
    pub locker_id: DbId,
    /// Channel sender for outbound messages to this connection.
    pub sender: WsSender,
    pub connected_at: Timestamp,
}

/// Tracks every open live socket.
///
/// Thread-safe via interior `RwLock`; wrapped in `Arc` and shared across
/// the application.
pub struct WsManager {
    connections: RwLock<HashMap<String, WsConnection>>,
}

impl WsManager {
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Register a new connection.
    ///
    /// Returns the receiver half of the message channel so the caller can
    /// forward messages to the WebSocket sink.
    pub async fn add(&self, conn_id: String, locker_id: DbId) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        let conn = WsConnection {
            locker_id,
            sender: tx,
            connected_at: chrono::Utc::now(),
        };
        self.connections.write().await.insert(conn_id, conn);
        rx
    }

    pub async fn remove(&self, conn_id: &str) {
        self.connections.write().await.remove(conn_id);
    }

    /// Queue a protocol message for one connection.
    ///
    /// Returns `false` if the connection is gone or the message could not
    /// be encoded.
    pub async fn send(&self, conn_id: &str, message: &LiveMessage) -> bool {
        let text = match serde_json::to_string(message) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(conn_id, error = %e, "Failed to encode live message");
                return false;
            }
        };

        let conns = self.connections.read().await;
        match conns.get(conn_id) {
            Some(conn) => conn.sender.send(Message::Text(text.into())).is_ok(),
            None => false,
        }
    }

    /// Queue a Close frame for one connection.
    pub async fn close(&self, conn_id: &str) {
        if let Some(conn) = self.connections.read().await.get(conn_id) {
            let _ = conn.sender.send(Message::Close(None));
        }
    }

    /// Connection IDs watching `locker_id`.
    pub async fn connections_for_locker(&self, locker_id: DbId) -> Vec<String> {
        self.connections
            .read()
            .await
            .iter()
            .filter(|(_, conn)| conn.locker_id == locker_id)
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Send a Close frame to every connection, then clear the map.
    ///
    /// Used during graceful shutdown.
    pub async fn shutdown_all(&self) {
        let mut conns = self.connections.write().await;
        let count = conns.len();
        for conn in conns.values() {
            let _ = conn.sender.send(Message::Close(None));
        }
        conns.clear();
        tracing::info!(count, "Closed all live sockets");
    }

    /// Ping every viewer and drop connections whose send task has ended.
    ///
    /// Returns how many connections were pruned.
    pub async fn ping_and_prune(&self) -> usize {
        let mut conns = self.connections.write().await;
        let before = conns.len();
        conns.retain(|conn_id, conn| {
            let alive = conn.sender.send(Message::Ping(Bytes::new())).is_ok();
            if !alive {
                let connected_secs = (chrono::Utc::now() - conn.connected_at).num_seconds();
                tracing::debug!(
                    conn_id,
                    locker_id = conn.locker_id,
                    connected_secs,
                    "Pruned dead live socket"
                );
            }
            alive
        });
        before - conns.len()
    }
}

impl Default for WsManager {
    fn default() -> Self {
        Self::new()
    }
}
