use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use lockerdesk_core::delta::LiveMessage;
use lockerdesk_core::types::DbId;
use lockerdesk_events::SyncEvent;
use lockerdesk_occupancy::SnapshotSource;

use crate::error::AppResult;
use crate::state::AppState;

/// GET /api/v1/lockers/{id}/live
///
/// Upgrade to a live socket for one locker. Unknown lockers are rejected
/// with 404 before the upgrade.
pub async fn live_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(locker_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    state.engine.locker(locker_id).await?;

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, locker_id)))
}

/// Manage a single live socket after upgrade.
///
/// Splits the socket into a sink (outbound) and stream (inbound), then:
///   1. Registers the connection with `WsManager`.
///   2. Spawns a sender task that forwards messages from the manager channel.
///   3. Spawns a streaming task: snapshot first, then deltas.
///   4. Processes inbound frames on the current task.
///   5. Cleans up on disconnect.
async fn handle_socket(socket: WebSocket, state: AppState, locker_id: DbId) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    let mut rx = state.ws_manager.add(conn_id.clone(), locker_id).await;
    let viewers = state.ws_manager.connections_for_locker(locker_id).await.len();
    tracing::info!(conn_id = %conn_id, locker_id, viewers, "Live socket connected");

    let (mut sink, mut stream) = socket.split();

    // Sender task: forward channel messages to the WebSocket sink.
    let sender_conn_id = conn_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let closing = matches!(msg, Message::Close(_));
            if sink.send(msg).await.is_err() {
                tracing::debug!(conn_id = %sender_conn_id, "Live socket sink closed");
                break;
            }
            if closing {
                break;
            }
        }
    });

    let stream_task = tokio::spawn(stream_locker(state.clone(), conn_id.clone(), locker_id));

    // Receiver loop: the protocol is server-push only.
    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Close(_)) => break,
            Ok(Message::Pong(_)) => {
                tracing::trace!(conn_id = %conn_id, "Pong received");
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(conn_id = %conn_id, error = %e, "Live socket receive error");
                break;
            }
        }
    }

    state.ws_manager.remove(&conn_id).await;
    stream_task.abort();
    send_task.abort();
    tracing::info!(conn_id = %conn_id, locker_id, "Live socket disconnected");
}

/// Push the locker's snapshot, then every delta, to one connection.
///
/// A gap is reported as a `resync` message followed by a fresh snapshot.
/// Losing the transport closes the socket; the viewer reconnects and
/// receives a new snapshot.
async fn stream_locker(state: AppState, conn_id: String, locker_id: DbId) {
    let mut subscription = match state.engine.channel().subscribe(locker_id).await {
        Ok(subscription) => subscription,
        Err(e) => {
            tracing::warn!(conn_id = %conn_id, locker_id, error = %e, "Live subscribe failed");
            state.ws_manager.close(&conn_id).await;
            return;
        }
    };

    if !send_snapshot(&state, &conn_id, locker_id).await {
        return;
    }

    loop {
        match subscription.recv().await {
            SyncEvent::Delta(delta) => {
                if !state
                    .ws_manager
                    .send(&conn_id, &LiveMessage::Delta { delta })
                    .await
                {
                    return;
                }
            }
            SyncEvent::Gap { missed } => {
                let resync = LiveMessage::Resync { locker_id, missed };
                if !state.ws_manager.send(&conn_id, &resync).await
                    || !send_snapshot(&state, &conn_id, locker_id).await
                {
                    return;
                }
            }
            SyncEvent::Disconnected => {
                tracing::info!(conn_id = %conn_id, locker_id, "Live sync transport lost, closing socket");
                state.ws_manager.close(&conn_id).await;
                return;
            }
            SyncEvent::Cancelled => return,
        }
    }
}

async fn send_snapshot(state: &AppState, conn_id: &str, locker_id: DbId) -> bool {
    match state.engine.snapshot(locker_id).await {
        Ok(doors) => {
            state
                .ws_manager
                .send(conn_id, &LiveMessage::Snapshot { locker_id, doors })
                .await
        }
        Err(e) => {
            tracing::warn!(conn_id, locker_id, error = %e, "Live snapshot failed");
            state.ws_manager.close(conn_id).await;
            false
        }
    }
}
