//! Viewer Reconciler: keeps one locker view consistent with committed state.
//!
//! A viewer subscribes to the locker's deltas *before* loading the
//! authoritative snapshot, so no commit can fall between the two. Deltas
//! are merged last-writer-wins by commit timestamp. Any gap in the stream
//! triggers a fresh snapshot; a lost transport triggers a reconnect with
//! exponential backoff followed by a snapshot.

mod cache;

use std::sync::Arc;

use async_trait::async_trait;
use lockerdesk_core::delta::DoorDelta;
use lockerdesk_core::types::DbId;
use lockerdesk_events::{LiveSyncChannel, LockerSubscription, SyncEvent};
use tokio::sync::{watch, RwLock};
use tokio_util::sync::CancellationToken;

use crate::error::OccupancyError;
use crate::retry::RetryPolicy;

pub use cache::{DoorCache, MergeOutcome};

/// Authoritative door state for a locker.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn snapshot(&self, locker_id: DbId) -> Result<Vec<DoorDelta>, OccupancyError>;
}

/// Where a viewer stands relative to the live stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connecting,
    /// Loading a snapshot; the cache may be behind.
    Reconciling,
    Live,
    /// Transport lost; waiting to resubscribe.
    Reconnecting,
    Stopped,
}

/// Why a live session ended.
enum SessionEnd {
    Reconnect,
    Stop,
}

pub struct ViewerReconciler {
    locker_id: DbId,
    source: Arc<dyn SnapshotSource>,
    channel: Arc<LiveSyncChannel>,
    backoff: RetryPolicy,
    cache: Arc<RwLock<DoorCache>>,
    status: watch::Sender<ConnectionStatus>,
}

impl ViewerReconciler {
    pub fn new(
        locker_id: DbId,
        source: Arc<dyn SnapshotSource>,
        channel: Arc<LiveSyncChannel>,
        backoff: RetryPolicy,
    ) -> Self {
        let (status, _) = watch::channel(ConnectionStatus::Connecting);
        Self {
            locker_id,
            source,
            channel,
            backoff,
            cache: Arc::new(RwLock::new(DoorCache::new(locker_id))),
            status,
        }
    }

    pub fn locker_id(&self) -> DbId {
        self.locker_id
    }

    /// Shared handle to the local cache.
    pub fn cache(&self) -> Arc<RwLock<DoorCache>> {
        Arc::clone(&self.cache)
    }

    /// Watch connection status changes.
    pub fn status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.subscribe()
    }

    pub fn current_status(&self) -> ConnectionStatus {
        *self.status.borrow()
    }

    /// Replace the cache with a fresh snapshot. Returns the door count.
    pub async fn reconcile(&self) -> Result<usize, OccupancyError> {
        let doors = self.source.snapshot(self.locker_id).await?;
        let mut cache = self.cache.write().await;
        cache.replace_all(doors);
        tracing::debug!(locker_id = self.locker_id, doors = cache.len(), "Viewer reconciled");
        Ok(cache.len())
    }

    /// Merge one delta into the cache.
    pub async fn apply(&self, delta: DoorDelta) -> MergeOutcome {
        let door_id = delta.door_id;
        let outcome = self.cache.write().await.apply(delta);
        if outcome == MergeOutcome::Stale {
            tracing::debug!(locker_id = self.locker_id, door_id, "Stale delta ignored");
        }
        outcome
    }

    /// Keep the cache live until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut delay = self.backoff.initial_delay;

        loop {
            if cancel.is_cancelled() {
                break;
            }

            let mut subscription = match self.channel.subscribe(self.locker_id).await {
                Ok(subscription) => subscription,
                Err(e) => {
                    tracing::warn!(locker_id = self.locker_id, error = %e, "Viewer subscribe failed");
                    self.set_status(ConnectionStatus::Reconnecting);
                    if sleep_or_cancel(delay, &cancel).await {
                        break;
                    }
                    delay = self.backoff.next_delay(delay);
                    continue;
                }
            };

            self.set_status(ConnectionStatus::Reconciling);
            if let Err(e) = self.reconcile().await {
                tracing::warn!(locker_id = self.locker_id, error = %e, "Viewer snapshot failed");
                self.set_status(ConnectionStatus::Reconnecting);
                if sleep_or_cancel(delay, &cancel).await {
                    break;
                }
                delay = self.backoff.next_delay(delay);
                continue;
            }

            delay = self.backoff.initial_delay;
            self.set_status(ConnectionStatus::Live);
            tracing::info!(locker_id = self.locker_id, "Viewer live");

            match self.consume(&mut subscription, &cancel).await {
                SessionEnd::Stop => break,
                SessionEnd::Reconnect => {
                    self.set_status(ConnectionStatus::Reconnecting);
                    if sleep_or_cancel(delay, &cancel).await {
                        break;
                    }
                }
            }
        }

        self.set_status(ConnectionStatus::Stopped);
        tracing::info!(locker_id = self.locker_id, "Viewer stopped");
    }

    async fn consume(
        &self,
        subscription: &mut LockerSubscription,
        cancel: &CancellationToken,
    ) -> SessionEnd {
        loop {
            let event = tokio::select! {
                biased;
                _ = cancel.cancelled() => return SessionEnd::Stop,
                event = subscription.recv() => event,
            };

            match event {
                SyncEvent::Delta(delta) => {
                    self.apply(delta).await;
                }
                SyncEvent::Gap { missed } => {
                    tracing::warn!(locker_id = self.locker_id, missed, "Viewer missed deltas, reconciling");
                    self.set_status(ConnectionStatus::Reconciling);
                    if let Err(e) = self.reconcile().await {
                        tracing::warn!(locker_id = self.locker_id, error = %e, "Viewer snapshot failed");
                        return SessionEnd::Reconnect;
                    }
                    self.set_status(ConnectionStatus::Live);
                }
                SyncEvent::Disconnected => {
                    tracing::warn!(locker_id = self.locker_id, "Live sync transport lost");
                    return SessionEnd::Reconnect;
                }
                SyncEvent::Cancelled => return SessionEnd::Stop,
            }
        }
    }

    fn set_status(&self, status: ConnectionStatus) {
        self.status.send_replace(status);
    }
}

/// Sleep for `delay`; `true` if `cancel` fired first.
async fn sleep_or_cancel(delay: std::time::Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => true,
        _ = tokio::time::sleep(delay) => false,
    }
}
