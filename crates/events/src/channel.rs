//! Topic-per-locker broadcast hub.
//!
//! [`LiveSyncChannel`] is designed to be shared via `Arc<LiveSyncChannel>`
//! between the occupancy engine (the only publisher) and every open viewer.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use lockerdesk_core::delta::DoorDelta;
use lockerdesk_core::types::{DbId, Timestamp};
use tokio::sync::{broadcast, RwLock};
use tokio_util::sync::CancellationToken;

use crate::subscription::LockerSubscription;

/// Default per-locker buffer, in deltas.
pub const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    #[error("Live sync transport unavailable")]
    TransportUnavailable,
}

/// One locker's broadcast sender and the newest commit time sent per door.
struct Topic {
    sender: broadcast::Sender<DoorDelta>,
    last_published: HashMap<DbId, Timestamp>,
}

impl Topic {
    fn new(capacity: usize) -> Self {
        Self {
            sender: broadcast::channel(capacity).0,
            last_published: HashMap::new(),
        }
    }

    fn is_stale(&self, delta: &DoorDelta) -> bool {
        self.last_published
            .get(&delta.door_id)
            .is_some_and(|last| !delta.is_not_older_than(*last))
    }
}

/// Per-locker fan-out of committed door deltas.
///
/// Deltas for one locker reach each subscriber in publish order. Publishes
/// are serialized per channel, and a delta older than one already sent for
/// the same door is dropped, so each door's timestamps never go backwards
/// on the wire even when two commits finish publishing out of order.
/// Nothing is ordered across lockers. When a topic's buffer is full the
/// oldest undelivered deltas are dropped for the slow subscriber only;
/// publishers never wait on subscribers.
pub struct LiveSyncChannel {
    topics: RwLock<HashMap<DbId, Topic>>,
    capacity: usize,
    connected: AtomicBool,
}

impl LiveSyncChannel {
    /// Create a channel whose per-locker topics buffer `capacity` deltas.
    pub fn new(capacity: usize) -> Self {
        Self {
            topics: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
            connected: AtomicBool::new(true),
        }
    }

    /// Publish a delta to every subscriber of its locker.
    ///
    /// Returns the number of subscribers it was handed to. Having no
    /// subscribers is not an error; a disconnected transport is.
    pub async fn publish(&self, delta: DoorDelta) -> Result<usize, SyncError> {
        if !self.is_connected() {
            return Err(SyncError::TransportUnavailable);
        }

        let locker_id = delta.locker_id;
        let mut topics = self.topics.write().await;
        let Some(topic) = topics.get_mut(&locker_id) else {
            return Ok(0);
        };

        if topic.is_stale(&delta) {
            tracing::debug!(
                locker_id,
                door_id = delta.door_id,
                "Delta older than one already published, dropped"
            );
            return Ok(0);
        }
        topic.last_published.insert(delta.door_id, delta.timestamp);

        match topic.sender.send(delta) {
            Ok(receivers) => Ok(receivers),
            Err(_) => {
                // Every viewer of this locker has gone; drop the idle topic.
                if topic.sender.receiver_count() == 0 {
                    topics.remove(&locker_id);
                }
                Ok(0)
            }
        }
    }

    /// Subscribe to the deltas of one locker.
    pub async fn subscribe(&self, locker_id: DbId) -> Result<LockerSubscription, SyncError> {
        if !self.is_connected() {
            return Err(SyncError::TransportUnavailable);
        }

        let receiver = self
            .topics
            .write()
            .await
            .entry(locker_id)
            .or_insert_with(|| Topic::new(self.capacity))
            .sender
            .subscribe();

        tracing::debug!(locker_id, "Live sync subscription opened");
        Ok(LockerSubscription::new(
            locker_id,
            receiver,
            CancellationToken::new(),
        ))
    }

    /// Drop the transport: every open subscription observes a disconnect
    /// and further publishes fail until [`reconnect`](Self::reconnect).
    pub async fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
        let mut topics = self.topics.write().await;
        let count = topics.len();
        topics.clear();
        tracing::warn!(topics = count, "Live sync transport disconnected");
    }

    /// Restore the transport after [`disconnect`](Self::disconnect).
    pub fn reconnect(&self) {
        if !self.connected.swap(true, Ordering::SeqCst) {
            tracing::info!("Live sync transport reconnected");
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Number of live subscribers for a locker.
    pub async fn subscriber_count(&self, locker_id: DbId) -> usize {
        self.topics
            .read()
            .await
            .get(&locker_id)
            .map_or(0, |topic| topic.sender.receiver_count())
    }
}

impl Default for LiveSyncChannel {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use lockerdesk_core::door::DoorStatus;

    use super::*;
    use crate::subscription::SyncEvent;

    fn delta(locker_id: DbId, door_id: DbId) -> DoorDelta {
        DoorDelta {
            locker_id,
            door_id,
            door_number: 1,
            status: DoorStatus::Occupied,
            assignee: None,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn publish_reaches_subscriber_of_same_locker() {
        let channel = LiveSyncChannel::default();
        let mut sub = channel.subscribe(1).await.unwrap();

        let sent = channel.publish(delta(1, 10)).await.unwrap();
        assert_eq!(sent, 1);

        match sub.recv().await {
            SyncEvent::Delta(d) => assert_eq!(d.door_id, 10),
            other => panic!("expected delta, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn other_lockers_are_not_delivered() {
        let channel = LiveSyncChannel::default();
        let _sub = channel.subscribe(1).await.unwrap();

        let sent = channel.publish(delta(2, 10)).await.unwrap();
        assert_eq!(sent, 0);
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_ok() {
        let channel = LiveSyncChannel::default();
        assert_eq!(channel.publish(delta(1, 1)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn idle_topic_is_dropped_after_last_subscriber_leaves() {
        let channel = LiveSyncChannel::default();
        let sub = channel.subscribe(3).await.unwrap();
        assert_eq!(channel.subscriber_count(3).await, 1);

        drop(sub);
        assert_eq!(channel.publish(delta(3, 1)).await.unwrap(), 0);
        assert!(channel.topics.read().await.get(&3).is_none());
    }

    #[tokio::test]
    async fn disconnected_channel_rejects_publish_and_subscribe() {
        let channel = LiveSyncChannel::default();
        channel.disconnect().await;

        assert_eq!(
            channel.publish(delta(1, 1)).await,
            Err(SyncError::TransportUnavailable)
        );
        assert!(channel.subscribe(1).await.is_err());

        channel.reconnect();
        assert!(channel.subscribe(1).await.is_ok());
    }

    #[tokio::test]
    async fn older_delta_for_same_door_is_not_published() {
        let channel = LiveSyncChannel::default();
        let mut sub = channel.subscribe(1).await.unwrap();

        let older = delta(1, 10);
        let mut newer = delta(1, 10);
        newer.timestamp = older.timestamp + chrono::Duration::milliseconds(5);
        newer.status = DoorStatus::Available;
        let mut other_door = delta(1, 11);
        other_door.timestamp = older.timestamp;

        assert_eq!(channel.publish(newer.clone()).await.unwrap(), 1);
        assert_eq!(channel.publish(older).await.unwrap(), 0);
        assert_eq!(channel.publish(other_door.clone()).await.unwrap(), 1);
        // A redelivery of the newest is still sent.
        assert_eq!(channel.publish(newer.clone()).await.unwrap(), 1);

        for expected in [&newer, &other_door, &newer] {
            match sub.recv().await {
                SyncEvent::Delta(d) => assert_eq!(&d, expected),
                other => panic!("expected delta, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn zero_capacity_is_clamped() {
        let channel = LiveSyncChannel::new(0);
        let mut sub = channel.subscribe(1).await.unwrap();
        channel.publish(delta(1, 5)).await.unwrap();
        assert!(matches!(sub.recv().await, SyncEvent::Delta(_)));
    }
}
