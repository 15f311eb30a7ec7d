//! Live Sync Channel: per-locker fan-out of committed door deltas.
//!
//! - [`LiveSyncChannel`]: topic-per-locker publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`LockerSubscription`]: one viewer's ordered stream for a single
//!   locker, surfacing gaps and disconnects as [`SyncEvent`]s.
//! - [`SubscriptionHandle`]: cancels a subscription from another task.
//!
//! Delivery is best-effort: a slow subscriber loses the oldest deltas and
//! sees a [`SyncEvent::Gap`]; a dropped transport surfaces as
//! [`SyncEvent::Disconnected`]. Either way the subscriber reconciles from
//! authoritative state instead of trusting the stream.

pub mod channel;
pub mod subscription;

pub use channel::{LiveSyncChannel, SyncError, DEFAULT_CAPACITY};
pub use subscription::{LockerSubscription, SubscriptionHandle, SyncEvent};
