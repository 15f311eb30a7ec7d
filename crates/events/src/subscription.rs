//! A single viewer's subscription to one locker's deltas.

use lockerdesk_core::delta::DoorDelta;
use lockerdesk_core::types::DbId;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// What a subscriber observes next on its stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// A committed change, in commit order for this locker.
    Delta(DoorDelta),
    /// `missed` deltas were dropped because this subscriber fell behind.
    Gap { missed: u64 },
    /// The transport went away; resubscribe and reconcile.
    Disconnected,
    /// The subscription was cancelled through its handle.
    Cancelled,
}

/// Ordered stream of deltas for one locker.
///
/// Dropping the subscription unsubscribes it.
#[derive(Debug)]
pub struct LockerSubscription {
    locker_id: DbId,
    receiver: broadcast::Receiver<DoorDelta>,
    cancel: CancellationToken,
}

impl LockerSubscription {
    pub(crate) fn new(
        locker_id: DbId,
        receiver: broadcast::Receiver<DoorDelta>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            locker_id,
            receiver,
            cancel,
        }
    }

    pub fn locker_id(&self) -> DbId {
        self.locker_id
    }

    /// A handle that cancels this subscription from elsewhere.
    pub fn handle(&self) -> SubscriptionHandle {
        SubscriptionHandle {
            cancel: self.cancel.clone(),
        }
    }

    /// Wait for the next event.
    ///
    /// Once [`SyncEvent::Disconnected`] or [`SyncEvent::Cancelled`] is
    /// returned every later call returns the same.
    pub async fn recv(&mut self) -> SyncEvent {
        if self.cancel.is_cancelled() {
            return SyncEvent::Cancelled;
        }

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => SyncEvent::Cancelled,
            result = self.receiver.recv() => match result {
                Ok(delta) => SyncEvent::Delta(delta),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::warn!(locker_id = self.locker_id, missed, "Live sync subscriber lagged");
                    SyncEvent::Gap { missed }
                }
                Err(broadcast::error::RecvError::Closed) => SyncEvent::Disconnected,
            },
        }
    }
}

/// Cancels a [`LockerSubscription`]; cheap to clone.
#[derive(Debug, Clone)]
pub struct SubscriptionHandle {
    cancel: CancellationToken,
}

impl SubscriptionHandle {
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
