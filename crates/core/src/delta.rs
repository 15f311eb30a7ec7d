//! Door-state deltas and the live socket message protocol.

use serde::{Deserialize, Serialize};

use crate::assignee::AssigneeSummary;
use crate::door::{DoorStatus, DoorView};
use crate::types::{DbId, Timestamp};

/// A single committed door-state change, as pushed to viewers.
///
/// `timestamp` is the commit time of the change. Viewers keep the delta
/// with the newest timestamp per door regardless of arrival order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoorDelta {
    pub locker_id: DbId,
    pub door_id: DbId,
    pub door_number: i32,
    pub status: DoorStatus,
    pub assignee: Option<AssigneeSummary>,
    pub timestamp: Timestamp,
}

impl DoorDelta {
    /// `true` if this delta may replace state committed at `cached`.
    ///
    /// Equal timestamps are accepted so a redelivered delta is harmless.
    pub fn is_not_older_than(&self, cached: Timestamp) -> bool {
        self.timestamp >= cached
    }
}

impl From<&DoorView> for DoorDelta {
    fn from(view: &DoorView) -> Self {
        Self {
            locker_id: view.state.locker_id,
            door_id: view.state.id,
            door_number: view.state.door_number,
            status: view.state.status,
            assignee: view.assignee.clone(),
            timestamp: view.state.updated_at,
        }
    }
}

impl From<DoorView> for DoorDelta {
    fn from(view: DoorView) -> Self {
        Self::from(&view)
    }
}

/// Messages pushed to a viewer over the per-locker live socket.
///
/// Serialized with an internally-tagged `"type"` discriminator so the
/// frontend can route messages by type string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LiveMessage {
    /// Full authoritative state of every door in the locker.
    #[serde(rename = "snapshot")]
    Snapshot {
        locker_id: DbId,
        doors: Vec<DoorDelta>,
    },

    /// One committed change.
    #[serde(rename = "delta")]
    Delta { delta: DoorDelta },

    /// Deltas were dropped for this viewer; it must reconcile.
    #[serde(rename = "resync")]
    Resync { locker_id: DbId, missed: u64 },
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::door::DoorState;

    fn delta_at(timestamp: Timestamp) -> DoorDelta {
        DoorDelta {
            locker_id: 1,
            door_id: 2,
            door_number: 3,
            status: DoorStatus::Occupied,
            assignee: None,
            timestamp,
        }
    }

    #[test]
    fn newer_and_equal_deltas_are_accepted() {
        let now = Utc::now();
        assert!(delta_at(now).is_not_older_than(now));
        assert!(delta_at(now + Duration::seconds(1)).is_not_older_than(now));
        assert!(!delta_at(now - Duration::seconds(1)).is_not_older_than(now));
    }

    #[test]
    fn delta_from_view_uses_commit_time() {
        let state = DoorState::vacant(5, 9, 12, Utc::now());
        let view = DoorView {
            state: state.clone(),
            assignee: None,
        };
        let delta = DoorDelta::from(&view);
        assert_eq!(delta.door_id, 5);
        assert_eq!(delta.locker_id, 9);
        assert_eq!(delta.door_number, 12);
        assert_eq!(delta.status, DoorStatus::Available);
        assert_eq!(delta.timestamp, state.updated_at);
    }

    #[test]
    fn live_message_is_tagged_by_type() {
        let msg = LiveMessage::Resync {
            locker_id: 4,
            missed: 2,
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "resync");
        assert_eq!(json["missed"], 2);

        let back: LiveMessage = serde_json::from_value(json).unwrap();
        assert_eq!(back, msg);
    }
}
