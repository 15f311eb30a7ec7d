//! A viewer's local copy of one locker's doors.

use std::collections::BTreeMap;

use lockerdesk_core::delta::DoorDelta;
use lockerdesk_core::door::OccupancySummary;
use lockerdesk_core::types::DbId;

/// Result of merging one delta into a [`DoorCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Applied,
    /// Older than the cached entry; ignored.
    Stale,
    /// Belongs to another locker; ignored.
    Foreign,
}

/// Last-writer-wins cache keyed by door id.
///
/// An entry is only ever replaced by a delta whose timestamp is not older,
/// so the cache converges to the newest committed state regardless of
/// delivery order.
#[derive(Debug, Clone)]
pub struct DoorCache {
    locker_id: DbId,
    doors: BTreeMap<DbId, DoorDelta>,
}

impl DoorCache {
    pub fn new(locker_id: DbId) -> Self {
        Self {
            locker_id,
            doors: BTreeMap::new(),
        }
    }

    pub fn locker_id(&self) -> DbId {
        self.locker_id
    }

    pub fn apply(&mut self, delta: DoorDelta) -> MergeOutcome {
        if delta.locker_id != self.locker_id {
            return MergeOutcome::Foreign;
        }
        if let Some(cached) = self.doors.get(&delta.door_id) {
            if !delta.is_not_older_than(cached.timestamp) {
                return MergeOutcome::Stale;
            }
        }
        self.doors.insert(delta.door_id, delta);
        MergeOutcome::Applied
    }

    /// Replace the whole cache with an authoritative snapshot.
    pub fn replace_all(&mut self, doors: impl IntoIterator<Item = DoorDelta>) {
        self.doors = doors
            .into_iter()
            .filter(|d| d.locker_id == self.locker_id)
            .map(|d| (d.door_id, d))
            .collect();
    }

    pub fn get(&self, door_id: DbId) -> Option<&DoorDelta> {
        self.doors.get(&door_id)
    }

    /// Entries ordered by door number, as a locker view renders them.
    pub fn sorted(&self) -> Vec<&DoorDelta> {
        let mut doors: Vec<&DoorDelta> = self.doors.values().collect();
        doors.sort_by_key(|d| d.door_number);
        doors
    }

    pub fn summary(&self) -> OccupancySummary {
        OccupancySummary::from_statuses(self.doors.values().map(|d| d.status))
    }

    pub fn len(&self) -> usize {
        self.doors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doors.is_empty()
    }
}
