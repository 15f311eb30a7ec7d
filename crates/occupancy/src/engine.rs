//! Door Occupancy Engine.
//!
//! Owns the per-door state machine. Every mutation is one conditional store
//! operation followed by a best-effort publish of the committed state; the
//! engine itself never retries and never locks.

use std::sync::Arc;

use async_trait::async_trait;
use lockerdesk_core::assignee::Assignee;
use lockerdesk_core::delta::DoorDelta;
use lockerdesk_core::door::{AssignmentEvent, DoorStatus, DoorView, OccupancySummary};
use lockerdesk_core::types::DbId;
use lockerdesk_db::models::locker::Locker;
use lockerdesk_events::LiveSyncChannel;

use crate::error::OccupancyError;
use crate::reconciler::SnapshotSource;
use crate::store::OccupancyStore;

pub struct OccupancyEngine {
    store: Arc<dyn OccupancyStore>,
    channel: Arc<LiveSyncChannel>,
}

impl OccupancyEngine {
    pub fn new(store: Arc<dyn OccupancyStore>, channel: Arc<LiveSyncChannel>) -> Self {
        Self { store, channel }
    }

    pub fn channel(&self) -> &Arc<LiveSyncChannel> {
        &self.channel
    }

    /// Assign an available door.
    ///
    /// Fails with [`OccupancyError::DoorNotAvailable`] if the door is
    /// occupied or overdue; an existing assignment is never overwritten.
    pub async fn assign(
        &self,
        door_id: DbId,
        assignee: Assignee,
    ) -> Result<AssignmentEvent, OccupancyError> {
        let Some(view) = self.store.assign_if_available(door_id, assignee).await? else {
            return Err(self.assign_rejection(door_id).await?);
        };

        let assigned_at = view.state.assigned_at.unwrap_or(view.state.updated_at);
        tracing::info!(
            door_id,
            locker_id = view.state.locker_id,
            assignee_kind = %assignee.kind(),
            assignee_id = assignee.id(),
            "Door assigned"
        );
        self.publish(&view).await;

        Ok(AssignmentEvent {
            door_id,
            locker_id: view.state.locker_id,
            assignee,
            assigned_at,
        })
    }

    /// Release a door. Releasing an available door succeeds without change.
    pub async fn unassign(&self, door_id: DbId) -> Result<(), OccupancyError> {
        if let Some(view) = self.store.release(door_id).await? {
            tracing::info!(door_id, locker_id = view.state.locker_id, "Door unassigned");
            self.publish(&view).await;
            return Ok(());
        }

        match self.store.find_door(door_id).await? {
            None => Err(OccupancyError::DoorNotFound { door_id }),
            Some(current) => {
                // The door was available when the guard ran. If another
                // caller has assigned it since, that assignment is theirs.
                tracing::debug!(
                    door_id,
                    status = %current.state.status,
                    "Unassign matched no occupied door, nothing to release"
                );
                Ok(())
            }
        }
    }

    /// Accept the externally driven `occupied -> overdue` transition.
    ///
    /// Idempotent on a door that is already overdue.
    pub async fn mark_overdue(&self, door_id: DbId) -> Result<DoorView, OccupancyError> {
        if let Some(view) = self.store.mark_overdue(door_id).await? {
            tracing::info!(door_id, locker_id = view.state.locker_id, "Door marked overdue");
            self.publish(&view).await;
            return Ok(view);
        }

        match self.store.find_door(door_id).await? {
            None => Err(OccupancyError::DoorNotFound { door_id }),
            Some(current) if current.state.status == DoorStatus::Overdue => Ok(current),
            Some(current) => Err(OccupancyError::InvalidTransition {
                door_id,
                from: current.state.status,
                to: DoorStatus::Overdue,
            }),
        }
    }

    /// `Ok` if the backing store answers.
    pub async fn ping_store(&self) -> Result<(), OccupancyError> {
        Ok(self.store.ping().await?)
    }

    /// Read-only snapshot of one door.
    pub async fn get(&self, door_id: DbId) -> Result<DoorView, OccupancyError> {
        self.store
            .find_door(door_id)
            .await?
            .ok_or(OccupancyError::DoorNotFound { door_id })
    }

    pub async fn locker(&self, locker_id: DbId) -> Result<Locker, OccupancyError> {
        self.store
            .find_locker(locker_id)
            .await?
            .ok_or(OccupancyError::LockerNotFound { locker_id })
    }

    pub async fn lockers_for_client(&self, client_id: DbId) -> Result<Vec<Locker>, OccupancyError> {
        Ok(self.store.list_lockers(client_id).await?)
    }

    /// Every door of a locker, ordered by door number.
    pub async fn list_doors(&self, locker_id: DbId) -> Result<Vec<DoorView>, OccupancyError> {
        self.locker(locker_id).await?;
        Ok(self.store.list_doors(locker_id).await?)
    }

    pub async fn occupancy(&self, locker_id: DbId) -> Result<OccupancySummary, OccupancyError> {
        let doors = self.list_doors(locker_id).await?;
        Ok(OccupancySummary::from_statuses(
            doors.iter().map(|d| d.state.status),
        ))
    }

    /// Work out why a guarded assignment matched no row.
    async fn assign_rejection(&self, door_id: DbId) -> Result<OccupancyError, OccupancyError> {
        let error = match self.store.find_door(door_id).await? {
            None => OccupancyError::DoorNotFound { door_id },
            Some(current) => {
                tracing::warn!(
                    door_id,
                    status = %current.state.status,
                    "Assignment rejected, door not available"
                );
                OccupancyError::DoorNotAvailable {
                    door_id,
                    status: current.state.status,
                }
            }
        };
        Ok(error)
    }

    /// Push a committed state to viewers. Failure never undoes the commit.
    async fn publish(&self, view: &DoorView) {
        let delta = DoorDelta::from(view);
        match self.channel.publish(delta).await {
            Ok(receivers) => {
                tracing::debug!(door_id = view.state.id, receivers, "Door delta published");
            }
            Err(e) => {
                tracing::warn!(
                    door_id = view.state.id,
                    locker_id = view.state.locker_id,
                    error = %e,
                    "Door delta not published, viewers will reconcile"
                );
            }
        }
    }
}

#[async_trait]
impl SnapshotSource for OccupancyEngine {
    async fn snapshot(&self, locker_id: DbId) -> Result<Vec<DoorDelta>, OccupancyError> {
        Ok(self
            .list_doors(locker_id)
            .await?
            .iter()
            .map(DoorDelta::from)
            .collect())
    }
}
