//! In-memory [`OccupancyStore`] for tests and local development.
//!
//! Each conditional transition runs its guard check and its write under a
//! single mutex acquisition, which gives it the same all-or-nothing
//! behaviour as the guarded `UPDATE` in Postgres.
//!
//! ## Limitations
//!
//! - No durability; all state is lost when the process exits.
//! - Single-process only.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use lockerdesk_core::assignee::{Assignee, AssigneeSummary};
use lockerdesk_core::door::{DoorState, DoorTransition, DoorView};
use lockerdesk_core::types::{DbId, Timestamp};
use lockerdesk_db::models::guest::{CreateGuest, Guest};
use lockerdesk_db::models::locker::{Locker, LOCKER_ACTIVE};

use super::OccupancyStore;
use crate::error::StoreError;

/// Operations that can be made to fail on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    FindDoor,
    ListDoors,
    Assign,
    Release,
    MarkOverdue,
    FindGuest,
    CreateGuest,
}

#[derive(Debug, Clone)]
struct UserRecord {
    full_name: String,
    email: Option<String>,
}

#[derive(Debug, Default)]
struct Tables {
    next_id: DbId,
    clients: HashMap<DbId, String>,
    users: HashMap<DbId, UserRecord>,
    lockers: BTreeMap<DbId, Locker>,
    doors: BTreeMap<DbId, DoorState>,
    guests: BTreeMap<DbId, Guest>,
    guest_inserts: u64,
    faults: HashMap<StoreOp, (u32, StoreError)>,
    lost_responses: HashMap<StoreOp, u32>,
    rival_guest_creates: u32,
}

impl Tables {
    fn allocate_id(&mut self) -> DbId {
        self.next_id += 1;
        self.next_id
    }

    /// Consume one injected failure for `op`, if any is pending.
    fn take_fault(&mut self, op: StoreOp) -> Result<(), StoreError> {
        let Some((remaining, error)) = self.faults.get_mut(&op) else {
            return Ok(());
        };
        let error = error.clone();
        *remaining -= 1;
        if *remaining == 0 {
            self.faults.remove(&op);
        }
        Err(error)
    }

    /// Consume one pending lost response for `op`, if any.
    fn take_lost_response(&mut self, op: StoreOp) -> Result<(), StoreError> {
        let Some(remaining) = self.lost_responses.get_mut(&op) else {
            return Ok(());
        };
        *remaining -= 1;
        if *remaining == 0 {
            self.lost_responses.remove(&op);
        }
        Err(StoreError::Unavailable("connection reset after commit".into()))
    }

    fn view(&self, door: &DoorState) -> DoorView {
        let assignee = door.assignee().map(|assignee| match assignee {
            Assignee::Guest(id) => match self.guests.get(&id) {
                Some(guest) => AssigneeSummary {
                    kind: assignee.kind(),
                    id,
                    name: Some(guest.full_name.clone()),
                    contact: guest.phone.clone(),
                },
                None => AssigneeSummary::unresolved(assignee),
            },
            Assignee::User(id) => match self.users.get(&id) {
                Some(user) => AssigneeSummary {
                    kind: assignee.kind(),
                    id,
                    name: Some(user.full_name.clone()),
                    contact: user.email.clone(),
                },
                None => AssigneeSummary::unresolved(assignee),
            },
        });
        DoorView {
            state: door.clone(),
            assignee,
        }
    }

    /// Apply `transition` to a door if its guard matches.
    fn transition(
        &mut self,
        door_id: DbId,
        transition: DoorTransition,
        assignee: Option<Assignee>,
    ) -> Option<DoorView> {
        let door = self.doors.get_mut(&door_id)?;
        if !transition.permits(door.status) {
            return None;
        }

        let committed_at = next_commit_time(door.updated_at);
        door.status = transition.target();
        door.updated_at = committed_at;
        match transition {
            DoorTransition::Assign => {
                door.assigned_user_id = assignee.and_then(|a| a.user_id());
                door.assigned_guest_id = assignee.and_then(|a| a.guest_id());
                door.assigned_at = Some(committed_at);
            }
            DoorTransition::Unassign => {
                door.assigned_user_id = None;
                door.assigned_guest_id = None;
                door.assigned_at = None;
            }
            DoorTransition::MarkOverdue => {}
        }

        let door = door.clone();
        Some(self.view(&door))
    }
}

/// Commit time for a door last changed at `previous`: now, but never at or
/// before `previous`.
fn next_commit_time(previous: Timestamp) -> Timestamp {
    Utc::now().max(previous + Duration::microseconds(1))
}

fn poison_err<T>(_: PoisonError<T>) -> StoreError {
    StoreError::Backend("in-memory store lock poisoned".into())
}

/// In-memory store for tests and local runs.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables.lock().map_err(poison_err)
    }

    fn lock_for(&self, op: StoreOp) -> Result<MutexGuard<'_, Tables>, StoreError> {
        let mut tables = self.lock()?;
        tables.take_fault(op)?;
        Ok(tables)
    }

    // --- Seeding ---

    /// Register a client and return its id.
    pub fn add_client(&self, name: &str) -> Result<DbId, StoreError> {
        let mut tables = self.lock()?;
        let id = tables.allocate_id();
        tables.clients.insert(id, name.to_string());
        Ok(id)
    }

    /// Register a directory user and return its id.
    pub fn add_user(
        &self,
        client_id: DbId,
        full_name: &str,
        email: Option<&str>,
    ) -> Result<DbId, StoreError> {
        let mut tables = self.lock()?;
        if !tables.clients.contains_key(&client_id) {
            return Err(StoreError::Conflict(format!("client {client_id} does not exist")));
        }
        let id = tables.allocate_id();
        tables.users.insert(
            id,
            UserRecord {
                full_name: full_name.to_string(),
                email: email.map(str::to_string),
            },
        );
        Ok(id)
    }

    /// Remove a directory user, leaving any door references dangling.
    pub fn remove_user(&self, user_id: DbId) -> Result<bool, StoreError> {
        Ok(self.lock()?.users.remove(&user_id).is_some())
    }

    /// Provision a locker with doors numbered `1..=door_count`, all available.
    pub fn add_locker(
        &self,
        client_id: DbId,
        name: &str,
        door_count: i32,
    ) -> Result<(Locker, Vec<DbId>), StoreError> {
        let mut tables = self.lock()?;
        if !tables.clients.contains_key(&client_id) {
            return Err(StoreError::Conflict(format!("client {client_id} does not exist")));
        }

        let now = Utc::now();
        let locker = Locker {
            id: tables.allocate_id(),
            client_id,
            name: name.to_string(),
            door_count,
            location: None,
            status: LOCKER_ACTIVE.to_string(),
            created_at: now,
            updated_at: now,
        };
        tables.lockers.insert(locker.id, locker.clone());

        let mut door_ids = Vec::new();
        for number in 1..=door_count {
            let id = tables.allocate_id();
            tables
                .doors
                .insert(id, DoorState::vacant(id, locker.id, number, now));
            door_ids.push(id);
        }

        Ok((locker, door_ids))
    }

    // --- Test hooks ---

    /// Make the next `times` calls of `op` fail with `error`.
    pub fn fail_next(&self, op: StoreOp, times: u32, error: StoreError) -> Result<(), StoreError> {
        if times > 0 {
            self.lock()?.faults.insert(op, (times, error));
        }
        Ok(())
    }

    /// Let the next `times` calls of `op` commit, then report
    /// [`StoreError::Unavailable`] as if the reply was lost in transit.
    pub fn lose_next_response(&self, op: StoreOp, times: u32) -> Result<(), StoreError> {
        if times > 0 {
            self.lock()?.lost_responses.insert(op, times);
        }
        Ok(())
    }

    /// Let a rival resolver win the next `times` guest creations: the
    /// requested row is inserted on the rival's behalf and the call fails
    /// with [`StoreError::Conflict`].
    pub fn lose_next_guest_create(&self, times: u32) -> Result<(), StoreError> {
        self.lock()?.rival_guest_creates = times;
        Ok(())
    }

    /// Number of guest rows inserted since the store was created.
    pub fn guest_insert_count(&self) -> Result<u64, StoreError> {
        Ok(self.lock()?.guest_inserts)
    }

    /// Number of guests sharing a logical key.
    pub fn guest_count(&self, client_id: DbId, full_name: &str) -> Result<usize, StoreError> {
        Ok(self
            .lock()?
            .guests
            .values()
            .filter(|g| g.client_id == client_id && g.full_name == full_name)
            .count())
    }

    /// Raw door rows, for invariant checks.
    pub fn door_states(&self) -> Result<Vec<DoorState>, StoreError> {
        Ok(self.lock()?.doors.values().cloned().collect())
    }
}

#[async_trait]
impl OccupancyStore for InMemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.lock().map(|_| ())
    }

    async fn find_door(&self, door_id: DbId) -> Result<Option<DoorView>, StoreError> {
        let tables = self.lock_for(StoreOp::FindDoor)?;
        Ok(tables.doors.get(&door_id).map(|door| tables.view(door)))
    }

    async fn list_doors(&self, locker_id: DbId) -> Result<Vec<DoorView>, StoreError> {
        let tables = self.lock_for(StoreOp::ListDoors)?;
        let mut views: Vec<DoorView> = tables
            .doors
            .values()
            .filter(|door| door.locker_id == locker_id)
            .map(|door| tables.view(door))
            .collect();
        views.sort_by_key(|v| v.state.door_number);
        Ok(views)
    }

    async fn assign_if_available(
        &self,
        door_id: DbId,
        assignee: Assignee,
    ) -> Result<Option<DoorView>, StoreError> {
        let mut tables = self.lock_for(StoreOp::Assign)?;
        let view = tables.transition(door_id, DoorTransition::Assign, Some(assignee));
        tables.take_lost_response(StoreOp::Assign)?;
        Ok(view)
    }

    async fn release(&self, door_id: DbId) -> Result<Option<DoorView>, StoreError> {
        let mut tables = self.lock_for(StoreOp::Release)?;
        let view = tables.transition(door_id, DoorTransition::Unassign, None);
        tables.take_lost_response(StoreOp::Release)?;
        Ok(view)
    }

    async fn mark_overdue(&self, door_id: DbId) -> Result<Option<DoorView>, StoreError> {
        let mut tables = self.lock_for(StoreOp::MarkOverdue)?;
        let view = tables.transition(door_id, DoorTransition::MarkOverdue, None);
        tables.take_lost_response(StoreOp::MarkOverdue)?;
        Ok(view)
    }

    async fn find_locker(&self, locker_id: DbId) -> Result<Option<Locker>, StoreError> {
        Ok(self.lock()?.lockers.get(&locker_id).cloned())
    }

    async fn list_lockers(&self, client_id: DbId) -> Result<Vec<Locker>, StoreError> {
        let mut lockers: Vec<Locker> = self
            .lock()?
            .lockers
            .values()
            .filter(|l| l.client_id == client_id)
            .cloned()
            .collect();
        lockers.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(lockers)
    }

    async fn client_exists(&self, client_id: DbId) -> Result<bool, StoreError> {
        Ok(self.lock()?.clients.contains_key(&client_id))
    }

    async fn find_guest(
        &self,
        client_id: DbId,
        full_name: &str,
    ) -> Result<Option<Guest>, StoreError> {
        let tables = self.lock_for(StoreOp::FindGuest)?;
        Ok(tables
            .guests
            .values()
            .find(|g| g.client_id == client_id && g.full_name == full_name)
            .cloned())
    }

    async fn create_guest(&self, input: &CreateGuest) -> Result<Guest, StoreError> {
        let mut tables = self.lock_for(StoreOp::CreateGuest)?;
        if !tables.clients.contains_key(&input.client_id) {
            return Err(StoreError::Conflict(format!(
                "client {} does not exist",
                input.client_id
            )));
        }

        let guest = Guest {
            id: tables.allocate_id(),
            client_id: input.client_id,
            full_name: input.full_name.clone(),
            phone: input.phone.clone(),
            created_at: Utc::now(),
        };
        tables.guests.insert(guest.id, guest.clone());
        tables.guest_inserts += 1;

        if tables.rival_guest_creates > 0 {
            tables.rival_guest_creates -= 1;
            return Err(StoreError::Conflict(format!(
                "guest {:?} was created concurrently",
                input.full_name
            )));
        }
        Ok(guest)
    }
}

#[cfg(test)]
mod tests {
    use lockerdesk_core::door::DoorStatus;

    use super::*;

    fn seeded() -> (InMemoryStore, Vec<DbId>) {
        let store = InMemoryStore::new();
        let client = store.add_client("Acme").unwrap();
        let (_, doors) = store.add_locker(client, "Lobby", 3).unwrap();
        (store, doors)
    }

    #[tokio::test]
    async fn provisioned_doors_match_door_count() {
        let (store, doors) = seeded();
        let locker_id = store.find_door(doors[0]).await.unwrap().unwrap().state.locker_id;
        let locker = store.find_locker(locker_id).await.unwrap().unwrap();
        let listed = store.list_doors(locker_id).await.unwrap();
        assert_eq!(listed.len() as i32, locker.door_count);
        assert!(listed.iter().all(|v| v.state.status == DoorStatus::Available));
    }

    #[tokio::test]
    async fn guarded_assign_matches_once() {
        let (store, doors) = seeded();
        assert!(store
            .assign_if_available(doors[0], Assignee::User(1))
            .await
            .unwrap()
            .is_some());
        assert!(store
            .assign_if_available(doors[0], Assignee::User(2))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn commit_times_strictly_increase() {
        let (store, doors) = seeded();
        let a = store
            .assign_if_available(doors[1], Assignee::Guest(99))
            .await
            .unwrap()
            .unwrap();
        let b = store.release(doors[1]).await.unwrap().unwrap();
        assert!(b.state.updated_at > a.state.updated_at);
        assert_eq!(a.state.assigned_at, Some(a.state.updated_at));
    }

    #[tokio::test]
    async fn injected_fault_fires_requested_times() {
        let (store, doors) = seeded();
        store
            .fail_next(StoreOp::FindDoor, 2, StoreError::Unavailable("down".into()))
            .unwrap();

        assert!(store.find_door(doors[0]).await.is_err());
        assert!(store.find_door(doors[0]).await.is_err());
        assert!(store.find_door(doors[0]).await.is_ok());
    }

    #[tokio::test]
    async fn lost_response_still_commits() {
        let (store, doors) = seeded();
        store.lose_next_response(StoreOp::Assign, 1).unwrap();

        assert!(store
            .assign_if_available(doors[0], Assignee::User(5))
            .await
            .is_err());
        let view = store.find_door(doors[0]).await.unwrap().unwrap();
        assert_eq!(view.state.assigned_user_id, Some(5));
    }

    #[tokio::test]
    async fn rival_guest_create_leaves_row_behind() {
        let store = InMemoryStore::new();
        let client_id = store.add_client("Acme").unwrap();
        store.lose_next_guest_create(1).unwrap();
        let input = CreateGuest {
            client_id,
            full_name: "Maria Cruz".into(),
            phone: None,
        };

        assert!(matches!(
            store.create_guest(&input).await,
            Err(StoreError::Conflict(_))
        ));
        let found = store.find_guest(client_id, "Maria Cruz").await.unwrap();
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn unknown_door_transition_matches_nothing() {
        let (store, _) = seeded();
        assert!(store.release(12345).await.unwrap().is_none());
    }
}
