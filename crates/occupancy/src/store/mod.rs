//! Pluggable persistence for doors, lockers and guests.
//!
//! - **Conditional updates**: every door mutation is a single guarded
//!   operation; a plain read-then-write is never used for a transition.
//! - **Testability**: [`memory::InMemoryStore`] for tests and local runs,
//!   [`postgres::PgOccupancyStore`] for production.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use lockerdesk_core::assignee::Assignee;
use lockerdesk_core::door::DoorView;
use lockerdesk_core::types::DbId;
use lockerdesk_db::models::guest::{CreateGuest, Guest};
use lockerdesk_db::models::locker::Locker;

use crate::error::StoreError;

/// Storage abstraction the engine and resolver run against.
///
/// ## Conditional transitions
///
/// `assign_if_available`, `release` and `mark_overdue` check the door's
/// current status and write the new one as one atomic step. They return
/// `Ok(None)` when the guard did not match (or the door does not exist);
/// the caller decides which with a follow-up read.
///
/// ## Commit time
///
/// Each committed transition sets the door's `updated_at` to a commit
/// time strictly later than the previous one for that door.
#[async_trait]
pub trait OccupancyStore: Send + Sync {
    /// Reachability check for `/health`.
    async fn ping(&self) -> Result<(), StoreError>;

    // --- Doors ---

    async fn find_door(&self, door_id: DbId) -> Result<Option<DoorView>, StoreError>;

    /// Every door of a locker, ordered by door number.
    async fn list_doors(&self, locker_id: DbId) -> Result<Vec<DoorView>, StoreError>;

    /// `available -> occupied`, recording `assignee` and clearing the other
    /// assignee field.
    async fn assign_if_available(
        &self,
        door_id: DbId,
        assignee: Assignee,
    ) -> Result<Option<DoorView>, StoreError>;

    /// `occupied | overdue -> available`, clearing assignee and timestamp.
    async fn release(&self, door_id: DbId) -> Result<Option<DoorView>, StoreError>;

    /// `occupied -> overdue`, keeping the assignee.
    async fn mark_overdue(&self, door_id: DbId) -> Result<Option<DoorView>, StoreError>;

    // --- Lockers ---

    async fn find_locker(&self, locker_id: DbId) -> Result<Option<Locker>, StoreError>;

    async fn list_lockers(&self, client_id: DbId) -> Result<Vec<Locker>, StoreError>;

    // --- Clients and guests ---

    async fn client_exists(&self, client_id: DbId) -> Result<bool, StoreError>;

    /// Exact-match lookup by `(client_id, full_name)`; oldest row wins.
    async fn find_guest(
        &self,
        client_id: DbId,
        full_name: &str,
    ) -> Result<Option<Guest>, StoreError>;

    async fn create_guest(&self, input: &CreateGuest) -> Result<Guest, StoreError>;
}
