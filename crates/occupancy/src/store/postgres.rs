//! Postgres-backed [`OccupancyStore`].

use async_trait::async_trait;
use lockerdesk_core::assignee::Assignee;
use lockerdesk_core::door::DoorView;
use lockerdesk_core::types::DbId;
use lockerdesk_db::models::guest::{CreateGuest, Guest};
use lockerdesk_db::models::locker::Locker;
use lockerdesk_db::repositories::{ClientRepo, DoorRepo, GuestRepo, LockerRepo};
use lockerdesk_db::DbPool;

use super::OccupancyStore;
use crate::error::StoreError;

/// Production store; a thin adapter over the `lockerdesk-db` repositories.
#[derive(Clone)]
pub struct PgOccupancyStore {
    pool: DbPool,
}

impl PgOccupancyStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl OccupancyStore for PgOccupancyStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(lockerdesk_db::health_check(&self.pool).await?)
    }

    async fn find_door(&self, door_id: DbId) -> Result<Option<DoorView>, StoreError> {
        Ok(DoorRepo::find_view(&self.pool, door_id).await?)
    }

    async fn list_doors(&self, locker_id: DbId) -> Result<Vec<DoorView>, StoreError> {
        Ok(DoorRepo::list_views_by_locker(&self.pool, locker_id).await?)
    }

    async fn assign_if_available(
        &self,
        door_id: DbId,
        assignee: Assignee,
    ) -> Result<Option<DoorView>, StoreError> {
        Ok(DoorRepo::assign_if_available(&self.pool, door_id, assignee).await?)
    }

    async fn release(&self, door_id: DbId) -> Result<Option<DoorView>, StoreError> {
        Ok(DoorRepo::release(&self.pool, door_id).await?)
    }

    async fn mark_overdue(&self, door_id: DbId) -> Result<Option<DoorView>, StoreError> {
        Ok(DoorRepo::mark_overdue(&self.pool, door_id).await?)
    }

    async fn find_locker(&self, locker_id: DbId) -> Result<Option<Locker>, StoreError> {
        Ok(LockerRepo::find_by_id(&self.pool, locker_id).await?)
    }

    async fn list_lockers(&self, client_id: DbId) -> Result<Vec<Locker>, StoreError> {
        Ok(LockerRepo::list_by_client(&self.pool, client_id).await?)
    }

    async fn client_exists(&self, client_id: DbId) -> Result<bool, StoreError> {
        Ok(ClientRepo::exists(&self.pool, client_id).await?)
    }

    async fn find_guest(
        &self,
        client_id: DbId,
        full_name: &str,
    ) -> Result<Option<Guest>, StoreError> {
        Ok(GuestRepo::find_by_name(&self.pool, client_id, full_name).await?)
    }

    async fn create_guest(&self, input: &CreateGuest) -> Result<Guest, StoreError> {
        Ok(GuestRepo::create(&self.pool, input).await?)
    }
}
