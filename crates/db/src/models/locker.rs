//! Locker entity model.

use lockerdesk_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// Status of a locker in service; the only other value is `inactive`.
pub const LOCKER_ACTIVE: &str = "active";

/// A row from the `lockers` table.
///
/// Lockers are provisioned by administrative flows; the occupancy core
/// only reads them.
#[derive(Debug, Clone, FromRow, Serialize, PartialEq, Eq)]
pub struct Locker {
    pub id: DbId,
    pub client_id: DbId,
    pub name: String,
    pub door_count: i32,
    pub location: Option<String>,
    pub status: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Locker {
    pub fn is_active(&self) -> bool {
        self.status == LOCKER_ACTIVE
    }
}
