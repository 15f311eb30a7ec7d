//! Repository for the `lockers` table.

use lockerdesk_core::types::DbId;
use sqlx::PgPool;

use crate::models::locker::Locker;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str =
    "id, client_id, name, door_count, location, status, created_at, updated_at";

/// Read access to lockers. Provisioning lives outside the occupancy core.
pub struct LockerRepo;

impl LockerRepo {
    /// Find a locker by its internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Locker>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM lockers WHERE id = $1");
        sqlx::query_as::<_, Locker>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List a client's lockers ordered by name.
    pub async fn list_by_client(pool: &PgPool, client_id: DbId) -> Result<Vec<Locker>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM lockers WHERE client_id = $1 ORDER BY name");
        sqlx::query_as::<_, Locker>(&query)
            .bind(client_id)
            .fetch_all(pool)
            .await
    }
}
