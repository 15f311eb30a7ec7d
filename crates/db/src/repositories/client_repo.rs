//! Read-only lookups against the `clients` table.

use lockerdesk_core::types::DbId;
use sqlx::PgPool;

pub struct ClientRepo;

impl ClientRepo {
    /// Returns `true` if a client with the given id exists.
    pub async fn exists(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM clients WHERE id = $1)")
            .bind(id)
            .fetch_one(pool)
            .await
    }
}
