//! Repository for the `guests` table.

use lockerdesk_core::types::DbId;
use sqlx::PgPool;

use crate::models::guest::{CreateGuest, Guest};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, client_id, full_name, phone, created_at";

/// Find and insert operations for guests. Existing rows are never updated.
pub struct GuestRepo;

impl GuestRepo {
    /// Find a guest by exact `(client_id, full_name)`.
    ///
    /// If duplicates exist the oldest row wins, so every caller converges on
    /// the same guest.
    pub async fn find_by_name(
        pool: &PgPool,
        client_id: DbId,
        full_name: &str,
    ) -> Result<Option<Guest>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM guests
             WHERE client_id = $1 AND full_name = $2
             ORDER BY id ASC
             LIMIT 1"
        );
        sqlx::query_as::<_, Guest>(&query)
            .bind(client_id)
            .bind(full_name)
            .fetch_optional(pool)
            .await
    }

    /// Insert a new guest, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateGuest) -> Result<Guest, sqlx::Error> {
        let query = format!(
            "INSERT INTO guests (client_id, full_name, phone)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Guest>(&query)
            .bind(input.client_id)
            .bind(&input.full_name)
            .bind(&input.phone)
            .fetch_one(pool)
            .await
    }
}
