//! Guest entity model and DTOs.

use lockerdesk_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `guests` table.
#[derive(Debug, Clone, FromRow, Serialize, PartialEq, Eq)]
pub struct Guest {
    pub id: DbId,
    pub client_id: DbId,
    pub full_name: String,
    pub phone: Option<String>,
    pub created_at: Timestamp,
}

/// DTO for creating a new guest.
#[derive(Debug, Clone)]
pub struct CreateGuest {
    pub client_id: DbId,
    pub full_name: String,
    pub phone: Option<String>,
}
