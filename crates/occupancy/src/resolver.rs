//! Guest Resolver: idempotent find-or-create of guests per client.
//!
//! The lookup and the insert are two separate store calls. Two concurrent
//! first-time resolutions of the same name can both miss the lookup and both
//! insert; lookups always return the oldest row, so callers converge on one
//! guest and the extra row is inert.

use std::sync::Arc;

use lockerdesk_core::assignee::{normalize_guest_name, Assignee};
use lockerdesk_core::types::DbId;
use lockerdesk_db::models::guest::{CreateGuest, Guest};

use crate::error::ResolveError;
use crate::store::OccupancyStore;

/// Outcome of [`GuestResolver::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedGuest {
    pub guest: Guest,
    /// `true` if this call inserted the row.
    pub created: bool,
}

impl ResolvedGuest {
    pub fn assignee(&self) -> Assignee {
        Assignee::Guest(self.guest.id)
    }
}

pub struct GuestResolver {
    store: Arc<dyn OccupancyStore>,
}

impl GuestResolver {
    pub fn new(store: Arc<dyn OccupancyStore>) -> Self {
        Self { store }
    }

    /// Find the guest named `full_name` for `client_id`, creating it if absent.
    ///
    /// An existing guest's phone is never overwritten.
    pub async fn resolve(
        &self,
        client_id: DbId,
        full_name: &str,
        phone: Option<&str>,
    ) -> Result<ResolvedGuest, ResolveError> {
        let full_name = normalize_guest_name(full_name).ok_or(ResolveError::InvalidName)?;

        if !self
            .store
            .client_exists(client_id)
            .await
            .map_err(ResolveError::LookupFailed)?
        {
            return Err(ResolveError::UnknownClient(client_id));
        }

        if let Some(guest) = self
            .store
            .find_guest(client_id, &full_name)
            .await
            .map_err(ResolveError::LookupFailed)?
        {
            tracing::debug!(client_id, guest_id = guest.id, "Resolved existing guest");
            return Ok(ResolvedGuest {
                guest,
                created: false,
            });
        }

        let input = CreateGuest {
            client_id,
            full_name,
            phone: phone.map(str::to_string),
        };
        let guest = self
            .store
            .create_guest(&input)
            .await
            .map_err(ResolveError::CreateFailed)?;

        tracing::info!(client_id, guest_id = guest.id, "Created guest");
        Ok(ResolvedGuest {
            guest,
            created: true,
        })
    }
}
