//! Error taxonomy for the occupancy core.
//!
//! Only transient store failures are ever retried, and only by the
//! orchestrator or a reconciler. Conflicts (`DoorNotAvailable`) always reach
//! the caller.

use lockerdesk_core::door::DoorStatus;
use lockerdesk_core::types::DbId;

/// PostgreSQL SQLSTATE classes and codes the store cares about.
const PG_UNIQUE_VIOLATION: &str = "23505";
const PG_FOREIGN_KEY_VIOLATION: &str = "23503";
const PG_CHECK_VIOLATION: &str = "23514";
const PG_SERIALIZATION_FAILURE: &str = "40001";
const PG_DEADLOCK_DETECTED: &str = "40P01";
const PG_CONNECTION_EXCEPTION_CLASS: &str = "08";

// ---------------------------------------------------------------------------
// StoreError
// ---------------------------------------------------------------------------

/// Failure reported by an [`OccupancyStore`](crate::store::OccupancyStore).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Timeout, lost connection or similar; the same call may succeed later.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A constraint rejected the write.
    #[error("Store conflict: {0}")]
    Conflict(String),

    #[error("Store error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::WorkerCrashed => Self::Unavailable(err.to_string()),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().unwrap_or_default();
                match code.as_ref() {
                    PG_UNIQUE_VIOLATION | PG_FOREIGN_KEY_VIOLATION | PG_CHECK_VIOLATION => {
                        Self::Conflict(db_err.message().to_string())
                    }
                    PG_SERIALIZATION_FAILURE | PG_DEADLOCK_DETECTED => {
                        Self::Unavailable(db_err.message().to_string())
                    }
                    c if c.starts_with(PG_CONNECTION_EXCEPTION_CLASS) => {
                        Self::Unavailable(db_err.message().to_string())
                    }
                    _ => Self::Backend(db_err.message().to_string()),
                }
            }
            _ => Self::Backend(err.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// ResolveError
// ---------------------------------------------------------------------------

/// Failure reported by the [`GuestResolver`](crate::resolver::GuestResolver).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("Guest name must not be empty")]
    InvalidName,

    #[error("Client {0} not found")]
    UnknownClient(DbId),

    #[error("Guest lookup failed: {0}")]
    LookupFailed(#[source] StoreError),

    /// Creation failed. A conflict here usually means a concurrent resolver
    /// created the same guest; retrying the lookup finds it.
    #[error("Guest creation failed: {0}")]
    CreateFailed(#[source] StoreError),
}

impl ResolveError {
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::LookupFailed(e) => e.is_transient(),
            Self::CreateFailed(e) => e.is_transient() || matches!(e, StoreError::Conflict(_)),
            Self::InvalidName | Self::UnknownClient(_) => false,
        }
    }
}

// ---------------------------------------------------------------------------
// OccupancyError
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OccupancyError {
    #[error("Door {door_id} not found")]
    DoorNotFound { door_id: DbId },

    #[error("Locker {locker_id} not found")]
    LockerNotFound { locker_id: DbId },

    /// Someone else holds the door. Never retried automatically.
    #[error("Door {door_id} is not available (currently {status})")]
    DoorNotAvailable { door_id: DbId, status: DoorStatus },

    #[error("Invalid assignee: {0}")]
    InvalidAssignee(String),

    #[error("Door {door_id} cannot move from {from} to {to}")]
    InvalidTransition {
        door_id: DbId,
        from: DoorStatus,
        to: DoorStatus,
    },

    #[error("Could not resolve assignee: {0}")]
    AssigneeResolutionFailed(#[source] ResolveError),

    #[error("Live sync transport unavailable")]
    TransportUnavailable,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl OccupancyError {
    /// Store-level hiccups are the only class eligible for automatic retry.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Store(e) => e.is_transient(),
            Self::AssigneeResolutionFailed(e) => e.is_retryable(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_unavailable_store_errors_are_transient() {
        assert!(StoreError::Unavailable("timeout".into()).is_transient());
        assert!(!StoreError::Conflict("dup".into()).is_transient());
        assert!(!StoreError::Backend("syntax".into()).is_transient());
    }

    #[test]
    fn pool_timeout_is_unavailable() {
        let err = StoreError::from(sqlx::Error::PoolTimedOut);
        assert!(err.is_transient());
    }

    #[test]
    fn row_not_found_is_backend() {
        let err = StoreError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, StoreError::Backend(_)));
    }

    #[test]
    fn create_conflict_is_retryable() {
        let err = ResolveError::CreateFailed(StoreError::Conflict("dup".into()));
        assert!(err.is_retryable());
        assert!(!ResolveError::InvalidName.is_retryable());
        assert!(!ResolveError::UnknownClient(1).is_retryable());
    }

    #[test]
    fn conflicts_are_never_transient() {
        let err = OccupancyError::DoorNotAvailable {
            door_id: 1,
            status: DoorStatus::Occupied,
        };
        assert!(!err.is_transient());
        assert!(!OccupancyError::DoorNotFound { door_id: 1 }.is_transient());
    }

    #[test]
    fn not_available_message_names_status() {
        let err = OccupancyError::DoorNotAvailable {
            door_id: 4,
            status: DoorStatus::Overdue,
        };
        assert_eq!(err.to_string(), "Door 4 is not available (currently overdue)");
    }
}
