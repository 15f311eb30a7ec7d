//! Repository for the `doors` table.
//!
//! Every mutation is a single conditional `UPDATE ... WHERE status = ANY(..)`
//! so the precondition check and the write commit atomically. Two concurrent
//! assignments of the same door serialize on the row lock; the loser
//! re-evaluates the guard against the winner's row and affects zero rows.

use lockerdesk_core::assignee::Assignee;
use lockerdesk_core::door::{DoorTransition, DoorView};
use lockerdesk_core::types::DbId;
use sqlx::PgPool;

use crate::models::door::DoorViewRow;

/// Door columns plus joined assignee details, read from a relation aliased `d`.
const VIEW_COLUMNS: &str = "d.id, d.locker_id, d.door_number, d.status, \
                            d.assigned_user_id, d.assigned_guest_id, d.assigned_at, d.updated_at, \
                            g.full_name AS guest_name, g.phone AS guest_phone, \
                            u.full_name AS user_name, u.email AS user_email";

/// Joins that attach assignee details to a relation aliased `d`.
const VIEW_JOINS: &str = "LEFT JOIN guests g ON g.id = d.assigned_guest_id \
                          LEFT JOIN users u ON u.id = d.assigned_user_id";

/// Next commit time for a row: never earlier than the previous one.
const NEXT_COMMIT_TIME: &str = "GREATEST(NOW(), updated_at + INTERVAL '1 microsecond')";

/// Provides reads and guarded state transitions for doors.
pub struct DoorRepo;

impl DoorRepo {
    /// Find a door by id, with its assignee details.
    pub async fn find_view(pool: &PgPool, id: DbId) -> Result<Option<DoorView>, sqlx::Error> {
        let query = format!("SELECT {VIEW_COLUMNS} FROM doors d {VIEW_JOINS} WHERE d.id = $1");
        sqlx::query_as::<_, DoorViewRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?
            .map(DoorViewRow::into_view)
            .transpose()
    }

    /// List every door of a locker ordered by door number.
    pub async fn list_views_by_locker(
        pool: &PgPool,
        locker_id: DbId,
    ) -> Result<Vec<DoorView>, sqlx::Error> {
        let query = format!(
            "SELECT {VIEW_COLUMNS} FROM doors d {VIEW_JOINS} \
             WHERE d.locker_id = $1 ORDER BY d.door_number ASC"
        );
        sqlx::query_as::<_, DoorViewRow>(&query)
            .bind(locker_id)
            .fetch_all(pool)
            .await?
            .into_iter()
            .map(DoorViewRow::into_view)
            .collect()
    }

    /// Assign a door if, and only if, it is currently available.
    ///
    /// Returns `None` when no row matched: the door is missing or not
    /// available. The caller distinguishes the two with a follow-up read.
    pub async fn assign_if_available(
        pool: &PgPool,
        id: DbId,
        assignee: Assignee,
    ) -> Result<Option<DoorView>, sqlx::Error> {
        let set = format!(
            "status = $3, \
             assigned_user_id = $4, \
             assigned_guest_id = $5, \
             assigned_at = {NEXT_COMMIT_TIME}, \
             updated_at = {NEXT_COMMIT_TIME}"
        );
        let query = Self::transition_query(&set);
        sqlx::query_as::<_, DoorViewRow>(&query)
            .bind(id)
            .bind(Self::guard(DoorTransition::Assign))
            .bind(DoorTransition::Assign.target().as_str())
            .bind(assignee.user_id())
            .bind(assignee.guest_id())
            .fetch_optional(pool)
            .await?
            .map(DoorViewRow::into_view)
            .transpose()
    }

    /// Release an occupied or overdue door.
    ///
    /// Returns `None` when no row matched: the door is missing or already
    /// available.
    pub async fn release(pool: &PgPool, id: DbId) -> Result<Option<DoorView>, sqlx::Error> {
        let set = format!(
            "status = $3, \
             assigned_user_id = NULL, \
             assigned_guest_id = NULL, \
             assigned_at = NULL, \
             updated_at = {NEXT_COMMIT_TIME}"
        );
        let query = Self::transition_query(&set);
        sqlx::query_as::<_, DoorViewRow>(&query)
            .bind(id)
            .bind(Self::guard(DoorTransition::Unassign))
            .bind(DoorTransition::Unassign.target().as_str())
            .fetch_optional(pool)
            .await?
            .map(DoorViewRow::into_view)
            .transpose()
    }

    /// Move an occupied door to overdue, keeping its assignee.
    ///
    /// Returns `None` when no row matched: the door is missing or not
    /// occupied.
    pub async fn mark_overdue(pool: &PgPool, id: DbId) -> Result<Option<DoorView>, sqlx::Error> {
        let set = format!("status = $3, updated_at = {NEXT_COMMIT_TIME}");
        let query = Self::transition_query(&set);
        sqlx::query_as::<_, DoorViewRow>(&query)
            .bind(id)
            .bind(Self::guard(DoorTransition::MarkOverdue))
            .bind(DoorTransition::MarkOverdue.target().as_str())
            .fetch_optional(pool)
            .await?
            .map(DoorViewRow::into_view)
            .transpose()
    }

    /// Build a guarded `UPDATE` that returns the joined view of the new row.
    ///
    /// `$1` is the door id and `$2` the array of permitted source statuses.
    fn transition_query(set: &str) -> String {
        format!(
            "WITH d AS ( \
                 UPDATE doors SET {set} \
                 WHERE id = $1 AND status = ANY($2) \
                 RETURNING * \
             ) \
             SELECT {VIEW_COLUMNS} FROM d {VIEW_JOINS}"
        )
    }

    fn guard(transition: DoorTransition) -> Vec<&'static str> {
        transition
            .source_statuses()
            .iter()
            .map(|status| status.as_str())
            .collect()
    }
}
