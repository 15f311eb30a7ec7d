//! Door row model joined with its assignee details.

use lockerdesk_core::assignee::{Assignee, AssigneeSummary};
use lockerdesk_core::door::{DoorState, DoorView};
use lockerdesk_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from `doors` left-joined with `guests` and `users`.
///
/// `status` is kept as text here and parsed into
/// [`DoorStatus`](lockerdesk_core::door::DoorStatus) by [`DoorViewRow::into_view`].
#[derive(Debug, Clone, FromRow)]
pub struct DoorViewRow {
    pub id: DbId,
    pub locker_id: DbId,
    pub door_number: i32,
    pub status: String,
    pub assigned_user_id: Option<DbId>,
    pub assigned_guest_id: Option<DbId>,
    pub assigned_at: Option<Timestamp>,
    pub updated_at: Timestamp,
    pub guest_name: Option<String>,
    pub guest_phone: Option<String>,
    pub user_name: Option<String>,
    pub user_email: Option<String>,
}

impl DoorViewRow {
    /// Convert into the domain view, failing if the stored status is unknown.
    pub fn into_view(self) -> Result<DoorView, sqlx::Error> {
        let status = self
            .status
            .parse()
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

        let state = DoorState {
            id: self.id,
            locker_id: self.locker_id,
            door_number: self.door_number,
            status,
            assigned_user_id: self.assigned_user_id,
            assigned_guest_id: self.assigned_guest_id,
            assigned_at: self.assigned_at,
            updated_at: self.updated_at,
        };

        let assignee = state.assignee().map(|assignee| match assignee {
            Assignee::Guest(_) if self.guest_name.is_some() => AssigneeSummary {
                kind: assignee.kind(),
                id: assignee.id(),
                name: self.guest_name,
                contact: self.guest_phone,
            },
            Assignee::User(_) if self.user_name.is_some() => AssigneeSummary {
                kind: assignee.kind(),
                id: assignee.id(),
                name: self.user_name,
                contact: self.user_email,
            },
            _ => AssigneeSummary::unresolved(assignee),
        });

        Ok(DoorView { state, assignee })
    }
}

#[cfg(test)]
mod tests {
    use lockerdesk_core::assignee::AssigneeKind;
    use lockerdesk_core::door::DoorStatus;

    use super::*;

    fn row(status: &str) -> DoorViewRow {
        DoorViewRow {
            id: 1,
            locker_id: 2,
            door_number: 3,
            status: status.to_string(),
            assigned_user_id: None,
            assigned_guest_id: None,
            assigned_at: None,
            updated_at: chrono::Utc::now(),
            guest_name: None,
            guest_phone: None,
            user_name: None,
            user_email: None,
        }
    }

    #[test]
    fn available_row_has_no_assignee() {
        let view = row("available").into_view().unwrap();
        assert_eq!(view.state.status, DoorStatus::Available);
        assert!(view.assignee.is_none());
    }

    #[test]
    fn guest_row_carries_name_and_phone() {
        let mut r = row("occupied");
        r.assigned_guest_id = Some(8);
        r.assigned_at = Some(r.updated_at);
        r.guest_name = Some("Maria Cruz".into());
        r.guest_phone = Some("0917".into());

        let summary = r.into_view().unwrap().assignee.unwrap();
        assert_eq!(summary.kind, AssigneeKind::Guest);
        assert_eq!(summary.id, 8);
        assert_eq!(summary.name.as_deref(), Some("Maria Cruz"));
        assert_eq!(summary.contact.as_deref(), Some("0917"));
    }

    #[test]
    fn dangling_user_is_unresolved() {
        let mut r = row("overdue");
        r.assigned_user_id = Some(42);
        r.assigned_at = Some(r.updated_at);

        let summary = r.into_view().unwrap().assignee.unwrap();
        assert_eq!(summary.kind, AssigneeKind::User);
        assert!(summary.name.is_none());
    }

    #[test]
    fn unknown_status_fails_to_decode() {
        assert!(row("reserved").into_view().is_err());
    }
}
