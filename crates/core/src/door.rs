//! Door status state machine and door snapshots.
//!
//! A door moves through three states:
//!
//! ```text
//! available --assign--> occupied --unassign--> available
//! occupied --mark_overdue--> overdue --unassign--> available
//! ```
//!
//! `mark_overdue` is only ever driven from outside the engine (a time
//! policy evaluator); the engine accepts it but never originates it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::assignee::{Assignee, AssigneeSummary};
use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// DoorStatus
// ---------------------------------------------------------------------------

/// Occupancy status of a single door.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DoorStatus {
    Available,
    Occupied,
    Overdue,
}

impl DoorStatus {
    pub const ALL: [DoorStatus; 3] = [Self::Available, Self::Occupied, Self::Overdue];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Occupied => "occupied",
            Self::Overdue => "overdue",
        }
    }

    /// Only `available` doors accept a new assignee. `overdue` counts as
    /// taken exactly like `occupied`.
    pub const fn is_available(self) -> bool {
        matches!(self, Self::Available)
    }
}

impl fmt::Display for DoorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DoorStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(Self::Available),
            "occupied" => Ok(Self::Occupied),
            "overdue" => Ok(Self::Overdue),
            other => Err(CoreError::Validation(format!(
                "Invalid door status '{other}'. Must be one of: available, occupied, overdue"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// DoorTransition
// ---------------------------------------------------------------------------

/// A mutation the engine can commit against a door.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoorTransition {
    Assign,
    Unassign,
    MarkOverdue,
}

impl DoorTransition {
    /// Statuses the door must currently be in for the transition to commit.
    ///
    /// Stores use this as the guard of their conditional update.
    pub const fn source_statuses(self) -> &'static [DoorStatus] {
        match self {
            Self::Assign => &[DoorStatus::Available],
            Self::Unassign => &[DoorStatus::Occupied, DoorStatus::Overdue],
            Self::MarkOverdue => &[DoorStatus::Occupied],
        }
    }

    /// Status the door ends up in once the transition commits.
    pub const fn target(self) -> DoorStatus {
        match self {
            Self::Assign => DoorStatus::Occupied,
            Self::Unassign => DoorStatus::Available,
            Self::MarkOverdue => DoorStatus::Overdue,
        }
    }

    pub fn permits(self, from: DoorStatus) -> bool {
        self.source_statuses().contains(&from)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Assign => "assign",
            Self::Unassign => "unassign",
            Self::MarkOverdue => "mark_overdue",
        }
    }
}

// ---------------------------------------------------------------------------
// DoorState / DoorView
// ---------------------------------------------------------------------------

/// Authoritative snapshot of a door row.
///
/// `updated_at` is the commit time of the last change and strictly
/// increases per door; viewers order deltas by it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoorState {
    pub id: DbId,
    pub locker_id: DbId,
    pub door_number: i32,
    pub status: DoorStatus,
    pub assigned_user_id: Option<DbId>,
    pub assigned_guest_id: Option<DbId>,
    pub assigned_at: Option<Timestamp>,
    pub updated_at: Timestamp,
}

impl DoorState {
    /// A freshly provisioned, unassigned door.
    pub fn vacant(id: DbId, locker_id: DbId, door_number: i32, now: Timestamp) -> Self {
        Self {
            id,
            locker_id,
            door_number,
            status: DoorStatus::Available,
            assigned_user_id: None,
            assigned_guest_id: None,
            assigned_at: None,
            updated_at: now,
        }
    }

    pub fn assignee(&self) -> Option<Assignee> {
        match (self.assigned_user_id, self.assigned_guest_id) {
            (Some(user_id), None) => Some(Assignee::User(user_id)),
            (None, Some(guest_id)) => Some(Assignee::Guest(guest_id)),
            _ => None,
        }
    }

    /// Check the field exclusivity invariant: at most one assignee is set,
    /// and both are null exactly when the door is available.
    pub fn check_invariants(&self) -> Result<(), CoreError> {
        let user = self.assigned_user_id.is_some();
        let guest = self.assigned_guest_id.is_some();

        if user && guest {
            return Err(CoreError::Internal(format!(
                "door {} has both a user and a guest assigned",
                self.id
            )));
        }

        let has_assignee = user || guest;
        if self.status.is_available() == has_assignee {
            return Err(CoreError::Internal(format!(
                "door {} is {} but assignee presence is {has_assignee}",
                self.id, self.status
            )));
        }

        if has_assignee != self.assigned_at.is_some() {
            return Err(CoreError::Internal(format!(
                "door {} assignment timestamp does not match its assignee",
                self.id
            )));
        }

        Ok(())
    }
}

/// A door together with enough about its assignee to render it without
/// another round trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoorView {
    #[serde(flatten)]
    pub state: DoorState,
    pub assignee: Option<AssigneeSummary>,
}

// ---------------------------------------------------------------------------
// AssignmentEvent
// ---------------------------------------------------------------------------

/// Produced by every successful assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentEvent {
    pub door_id: DbId,
    pub locker_id: DbId,
    pub assignee: Assignee,
    pub assigned_at: Timestamp,
}

// ---------------------------------------------------------------------------
// OccupancySummary
// ---------------------------------------------------------------------------

/// Door counts per status for one locker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccupancySummary {
    pub total: usize,
    pub available: usize,
    pub occupied: usize,
    pub overdue: usize,
}

impl OccupancySummary {
    pub fn from_statuses(statuses: impl IntoIterator<Item = DoorStatus>) -> Self {
        statuses.into_iter().fold(Self::default(), |mut acc, status| {
            acc.total += 1;
            match status {
                DoorStatus::Available => acc.available += 1,
                DoorStatus::Occupied => acc.occupied += 1,
                DoorStatus::Overdue => acc.overdue += 1,
            }
            acc
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
