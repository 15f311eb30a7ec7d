//! Assignee kinds and caller input validation.
//!
//! A door is assigned either to a registered user or to an ad-hoc guest.
//! Callers describe the assignee with a loosely typed [`AssigneeInput`];
//! [`AssigneeInput::into_request`] turns that into exactly one
//! [`AssigneeRequest`] or rejects it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::CoreError;
use crate::types::DbId;

/// Maximum guest name length accepted from callers.
pub const MAX_GUEST_NAME_LEN: u64 = 200;

/// Maximum guest phone length accepted from callers.
pub const MAX_GUEST_PHONE_LEN: u64 = 40;

/// Label rendered when an assignee reference can no longer be resolved.
pub const ASSIGNEE_UNAVAILABLE: &str = "assignee details unavailable";

// ---------------------------------------------------------------------------
// AssigneeKind / Assignee
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssigneeKind {
    User,
    Guest,
}

impl AssigneeKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Guest => "guest",
        }
    }
}

impl fmt::Display for AssigneeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssigneeKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "guest" => Ok(Self::Guest),
            other => Err(CoreError::Validation(format!(
                "Invalid assignee kind '{other}'. Must be one of: user, guest"
            ))),
        }
    }
}

/// A resolved assignee reference, ready to be written to a door.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum Assignee {
    User(DbId),
    Guest(DbId),
}

impl Assignee {
    pub const fn kind(&self) -> AssigneeKind {
        match self {
            Self::User(_) => AssigneeKind::User,
            Self::Guest(_) => AssigneeKind::Guest,
        }
    }

    pub const fn id(&self) -> DbId {
        match self {
            Self::User(id) | Self::Guest(id) => *id,
        }
    }

    pub const fn user_id(&self) -> Option<DbId> {
        match self {
            Self::User(id) => Some(*id),
            Self::Guest(_) => None,
        }
    }

    pub const fn guest_id(&self) -> Option<DbId> {
        match self {
            Self::Guest(id) => Some(*id),
            Self::User(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// AssigneeSummary
// ---------------------------------------------------------------------------

/// Display details for an assignee, carried on views and deltas.
///
/// `name` and `contact` are `None` when the referenced user no longer
/// exists in the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssigneeSummary {
    pub kind: AssigneeKind,
    pub id: DbId,
    pub name: Option<String>,
    pub contact: Option<String>,
}

impl AssigneeSummary {
    /// Summary for a reference whose details could not be found.
    pub fn unresolved(assignee: Assignee) -> Self {
        Self {
            kind: assignee.kind(),
            id: assignee.id(),
            name: None,
            contact: None,
        }
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(ASSIGNEE_UNAVAILABLE)
    }
}

// ---------------------------------------------------------------------------
// Caller input
// ---------------------------------------------------------------------------

/// Assignee as supplied by a caller.
///
/// `kind` may be omitted, in which case it is inferred from whichever of
/// `user_id` / `name` is present.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct AssigneeInput {
    pub kind: Option<String>,
    pub user_id: Option<DbId>,
    #[validate(length(max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 40))]
    pub phone: Option<String>,
}

/// A validated assignment target; exactly one assignee kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssigneeRequest {
    User { user_id: DbId },
    Guest { name: String, phone: Option<String> },
}

impl AssigneeInput {
    pub fn user(user_id: DbId) -> Self {
        Self {
            kind: Some(AssigneeKind::User.as_str().to_string()),
            user_id: Some(user_id),
            ..Default::default()
        }
    }

    pub fn guest(name: impl Into<String>, phone: Option<&str>) -> Self {
        Self {
            kind: Some(AssigneeKind::Guest.as_str().to_string()),
            name: Some(name.into()),
            phone: phone.map(str::to_string),
            ..Default::default()
        }
    }

    /// Validate that exactly one assignee kind is described.
    pub fn into_request(self) -> Result<AssigneeRequest, CoreError> {
        self.validate()
            .map_err(|e| CoreError::Validation(e.to_string()))?;

        let kind = self
            .kind
            .as_deref()
            .map(AssigneeKind::from_str)
            .transpose()?;

        match (kind, self.user_id, self.name) {
            (_, Some(_), Some(_)) => Err(CoreError::Validation(
                "Supply exactly one of user_id or name, not both".into(),
            )),
            (_, None, None) => Err(CoreError::Validation(
                "An assignee is required: supply user_id or name".into(),
            )),
            (Some(AssigneeKind::Guest), Some(_), None) => Err(CoreError::Validation(
                "Assignee kind 'guest' requires a name".into(),
            )),
            (Some(AssigneeKind::User), None, Some(_)) => Err(CoreError::Validation(
                "Assignee kind 'user' requires a user_id".into(),
            )),
            (_, Some(user_id), None) => {
                if self.phone.is_some() {
                    return Err(CoreError::Validation(
                        "A phone number only applies to guest assignees".into(),
                    ));
                }
                Ok(AssigneeRequest::User { user_id })
            }
            (_, None, Some(name)) => {
                let name = normalize_guest_name(&name).ok_or_else(|| {
                    CoreError::Validation("Guest name must not be empty".into())
                })?;
                let phone = self
                    .phone
                    .as_deref()
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(str::to_string);
                Ok(AssigneeRequest::Guest { name, phone })
            }
        }
    }
}

/// Trim surrounding whitespace from a guest name; `None` if nothing is left.
///
/// Matching is otherwise exact: case and inner whitespace are preserved.
pub fn normalize_guest_name(name: &str) -> Option<String> {
    let trimmed = name.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
