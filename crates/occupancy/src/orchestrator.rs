//! Assignment Orchestrator: the caller-facing entry point.
//!
//! Turns a raw [`AssigneeInput`] into a concrete [`Assignee`] (resolving
//! guests by name), then drives the engine. Transient store failures are
//! retried under the configured [`RetryPolicy`]; conflicts never are.
//!
//! A conflict always reaches the caller, even on a retried attempt. A
//! transient failure can hide a commit whose reply was lost, so a retry
//! that ends in `DoorNotAvailable` may be looking at this caller's own
//! assignment; the caller re-fetches the door to find out.

use std::sync::Arc;

use lockerdesk_core::assignee::{Assignee, AssigneeInput, AssigneeRequest};
use lockerdesk_core::door::{AssignmentEvent, DoorView};
use lockerdesk_core::types::DbId;

use crate::engine::OccupancyEngine;
use crate::error::{OccupancyError, ResolveError};
use crate::resolver::GuestResolver;
use crate::retry::RetryPolicy;

pub struct AssignmentOrchestrator {
    engine: Arc<OccupancyEngine>,
    resolver: GuestResolver,
    retry: RetryPolicy,
}

impl AssignmentOrchestrator {
    pub fn new(engine: Arc<OccupancyEngine>, resolver: GuestResolver, retry: RetryPolicy) -> Self {
        Self {
            engine,
            resolver,
            retry,
        }
    }

    pub fn engine(&self) -> &Arc<OccupancyEngine> {
        &self.engine
    }

    /// Assign `door_id` to the described assignee on behalf of `client_id`.
    pub async fn request_assignment(
        &self,
        door_id: DbId,
        client_id: DbId,
        input: AssigneeInput,
    ) -> Result<AssignmentEvent, OccupancyError> {
        let request = input
            .into_request()
            .map_err(|e| OccupancyError::InvalidAssignee(e.to_string()))?;

        let assignee = match request {
            AssigneeRequest::User { user_id } => Assignee::User(user_id),
            AssigneeRequest::Guest { name, phone } => self
                .retry
                .run(
                    "resolve_guest",
                    || self.resolver.resolve(client_id, &name, phone.as_deref()),
                    ResolveError::is_retryable,
                )
                .await
                .map_err(OccupancyError::AssigneeResolutionFailed)?
                .assignee(),
        };

        self.retry
            .run(
                "assign_door",
                || self.engine.assign(door_id, assignee),
                OccupancyError::is_transient,
            )
            .await
    }

    /// Release `door_id`. Succeeds on a door that is already available.
    pub async fn request_unassignment(&self, door_id: DbId) -> Result<(), OccupancyError> {
        self.retry
            .run(
                "unassign_door",
                || self.engine.unassign(door_id),
                OccupancyError::is_transient,
            )
            .await
    }

    /// Accept an external overdue signal for `door_id`.
    pub async fn request_overdue(&self, door_id: DbId) -> Result<DoorView, OccupancyError> {
        self.retry
            .run(
                "mark_overdue",
                || self.engine.mark_overdue(door_id),
                OccupancyError::is_transient,
            )
            .await
    }
}
