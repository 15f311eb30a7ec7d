//! Door-level guarantees of the engine and orchestrator, run against the
//! in-memory store: mutual exclusion, field exclusivity, round trips and
//! the two-operator conflict scenario.

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use lockerdesk_core::assignee::{Assignee, AssigneeInput, AssigneeKind};
use lockerdesk_core::door::DoorStatus;
use lockerdesk_core::types::DbId;
use lockerdesk_events::LiveSyncChannel;
use lockerdesk_occupancy::{
    AssignmentOrchestrator, GuestResolver, InMemoryStore, OccupancyEngine, OccupancyError,
    RetryPolicy,
};

struct Desk {
    store: Arc<InMemoryStore>,
    engine: Arc<OccupancyEngine>,
    orchestrator: AssignmentOrchestrator,
    client_id: DbId,
    doors: Vec<DbId>,
}

fn desk(door_count: i32) -> Desk {
    let store = Arc::new(InMemoryStore::new());
    let client_id = store.add_client("Acme").unwrap();
    let (_, doors) = store.add_locker(client_id, "Lobby", door_count).unwrap();
    let engine = Arc::new(OccupancyEngine::new(
        store.clone(),
        Arc::new(LiveSyncChannel::default()),
    ));
    let retry = RetryPolicy {
        initial_delay: Duration::from_millis(1),
        ..Default::default()
    };
    let orchestrator =
        AssignmentOrchestrator::new(Arc::clone(&engine), GuestResolver::new(store.clone()), retry);
    Desk {
        store,
        engine,
        orchestrator,
        client_id,
        doors,
    }
}

// ---------------------------------------------------------------------------
// Test: concurrent assigns on one door yield exactly one winner
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_assigns_have_exactly_one_winner() {
    const CONTENDERS: i64 = 16;
    let d = desk(1);
    let door = d.doors[0];

    let handles: Vec<_> = (1..=CONTENDERS)
        .map(|user_id| {
            let engine = Arc::clone(&d.engine);
            tokio::spawn(async move { engine.assign(door, Assignee::User(user_id)).await })
        })
        .collect();

    let results: Vec<_> = futures::future::join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let winners: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(winners.len(), 1);
    assert_eq!(
        results
            .iter()
            .filter(|r| matches!(r, Err(OccupancyError::DoorNotAvailable { .. })))
            .count() as i64,
        CONTENDERS - 1
    );

    let view = d.engine.get(door).await.unwrap();
    assert_eq!(view.state.assignee(), Some(winners[0].assignee));
}

// ---------------------------------------------------------------------------
// Test: assignee fields stay exclusive under a mixed operation sequence
// ---------------------------------------------------------------------------

#[tokio::test]
async fn assignee_fields_stay_exclusive() {
    let d = desk(4);

    for step in 0..60usize {
        let door = d.doors[step % d.doors.len()];
        let _ = match step % 5 {
            0 | 3 => d.engine.assign(door, Assignee::User(step as i64)).await.map(|_| ()),
            1 => d.engine.assign(door, Assignee::Guest(step as i64)).await.map(|_| ()),
            2 => d.engine.mark_overdue(door).await.map(|_| ()),
            _ => d.engine.unassign(door).await,
        };

        for door in d.store.door_states().unwrap() {
            door.check_invariants().unwrap();
            assert!(!(door.assigned_user_id.is_some() && door.assigned_guest_id.is_some()));
            if door.status == DoorStatus::Available {
                assert!(door.assigned_user_id.is_none() && door.assigned_guest_id.is_none());
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Test: assign then unassign restores the vacant state
// ---------------------------------------------------------------------------

#[tokio::test]
async fn assign_unassign_round_trip() {
    let d = desk(1);
    let door = d.doors[0];
    let before = d.engine.get(door).await.unwrap();

    d.engine.assign(door, Assignee::User(9)).await.unwrap();
    d.engine.unassign(door).await.unwrap();

    let after = d.engine.get(door).await.unwrap();
    assert_eq!(after.state.status, before.state.status);
    assert_eq!(after.state.assigned_user_id, None);
    assert_eq!(after.state.assigned_guest_id, None);
    assert_eq!(after.state.assigned_at, None);
    assert_eq!(after.assignee, None);
}

#[tokio::test]
async fn repeated_unassign_leaves_state_unchanged() {
    let d = desk(1);
    let door = d.doors[0];
    d.engine.unassign(door).await.unwrap();
    let once = d.engine.get(door).await.unwrap();
    d.engine.unassign(door).await.unwrap();
    assert_eq!(d.engine.get(door).await.unwrap(), once);
}

// ---------------------------------------------------------------------------
// Test: two operators contend for the same door
// ---------------------------------------------------------------------------

#[tokio::test]
async fn second_operator_is_rejected_and_first_keeps_door() {
    let d = desk(2);
    let d1 = d.doors[0];

    // Operator A assigns a walk-in guest.
    let event = d
        .orchestrator
        .request_assignment(d1, d.client_id, AssigneeInput::guest("Maria Cruz", Some("0917-555-0101")))
        .await
        .unwrap();
    assert_matches!(event.assignee, Assignee::Guest(_));
    assert_eq!(d.store.guest_count(d.client_id, "Maria Cruz").unwrap(), 1);

    let view = d.engine.get(d1).await.unwrap();
    assert_eq!(view.state.status, DoorStatus::Occupied);

    // Operator B tries to hand the same door to user 42.
    assert_matches!(
        d.orchestrator
            .request_assignment(d1, d.client_id, AssigneeInput::user(42))
            .await,
        Err(OccupancyError::DoorNotAvailable { status: DoorStatus::Occupied, .. })
    );

    let view = d.engine.get(d1).await.unwrap();
    let summary = view.assignee.unwrap();
    assert_eq!(summary.kind, AssigneeKind::Guest);
    assert_eq!(summary.name.as_deref(), Some("Maria Cruz"));
    assert_eq!(summary.contact.as_deref(), Some("0917-555-0101"));

    // Operator A releases it.
    d.orchestrator.request_unassignment(d1).await.unwrap();
    let view = d.engine.get(d1).await.unwrap();
    assert_eq!(view.state.status, DoorStatus::Available);
    assert_eq!(view.state.assigned_user_id, None);
    assert_eq!(view.state.assigned_guest_id, None);
}

// ---------------------------------------------------------------------------
// Test: dangling user references still render
// ---------------------------------------------------------------------------

#[tokio::test]
async fn removed_user_shows_as_unavailable() {
    let d = desk(1);
    let user = d.store.add_user(d.client_id, "Sam Reyes", Some("sam@example.com")).unwrap();
    d.engine.assign(d.doors[0], Assignee::User(user)).await.unwrap();
    d.store.remove_user(user).unwrap();

    let view = d.engine.get(d.doors[0]).await.unwrap();
    let summary = view.assignee.unwrap();
    assert_eq!(summary.id, user);
    assert_eq!(summary.display_name(), "assignee details unavailable");
}
