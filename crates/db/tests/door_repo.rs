//! Integration tests for guarded door transitions against a real database.
//!
//! These need a Postgres instance reachable through `DATABASE_URL` and are
//! ignored by default: `cargo test -p lockerdesk-db -- --ignored`.

use lockerdesk_core::assignee::{Assignee, AssigneeKind};
use lockerdesk_core::door::DoorStatus;
use lockerdesk_db::models::guest::CreateGuest;
use lockerdesk_db::repositories::{ClientRepo, DoorRepo, GuestRepo, LockerRepo};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Seed one client with one two-door locker. Returns `(client_id, locker_id, door_ids)`.
async fn seed(pool: &PgPool) -> (i64, i64, Vec<i64>) {
    let client_id: i64 = sqlx::query_scalar("INSERT INTO clients (name) VALUES ('Acme') RETURNING id")
        .fetch_one(pool)
        .await
        .unwrap();

    let locker_id: i64 = sqlx::query_scalar(
        "INSERT INTO lockers (client_id, name, door_count) VALUES ($1, 'Lobby', 2) RETURNING id",
    )
    .bind(client_id)
    .fetch_one(pool)
    .await
    .unwrap();

    let mut door_ids = Vec::new();
    for number in 1..=2 {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO doors (locker_id, door_number) VALUES ($1, $2) RETURNING id",
        )
        .bind(locker_id)
        .bind(number)
        .fetch_one(pool)
        .await
        .unwrap();
        door_ids.push(id);
    }

    (client_id, locker_id, door_ids)
}

async fn seed_user(pool: &PgPool, client_id: i64, name: &str) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO users (client_id, full_name, email) VALUES ($1, $2, 'u@example.com') RETURNING id",
    )
    .bind(client_id)
    .bind(name)
    .fetch_one(pool)
    .await
    .unwrap()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn assign_then_release_round_trip(pool: PgPool) {
    let (client_id, _, doors) = seed(&pool).await;
    let user_id = seed_user(&pool, client_id, "Ana Reyes").await;

    let assigned = DoorRepo::assign_if_available(&pool, doors[0], Assignee::User(user_id))
        .await
        .unwrap()
        .expect("available door should be assigned");
    assert_eq!(assigned.state.status, DoorStatus::Occupied);
    assert_eq!(assigned.state.assigned_user_id, Some(user_id));
    assert_eq!(assigned.state.assigned_at, Some(assigned.state.updated_at));
    let summary = assigned.assignee.unwrap();
    assert_eq!(summary.kind, AssigneeKind::User);
    assert_eq!(summary.name.as_deref(), Some("Ana Reyes"));

    let released = DoorRepo::release(&pool, doors[0]).await.unwrap().unwrap();
    assert_eq!(released.state.status, DoorStatus::Available);
    assert!(released.state.assigned_user_id.is_none());
    assert!(released.state.assigned_guest_id.is_none());
    assert!(released.state.assigned_at.is_none());
    assert!(released.state.updated_at > assigned.state.updated_at);
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn second_assign_matches_no_row(pool: PgPool) {
    let (_, _, doors) = seed(&pool).await;

    let first = DoorRepo::assign_if_available(&pool, doors[0], Assignee::User(1))
        .await
        .unwrap();
    assert!(first.is_some());

    let second = DoorRepo::assign_if_available(&pool, doors[0], Assignee::User(2))
        .await
        .unwrap();
    assert!(second.is_none());

    let current = DoorRepo::find_view(&pool, doors[0]).await.unwrap().unwrap();
    assert_eq!(current.state.assigned_user_id, Some(1));
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn concurrent_assigns_commit_once(pool: PgPool) {
    let (_, _, doors) = seed(&pool).await;
    let door_id = doors[1];

    let mut handles = Vec::new();
    for user_id in 1..=8 {
        let pool = pool.clone();
        handles.push(tokio::spawn(async move {
            DoorRepo::assign_if_available(&pool, door_id, Assignee::User(user_id))
                .await
                .unwrap()
                .is_some()
        }));
    }

    let mut wins = 0;
    for handle in handles {
        if handle.await.unwrap() {
            wins += 1;
        }
    }
    assert_eq!(wins, 1);
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn overdue_only_from_occupied(pool: PgPool) {
    let (_, _, doors) = seed(&pool).await;

    assert!(DoorRepo::mark_overdue(&pool, doors[0]).await.unwrap().is_none());

    DoorRepo::assign_if_available(&pool, doors[0], Assignee::User(5))
        .await
        .unwrap();
    let overdue = DoorRepo::mark_overdue(&pool, doors[0]).await.unwrap().unwrap();
    assert_eq!(overdue.state.status, DoorStatus::Overdue);
    assert_eq!(overdue.state.assigned_user_id, Some(5));

    assert!(DoorRepo::assign_if_available(&pool, doors[0], Assignee::User(6))
        .await
        .unwrap()
        .is_none());
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn check_constraint_rejects_both_assignees(pool: PgPool) {
    let (client_id, _, doors) = seed(&pool).await;
    let guest = GuestRepo::create(
        &pool,
        &CreateGuest {
            client_id,
            full_name: "Maria Cruz".into(),
            phone: None,
        },
    )
    .await
    .unwrap();

    let result = sqlx::query(
        "UPDATE doors SET status = 'occupied', assigned_user_id = 1, assigned_guest_id = $2, \
         assigned_at = NOW() WHERE id = $1",
    )
    .bind(doors[0])
    .bind(guest.id)
    .execute(&pool)
    .await;
    assert!(result.is_err());
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn guest_lookup_prefers_oldest_row(pool: PgPool) {
    let (client_id, _, _) = seed(&pool).await;
    assert!(ClientRepo::exists(&pool, client_id).await.unwrap());

    let input = CreateGuest {
        client_id,
        full_name: "Jane Doe".into(),
        phone: Some("0917".into()),
    };
    let first = GuestRepo::create(&pool, &input).await.unwrap();
    let _dup = GuestRepo::create(&pool, &input).await.unwrap();

    let found = GuestRepo::find_by_name(&pool, client_id, "Jane Doe")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, first.id);

    assert!(GuestRepo::find_by_name(&pool, client_id, "jane doe")
        .await
        .unwrap()
        .is_none());
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn doors_list_in_number_order(pool: PgPool) {
    let (client_id, locker_id, _) = seed(&pool).await;

    let locker = LockerRepo::find_by_id(&pool, locker_id).await.unwrap().unwrap();
    assert!(locker.is_active());
    assert_eq!(LockerRepo::list_by_client(&pool, client_id).await.unwrap().len(), 1);

    let doors = DoorRepo::list_views_by_locker(&pool, locker_id).await.unwrap();
    let numbers: Vec<i32> = doors.iter().map(|d| d.state.door_number).collect();
    assert_eq!(numbers, vec![1, 2]);
    assert_eq!(doors.len() as i32, locker.door_count);
}
