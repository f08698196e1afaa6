// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore integration tests.
//!
//! These tests require the Firestore emulator to be running.
//! Run with: FIRESTORE_EMULATOR_HOST=localhost:8080 cargo test --test firestore_integration
//!
//! Each test uses unique IDs so runs do not interfere.

use coach_sync::db::Store;
use coach_sync::models::{
    ConnectionStatus, SharedWorkout, SharedWorkoutStatus, StoredCredential, Workout, WorkoutType,
};

mod common;
use common::test_db;

/// Generate a unique user ID for test isolation.
fn unique_user_id() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos() as u64
}

fn test_workout(coach_id: u64, external_id: &str) -> Workout {
    Workout {
        coach_id,
        external_workout_id: external_id.to_string(),
        name: format!("Workout {}", external_id),
        workout_type: WorkoutType::Cycling,
        description: Some("Over-unders".to_string()),
        payload: format!(r#"{{"workoutId":{}}}"#, external_id),
        synced_at: "2026-05-01T10:00:00.000Z".to_string(),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// CREDENTIAL & STATUS TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_credential_crud() {
    require_emulator!();

    let db = test_db().await;
    let user_id = unique_user_id();

    assert!(db.get_credential(user_id).await.unwrap().is_none());

    let credential = StoredCredential {
        user_id,
        email_encrypted: "ZW1haWw=".to_string(),
        password_encrypted: "cGFzcw==".to_string(),
        created_at: "2026-05-01T10:00:00.000Z".to_string(),
    };
    db.put_credential(&credential).await.unwrap();
    assert_eq!(db.get_credential(user_id).await.unwrap(), Some(credential));

    db.delete_credential(user_id).await.unwrap();
    assert!(db.get_credential(user_id).await.unwrap().is_none());

    // Deleting again is not an error
    db.delete_credential(user_id).await.unwrap();
}

#[tokio::test]
async fn test_connection_status_round_trip() {
    require_emulator!();

    let db = test_db().await;
    let user_id = unique_user_id();

    let status = ConnectionStatus::verified(
        user_id,
        Some("Pat Runner".to_string()),
        "2026-05-01T10:00:00.000Z".to_string(),
    );
    db.put_connection_status(&status).await.unwrap();
    assert_eq!(
        db.get_connection_status(user_id).await.unwrap(),
        Some(status)
    );

    db.delete_connection_status(user_id).await.unwrap();
    assert!(db.get_connection_status(user_id).await.unwrap().is_none());
}

// ═══════════════════════════════════════════════════════════════════════════
// WORKOUT TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_workout_library_batch_write() {
    require_emulator!();

    let db = test_db().await;
    let coach_id = unique_user_id();

    let workouts: Vec<Workout> = (1..=5)
        .map(|i| test_workout(coach_id, &i.to_string()))
        .collect();
    db.put_workouts(&workouts).await.unwrap();

    let listed = db.list_workouts_for_coach(coach_id).await.unwrap();
    assert_eq!(listed.len(), 5);

    let one = db
        .get_workout(&Workout::doc_id(coach_id, "3"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(one.name, "Workout 3");
}

#[tokio::test]
async fn test_shared_workout_queries() {
    require_emulator!();

    let db = test_db().await;
    let coach_id = unique_user_id();
    let athlete_id = coach_id + 1;
    let workout = test_workout(coach_id, "42");

    let first = SharedWorkout::new_pending(&workout, athlete_id, "2026-05-01T10:00:00.000Z".to_string());
    let mut second =
        SharedWorkout::new_pending(&workout, athlete_id, "2026-05-02T10:00:00.000Z".to_string());
    second
        .mark_imported("garmin-1".to_string(), "2026-05-02T11:00:00.000Z".to_string())
        .unwrap();

    db.put_shared_workout(&first).await.unwrap();
    db.put_shared_workout(&second).await.unwrap();

    let for_athlete = db.list_shared_for_athlete(athlete_id).await.unwrap();
    assert_eq!(for_athlete.len(), 2);
    assert_eq!(for_athlete[0].id, second.id, "newest first");
    assert_eq!(for_athlete[0].status, SharedWorkoutStatus::Imported);

    let for_coach = db.list_shared_for_coach(coach_id).await.unwrap();
    assert_eq!(for_coach.len(), 2);

    db.delete_shared_workout(&first.id).await.unwrap();
    assert!(db.get_shared_workout(&first.id).await.unwrap().is_none());
}
