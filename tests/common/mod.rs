// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use coach_sync::config::Config;
use coach_sync::db::{FirestoreDb, MemoryDb};
use coach_sync::middleware::auth::{create_jwt, Role};
use coach_sync::routes::create_router;
use coach_sync::services::{GarminClient, GarminError, GarminSession};
use coach_sync::AppState;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[allow(dead_code)]
pub const COACH_ID: u64 = 100;
#[allow(dead_code)]
pub const ATHLETE_ID: u64 = 200;
#[allow(dead_code)]
pub const COACH_EMAIL: &str = "coach@example.com";
#[allow(dead_code)]
pub const ATHLETE_EMAIL: &str = "athlete@example.com";
#[allow(dead_code)]
pub const GOOD_PASSWORD: &str = "correct horse battery staple";

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Scripted stand-in for Garmin Connect.
#[derive(Default)]
pub struct FakeGarmin {
    accounts: Mutex<HashMap<String, String>>,
    library: Mutex<Vec<Value>>,
    delay: Mutex<Option<Duration>>,
    unreachable: AtomicBool,
    reject_uploads: AtomicBool,
    uploads: AtomicUsize,
}

#[allow(dead_code)]
impl FakeGarmin {
    /// Fake with the coach and athlete accounts registered.
    pub fn new() -> Self {
        let fake = Self::default();
        fake.add_account(COACH_EMAIL, GOOD_PASSWORD);
        fake.add_account(ATHLETE_EMAIL, GOOD_PASSWORD);
        fake.set_library(vec![
            json!({
                "workoutId": 9001,
                "ownerId": 1,
                "workoutName": "Tempo 5k",
                "description": "20min @ tempo",
                "sportType": {"sportTypeId": 1, "sportTypeKey": "running"}
            }),
            json!({
                "workoutId": 9002,
                "ownerId": 1,
                "workoutName": "Sweet spot",
                "sportType": {"sportTypeId": 2, "sportTypeKey": "cycling"}
            }),
        ]);
        fake
    }

    pub fn add_account(&self, email: &str, password: &str) {
        self.accounts
            .lock()
            .unwrap()
            .insert(email.to_string(), password.to_string());
    }

    /// Simulate a password change on Garmin's side.
    pub fn remove_account(&self, email: &str) {
        self.accounts.lock().unwrap().remove(email);
    }

    pub fn set_library(&self, workouts: Vec<Value>) {
        *self.library.lock().unwrap() = workouts;
    }

    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    pub fn set_reject_uploads(&self, reject: bool) {
        self.reject_uploads.store(reject, Ordering::SeqCst);
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    async fn pause(&self) {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn check_reachable(&self) -> Result<(), GarminError> {
        if self.unreachable.load(Ordering::SeqCst) {
            Err(GarminError::Transport("connection refused".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl GarminClient for FakeGarmin {
    async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<GarminSession, GarminError> {
        self.pause().await;
        self.check_reachable()?;

        let valid = self.accounts.lock().unwrap().get(email).map(String::as_str) == Some(password);
        if !valid {
            return Err(GarminError::Auth("HTTP 401: invalid credentials".to_string()));
        }

        Ok(GarminSession {
            access_token: format!("token-for-{}", email),
            display_name: Some(format!("Garmin {}", email)),
        })
    }

    async fn list_workouts(&self, _session: &GarminSession) -> Result<Vec<Value>, GarminError> {
        self.pause().await;
        self.check_reachable()?;
        Ok(self.library.lock().unwrap().clone())
    }

    async fn upload_workout(
        &self,
        _session: &GarminSession,
        payload: &Value,
    ) -> Result<String, GarminError> {
        self.pause().await;
        self.check_reachable()?;
        assert!(
            payload.get("workoutId").is_none(),
            "server-assigned fields must be stripped before upload"
        );

        let n = self.uploads.fetch_add(1, Ordering::SeqCst) + 1;
        if self.reject_uploads.load(Ordering::SeqCst) {
            return Err(GarminError::Rejected("HTTP 422: invalid step".to_string()));
        }
        Ok(format!("athlete-workout-{}", n))
    }
}

/// Build state over an in-memory store and the given fake.
#[allow(dead_code)]
pub fn test_state(config: Config, garmin: Arc<FakeGarmin>) -> Arc<AppState> {
    Arc::new(AppState::build(config, Arc::new(MemoryDb::new()), garmin).expect("valid test state"))
}

/// Create a test app with in-memory dependencies.
/// Returns the router, the shared state, and the Garmin fake.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>, Arc<FakeGarmin>) {
    let garmin = Arc::new(FakeGarmin::new());
    let state = test_state(Config::test_default(), garmin.clone());
    (create_router(state.clone()), state, garmin)
}

/// Create a session JWT signed with the test key.
#[allow(dead_code)]
pub fn create_test_jwt(user_id: u64, role: Role) -> String {
    create_jwt(user_id, role, &Config::test_default().jwt_signing_key).expect("sign test jwt")
}

/// Connect both users and share the coach's library with the athlete.
/// Returns the shared workout IDs.
#[allow(dead_code)]
pub async fn connect_and_share(state: &AppState) -> Vec<String> {
    state
        .connection_service
        .connect(COACH_ID, COACH_EMAIL, GOOD_PASSWORD)
        .await
        .expect("coach connects");
    state
        .connection_service
        .connect(ATHLETE_ID, ATHLETE_EMAIL, GOOD_PASSWORD)
        .await
        .expect("athlete connects");

    let library = state
        .workout_service
        .sync_library(COACH_ID, None)
        .await
        .expect("library syncs");
    let ids: Vec<String> = library
        .iter()
        .map(|w| w.external_workout_id.clone())
        .collect();

    state
        .workout_service
        .share(COACH_ID, ATHLETE_ID, &ids)
        .await
        .expect("share succeeds")
        .shared_ids
}
