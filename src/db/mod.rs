// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Persistence layer.
//!
//! Services talk to the [`Store`] trait. Production uses Firestore; tests and
//! local development without a GCP project use the in-memory store.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryDb;

use crate::error::AppError;
use crate::models::{ConnectionStatus, SharedWorkout, StoredCredential, Workout};
use async_trait::async_trait;

/// Collection names as constants.
pub mod collections {
    pub const CREDENTIALS: &str = "garmin_credentials";
    pub const CONNECTION_STATUS: &str = "connection_status";
    pub const WORKOUTS: &str = "workouts";
    pub const SHARED_WORKOUTS: &str = "shared_workouts";
}

/// CRUD access to the records the service owns.
///
/// Every write replaces the whole document.
#[async_trait]
pub trait Store: Send + Sync {
    // ─── Credentials ─────────────────────────────────────────────
    async fn get_credential(&self, user_id: u64) -> Result<Option<StoredCredential>, AppError>;
    async fn put_credential(&self, credential: &StoredCredential) -> Result<(), AppError>;
    /// Succeeds when nothing is stored.
    async fn delete_credential(&self, user_id: u64) -> Result<(), AppError>;

    // ─── Connection status ───────────────────────────────────────
    async fn get_connection_status(
        &self,
        user_id: u64,
    ) -> Result<Option<ConnectionStatus>, AppError>;
    async fn put_connection_status(&self, status: &ConnectionStatus) -> Result<(), AppError>;
    async fn delete_connection_status(&self, user_id: u64) -> Result<(), AppError>;

    // ─── Coach workout library ───────────────────────────────────
    async fn get_workout(&self, workout_id: &str) -> Result<Option<Workout>, AppError>;
    async fn put_workout(&self, workout: &Workout) -> Result<(), AppError>;
    async fn put_workouts(&self, workouts: &[Workout]) -> Result<(), AppError> {
        for workout in workouts {
            self.put_workout(workout).await?;
        }
        Ok(())
    }
    async fn list_workouts_for_coach(&self, coach_id: u64) -> Result<Vec<Workout>, AppError>;

    // ─── Shared workouts ─────────────────────────────────────────
    async fn get_shared_workout(&self, id: &str) -> Result<Option<SharedWorkout>, AppError>;
    async fn put_shared_workout(&self, shared: &SharedWorkout) -> Result<(), AppError>;
    async fn delete_shared_workout(&self, id: &str) -> Result<(), AppError>;
    async fn list_shared_for_athlete(&self, athlete_id: u64)
        -> Result<Vec<SharedWorkout>, AppError>;
    async fn list_shared_for_coach(&self, coach_id: u64) -> Result<Vec<SharedWorkout>, AppError>;
}

/// Newest first; RFC3339 `Z` timestamps sort lexically.
pub(crate) fn sort_newest_first(shared: &mut [SharedWorkout]) {
    shared.sort_by(|a, b| b.shared_at.cmp(&a.shared_at).then_with(|| a.id.cmp(&b.id)));
}
