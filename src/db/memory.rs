// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory store for tests and local development.

use super::{sort_newest_first, Store};
use crate::error::AppError;
use crate::models::{ConnectionStatus, SharedWorkout, StoredCredential, Workout};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

/// `DashMap`-backed store. Clones share the same data.
#[derive(Clone, Default)]
pub struct MemoryDb {
    credentials: Arc<DashMap<u64, StoredCredential>>,
    statuses: Arc<DashMap<u64, ConnectionStatus>>,
    workouts: Arc<DashMap<String, Workout>>,
    shared: Arc<DashMap<String, SharedWorkout>>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryDb {
    async fn get_credential(&self, user_id: u64) -> Result<Option<StoredCredential>, AppError> {
        Ok(self.credentials.get(&user_id).map(|c| c.clone()))
    }

    async fn put_credential(&self, credential: &StoredCredential) -> Result<(), AppError> {
        self.credentials
            .insert(credential.user_id, credential.clone());
        Ok(())
    }

    async fn delete_credential(&self, user_id: u64) -> Result<(), AppError> {
        self.credentials.remove(&user_id);
        Ok(())
    }

    async fn get_connection_status(
        &self,
        user_id: u64,
    ) -> Result<Option<ConnectionStatus>, AppError> {
        Ok(self.statuses.get(&user_id).map(|s| s.clone()))
    }

    async fn put_connection_status(&self, status: &ConnectionStatus) -> Result<(), AppError> {
        self.statuses.insert(status.user_id, status.clone());
        Ok(())
    }

    async fn delete_connection_status(&self, user_id: u64) -> Result<(), AppError> {
        self.statuses.remove(&user_id);
        Ok(())
    }

    async fn get_workout(&self, workout_id: &str) -> Result<Option<Workout>, AppError> {
        Ok(self.workouts.get(workout_id).map(|w| w.clone()))
    }

    async fn put_workout(&self, workout: &Workout) -> Result<(), AppError> {
        self.workouts.insert(workout.id(), workout.clone());
        Ok(())
    }

    async fn list_workouts_for_coach(&self, coach_id: u64) -> Result<Vec<Workout>, AppError> {
        let mut workouts: Vec<Workout> = self
            .workouts
            .iter()
            .filter(|w| w.coach_id == coach_id)
            .map(|w| w.clone())
            .collect();
        workouts.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(workouts)
    }

    async fn get_shared_workout(&self, id: &str) -> Result<Option<SharedWorkout>, AppError> {
        Ok(self.shared.get(id).map(|s| s.clone()))
    }

    async fn put_shared_workout(&self, shared: &SharedWorkout) -> Result<(), AppError> {
        self.shared.insert(shared.id.clone(), shared.clone());
        Ok(())
    }

    async fn delete_shared_workout(&self, id: &str) -> Result<(), AppError> {
        self.shared.remove(id);
        Ok(())
    }

    async fn list_shared_for_athlete(
        &self,
        athlete_id: u64,
    ) -> Result<Vec<SharedWorkout>, AppError> {
        let mut shared: Vec<SharedWorkout> = self
            .shared
            .iter()
            .filter(|s| s.athlete_id == athlete_id)
            .map(|s| s.clone())
            .collect();
        sort_newest_first(&mut shared);
        Ok(shared)
    }

    async fn list_shared_for_coach(&self, coach_id: u64) -> Result<Vec<SharedWorkout>, AppError> {
        let mut shared: Vec<SharedWorkout> = self
            .shared
            .iter()
            .filter(|s| s.coach_id == coach_id)
            .map(|s| s.clone())
            .collect();
        sort_newest_first(&mut shared);
        Ok(shared)
    }
}
