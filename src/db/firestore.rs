// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Garmin credentials (encrypted, keyed by user)
//! - Connection status (keyed by user)
//! - Coach workout library
//! - Workouts shared with athletes

use super::{collections, sort_newest_first, Store};
use crate::error::AppError;
use crate::models::{ConnectionStatus, SharedWorkout, StoredCredential, Workout};
use async_trait::async_trait;
use futures_util::{stream, StreamExt};

const MAX_CONCURRENT_DB_OPS: usize = 50;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Offline client: every operation returns `AppError::Database`.
    pub fn new_offline() -> Self {
        Self { client: None }
    }

    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    async fn delete_doc(&self, collection: &str, id: &str) -> Result<(), AppError> {
        // Firestore deletes are no-ops for missing documents.
        self.get_client()?
            .fluent()
            .delete()
            .from(collection)
            .document_id(id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl Store for FirestoreDb {
    // ─── Credential Operations ───────────────────────────────────

    async fn get_credential(&self, user_id: u64) -> Result<Option<StoredCredential>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::CREDENTIALS)
            .obj()
            .one(&user_id.to_string())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn put_credential(&self, credential: &StoredCredential) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::CREDENTIALS)
            .document_id(credential.user_id.to_string())
            .object(credential)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn delete_credential(&self, user_id: u64) -> Result<(), AppError> {
        self.delete_doc(collections::CREDENTIALS, &user_id.to_string())
            .await
    }

    // ─── Connection Status Operations ────────────────────────────

    async fn get_connection_status(
        &self,
        user_id: u64,
    ) -> Result<Option<ConnectionStatus>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::CONNECTION_STATUS)
            .obj()
            .one(&user_id.to_string())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn put_connection_status(&self, status: &ConnectionStatus) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::CONNECTION_STATUS)
            .document_id(status.user_id.to_string())
            .object(status)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn delete_connection_status(&self, user_id: u64) -> Result<(), AppError> {
        self.delete_doc(collections::CONNECTION_STATUS, &user_id.to_string())
            .await
    }

    // ─── Workout Library Operations ──────────────────────────────

    async fn get_workout(&self, workout_id: &str) -> Result<Option<Workout>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::WORKOUTS)
            .obj()
            .one(workout_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn put_workout(&self, workout: &Workout) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::WORKOUTS)
            .document_id(workout.id())
            .object(workout)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Library syncs can be a few hundred documents; write them concurrently.
    async fn put_workouts(&self, workouts: &[Workout]) -> Result<(), AppError> {
        let writes: Vec<_> = workouts.iter().map(|w| self.put_workout(w)).collect();
        stream::iter(writes)
            .buffer_unordered(MAX_CONCURRENT_DB_OPS)
            .collect::<Vec<Result<(), AppError>>>()
            .await
            .into_iter()
            .collect::<Result<Vec<()>, AppError>>()?;
        Ok(())
    }

    async fn list_workouts_for_coach(&self, coach_id: u64) -> Result<Vec<Workout>, AppError> {
        let mut workouts: Vec<Workout> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::WORKOUTS)
            .filter(|q| q.for_all([q.field("coach_id").eq(coach_id)]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        workouts.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(workouts)
    }

    // ─── Shared Workout Operations ───────────────────────────────

    async fn get_shared_workout(&self, id: &str) -> Result<Option<SharedWorkout>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::SHARED_WORKOUTS)
            .obj()
            .one(id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn put_shared_workout(&self, shared: &SharedWorkout) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::SHARED_WORKOUTS)
            .document_id(&shared.id)
            .object(shared)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn delete_shared_workout(&self, id: &str) -> Result<(), AppError> {
        self.delete_doc(collections::SHARED_WORKOUTS, id).await
    }

    async fn list_shared_for_athlete(
        &self,
        athlete_id: u64,
    ) -> Result<Vec<SharedWorkout>, AppError> {
        let mut shared: Vec<SharedWorkout> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::SHARED_WORKOUTS)
            .filter(|q| q.for_all([q.field("athlete_id").eq(athlete_id)]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        // Sorted here rather than with order_by to avoid a composite index.
        sort_newest_first(&mut shared);
        Ok(shared)
    }

    async fn list_shared_for_coach(&self, coach_id: u64) -> Result<Vec<SharedWorkout>, AppError> {
        let mut shared: Vec<SharedWorkout> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::SHARED_WORKOUTS)
            .filter(|q| q.for_all([q.field("coach_id").eq(coach_id)]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        sort_newest_first(&mut shared);
        Ok(shared)
    }
}
