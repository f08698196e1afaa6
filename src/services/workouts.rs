// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Workout library sync, sharing, and import into athletes' Garmin accounts.
//!
//! Shared workout lifecycle:
//! - `pending → imported` on a successful upload
//! - `pending → failed` on any upload failure
//! - `failed → pending` only through [`WorkoutService::retry`]
//!
//! An import call uploads at most once. Imports of the same row are
//! serialized; different rows run independently.

use crate::db::Store;
use crate::error::AppError;
use crate::models::{PlainCredentials, SharedWorkout, SharedWorkoutStatus, Workout, WorkoutType};
use crate::services::connection::ConnectionService;
use crate::services::garmin::{prepare_for_import, GarminClient, GarminError};
use crate::time_utils::now_rfc3339;
use dashmap::DashMap;
use futures_util::{stream, StreamExt};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

const MAX_CONCURRENT_IMPORTS: usize = 4;

const NOT_CONNECTED_MESSAGE: &str =
    "Please connect your Garmin account first (Settings > Garmin Connect)";
const CORRUPTED_MESSAGE: &str =
    "Workout data is corrupted. Ask your coach to re-share this workout.";
const IMPORT_AUTH_MESSAGE: &str = "Authentication failed for athlete's Garmin account. \
     The athlete needs to re-enter their Garmin credentials.";

/// Result of sharing a batch of workouts.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ShareOutcome {
    pub shared_count: usize,
    pub shared_ids: Vec<String>,
    /// Per-workout problems that did not stop the rest of the batch.
    pub errors: Vec<String>,
}

/// Result of one import in a batch.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ImportOutcome {
    pub shared_workout_id: String,
    pub success: bool,
    pub message: String,
    pub external_id: Option<String>,
}

/// Coach/athlete workout flows.
#[derive(Clone)]
pub struct WorkoutService {
    store: Arc<dyn Store>,
    connections: ConnectionService,
    garmin: Arc<dyn GarminClient>,
    /// Per-shared-workout locks so one row is never uploaded twice at once.
    import_locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
    timeout: Duration,
}

impl WorkoutService {
    pub fn new(
        store: Arc<dyn Store>,
        connections: ConnectionService,
        garmin: Arc<dyn GarminClient>,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            connections,
            garmin,
            import_locks: Arc::new(DashMap::new()),
            timeout,
        }
    }

    // ─── Coach ───────────────────────────────────────────────────────────────

    /// Pull the coach's workouts from Garmin, cache them, and return them.
    ///
    /// If Garmin is unreachable or slow, the last cached library is served
    /// instead, provided there is one.
    pub async fn sync_library(
        &self,
        coach_id: u64,
        workout_type: Option<WorkoutType>,
    ) -> Result<Vec<Workout>, AppError> {
        self.require_connected(coach_id).await?;
        let credentials = self.credentials_for(coach_id).await?;

        let fetched = self
            .bounded(async {
                let session = self
                    .garmin
                    .authenticate(&credentials.email, &credentials.password)
                    .await?;
                self.garmin.list_workouts(&session).await
            })
            .await
            .map_err(AppError::from);

        let mut workouts = match fetched {
            Ok(raw) => {
                let synced_at = now_rfc3339();
                let workouts: Vec<Workout> = raw
                    .iter()
                    .filter_map(|w| workout_from_garmin(coach_id, w, &synced_at))
                    .collect();

                self.store.put_workouts(&workouts).await?;
                tracing::info!(coach_id, count = workouts.len(), "Workout library synced");
                workouts
            }
            Err(err) if err.is_transient() => {
                let cached = self.store.list_workouts_for_coach(coach_id).await?;
                if cached.is_empty() {
                    return Err(err);
                }
                tracing::warn!(
                    coach_id,
                    count = cached.len(),
                    error = %err,
                    "Garmin unavailable, serving cached workout library"
                );
                cached
            }
            Err(err) => return Err(err),
        };

        if let Some(wanted) = workout_type {
            workouts.retain(|w| w.workout_type == wanted);
        }
        workouts.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(workouts)
    }

    /// Share library workouts (by Garmin workout ID) with an athlete.
    pub async fn share(
        &self,
        coach_id: u64,
        athlete_id: u64,
        external_workout_ids: &[String],
    ) -> Result<ShareOutcome, AppError> {
        if coach_id == athlete_id {
            return Err(AppError::BadRequest(
                "Workouts cannot be shared with yourself".to_string(),
            ));
        }

        let mut active: HashSet<String> = self
            .store
            .list_shared_for_athlete(athlete_id)
            .await?
            .into_iter()
            .filter(|s| s.status != SharedWorkoutStatus::Failed)
            .map(|s| s.workout_id)
            .collect();

        let mut outcome = ShareOutcome {
            shared_count: 0,
            shared_ids: Vec::new(),
            errors: Vec::new(),
        };

        for external_id in external_workout_ids {
            let doc_id = Workout::doc_id(coach_id, external_id);
            let Some(workout) = self.store.get_workout(&doc_id).await? else {
                outcome.errors.push(format!(
                    "Workout {} not found. Refresh your workout list first.",
                    external_id
                ));
                continue;
            };

            if !active.insert(doc_id) {
                outcome.errors.push(format!(
                    "Workout '{}' already shared with this athlete",
                    workout.name
                ));
                continue;
            }

            let shared = SharedWorkout::new_pending(&workout, athlete_id, now_rfc3339());
            self.store.put_shared_workout(&shared).await?;
            outcome.shared_ids.push(shared.id);
            outcome.shared_count += 1;
        }

        tracing::info!(
            coach_id,
            athlete_id,
            shared = outcome.shared_count,
            skipped = outcome.errors.len(),
            "Workouts shared"
        );
        Ok(outcome)
    }

    pub async fn list_for_coach(
        &self,
        coach_id: u64,
        athlete_id: Option<u64>,
    ) -> Result<Vec<SharedWorkout>, AppError> {
        let mut shared = self.store.list_shared_for_coach(coach_id).await?;
        if let Some(athlete_id) = athlete_id {
            shared.retain(|s| s.athlete_id == athlete_id);
        }
        Ok(shared)
    }

    // ─── Athlete ─────────────────────────────────────────────────────────────

    pub async fn list_for_athlete(&self, athlete_id: u64) -> Result<Vec<SharedWorkout>, AppError> {
        self.store.list_shared_for_athlete(athlete_id).await
    }

    /// Upload one pending shared workout into the athlete's Garmin account.
    ///
    /// External failures mark the row `failed` and return the error; nothing
    /// is retried here.
    pub async fn import_workout(
        &self,
        athlete_id: u64,
        shared_workout_id: &str,
    ) -> Result<SharedWorkout, AppError> {
        let lock = self.import_lock(shared_workout_id);
        let _guard = lock.lock().await;

        // Read under the lock so a concurrent import's result is visible.
        let mut shared = self.owned_by(athlete_id, shared_workout_id).await?;
        shared.ensure_importable()?;
        self.require_connected(athlete_id).await?;

        let Some(payload) = serde_json::from_str::<Value>(&shared.payload)
            .ok()
            .and_then(|raw| prepare_for_import(&raw))
        else {
            tracing::warn!(athlete_id, shared_workout_id, "Shared workout payload is corrupted");
            shared.mark_failed(CORRUPTED_MESSAGE.to_string())?;
            self.store.put_shared_workout(&shared).await?;
            return Err(AppError::BadRequest(CORRUPTED_MESSAGE.to_string()));
        };

        let credentials = self.credentials_for(athlete_id).await?;

        let uploaded = self
            .bounded(async {
                let session = self
                    .garmin
                    .authenticate(&credentials.email, &credentials.password)
                    .await?;
                self.garmin.upload_workout(&session, &payload).await
            })
            .await;

        match uploaded {
            Ok(external_id) => {
                shared.mark_imported(external_id, now_rfc3339())?;
                self.store.put_shared_workout(&shared).await?;
                // Imported is terminal; later calls are rejected by status alone.
                self.import_locks.remove(shared_workout_id);
                tracing::info!(athlete_id, shared_workout_id, "Workout imported to Garmin");
                Ok(shared)
            }
            Err(err) => {
                tracing::warn!(athlete_id, shared_workout_id, error = %err, "Workout import failed");
                let (reason, app_err) = import_failure(err);
                shared.mark_failed(reason)?;
                self.store.put_shared_workout(&shared).await?;
                Err(app_err)
            }
        }
    }

    /// Import several shared workouts, reporting each result.
    ///
    /// The connection precondition fails the whole call; everything after
    /// that is reported per item.
    pub async fn import_many(
        &self,
        athlete_id: u64,
        shared_workout_ids: &[String],
    ) -> Result<Vec<ImportOutcome>, AppError> {
        self.require_connected(athlete_id).await?;

        let outcomes = stream::iter(shared_workout_ids.iter().cloned())
            .map(|id| async move {
                match self.import_workout(athlete_id, &id).await {
                    Ok(shared) => ImportOutcome {
                        shared_workout_id: id,
                        success: true,
                        message: format!(
                            "'{}' imported successfully to your Garmin account",
                            shared.workout_name
                        ),
                        external_id: shared.external_id,
                    },
                    Err(err) => ImportOutcome {
                        shared_workout_id: id,
                        success: false,
                        message: err.public_message(),
                        external_id: None,
                    },
                }
            })
            .buffered(MAX_CONCURRENT_IMPORTS)
            .collect::<Vec<_>>()
            .await;

        Ok(outcomes)
    }

    /// Move a failed import back to pending so it can be imported again.
    pub async fn retry(
        &self,
        athlete_id: u64,
        shared_workout_id: &str,
    ) -> Result<SharedWorkout, AppError> {
        let lock = self.import_lock(shared_workout_id);
        let _guard = lock.lock().await;

        let mut shared = self.owned_by(athlete_id, shared_workout_id).await?;
        shared.retry()?;
        self.store.put_shared_workout(&shared).await?;
        tracing::info!(athlete_id, shared_workout_id, "Workout import re-armed");
        Ok(shared)
    }

    /// Remove a shared workout from the athlete's list.
    pub async fn remove(&self, athlete_id: u64, shared_workout_id: &str) -> Result<(), AppError> {
        let lock = self.import_lock(shared_workout_id);
        let _guard = lock.lock().await;

        self.owned_by(athlete_id, shared_workout_id).await?;
        self.store.delete_shared_workout(shared_workout_id).await?;
        self.import_locks.remove(shared_workout_id);
        Ok(())
    }

    // ─── Helpers ─────────────────────────────────────────────────────────────

    fn import_lock(&self, shared_workout_id: &str) -> Arc<Mutex<()>> {
        self.import_locks
            .entry(shared_workout_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn owned_by(
        &self,
        athlete_id: u64,
        shared_workout_id: &str,
    ) -> Result<SharedWorkout, AppError> {
        self.store
            .get_shared_workout(shared_workout_id)
            .await?
            .filter(|s| s.athlete_id == athlete_id)
            .ok_or_else(|| {
                AppError::NotFound(
                    "Shared workout not found or does not belong to you".to_string(),
                )
            })
    }

    async fn require_connected(&self, user_id: u64) -> Result<(), AppError> {
        if self.connections.stored_status(user_id).await?.is_connected {
            Ok(())
        } else {
            Err(AppError::NotConnected(NOT_CONNECTED_MESSAGE.to_string()))
        }
    }

    /// A connected status without a stored credential counts as not connected.
    async fn credentials_for(&self, user_id: u64) -> Result<PlainCredentials, AppError> {
        self.connections
            .vault()
            .retrieve(user_id)
            .await
            .map_err(|e| match e {
                AppError::NotFound(_) => AppError::NotConnected(NOT_CONNECTED_MESSAGE.to_string()),
                other => other,
            })
    }

    /// Run a whole Garmin exchange (login plus the call that follows it)
    /// under one deadline.
    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, GarminError>>,
    ) -> Result<T, GarminError> {
        tokio::time::timeout(self.timeout, call)
            .await
            .unwrap_or_else(|_| Err(GarminError::Timeout(self.timeout)))
    }
}

/// User-facing reason for the row, and the error for the caller.
fn import_failure(err: GarminError) -> (String, AppError) {
    match err {
        GarminError::Auth(_) => (
            IMPORT_AUTH_MESSAGE.to_string(),
            AppError::GarminAuth(IMPORT_AUTH_MESSAGE.to_string()),
        ),
        other => {
            let reason = other.user_message().to_string();
            (reason, AppError::from(other))
        }
    }
}

/// Build a library entry from Garmin workout JSON. Skips entries without an ID.
pub fn workout_from_garmin(coach_id: u64, raw: &Value, synced_at: &str) -> Option<Workout> {
    let external_workout_id = match raw.get("workoutId")? {
        Value::Number(n) => n.to_string(),
        Value::String(s) if !s.is_empty() => s.clone(),
        _ => return None,
    };

    let sport_key = match raw.get("sportType") {
        Some(Value::Object(sport)) => sport
            .get("sportTypeKey")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        Some(Value::String(s)) => s.clone(),
        _ => String::new(),
    };

    Some(Workout {
        coach_id,
        external_workout_id,
        name: raw
            .get("workoutName")
            .and_then(Value::as_str)
            .unwrap_or("Unnamed Workout")
            .to_string(),
        workout_type: WorkoutType::from_sport_key(&sport_key),
        description: raw
            .get("description")
            .and_then(Value::as_str)
            .filter(|d| !d.is_empty())
            .map(str::to_string),
        payload: raw.to_string(),
        synced_at: synced_at.to_string(),
    })
}
