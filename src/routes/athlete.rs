// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Athlete routes: shared workouts and importing them into Garmin.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{SharedWorkout, SharedWorkoutStatus, WorkoutType};
use crate::services::ImportOutcome;
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::{delete, get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/athlete/workouts", get(list_workouts))
        .route("/api/athlete/workouts/import", post(import_workouts))
        .route("/api/athlete/workouts/{id}/retry", post(retry_workout))
        .route("/api/athlete/workouts/{id}", delete(remove_workout))
}

/// A shared workout without the raw Garmin payload.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SharedWorkoutResponse {
    pub id: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub coach_id: u64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub athlete_id: u64,
    pub workout_name: String,
    pub workout_type: WorkoutType,
    pub description: Option<String>,
    pub status: SharedWorkoutStatus,
    pub external_id: Option<String>,
    pub import_error: Option<String>,
    pub shared_at: String,
    pub imported_at: Option<String>,
}

impl From<SharedWorkout> for SharedWorkoutResponse {
    fn from(s: SharedWorkout) -> Self {
        Self {
            id: s.id,
            coach_id: s.coach_id,
            athlete_id: s.athlete_id,
            workout_name: s.workout_name,
            workout_type: s.workout_type,
            description: s.description,
            status: s.status,
            external_id: s.external_id,
            import_error: s.import_error,
            shared_at: s.shared_at,
            imported_at: s.imported_at,
        }
    }
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SharedWorkoutsResponse {
    pub workouts: Vec<SharedWorkoutResponse>,
    pub pending: usize,
    pub imported: usize,
    pub failed: usize,
}

impl SharedWorkoutsResponse {
    pub fn new(shared: Vec<SharedWorkout>) -> Self {
        let count = |status: SharedWorkoutStatus| shared.iter().filter(|s| s.status == status).count();
        let (pending, imported, failed) = (
            count(SharedWorkoutStatus::Pending),
            count(SharedWorkoutStatus::Imported),
            count(SharedWorkoutStatus::Failed),
        );
        Self {
            workouts: shared.into_iter().map(Into::into).collect(),
            pending,
            imported,
            failed,
        }
    }
}

async fn list_workouts(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<SharedWorkoutsResponse>> {
    user.require_athlete()?;
    let shared = state.workout_service.list_for_athlete(user.user_id).await?;
    Ok(Json(SharedWorkoutsResponse::new(shared)))
}

// ─── Import ──────────────────────────────────────────────────

#[derive(Deserialize, Validate)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ImportRequest {
    #[validate(length(min = 1, max = 50, message = "Select between 1 and 50 workouts to import"))]
    pub shared_workout_ids: Vec<String>,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ImportResponse {
    pub imported_count: usize,
    pub failed_count: usize,
    pub results: Vec<ImportOutcome>,
}

async fn import_workouts(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<ImportRequest>,
) -> Result<Json<ImportResponse>> {
    user.require_athlete()?;
    body.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let results = state
        .workout_service
        .import_many(user.user_id, &body.shared_workout_ids)
        .await?;

    let imported_count = results.iter().filter(|r| r.success).count();
    Ok(Json(ImportResponse {
        imported_count,
        failed_count: results.len() - imported_count,
        results,
    }))
}

async fn retry_workout(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<SharedWorkoutResponse>> {
    user.require_athlete()?;
    let shared = state.workout_service.retry(user.user_id, &id).await?;
    Ok(Json(shared.into()))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RemoveResponse {
    pub success: bool,
}

async fn remove_workout(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<RemoveResponse>> {
    user.require_athlete()?;
    state.workout_service.remove(user.user_id, &id).await?;
    Ok(Json(RemoveResponse { success: true }))
}
