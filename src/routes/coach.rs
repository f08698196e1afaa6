// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Coach routes: workout library, sharing, and athlete Garmin status.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{Workout, WorkoutType};
use crate::routes::athlete::SharedWorkoutsResponse;
use crate::services::{AthleteConnectionReport, ShareOutcome};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/coach/workouts", get(list_library))
        .route("/api/coach/share-workouts", post(share_workouts))
        .route("/api/coach/shared-workouts", get(list_shared))
        .route(
            "/api/coach/athletes/{athlete_id}/garmin-status",
            get(athlete_garmin_status),
        )
}

// ─── Library ─────────────────────────────────────────────────

#[derive(Deserialize)]
struct LibraryQuery {
    workout_type: Option<WorkoutType>,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct WorkoutSummary {
    /// Garmin workout ID, used when sharing
    pub id: String,
    pub name: String,
    pub workout_type: WorkoutType,
    pub description: Option<String>,
    pub synced_at: String,
}

impl From<Workout> for WorkoutSummary {
    fn from(w: Workout) -> Self {
        Self {
            id: w.external_workout_id,
            name: w.name,
            workout_type: w.workout_type,
            description: w.description,
            synced_at: w.synced_at,
        }
    }
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LibraryResponse {
    pub workouts: Vec<WorkoutSummary>,
    pub total: usize,
}

/// Sync the coach's Garmin library and return it.
async fn list_library(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<LibraryQuery>,
) -> Result<Json<LibraryResponse>> {
    user.require_coach()?;

    let workouts = state
        .workout_service
        .sync_library(user.user_id, query.workout_type)
        .await?;

    Ok(Json(LibraryResponse {
        total: workouts.len(),
        workouts: workouts.into_iter().map(Into::into).collect(),
    }))
}

// ─── Sharing ─────────────────────────────────────────────────

#[derive(Deserialize, Validate)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ShareRequest {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub athlete_id: u64,
    #[validate(length(min = 1, max = 100, message = "Select at least one workout to share"))]
    pub workout_ids: Vec<String>,
}

async fn share_workouts(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<ShareRequest>,
) -> Result<Json<ShareOutcome>> {
    user.require_coach()?;
    body.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let outcome = state
        .workout_service
        .share(user.user_id, body.athlete_id, &body.workout_ids)
        .await?;

    Ok(Json(outcome))
}

#[derive(Deserialize)]
struct SharedQuery {
    athlete_id: Option<u64>,
}

async fn list_shared(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<SharedQuery>,
) -> Result<Json<SharedWorkoutsResponse>> {
    user.require_coach()?;

    let shared = state
        .workout_service
        .list_for_coach(user.user_id, query.athlete_id)
        .await?;

    Ok(Json(SharedWorkoutsResponse::new(shared)))
}

// ─── Athlete status ──────────────────────────────────────────

async fn athlete_garmin_status(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(athlete_id): Path<u64>,
) -> Result<Json<AthleteConnectionReport>> {
    user.require_coach()?;
    tracing::debug!(coach_id = user.user_id, athlete_id, "Coach checking athlete Garmin status");

    Ok(Json(
        state.connection_service.athlete_report(athlete_id).await?,
    ))
}
