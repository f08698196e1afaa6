// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Coach workout library and workouts shared with athletes.

use crate::error::AppError;
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Coarse workout category used for filtering in the coach UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum WorkoutType {
    Running,
    Cycling,
    Swimming,
    Strength,
    Other,
}

impl WorkoutType {
    /// Classify a Garmin `sportTypeKey` (e.g. `"running"`, `"lap_swimming"`).
    pub fn from_sport_key(key: &str) -> Self {
        let key = key.to_ascii_lowercase();
        if key.contains("run") {
            WorkoutType::Running
        } else if key.contains("cycling") || key.contains("bik") {
            WorkoutType::Cycling
        } else if key.contains("swim") {
            WorkoutType::Swimming
        } else if key.contains("strength") || key.contains("cardio") {
            WorkoutType::Strength
        } else {
            WorkoutType::Other
        }
    }
}

/// A workout in a coach's Garmin library, cached locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workout {
    pub coach_id: u64,
    /// Garmin's workout ID in the coach's account
    pub external_workout_id: String,
    pub name: String,
    pub workout_type: WorkoutType,
    pub description: Option<String>,
    /// Full Garmin workout JSON
    pub payload: String,
    pub synced_at: String,
}

impl Workout {
    /// Document ID: one record per (coach, Garmin workout).
    pub fn doc_id(coach_id: u64, external_workout_id: &str) -> String {
        format!("{}_{}", coach_id, external_workout_id)
    }

    pub fn id(&self) -> String {
        Self::doc_id(self.coach_id, &self.external_workout_id)
    }
}

/// Import state of a shared workout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum SharedWorkoutStatus {
    Pending,
    Imported,
    Failed,
}

/// A workout a coach made available to an athlete.
///
/// `external_id` is set if and only if `status == Imported`, and
/// `import_error` only when `status == Failed`. Use the transition methods
/// rather than writing the fields directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedWorkout {
    pub id: String,
    /// Source `Workout` document ID
    pub workout_id: String,
    pub coach_id: u64,
    pub athlete_id: u64,
    pub workout_name: String,
    pub workout_type: WorkoutType,
    pub description: Option<String>,
    /// Snapshot of the workout JSON at share time
    pub payload: String,
    pub status: SharedWorkoutStatus,
    /// Workout ID in the athlete's Garmin account
    pub external_id: Option<String>,
    pub import_error: Option<String>,
    pub shared_at: String,
    pub imported_at: Option<String>,
}

impl SharedWorkout {
    /// Share `workout` with `athlete_id` as a new pending record.
    pub fn new_pending(workout: &Workout, athlete_id: u64, shared_at: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            workout_id: workout.id(),
            coach_id: workout.coach_id,
            athlete_id,
            workout_name: workout.name.clone(),
            workout_type: workout.workout_type,
            description: workout.description.clone(),
            payload: workout.payload.clone(),
            status: SharedWorkoutStatus::Pending,
            external_id: None,
            import_error: None,
            shared_at,
            imported_at: None,
        }
    }

    /// Only pending workouts can be imported.
    pub fn ensure_importable(&self) -> Result<(), AppError> {
        self.expect_status(SharedWorkoutStatus::Pending, "import")
    }

    /// pending → imported
    pub fn mark_imported(&mut self, external_id: String, imported_at: String) -> Result<(), AppError> {
        self.expect_status(SharedWorkoutStatus::Pending, "import")?;
        self.status = SharedWorkoutStatus::Imported;
        self.external_id = Some(external_id);
        self.import_error = None;
        self.imported_at = Some(imported_at);
        Ok(())
    }

    /// pending → failed
    pub fn mark_failed(&mut self, reason: String) -> Result<(), AppError> {
        self.expect_status(SharedWorkoutStatus::Pending, "fail")?;
        self.status = SharedWorkoutStatus::Failed;
        self.external_id = None;
        self.import_error = Some(reason);
        Ok(())
    }

    /// failed → pending, only on explicit request.
    pub fn retry(&mut self) -> Result<(), AppError> {
        self.expect_status(SharedWorkoutStatus::Failed, "retry")?;
        self.status = SharedWorkoutStatus::Pending;
        self.import_error = None;
        Ok(())
    }

    fn expect_status(&self, expected: SharedWorkoutStatus, action: &str) -> Result<(), AppError> {
        if self.status == expected {
            return Ok(());
        }
        let msg = match self.status {
            SharedWorkoutStatus::Imported => "This workout has already been imported".to_string(),
            SharedWorkoutStatus::Failed => {
                "This workout failed to import. Retry it before importing again".to_string()
            }
            SharedWorkoutStatus::Pending => {
                format!("Cannot {} a workout that is still pending", action)
            }
        };
        Err(AppError::BadRequest(msg))
    }
}
