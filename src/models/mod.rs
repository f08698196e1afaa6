// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod connection;
pub mod credential;
pub mod workout;

pub use connection::{ConnectionState, ConnectionStatus};
pub use credential::{PlainCredentials, StoredCredential};
pub use workout::{SharedWorkout, SharedWorkoutStatus, Workout, WorkoutType};
