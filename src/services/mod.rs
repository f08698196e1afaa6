// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod connection;
pub mod garmin;
pub mod vault;
pub mod workouts;

pub use connection::{AthleteConnectionReport, ConnectionService, ConnectionView};
pub use garmin::{GarminClient, GarminConnectClient, GarminError, GarminSession};
pub use vault::{CredentialField, CredentialVault};
pub use workouts::{ImportOutcome, ShareOutcome, WorkoutService};
