// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Coach-Sync: share Garmin Connect workouts between coaches and athletes
//!
//! This crate provides the backend API that keeps users' Garmin credentials
//! encrypted at rest, tracks each user's Garmin connection, and moves
//! workouts from a coach's Garmin library into athletes' accounts.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::Store;
use services::{ConnectionService, WorkoutService};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn Store>,
    pub connection_service: ConnectionService,
    pub workout_service: WorkoutService,
}

impl AppState {
    /// Wire the services together over one store and one Garmin client.
    pub fn build(
        config: Config,
        store: Arc<dyn Store>,
        garmin: Arc<dyn services::GarminClient>,
    ) -> Result<Self, error::AppError> {
        let vault = services::CredentialVault::new(
            config.credential_encryption_key.as_deref(),
            store.clone(),
        )?;
        let connection_service =
            ConnectionService::new(store.clone(), vault, garmin.clone(), config.garmin_timeout);
        let workout_service = WorkoutService::new(
            store.clone(),
            connection_service.clone(),
            garmin,
            config.garmin_timeout,
        );

        Ok(Self {
            config,
            store,
            connection_service,
            workout_service,
        })
    }
}
