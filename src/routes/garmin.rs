// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Garmin account connection routes, available to every role.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::services::ConnectionView;
use crate::AppState;
use axum::{
    extract::State,
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
        .route("/api/garmin/connect", post(connect))
        .route("/api/garmin/test", post(test_connection))
        .route("/api/garmin/disconnect", delete(disconnect))
        .route("/api/garmin/status", get(status))
}

/// Credentials submitted from the settings page.
#[derive(Deserialize, Validate)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ConnectRequest {
    #[validate(email(message = "A valid Garmin Connect email is required"))]
    pub email: String,
    #[validate(length(min = 1, max = 256, message = "Password is required"))]
    pub password: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ConnectionResponse {
    pub message: String,
    pub status: ConnectionView,
}

async fn connect(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<ConnectRequest>,
) -> Result<Json<ConnectionResponse>> {
    body.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let status = state
        .connection_service
        .connect(user.user_id, body.email.trim(), &body.password)
        .await?;

    Ok(Json(ConnectionResponse {
        message: "Garmin Connect account connected successfully".to_string(),
        status: status.into(),
    }))
}

async fn test_connection(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ConnectionResponse>> {
    let status = state.connection_service.test(user.user_id).await?;

    Ok(Json(ConnectionResponse {
        message: "Garmin Connect connection is working".to_string(),
        status: status.into(),
    }))
}

async fn disconnect(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ConnectionResponse>> {
    let status = state.connection_service.disconnect(user.user_id).await?;

    Ok(Json(ConnectionResponse {
        message: "Garmin Connect account disconnected".to_string(),
        status: status.into(),
    }))
}

async fn status(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ConnectionView>> {
    Ok(Json(state.connection_service.status(user.user_id).await?))
}
