// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Garmin Connect client.
//!
//! Handles:
//! - Account authentication (token exchange + display name lookup)
//! - Listing a coach's workout library
//! - Uploading a workout into an athlete's account
//! - Classifying failures as auth / transport / timeout / rejected

use crate::error::AppError;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::time::Duration;

/// Failure at the Garmin boundary. Carries raw detail for server logs only.
#[derive(Debug, thiserror::Error)]
pub enum GarminError {
    /// Credentials rejected (HTTP 401/403 or equivalent).
    #[error("authentication rejected: {0}")]
    Auth(String),

    /// Network error, rate limit, or Garmin-side outage.
    #[error("transport failure: {0}")]
    Transport(String),

    /// No answer within the configured timeout.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// Garmin answered but refused the request (bad payload, etc.).
    #[error("request rejected: {0}")]
    Rejected(String),
}

impl GarminError {
    pub const AUTH_MESSAGE: &'static str = "Authentication failed. The Garmin Connect credentials are invalid. \
         Please verify the email and password are correct and that the account exists.";
    pub const TRANSPORT_MESSAGE: &'static str = "Could not connect to Garmin Connect servers. \
         This may be a temporary issue. Please try again in a few minutes.";
    pub const TIMEOUT_MESSAGE: &'static str =
        "Garmin Connect did not respond in time. Please try again in a few minutes.";
    pub const REJECTED_MESSAGE: &'static str =
        "Garmin Connect rejected the request. Ask your coach to re-share this workout.";

    /// Fixed user-facing text; never includes the raw vendor detail.
    pub fn user_message(&self) -> &'static str {
        match self {
            GarminError::Auth(_) => Self::AUTH_MESSAGE,
            GarminError::Transport(_) => Self::TRANSPORT_MESSAGE,
            GarminError::Timeout(_) => Self::TIMEOUT_MESSAGE,
            GarminError::Rejected(_) => Self::REJECTED_MESSAGE,
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, GarminError::Auth(_))
    }

    /// Map a reqwest error onto the taxonomy.
    fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            GarminError::Timeout(timeout)
        } else if err.is_decode() {
            GarminError::Rejected(format!("unexpected response body: {}", err))
        } else {
            GarminError::Transport(err.to_string())
        }
    }
}

impl From<GarminError> for AppError {
    fn from(err: GarminError) -> Self {
        tracing::warn!(error = %err, "Garmin Connect call failed");
        let msg = err.user_message().to_string();
        match err {
            GarminError::Auth(_) => AppError::GarminAuth(msg),
            GarminError::Transport(_) => AppError::GarminUnavailable(msg),
            GarminError::Timeout(_) => AppError::Timeout(msg),
            GarminError::Rejected(_) => AppError::Garmin(msg),
        }
    }
}

/// An authenticated Garmin session.
#[derive(Clone)]
pub struct GarminSession {
    pub access_token: String,
    pub display_name: Option<String>,
}

impl fmt::Debug for GarminSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GarminSession")
            .field("access_token", &"<redacted>")
            .field("display_name", &self.display_name)
            .finish()
    }
}

/// Boundary to the Garmin Connect service.
#[async_trait]
pub trait GarminClient: Send + Sync {
    /// Log in with account credentials.
    async fn authenticate(&self, email: &str, password: &str)
        -> Result<GarminSession, GarminError>;

    /// All workouts in the session's account, as raw Garmin JSON.
    async fn list_workouts(&self, session: &GarminSession) -> Result<Vec<Value>, GarminError>;

    /// Create a workout in the session's account. Returns the new workout ID.
    async fn upload_workout(
        &self,
        session: &GarminSession,
        payload: &Value,
    ) -> Result<String, GarminError>;
}

/// Fields Garmin assigns server-side; stripped before re-uploading a workout.
const SERVER_ASSIGNED_FIELDS: [&str; 4] = ["workoutId", "ownerId", "createdDate", "updatedDate"];

/// Prepare a coach's workout JSON for creation in another account.
///
/// Returns `None` if the payload is not a JSON object.
pub fn prepare_for_import(payload: &Value) -> Option<Value> {
    let mut object = payload.as_object()?.clone();
    for field in SERVER_ASSIGNED_FIELDS {
        object.remove(field);
    }
    Some(Value::Object(object))
}

/// HTTP client for Garmin Connect.
#[derive(Clone)]
pub struct GarminConnectClient {
    http: reqwest::Client,
    sso_url: String,
    api_url: String,
    timeout: Duration,
}

impl GarminConnectClient {
    pub fn new(sso_url: String, api_url: String, timeout: Duration) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("coach-sync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            sso_url: sso_url.trim_end_matches('/').to_string(),
            api_url: api_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    /// Check response status and classify failures.
    async fn check_response(
        &self,
        response: reqwest::Response,
    ) -> Result<reqwest::Response, GarminError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let detail = format!("HTTP {}: {}", status, body);

        match status.as_u16() {
            401 | 403 => Err(GarminError::Auth(detail)),
            429 => {
                tracing::warn!("Garmin rate limit hit (429)");
                Err(GarminError::Transport(detail))
            }
            s if s >= 500 => Err(GarminError::Transport(detail)),
            _ => Err(GarminError::Rejected(detail)),
        }
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        access_token: &str,
    ) -> Result<T, GarminError> {
        let response = self
            .http
            .get(url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| GarminError::from_reqwest(e, self.timeout))?;

        self.check_response(response)
            .await?
            .json()
            .await
            .map_err(|e| GarminError::from_reqwest(e, self.timeout))
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SocialProfile {
    full_name: Option<String>,
    display_name: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SavedWorkout {
    workout_id: Option<Value>,
}

#[async_trait]
impl GarminClient for GarminConnectClient {
    async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<GarminSession, GarminError> {
        let response = self
            .http
            .post(format!("{}/oauth/token", self.sso_url))
            .form(&[
                ("grant_type", "password"),
                ("username", email),
                ("password", password),
            ])
            .send()
            .await
            .map_err(|e| GarminError::from_reqwest(e, self.timeout))?;

        // A 400 from the token endpoint means bad credentials, not a bad request.
        let token: TokenResponse = match response.status().as_u16() {
            400 => {
                let body = response.text().await.unwrap_or_default();
                return Err(GarminError::Auth(format!("HTTP 400: {}", body)));
            }
            _ => self
                .check_response(response)
                .await?
                .json()
                .await
                .map_err(|e| GarminError::from_reqwest(e, self.timeout))?,
        };

        let profile: SocialProfile = self
            .get_json(
                &format!("{}/userprofile-service/socialProfile", self.api_url),
                &token.access_token,
            )
            .await?;

        Ok(GarminSession {
            access_token: token.access_token,
            display_name: profile.full_name.or(profile.display_name),
        })
    }

    async fn list_workouts(&self, session: &GarminSession) -> Result<Vec<Value>, GarminError> {
        self.get_json(
            &format!("{}/workout-service/workouts?start=0&limit=500", self.api_url),
            &session.access_token,
        )
        .await
    }

    async fn upload_workout(
        &self,
        session: &GarminSession,
        payload: &Value,
    ) -> Result<String, GarminError> {
        let response = self
            .http
            .post(format!("{}/workout-service/workout", self.api_url))
            .bearer_auth(&session.access_token)
            .json(payload)
            .send()
            .await
            .map_err(|e| GarminError::from_reqwest(e, self.timeout))?;

        let saved: SavedWorkout = self
            .check_response(response)
            .await?
            .json()
            .await
            .map_err(|e| GarminError::from_reqwest(e, self.timeout))?;

        match saved.workout_id {
            Some(Value::Number(n)) => Ok(n.to_string()),
            Some(Value::String(s)) if !s.is_empty() => Ok(s),
            _ => Err(GarminError::Rejected(
                "upload response did not include a workoutId".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn prepare_strips_server_fields() {
        let payload = json!({
            "workoutId": 42,
            "ownerId": 7,
            "createdDate": "2026-01-01",
            "updatedDate": "2026-01-02",
            "workoutName": "Hill repeats",
            "sportType": {"sportTypeKey": "running"}
        });

        let prepared = prepare_for_import(&payload).unwrap();
        assert_eq!(
            prepared,
            json!({
                "workoutName": "Hill repeats",
                "sportType": {"sportTypeKey": "running"}
            })
        );
    }

    #[test]
    fn prepare_rejects_non_objects() {
        assert!(prepare_for_import(&json!([1, 2, 3])).is_none());
        assert!(prepare_for_import(&json!("workout")).is_none());
    }

    #[test]
    fn app_error_never_carries_raw_detail() {
        let err: AppError = GarminError::Auth("HTTP 401: user=pat@example.com".to_string()).into();
        assert!(matches!(err, AppError::GarminAuth(_)));
        assert!(!err.to_string().contains("pat@example.com"));

        let err: AppError = GarminError::Timeout(Duration::from_secs(3)).into();
        assert!(err.is_transient());
    }
}
