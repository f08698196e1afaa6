// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Garmin connection state machine.
//!
//! `Disconnected → Connecting → Connected | Error`; `Connected` and `Error`
//! go back through `Connecting` on every connect/test. `Connecting` covers
//! exactly the span of a connect or test and is never persisted.
//!
//! Credential policy:
//! - authentication rejected: credential deleted, user must reconnect
//! - transport failure or timeout: credential kept, user may test again

use crate::db::Store;
use crate::error::AppError;
use crate::models::{ConnectionState, ConnectionStatus, PlainCredentials};
use crate::services::garmin::{GarminClient, GarminError, GarminSession};
use crate::services::vault::CredentialVault;
use crate::time_utils::now_rfc3339;
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Per-user locks serializing connect/test/disconnect.
pub type UserLocks = Arc<DashMap<u64, Arc<Mutex<()>>>>;

/// Marks a user as mid-verification until dropped.
struct Verifying {
    users: Arc<DashMap<u64, ()>>,
    user_id: u64,
}

impl Verifying {
    fn begin(users: &Arc<DashMap<u64, ()>>, user_id: u64) -> Self {
        users.insert(user_id, ());
        Self {
            users: users.clone(),
            user_id,
        }
    }
}

impl Drop for Verifying {
    fn drop(&mut self) {
        self.users.remove(&self.user_id);
    }
}

/// Connection status as returned to the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ConnectionView {
    pub state: ConnectionState,
    pub is_connected: bool,
    pub last_verified_at: Option<String>,
    pub error_message: Option<String>,
    pub external_account_label: Option<String>,
}

impl ConnectionView {
    fn new(status: ConnectionStatus, in_flight: bool) -> Self {
        let state = if in_flight {
            ConnectionState::Connecting
        } else {
            status.state()
        };
        Self {
            state,
            is_connected: status.is_connected,
            last_verified_at: status.last_verified_at,
            error_message: status.error_message,
            external_account_label: status.external_account_label,
        }
    }
}

impl From<ConnectionStatus> for ConnectionView {
    fn from(status: ConnectionStatus) -> Self {
        Self::new(status, false)
    }
}

/// What a coach sees about an athlete's Garmin link.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AthleteConnectionReport {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub athlete_id: u64,
    #[serde(flatten)]
    pub status: ConnectionView,
    pub message: String,
    pub recommendations: Vec<String>,
}

/// Owns the per-user connection lifecycle.
#[derive(Clone)]
pub struct ConnectionService {
    store: Arc<dyn Store>,
    vault: CredentialVault,
    garmin: Arc<dyn GarminClient>,
    locks: UserLocks,
    /// Users with a connect or test running. Disconnect does not count.
    verifying: Arc<DashMap<u64, ()>>,
    timeout: Duration,
}

impl ConnectionService {
    pub fn new(
        store: Arc<dyn Store>,
        vault: CredentialVault,
        garmin: Arc<dyn GarminClient>,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            vault,
            garmin,
            locks: Arc::new(DashMap::new()),
            verifying: Arc::new(DashMap::new()),
            timeout,
        }
    }

    pub fn vault(&self) -> &CredentialVault {
        &self.vault
    }

    fn user_lock(&self, user_id: u64) -> Arc<Mutex<()>> {
        self.locks
            .entry(user_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn in_flight(&self, user_id: u64) -> bool {
        self.verifying.contains_key(&user_id)
    }

    /// Log in to Garmin, bounded by the configured timeout.
    async fn authenticate(
        &self,
        credentials: &PlainCredentials,
    ) -> Result<GarminSession, GarminError> {
        tokio::time::timeout(
            self.timeout,
            self.garmin
                .authenticate(&credentials.email, &credentials.password),
        )
        .await
        .unwrap_or_else(|_| Err(GarminError::Timeout(self.timeout)))
    }

    /// Store new credentials and verify them against Garmin.
    pub async fn connect(
        &self,
        user_id: u64,
        email: &str,
        password: &str,
    ) -> Result<ConnectionStatus, AppError> {
        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;
        let _verifying = Verifying::begin(&self.verifying, user_id);

        tracing::info!(user_id, "Connecting Garmin account");
        self.vault.store(user_id, email, password).await?;

        self.verify(user_id, PlainCredentials::new(email, password))
            .await
    }

    /// Re-verify the stored credentials.
    pub async fn test(&self, user_id: u64) -> Result<ConnectionStatus, AppError> {
        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;
        let _verifying = Verifying::begin(&self.verifying, user_id);

        let credentials = self.vault.retrieve(user_id).await?;
        tracing::info!(user_id, "Testing Garmin connection");
        self.verify(user_id, credentials).await
    }

    /// Forget the credentials and reset the status. Safe to repeat.
    pub async fn disconnect(&self, user_id: u64) -> Result<ConnectionStatus, AppError> {
        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;

        self.vault.delete(user_id).await?;
        self.store.delete_connection_status(user_id).await?;
        tracing::info!(user_id, "Garmin account disconnected");

        Ok(ConnectionStatus::disconnected(user_id))
    }

    /// Persisted status, defaulting to disconnected.
    pub async fn stored_status(&self, user_id: u64) -> Result<ConnectionStatus, AppError> {
        Ok(self
            .store
            .get_connection_status(user_id)
            .await?
            .unwrap_or_else(|| ConnectionStatus::disconnected(user_id)))
    }

    /// Status for the UI, including the transient `Connecting` state.
    pub async fn status(&self, user_id: u64) -> Result<ConnectionView, AppError> {
        let status = self.stored_status(user_id).await?;
        Ok(ConnectionView::new(status, self.in_flight(user_id)))
    }

    /// Read-only summary of an athlete's link for their coach.
    pub async fn athlete_report(&self, athlete_id: u64) -> Result<AthleteConnectionReport, AppError> {
        let view = self.status(athlete_id).await?;
        let has_credential = self.vault.exists(athlete_id).await?;

        let (message, recommendations) = match view.state {
            ConnectionState::Connected => (
                match &view.external_account_label {
                    Some(label) => format!(
                        "Connected to Garmin Connect as {}. Ready for workout sync.",
                        label
                    ),
                    None => "Connected to Garmin Connect. Ready for workout sync.".to_string(),
                },
                vec![],
            ),
            ConnectionState::Connecting => (
                "The athlete is connecting their Garmin account right now.".to_string(),
                vec!["Check again in a moment".to_string()],
            ),
            ConnectionState::Error if has_credential => (
                view.error_message
                    .clone()
                    .unwrap_or_else(|| "Garmin account is not connected.".to_string()),
                vec![
                    "Garmin Connect may be temporarily unavailable".to_string(),
                    "Ask the athlete to test their connection again later".to_string(),
                ],
            ),
            ConnectionState::Error => (
                view.error_message
                    .clone()
                    .unwrap_or_else(|| "Garmin account is not connected.".to_string()),
                vec![
                    "The athlete's Garmin credentials may be invalid".to_string(),
                    "Ask the athlete to re-enter their Garmin Connect credentials".to_string(),
                    "The athlete should verify they can log in at connect.garmin.com".to_string(),
                ],
            ),
            ConnectionState::Disconnected => (
                "This athlete has not connected their Garmin account yet.".to_string(),
                vec![
                    "Ask the athlete to log in and connect their Garmin account".to_string(),
                    "The athlete needs to go to Settings > Garmin Connect and enter their credentials"
                        .to_string(),
                    "Once connected, you can share workouts with them".to_string(),
                ],
            ),
        };

        Ok(AthleteConnectionReport {
            athlete_id,
            status: view,
            message,
            recommendations,
        })
    }

    /// Shared success/failure handling for connect and test.
    /// Caller holds the user's lock.
    async fn verify(
        &self,
        user_id: u64,
        credentials: PlainCredentials,
    ) -> Result<ConnectionStatus, AppError> {
        match self.authenticate(&credentials).await {
            Ok(session) => {
                let status =
                    ConnectionStatus::verified(user_id, session.display_name, now_rfc3339());
                self.store.put_connection_status(&status).await?;
                tracing::info!(user_id, "Garmin connection verified");
                Ok(status)
            }
            Err(err) => {
                let previous = self.store.get_connection_status(user_id).await?;
                let status =
                    ConnectionStatus::failed(previous, user_id, err.user_message().to_string());

                if err.is_auth() {
                    self.vault.delete(user_id).await?;
                    tracing::info!(user_id, "Garmin rejected credentials, discarded");
                } else {
                    tracing::info!(user_id, "Garmin unreachable, credentials retained");
                }

                self.store.put_connection_status(&status).await?;
                Err(err.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryDb;
    use async_trait::async_trait;
    use serde_json::Value;

    struct OfflineGarmin;

    #[async_trait]
    impl GarminClient for OfflineGarmin {
        async fn authenticate(&self, _: &str, _: &str) -> Result<GarminSession, GarminError> {
            Err(GarminError::Transport("offline".to_string()))
        }

        async fn list_workouts(&self, _: &GarminSession) -> Result<Vec<Value>, GarminError> {
            Ok(vec![])
        }

        async fn upload_workout(&self, _: &GarminSession, _: &Value) -> Result<String, GarminError> {
            Err(GarminError::Transport("offline".to_string()))
        }
    }

    fn service() -> ConnectionService {
        let store: Arc<dyn Store> = Arc::new(MemoryDb::new());
        let vault = CredentialVault::new(Some("unit-test-secret"), store.clone()).unwrap();
        ConnectionService::new(store, vault, Arc::new(OfflineGarmin), Duration::from_secs(1))
    }

    #[tokio::test]
    async fn held_user_lock_alone_is_not_connecting() {
        let service = service();

        // What a running disconnect looks like from outside.
        let lock = service.user_lock(7);
        let _held = lock.lock().await;

        let view = service.status(7).await.unwrap();
        assert_eq!(view.state, ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn verification_marker_reports_connecting_until_dropped() {
        let service = service();

        let marker = Verifying::begin(&service.verifying, 7);
        assert_eq!(
            service.status(7).await.unwrap().state,
            ConnectionState::Connecting
        );
        assert_eq!(
            service.status(8).await.unwrap().state,
            ConnectionState::Disconnected
        );

        drop(marker);
        assert_eq!(
            service.status(7).await.unwrap().state,
            ConnectionState::Disconnected
        );
    }

    #[tokio::test]
    async fn failed_test_clears_marker() {
        let service = service();
        service.vault().store(7, "a@example.com", "pw").await.unwrap();

        assert!(service.test(7).await.is_err());
        assert!(!service.in_flight(7));
        assert_eq!(service.status(7).await.unwrap().state, ConnectionState::Error);
    }
}
