// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-user Garmin connection status.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Connection state as seen by the UI.
///
/// `Connecting` is derived from an in-flight connect/test and never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

/// Persisted connection status, one document per user.
///
/// `is_connected == true` implies `error_message == None`; the constructors
/// below are the only way the service builds one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub user_id: u64,
    pub is_connected: bool,
    /// Last successful verification (RFC3339)
    pub last_verified_at: Option<String>,
    /// Sanitized reason for the last failed verification
    pub error_message: Option<String>,
    /// Display name reported by Garmin
    pub external_account_label: Option<String>,
}

impl ConnectionStatus {
    /// Initial state for a user that never connected (or disconnected).
    pub fn disconnected(user_id: u64) -> Self {
        Self {
            user_id,
            is_connected: false,
            last_verified_at: None,
            error_message: None,
            external_account_label: None,
        }
    }

    /// Status after a successful verification.
    pub fn verified(user_id: u64, label: Option<String>, verified_at: String) -> Self {
        Self {
            user_id,
            is_connected: true,
            last_verified_at: Some(verified_at),
            error_message: None,
            external_account_label: label,
        }
    }

    /// Status after a failed verification. The last success is kept for display.
    pub fn failed(previous: Option<Self>, user_id: u64, message: String) -> Self {
        let previous = previous.unwrap_or_else(|| Self::disconnected(user_id));
        Self {
            user_id,
            is_connected: false,
            last_verified_at: previous.last_verified_at,
            error_message: Some(message),
            external_account_label: previous.external_account_label,
        }
    }

    pub fn state(&self) -> ConnectionState {
        if self.is_connected {
            ConnectionState::Connected
        } else if self.error_message.is_some() {
            ConnectionState::Error
        } else {
            ConnectionState::Disconnected
        }
    }
}
