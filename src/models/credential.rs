// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Garmin account credentials, encrypted at rest.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Encrypted Garmin credentials stored per user.
///
/// Written as a single document so a reconnect replaces both fields at once.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredCredential {
    /// Owning user (also used as document ID)
    pub user_id: u64,
    /// base64(nonce || ciphertext || tag)
    pub email_encrypted: String,
    /// base64(nonce || ciphertext || tag)
    pub password_encrypted: String,
    /// When the credential was stored (RFC3339)
    pub created_at: String,
}

impl fmt::Debug for StoredCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredCredential")
            .field("user_id", &self.user_id)
            .field("email_encrypted", &"<ciphertext>")
            .field("password_encrypted", &"<ciphertext>")
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Decrypted credentials, only ever held in memory.
#[derive(Clone, PartialEq, Eq)]
pub struct PlainCredentials {
    pub email: String,
    pub password: String,
}

impl PlainCredentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for PlainCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlainCredentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_hides_secrets() {
        let plain = PlainCredentials::new("runner@example.com", "hunter2");
        let rendered = format!("{:?}", plain);
        assert!(rendered.contains("runner@example.com"));
        assert!(!rendered.contains("hunter2"));

        let stored = StoredCredential {
            user_id: 7,
            email_encrypted: "ZW1haWw=".to_string(),
            password_encrypted: "cGFzc3dvcmQ=".to_string(),
            created_at: "2026-01-01T00:00:00Z".to_string(),
        };
        let rendered = format!("{:?}", stored);
        assert!(!rendered.contains("cGFzc3dvcmQ="));
    }
}
