// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Credential vault for Garmin account email/password pairs.
//!
//! Each field is sealed with AES-256-GCM under a key derived (HKDF-SHA256)
//! from the process-wide secret. The AAD binds a ciphertext to its owner and
//! field, so a value copied to another user or column fails to open.
//! Stored format: base64(nonce || ciphertext || tag).

use crate::db::Store;
use crate::error::AppError;
use crate::models::{PlainCredentials, StoredCredential};
use crate::time_utils::now_rfc3339;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use hkdf::Hkdf;
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN};
use ring::rand::{SecureRandom, SystemRandom};
use sha2::Sha256;
use std::sync::Arc;

const HKDF_SALT: &[u8] = b"coach-sync/credential-vault";
const HKDF_INFO: &[u8] = b"aes-256-gcm/v1";

/// Which credential field a ciphertext belongs to (part of the AAD).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialField {
    Email,
    Password,
}

impl CredentialField {
    fn as_str(self) -> &'static str {
        match self {
            CredentialField::Email => "email",
            CredentialField::Password => "password",
        }
    }
}

fn aad_for(user_id: u64, field: CredentialField) -> String {
    format!("user:{}|field:{}", user_id, field.as_str())
}

/// Encrypts credentials at rest and persists them through the [`Store`].
#[derive(Clone)]
pub struct CredentialVault {
    /// `None` when no secret is configured: writes fail, reads fail.
    key: Option<Arc<LessSafeKey>>,
    rng: SystemRandom,
    store: Arc<dyn Store>,
}

impl CredentialVault {
    /// Build the vault. A missing or blank secret leaves the vault unkeyed.
    pub fn new(secret: Option<&str>, store: Arc<dyn Store>) -> Result<Self, AppError> {
        let key = match secret.map(str::trim).filter(|s| !s.is_empty()) {
            Some(secret) => Some(Arc::new(derive_key(secret)?)),
            None => {
                tracing::warn!("No credential encryption key configured; Garmin connect is disabled");
                None
            }
        };

        Ok(Self {
            key,
            rng: SystemRandom::new(),
            store,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.key.is_some()
    }

    /// Encrypt and store a user's credentials, replacing any previous pair.
    pub async fn store(
        &self,
        user_id: u64,
        email: &str,
        password: &str,
    ) -> Result<StoredCredential, AppError> {
        let credential = StoredCredential {
            user_id,
            email_encrypted: self.seal(user_id, CredentialField::Email, email)?,
            password_encrypted: self.seal(user_id, CredentialField::Password, password)?,
            created_at: now_rfc3339(),
        };

        self.store.put_credential(&credential).await?;
        tracing::debug!(user_id, "Garmin credentials stored");
        Ok(credential)
    }

    /// Load and decrypt a user's credentials.
    pub async fn retrieve(&self, user_id: u64) -> Result<PlainCredentials, AppError> {
        let credential = self.store.get_credential(user_id).await?.ok_or_else(|| {
            AppError::NotFound(
                "No Garmin account connected. Please connect first.".to_string(),
            )
        })?;

        Ok(PlainCredentials {
            email: self.open(user_id, CredentialField::Email, &credential.email_encrypted)?,
            password: self.open(
                user_id,
                CredentialField::Password,
                &credential.password_encrypted,
            )?,
        })
    }

    /// Remove a user's credentials. Absent credentials are not an error.
    pub async fn delete(&self, user_id: u64) -> Result<(), AppError> {
        self.store.delete_credential(user_id).await?;
        tracing::debug!(user_id, "Garmin credentials deleted");
        Ok(())
    }

    pub async fn exists(&self, user_id: u64) -> Result<bool, AppError> {
        Ok(self.store.get_credential(user_id).await?.is_some())
    }

    /// Seal one field for `user_id`.
    pub fn seal(
        &self,
        user_id: u64,
        field: CredentialField,
        plaintext: &str,
    ) -> Result<String, AppError> {
        let key = self
            .key
            .as_ref()
            .ok_or_else(|| AppError::Encryption("credential encryption key not configured".into()))?;

        let mut nonce_bytes = [0u8; NONCE_LEN];
        self.rng
            .fill(&mut nonce_bytes)
            .map_err(|_| AppError::Encryption("failed to generate nonce".into()))?;
        let nonce = Nonce::assume_unique_for_key(nonce_bytes);

        let aad = aad_for(user_id, field);
        let mut in_out = plaintext.as_bytes().to_vec();
        key.seal_in_place_append_tag(nonce, Aad::from(aad.as_bytes()), &mut in_out)
            .map_err(|_| AppError::Encryption("seal failed".into()))?;

        let mut combined = nonce_bytes.to_vec();
        combined.extend(in_out);
        Ok(BASE64.encode(combined))
    }

    /// Open one field sealed by [`seal`](Self::seal).
    pub fn open(
        &self,
        user_id: u64,
        field: CredentialField,
        ciphertext_b64: &str,
    ) -> Result<String, AppError> {
        let key = self
            .key
            .as_ref()
            .ok_or_else(|| AppError::Decryption("credential encryption key not configured".into()))?;

        let combined = BASE64
            .decode(ciphertext_b64)
            .map_err(|_| AppError::Decryption("ciphertext is not valid base64".into()))?;
        if combined.len() < NONCE_LEN + AES_256_GCM.tag_len() {
            return Err(AppError::Decryption("ciphertext too short".into()));
        }

        let (nonce_bytes, sealed) = combined.split_at(NONCE_LEN);
        let nonce = Nonce::try_assume_unique_for_key(nonce_bytes)
            .map_err(|_| AppError::Decryption("invalid nonce".into()))?;

        let aad = aad_for(user_id, field);
        let mut in_out = sealed.to_vec();
        let plaintext = key
            .open_in_place(nonce, Aad::from(aad.as_bytes()), &mut in_out)
            .map_err(|_| {
                AppError::Decryption("authentication failed (wrong key or tampered data)".into())
            })?;

        String::from_utf8(plaintext.to_vec())
            .map_err(|_| AppError::Decryption("plaintext is not UTF-8".into()))
    }
}

fn derive_key(secret: &str) -> Result<LessSafeKey, AppError> {
    let hk = Hkdf::<Sha256>::new(Some(HKDF_SALT), secret.as_bytes());
    let mut okm = [0u8; 32];
    hk.expand(HKDF_INFO, &mut okm)
        .map_err(|_| AppError::Encryption("key derivation failed".into()))?;
    let unbound = UnboundKey::new(&AES_256_GCM, &okm)
        .map_err(|_| AppError::Encryption("invalid derived key".into()))?;
    Ok(LessSafeKey::new(unbound))
}
