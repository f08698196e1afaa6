// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Credential vault tests.
//!
//! These tests verify that:
//! 1. Stored credentials decrypt to the exact original plaintext
//! 2. Nothing readable is persisted
//! 3. A different key or a different owner cannot open a ciphertext
//! 4. A vault without a key refuses to store

use coach_sync::db::{MemoryDb, Store};
use coach_sync::error::AppError;
use coach_sync::services::CredentialVault;
use std::sync::Arc;

const SECRET: &str = "vault-test-secret-not-for-production";

fn vault_over(store: Arc<MemoryDb>, secret: Option<&str>) -> CredentialVault {
    CredentialVault::new(secret, store).expect("vault builds")
}

#[tokio::test]
async fn test_round_trip_returns_exact_plaintext() {
    let store = Arc::new(MemoryDb::new());
    let vault = vault_over(store, Some(SECRET));

    let password = "pässwörd with spaces & ümlauts 🏃";
    vault.store(7, "runner@example.com", password).await.unwrap();

    let plain = vault.retrieve(7).await.unwrap();
    assert_eq!(plain.email, "runner@example.com");
    assert_eq!(plain.password, password);
}

#[tokio::test]
async fn test_persisted_record_is_not_plaintext() {
    let store = Arc::new(MemoryDb::new());
    let vault = vault_over(store.clone(), Some(SECRET));

    vault.store(7, "runner@example.com", "hunter2").await.unwrap();

    let stored = store.get_credential(7).await.unwrap().unwrap();
    assert!(!stored.email_encrypted.contains("runner"));
    assert!(!stored.password_encrypted.contains("hunter2"));
    assert!(!format!("{:?}", stored).contains("hunter2"));
}

#[tokio::test]
async fn test_retrieve_missing_is_not_found() {
    let vault = vault_over(Arc::new(MemoryDb::new()), Some(SECRET));
    assert!(matches!(vault.retrieve(1).await, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_wrong_key_fails_decryption() {
    let store = Arc::new(MemoryDb::new());
    vault_over(store.clone(), Some(SECRET))
        .store(7, "runner@example.com", "hunter2")
        .await
        .unwrap();

    let rotated = vault_over(store, Some("a-completely-different-secret"));
    assert!(matches!(
        rotated.retrieve(7).await,
        Err(AppError::Decryption(_))
    ));
}

#[tokio::test]
async fn test_ciphertext_bound_to_owner() {
    let store = Arc::new(MemoryDb::new());
    let vault = vault_over(store.clone(), Some(SECRET));
    vault.store(7, "runner@example.com", "hunter2").await.unwrap();

    // Copy user 7's record to user 8
    let mut copied = store.get_credential(7).await.unwrap().unwrap();
    copied.user_id = 8;
    store.put_credential(&copied).await.unwrap();

    assert!(matches!(vault.retrieve(8).await, Err(AppError::Decryption(_))));
    assert!(vault.retrieve(7).await.is_ok());
}

#[tokio::test]
async fn test_missing_key_fails_encryption() {
    let store = Arc::new(MemoryDb::new());
    let vault = vault_over(store.clone(), None);

    let result = vault.store(7, "runner@example.com", "hunter2").await;
    assert!(matches!(result, Err(AppError::Encryption(_))));
    assert!(store.get_credential(7).await.unwrap().is_none());
}

#[tokio::test]
async fn test_delete_is_idempotent() {
    let vault = vault_over(Arc::new(MemoryDb::new()), Some(SECRET));
    vault.store(7, "runner@example.com", "hunter2").await.unwrap();

    vault.delete(7).await.unwrap();
    vault.delete(7).await.unwrap();
    assert!(!vault.exists(7).await.unwrap());
}

#[tokio::test]
async fn test_store_replaces_previous_credential() {
    let vault = vault_over(Arc::new(MemoryDb::new()), Some(SECRET));
    vault.store(7, "old@example.com", "old").await.unwrap();
    vault.store(7, "new@example.com", "new").await.unwrap();

    let plain = vault.retrieve(7).await.unwrap();
    assert_eq!(plain.email, "new@example.com");
    assert_eq!(plain.password, "new");
}
