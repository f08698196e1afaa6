use coach_sync::db::MemoryDb;
use coach_sync::services::{CredentialField, CredentialVault};
use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use std::sync::Arc;

fn benchmark_vault(c: &mut Criterion) {
    let vault = CredentialVault::new(
        Some("benchmark-secret-not-for-production"),
        Arc::new(MemoryDb::new()),
    )
    .expect("Failed to build vault");

    let password = "a-reasonably-long-garmin-password-123!";
    let sealed = vault
        .seal(42, CredentialField::Password, password)
        .expect("Failed to seal");

    let mut group = c.benchmark_group("credential_vault");

    group.bench_function("seal_password", |b| {
        b.iter(|| vault.seal(black_box(42), CredentialField::Password, black_box(password)))
    });

    group.bench_function("open_password", |b| {
        b.iter(|| vault.open(black_box(42), CredentialField::Password, black_box(&sealed)))
    });

    // Key derivation runs once per process, but keep an eye on it
    group.bench_function("derive_key", |b| {
        b.iter(|| {
            CredentialVault::new(
                Some(black_box("benchmark-secret-not-for-production")),
                Arc::new(MemoryDb::new()),
            )
        })
    });

    group.finish();
}

criterion_group!(benches, benchmark_vault);
criterion_main!(benches);
