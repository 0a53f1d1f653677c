//! Argon2 hashing. The work is CPU-bound, so the async entry points run it on
//! tokio's blocking pool and keep the request workers free.

use anyhow::Context;
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use lazy_static::lazy_static;
use rand::rngs::OsRng;
use tracing::error;

lazy_static! {
    /// Verified against when the username is unknown, so that a failed login
    /// costs the same whether or not the account exists.
    static ref DUMMY_HASH: Option<String> = hash_sync("not-a-real-password").ok();
}

fn hash_sync(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| {
            error!(error = %e, "argon2 hash failed");
            anyhow::anyhow!("hash password: {e}")
        })
}

fn verify_sync(plain: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "stored password hash is malformed");
        anyhow::anyhow!("parse password hash: {e}")
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

pub async fn hash_password(plain: &str) -> anyhow::Result<String> {
    let plain = plain.to_owned();
    tokio::task::spawn_blocking(move || hash_sync(&plain))
        .await
        .context("password hashing task")?
}

pub async fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    let (plain, hash) = (plain.to_owned(), hash.to_owned());
    tokio::task::spawn_blocking(move || verify_sync(&plain, &hash))
        .await
        .context("password verification task")?
}

/// Burns one verification against a throwaway hash. Always reports failure.
pub async fn verify_against_dummy(plain: &str) {
    let plain = plain.to_owned();
    let _ = tokio::task::spawn_blocking(move || {
        if let Some(hash) = DUMMY_HASH.as_deref() {
            let _ = verify_sync(&plain, hash);
        }
    })
    .await;
}
