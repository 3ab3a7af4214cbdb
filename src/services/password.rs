//! Password hashing and verification.
//!
//! Hashes are Argon2id PHC strings. Verification never fails loudly: an
//! empty or malformed stored hash simply does not match.

use anyhow::{Context, Result};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use tokio::task;

use crate::config::SecurityConfig;

/// Hash a password using Argon2id with the configured cost parameters.
pub fn hash_password(password: &str, config: &SecurityConfig) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let params = Params::new(
        config.argon2_memory_cost_kib,
        config.argon2_time_cost,
        config.argon2_parallelism,
        None,
    )
    .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;

    Ok(hash.to_string())
}

/// Check a plaintext password against a stored hash.
#[must_use]
pub fn verify_password(stored_hash: &str, password: &str) -> bool {
    if stored_hash.is_empty() {
        return false;
    }

    let Ok(parsed_hash) = PasswordHash::new(stored_hash) else {
        tracing::error!("Attempted to verify password against an invalid hash");
        return false;
    };

    // Parameters come from the hash itself, so default Argon2 verifies
    // hashes made with any cost settings.
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Hashing is CPU-intensive; run it off the async runtime.
pub async fn hash_password_async(password: &str, config: &SecurityConfig) -> Result<String> {
    let password = password.to_string();
    let config = config.clone();

    task::spawn_blocking(move || hash_password(&password, &config))
        .await
        .context("Password hashing task panicked")?
}

pub async fn verify_password_async(stored_hash: &str, password: &str) -> bool {
    let stored_hash = stored_hash.to_string();
    let password = password.to_string();

    task::spawn_blocking(move || verify_password(&stored_hash, &password))
        .await
        .unwrap_or(false)
}
