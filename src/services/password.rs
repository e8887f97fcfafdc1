//! Password hashing and the password-reset token lifecycle.

use anyhow::{Context, Result};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sha2::{Digest, Sha256};
use tokio::task;

/// Reset tokens are single-use and short-lived.
pub const RESET_TOKEN_TTL_MINUTES: i64 = 10;

/// Hashes a password with Argon2id.
/// Runs in `spawn_blocking` because the hash is CPU-intensive and would
/// stall the async runtime if computed inline.
pub async fn hash(password: &str) -> Result<String> {
    let password = password.to_string();
    task::spawn_blocking(move || hash_blocking(&password))
        .await
        .context("Password hashing task panicked")?
}

pub fn hash_blocking(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;
    Ok(hash.to_string())
}

/// Verifies a password against a stored hash, off the async runtime.
pub async fn verify(password: &str, stored_hash: &str) -> Result<bool> {
    let password = password.to_string();
    let stored_hash = stored_hash.to_string();

    task::spawn_blocking(move || {
        let parsed = PasswordHash::new(&stored_hash)
            .map_err(|e| anyhow::anyhow!("Invalid password hash format: {e}"))?;
        Ok::<bool, anyhow::Error>(
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
        )
    })
    .await
    .context("Password verification task panicked")?
}

/// Generates a random reset token (64 character hex string).
/// Only its one-way hash is stored; the plaintext goes out of band.
#[must_use]
pub fn generate_reset_token() -> String {
    use rand::Rng;

    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();

    bytes.iter().fold(String::with_capacity(64), |mut acc, b| {
        use std::fmt::Write;
        let _ = write!(acc, "{b:02x}");
        acc
    })
}

/// One-way hash of a reset token, hex-encoded, for storage and comparison.
#[must_use]
pub fn hash_reset_token(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    digest.iter().fold(String::with_capacity(64), |mut acc, b| {
        use std::fmt::Write;
        let _ = write!(acc, "{b:02x}");
        acc
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_then_verify_round_trips() {
        let hashed = hash("pass1234").await.unwrap();
        assert!(verify("pass1234", &hashed).await.unwrap());
        assert!(!verify("wrong-pass", &hashed).await.unwrap());
    }

    #[test]
    fn reset_tokens_are_unique_hex() {
        let a = generate_reset_token();
        let b = generate_reset_token();
        assert_eq!(a.len(), 64);
        assert_ne!(a, b);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn reset_token_hash_is_deterministic() {
        let token = "abcdef0123456789";
        assert_eq!(hash_reset_token(token), hash_reset_token(token));
        assert_ne!(hash_reset_token(token), hash_reset_token("other"));
        assert_eq!(hash_reset_token(token).len(), 64);
    }
}
