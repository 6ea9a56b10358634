//! Password hashing, opaque token generation, and secret hashing.
//!
//! Session tokens and one-time codes are opaque values validated against a
//! stored sha-256 hash; only the hash ever touches the database.

use argon2::password_hash::{PasswordHash, SaltString, rand_core::OsRng};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use rand::RngCore;
use sha2::{Digest, Sha256};
use unicode_normalization::UnicodeNormalization;

use crate::error::{AppError, Result};

pub const SESSION_TOKEN_PREFIX: &str = "sess_";

/// NFKC-normalize a password so visually identical inputs hash identically.
fn normalize_password(password: &str) -> String {
    password.nfkc().collect()
}

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(normalize_password(password).as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(normalize_password(password).as_bytes(), &parsed)
        .is_ok()
}

/// Hash a secret (session token, OTP code) for storage and lookup.
pub fn hash_secret(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"plancast-secret-v1:");
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Generate an opaque session token from the OS CSPRNG.
/// 256 bits of entropy; uniqueness is enforced by the store, and a collision
/// is treated as a fatal generation error rather than silently retried.
pub fn generate_session_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    format!("{SESSION_TOKEN_PREFIX}{}", hex::encode(bytes))
}

/// Generate a 6-digit one-time code.
pub fn generate_otp_code() -> String {
    let mut bytes = [0u8; 4];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    format!("{:06}", u32::from_be_bytes(bytes) % 1_000_000)
}

/// Constant-time comparison of two stored secret hashes.
pub fn secrets_match(a: &str, b: &str) -> bool {
    use subtle::ConstantTimeEq;
    a.as_bytes().ct_eq(b.as_bytes()).into()
}
