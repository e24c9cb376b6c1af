//! Random value generation, hashing and constant-time comparison.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::AuthResult;
use crate::error::AuthError;

type HmacSha256 = Hmac<Sha256>;

/// Returns `len` cryptographically random bytes encoded as base64url without padding.
#[must_use]
pub fn random_base64url(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Returns `len` cryptographically random bytes encoded as lowercase hex.
#[must_use]
pub fn random_hex(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Computes `base64url(HMAC-SHA256(secret, message))`.
///
/// # Errors
///
/// Returns `AuthError::Configuration` if the key is rejected by the MAC.
pub fn hmac_sha256_base64url(secret: &[u8], message: &str) -> AuthResult<String> {
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| AuthError::configuration(format!("Invalid HMAC key: {e}")))?;
    mac.update(message.as_bytes());
    Ok(URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes()))
}

/// Compares two strings without short-circuiting on the first differing byte.
///
/// Strings of different length compare unequal.
#[must_use]
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// SHA-256 of a token, hex encoded. Used as the storage key for tokens.
#[must_use]
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Short correlation id for a secret value, safe to write to logs.
#[must_use]
pub fn fingerprint(value: &str) -> String {
    let mut digest = hash_token(value);
    digest.truncate(12);
    digest
}
