//! Encryption at rest for identity-provider tokens.
//!
//! The engine never stores provider access or refresh tokens in plaintext.
//! Before a user profile is upserted, provider tokens are passed through a
//! [`TokenCipher`]. Deployments usually back this with a KMS; the
//! [`AesGcmTokenCipher`] reference implementation uses a local AES-256-GCM key.
//!
//! Ciphertext format: `base64(nonce || ciphertext)` with a 96-bit random nonce.

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use rand::RngCore;

use crate::error::AuthError;

/// Nonce size for AES-256-GCM (96 bits)
const NONCE_SIZE: usize = 12;

/// Key size for AES-256 (256 bits)
pub const KEY_SIZE: usize = 32;

/// Errors raised by a [`TokenCipher`].
#[derive(Debug, thiserror::Error)]
pub enum CipherError {
    /// The key material is unusable.
    #[error("Invalid encryption key: {0}")]
    InvalidKey(String),

    /// Encryption failed.
    #[error("Encryption failed: {0}")]
    Encrypt(String),

    /// The ciphertext is malformed or failed authentication.
    #[error("Decryption failed: {0}")]
    Decrypt(String),
}

impl From<CipherError> for AuthError {
    fn from(err: CipherError) -> Self {
        AuthError::internal(err.to_string())
    }
}

/// Encryption service for secrets persisted by collaborators.
#[async_trait]
pub trait TokenCipher: Send + Sync {
    /// Encrypts a plaintext secret.
    async fn encrypt(&self, plaintext: &str) -> Result<String, CipherError>;

    /// Decrypts a value produced by [`TokenCipher::encrypt`].
    async fn decrypt(&self, ciphertext: &str) -> Result<String, CipherError>;
}

/// AES-256-GCM [`TokenCipher`] with a process-local key.
pub struct AesGcmTokenCipher {
    cipher: Aes256Gcm,
}

impl AesGcmTokenCipher {
    /// Creates a cipher from a 32-byte key.
    ///
    /// # Errors
    ///
    /// Returns `CipherError::InvalidKey` if the key is not 32 bytes.
    pub fn new(key: &[u8]) -> Result<Self, CipherError> {
        if key.len() != KEY_SIZE {
            return Err(CipherError::InvalidKey(format!(
                "expected {KEY_SIZE} bytes, got {}",
                key.len()
            )));
        }
        let cipher = Aes256Gcm::new_from_slice(key)
            .map_err(|e| CipherError::InvalidKey(e.to_string()))?;
        Ok(Self { cipher })
    }

    /// Creates a cipher from a base64-encoded 32-byte key.
    ///
    /// # Errors
    ///
    /// Returns `CipherError::InvalidKey` if the key does not decode to 32 bytes.
    pub fn from_base64(key: &str) -> Result<Self, CipherError> {
        let bytes = BASE64
            .decode(key.trim())
            .map_err(|e| CipherError::InvalidKey(format!("invalid base64: {e}")))?;
        Self::new(&bytes)
    }

    fn seal(&self, plaintext: &str) -> Result<String, CipherError> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| CipherError::Encrypt(e.to_string()))?;

        let mut sealed = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(sealed))
    }

    fn open(&self, sealed: &str) -> Result<String, CipherError> {
        let bytes = BASE64
            .decode(sealed)
            .map_err(|e| CipherError::Decrypt(format!("invalid base64: {e}")))?;
        if bytes.len() <= NONCE_SIZE {
            return Err(CipherError::Decrypt("ciphertext too short".to_string()));
        }
        let (nonce_bytes, ciphertext) = bytes.split_at(NONCE_SIZE);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|e| CipherError::Decrypt(e.to_string()))?;
        String::from_utf8(plaintext)
            .map_err(|e| CipherError::Decrypt(format!("invalid UTF-8: {e}")))
    }
}

#[async_trait]
impl TokenCipher for AesGcmTokenCipher {
    async fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        self.seal(plaintext)
    }

    async fn decrypt(&self, ciphertext: &str) -> Result<String, CipherError> {
        self.open(ciphertext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cipher() -> AesGcmTokenCipher {
        AesGcmTokenCipher::new(&[7u8; KEY_SIZE]).unwrap()
    }

    #[test]
    fn test_encrypt_decrypt() {
        let cipher = cipher();
        let sealed = tokio_test::block_on(cipher.encrypt("gho_provider_token")).unwrap();
        assert!(!sealed.contains("gho_provider_token"));

        let opened = tokio_test::block_on(cipher.decrypt(&sealed)).unwrap();
        assert_eq!(opened, "gho_provider_token");
    }

    #[test]
    fn test_nonce_is_random() {
        let cipher = cipher();
        let a = tokio_test::block_on(cipher.encrypt("same")).unwrap();
        let b = tokio_test::block_on(cipher.encrypt("same")).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_wrong_key_fails() {
        let sealed = tokio_test::block_on(cipher().encrypt("secret")).unwrap();
        let other = AesGcmTokenCipher::new(&[9u8; KEY_SIZE]).unwrap();
        let err = tokio_test::block_on(other.decrypt(&sealed)).unwrap_err();
        assert!(matches!(err, CipherError::Decrypt(_)));
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let cipher = cipher();
        let sealed = tokio_test::block_on(cipher.encrypt("secret")).unwrap();
        let mut bytes = BASE64.decode(&sealed).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        let tampered = BASE64.encode(bytes);
        assert!(tokio_test::block_on(cipher.decrypt(&tampered)).is_err());
    }

    #[test]
    fn test_invalid_key_length() {
        assert!(matches!(
            AesGcmTokenCipher::new(&[0u8; 16]),
            Err(CipherError::InvalidKey(_))
        ));
        assert!(AesGcmTokenCipher::from_base64("not base64!!").is_err());
    }
}
