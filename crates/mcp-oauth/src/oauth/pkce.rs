//! PKCE (Proof Key for Code Exchange) implementation
//!
//! Implements RFC 7636. OAuth 2.1 requires S256 for every client, and the
//! authorize endpoint only accepts S256. Verification also understands
//! `plain` so that codes issued by older deployments can still be redeemed
//! when the legacy switch is enabled.
//!
//! # Example
//!
//! ```
//! use mcp_oauth::oauth::pkce::{PkceChallenge, PkceChallengeMethod, PkceVerifier};
//!
//! let verifier = PkceVerifier::generate();
//! let challenge = PkceChallenge::from_verifier(&verifier);
//!
//! assert!(challenge.verify(&verifier, PkceChallengeMethod::S256).is_ok());
//! ```

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::crypto::constant_time_eq;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during PKCE operations.
#[derive(Debug, thiserror::Error)]
pub enum PkceError {
    /// Verifier length is outside the valid range (43-128 characters).
    #[error("Invalid verifier length: must be 43-128 characters, got {0}")]
    InvalidVerifierLength(usize),

    /// Verifier contains invalid characters.
    #[error("Invalid verifier characters: must be URL-safe ([A-Za-z0-9-._~])")]
    InvalidVerifierCharacters,

    /// Challenge format is invalid.
    #[error("Invalid challenge format: must be 43-128 URL-safe characters")]
    InvalidChallengeFormat,

    /// Unsupported or disallowed challenge method.
    #[error("Unsupported challenge method: {0}")]
    UnsupportedMethod(String),

    /// PKCE verification failed (verifier doesn't match challenge).
    #[error("PKCE verification failed: verifier does not match challenge")]
    VerificationFailed,
}

impl PkceError {
    /// Returns `true` if this is a verifier validation error.
    #[must_use]
    pub fn is_verifier_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidVerifierLength(_) | Self::InvalidVerifierCharacters
        )
    }

    /// Returns `true` if this is a verification failure.
    #[must_use]
    pub fn is_verification_error(&self) -> bool {
        matches!(self, Self::VerificationFailed)
    }
}

// =============================================================================
// PKCE Challenge Method
// =============================================================================

/// PKCE challenge method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PkceChallengeMethod {
    /// `BASE64URL(SHA256(verifier))`.
    S256,
    /// The verifier itself. Legacy only.
    #[serde(rename = "plain")]
    Plain,
}

impl PkceChallengeMethod {
    /// Parse challenge method from string.
    ///
    /// # Errors
    ///
    /// Returns `PkceError::UnsupportedMethod` for anything other than
    /// `S256` or `plain`.
    pub fn parse(method: &str) -> Result<Self, PkceError> {
        match method {
            "S256" => Ok(Self::S256),
            "plain" => Ok(Self::Plain),
            other => Err(PkceError::UnsupportedMethod(other.to_string())),
        }
    }

    /// Get the method as a string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::S256 => "S256",
            Self::Plain => "plain",
        }
    }
}

impl std::fmt::Display for PkceChallengeMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// PKCE Verifier
// =============================================================================

/// Returns `true` for the RFC 3986 unreserved characters.
fn is_unreserved(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '~')
}

/// PKCE code verifier.
///
/// 43 to 128 characters from `[A-Z] / [a-z] / [0-9] / "-" / "." / "_" / "~"`
/// (RFC 7636 section 4.1).
#[derive(Debug, Clone)]
pub struct PkceVerifier(String);

impl PkceVerifier {
    /// Create a new verifier from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Length is not between 43 and 128 characters
    /// - Contains characters other than `[A-Za-z0-9-._~]`
    pub fn new(verifier: impl Into<String>) -> Result<Self, PkceError> {
        let verifier = verifier.into();
        let len = verifier.len();

        if !(43..=128).contains(&len) {
            return Err(PkceError::InvalidVerifierLength(len));
        }

        if !verifier.chars().all(is_unreserved) {
            return Err(PkceError::InvalidVerifierCharacters);
        }

        Ok(Self(verifier))
    }

    /// Generate a cryptographically random verifier.
    ///
    /// Generates 32 random bytes and encodes them as base64url (43 characters).
    #[must_use]
    pub fn generate() -> Self {
        Self(crate::crypto::random_base64url(32))
    }

    /// Get the verifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// =============================================================================
// PKCE Challenge
// =============================================================================

/// PKCE code challenge as received from the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkceChallenge(String);

impl PkceChallenge {
    /// Create an S256 challenge from a verifier.
    ///
    /// Computes `BASE64URL(SHA256(ASCII(code_verifier)))`.
    #[must_use]
    pub fn from_verifier(verifier: &PkceVerifier) -> Self {
        Self(s256(verifier.as_str()))
    }

    /// Create a challenge from a raw string (received from client).
    ///
    /// # Errors
    ///
    /// Returns `PkceError::InvalidChallengeFormat` unless the challenge is
    /// 43-128 unreserved characters.
    pub fn new(challenge: impl Into<String>) -> Result<Self, PkceError> {
        let challenge = challenge.into();
        if !(43..=128).contains(&challenge.len()) || !challenge.chars().all(is_unreserved) {
            return Err(PkceError::InvalidChallengeFormat);
        }
        Ok(Self(challenge))
    }

    /// Verify that a verifier matches this challenge.
    ///
    /// # Errors
    ///
    /// Returns `PkceError::VerificationFailed` if the verifier doesn't match.
    pub fn verify(
        &self,
        verifier: &PkceVerifier,
        method: PkceChallengeMethod,
    ) -> Result<(), PkceError> {
        let expected = match method {
            PkceChallengeMethod::S256 => s256(verifier.as_str()),
            PkceChallengeMethod::Plain => verifier.as_str().to_string(),
        };
        if constant_time_eq(&expected, &self.0) {
            Ok(())
        } else {
            Err(PkceError::VerificationFailed)
        }
    }

    /// Get the challenge as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn s256(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

/// Verifies a raw `code_verifier` against a stored challenge.
///
/// # Errors
///
/// Returns a verifier format error or `PkceError::VerificationFailed`.
pub fn verify_code_verifier(
    code_verifier: &str,
    code_challenge: &str,
    method: PkceChallengeMethod,
) -> Result<(), PkceError> {
    let verifier = PkceVerifier::new(code_verifier)?;
    PkceChallenge(code_challenge.to_string()).verify(&verifier, method)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // RFC 7636 Appendix B
    const RFC_VERIFIER: &str = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
    const RFC_CHALLENGE: &str = "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM";

    #[test]
    fn test_rfc7636_vector() {
        let verifier = PkceVerifier::new(RFC_VERIFIER).unwrap();
        assert_eq!(PkceChallenge::from_verifier(&verifier).as_str(), RFC_CHALLENGE);
        assert!(verify_code_verifier(RFC_VERIFIER, RFC_CHALLENGE, PkceChallengeMethod::S256).is_ok());
    }

    #[test]
    fn test_one_character_change_fails() {
        let mut altered = RFC_VERIFIER.to_string();
        altered.replace_range(0..1, "e");
        let err =
            verify_code_verifier(&altered, RFC_CHALLENGE, PkceChallengeMethod::S256).unwrap_err();
        assert!(err.is_verification_error());
    }

    #[test]
    fn test_generated_verifier_round_trip() {
        let verifier = PkceVerifier::generate();
        assert_eq!(verifier.as_str().len(), 43);
        let challenge = PkceChallenge::from_verifier(&verifier);
        assert!(challenge.verify(&verifier, PkceChallengeMethod::S256).is_ok());
        assert_ne!(PkceVerifier::generate().as_str(), verifier.as_str());
    }

    #[test]
    fn test_plain_method() {
        assert!(verify_code_verifier(RFC_VERIFIER, RFC_VERIFIER, PkceChallengeMethod::Plain).is_ok());
        assert!(
            verify_code_verifier(RFC_VERIFIER, RFC_CHALLENGE, PkceChallengeMethod::Plain).is_err()
        );
        // An S256 challenge never verifies the verifier itself
        assert!(verify_code_verifier(RFC_VERIFIER, RFC_VERIFIER, PkceChallengeMethod::S256).is_err());
    }

    #[test]
    fn test_verifier_validation() {
        assert!(matches!(
            PkceVerifier::new("short"),
            Err(PkceError::InvalidVerifierLength(5))
        ));
        assert!(PkceVerifier::new("a".repeat(129)).is_err());
        assert!(PkceVerifier::new("a".repeat(128)).is_ok());
        assert!(matches!(
            PkceVerifier::new(format!("{}!", "a".repeat(42))),
            Err(PkceError::InvalidVerifierCharacters)
        ));
        assert!(PkceVerifier::new("a".repeat(43)).is_ok());
    }

    #[test]
    fn test_challenge_validation() {
        assert!(PkceChallenge::new(RFC_CHALLENGE).is_ok());
        assert!(PkceChallenge::new("too-short").is_err());
        assert!(PkceChallenge::new(format!("{}=", &RFC_CHALLENGE[..43])).is_err());
    }

    #[test]
    fn test_method_parse() {
        assert_eq!(PkceChallengeMethod::parse("S256").unwrap(), PkceChallengeMethod::S256);
        assert_eq!(PkceChallengeMethod::parse("plain").unwrap(), PkceChallengeMethod::Plain);
        assert!(PkceChallengeMethod::parse("s256").is_err());
        assert!(PkceChallengeMethod::parse("").is_err());
    }

    #[test]
    fn test_method_serde() {
        assert_eq!(
            serde_json::to_string(&PkceChallengeMethod::S256).unwrap(),
            "\"S256\""
        );
        assert_eq!(
            serde_json::to_string(&PkceChallengeMethod::Plain).unwrap(),
            "\"plain\""
        );
    }
}
