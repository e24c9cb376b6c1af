//! Opaque token metadata and the token response.
//!
//! Tokens are random strings without structure. Storage is keyed by the
//! SHA-256 hash of the token (see [`crate::crypto::hash_token`]), so a store
//! dump never contains a usable token.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Subject and audience of an issued token pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenGrant {
    /// Authenticated user.
    pub user_id: String,
    /// Client the tokens are issued to.
    pub client_id: String,
    /// Granted scope.
    pub scope: Option<String>,
    /// Resource indicator the tokens are bound to.
    pub resource: Option<String>,
    /// User profile record.
    pub user_profile_id: String,
}

/// Server-side record of an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenMetadata {
    /// Authenticated user.
    pub user_id: String,
    /// Owning client.
    pub client_id: String,
    /// Granted scope.
    #[serde(default)]
    pub scope: Option<String>,
    /// Resource indicator.
    #[serde(default)]
    pub resource: Option<String>,
    /// User profile record.
    pub user_profile_id: String,
    /// Refresh family this token was issued with.
    pub family_id: String,
    /// Issue time.
    #[serde(with = "time::serde::rfc3339")]
    pub issued_at: OffsetDateTime,
    /// Expiry time.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

impl AccessTokenMetadata {
    /// Returns `true` if the token has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        OffsetDateTime::now_utc() >= self.expires_at
    }
}

/// Server-side record of a refresh token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshTokenMetadata {
    /// Authenticated user.
    pub user_id: String,
    /// Owning client.
    pub client_id: String,
    /// Granted scope.
    #[serde(default)]
    pub scope: Option<String>,
    /// Resource indicator.
    #[serde(default)]
    pub resource: Option<String>,
    /// User profile record.
    pub user_profile_id: String,
    /// Rotation lineage identifier.
    pub family_id: String,
    /// Position in the lineage, starting at 0.
    pub generation: u32,
    /// Issue time.
    #[serde(with = "time::serde::rfc3339")]
    pub issued_at: OffsetDateTime,
    /// Expiry time.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

impl RefreshTokenMetadata {
    /// Returns `true` if the token has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        OffsetDateTime::now_utc() >= self.expires_at
    }

    /// The grant this token was issued for.
    #[must_use]
    pub fn grant(&self) -> TokenGrant {
        TokenGrant {
            user_id: self.user_id.clone(),
            client_id: self.client_id.clone(),
            scope: self.scope.clone(),
            resource: self.resource.clone(),
            user_profile_id: self.user_profile_id.clone(),
        }
    }
}

/// Marker left behind when a refresh token is rotated away.
///
/// Presenting a token that has a marker is a replay and revokes the family.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsedRefreshToken {
    /// Family of the rotated token.
    pub family_id: String,
    /// Client that owned the token.
    pub client_id: String,
    /// Generation of the rotated token.
    pub generation: u32,
    /// When the token was rotated.
    #[serde(with = "time::serde::rfc3339")]
    pub used_at: OffsetDateTime,
    /// The marker may be discarded after this time.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

/// Token endpoint success response. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    /// Opaque access token.
    pub access_token: String,
    /// Opaque refresh token.
    pub refresh_token: String,
    /// Always `bearer`.
    pub token_type: String,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
    /// Granted scope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}
