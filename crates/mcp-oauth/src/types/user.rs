//! Identities returned by the identity provider and the stored user profile.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Tokens the identity provider issued for the user.
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderTokens {
    /// Provider access token.
    pub access_token: String,
    /// Provider refresh token.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Provider access token expiry.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub expires_at: Option<OffsetDateTime>,
}

impl std::fmt::Debug for ProviderTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderTokens")
            .field("access_token", &"***")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "***"))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// A user authenticated by an external identity provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalIdentity {
    /// Provider name, e.g. `github`.
    pub provider: String,
    /// The provider's stable user identifier.
    pub provider_user_id: String,
    /// Login or handle.
    #[serde(default)]
    pub username: Option<String>,
    /// Email address.
    #[serde(default)]
    pub email: Option<String>,
    /// Display name.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Avatar URL.
    #[serde(default)]
    pub avatar_url: Option<String>,
    /// Provider-specific profile payload, stored as is.
    #[serde(default)]
    pub raw_profile: serde_json::Value,
    /// Provider tokens, encrypted before they are stored.
    #[serde(default)]
    pub tokens: Option<ProviderTokens>,
}

impl ExternalIdentity {
    /// Creates an identity with only the required fields.
    #[must_use]
    pub fn new(provider: impl Into<String>, provider_user_id: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            provider_user_id: provider_user_id.into(),
            username: None,
            email: None,
            display_name: None,
            avatar_url: None,
            raw_profile: serde_json::Value::Null,
            tokens: None,
        }
    }

    /// Sets the username.
    #[must_use]
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Sets the email.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Sets the provider tokens.
    #[must_use]
    pub fn with_tokens(mut self, tokens: ProviderTokens) -> Self {
        self.tokens = Some(tokens);
        self
    }

    /// Stable user identifier used as the token subject.
    #[must_use]
    pub fn user_id(&self) -> String {
        format!("{}:{}", self.provider, self.provider_user_id)
    }
}

/// Stored user profile, unique per `(provider, provider_user_id)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    /// Profile identifier, stable across upserts.
    pub profile_id: String,
    /// Token subject, `provider:provider_user_id`.
    pub user_id: String,
    /// Provider name.
    pub provider: String,
    /// The provider's user identifier.
    pub provider_user_id: String,
    /// Login or handle.
    #[serde(default)]
    pub username: Option<String>,
    /// Email address.
    #[serde(default)]
    pub email: Option<String>,
    /// Display name.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Avatar URL.
    #[serde(default)]
    pub avatar_url: Option<String>,
    /// Provider profile payload.
    #[serde(default)]
    pub raw_profile: serde_json::Value,
    /// Encrypted provider access token.
    #[serde(default)]
    pub encrypted_access_token: Option<String>,
    /// Encrypted provider refresh token.
    #[serde(default)]
    pub encrypted_refresh_token: Option<String>,
    /// Provider access token expiry.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub provider_token_expires_at: Option<OffsetDateTime>,
    /// First login.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Latest login.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}
