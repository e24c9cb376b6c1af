//! Authorization session and authorization code records.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::oauth::pkce::PkceChallengeMethod;

/// Authorization session spanning the redirect to the identity provider.
///
/// Keyed by `session_id`. `state` holds the HMAC binding; the session is
/// trusted only when the caller presents the same value.
///
/// The request fields are optional because sessions come back from an
/// external store. A session missing any of them is treated as corrupt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthSession {
    /// Random session identifier.
    pub session_id: String,

    /// `base64url(HMAC-SHA256(secret, session_id ":" nonce))`.
    pub state: String,

    /// Client that started the flow.
    #[serde(default)]
    pub client_id: Option<String>,

    /// Validated redirect URI.
    #[serde(default)]
    pub redirect_uri: Option<String>,

    /// PKCE code challenge.
    #[serde(default)]
    pub code_challenge: Option<String>,

    /// PKCE challenge method.
    #[serde(default)]
    pub code_challenge_method: Option<PkceChallengeMethod>,

    /// The MCP client's own `state`, echoed back untouched.
    #[serde(default)]
    pub oauth_state: Option<String>,

    /// Requested scope.
    #[serde(default)]
    pub scope: Option<String>,

    /// Resource indicator the flow is bound to.
    #[serde(default)]
    pub resource: Option<String>,

    /// Creation time.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// Expiry time.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

impl OAuthSession {
    /// Returns `true` if the session has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        OffsetDateTime::now_utc() >= self.expires_at
    }
}

/// Single-use authorization code, keyed by the code value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationCode {
    /// The code value.
    pub code: String,

    /// Authenticated user.
    pub user_id: String,

    /// Client the code was issued to.
    pub client_id: String,

    /// Redirect URI used in the authorization request.
    pub redirect_uri: String,

    /// PKCE code challenge copied from the session.
    pub code_challenge: String,

    /// PKCE challenge method copied from the session.
    pub code_challenge_method: PkceChallengeMethod,

    /// Resource indicator fixed at authorization time.
    #[serde(default)]
    pub resource: Option<String>,

    /// Granted scope.
    #[serde(default)]
    pub scope: Option<String>,

    /// User profile record created for the authenticated identity.
    pub user_profile_id: String,

    /// Expiry time.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

impl AuthorizationCode {
    /// Returns `true` if the code has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        OffsetDateTime::now_utc() >= self.expires_at
    }
}
