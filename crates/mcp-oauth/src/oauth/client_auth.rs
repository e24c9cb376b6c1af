//! Client credential extraction for the token, introspection and revocation
//! endpoints.
//!
//! # Authentication Methods
//!
//! - `none` - Public clients (client_id only)
//! - `client_secret_basic` - HTTP Basic Auth with client_id:client_secret
//! - `client_secret_post` - client_id and client_secret in request body
//!
//! # Priority
//!
//! When an `Authorization: Basic` header is present it wins over body
//! parameters. Empty strings are treated as absent.

use crate::AuthResult;
use crate::error::AuthError;
use crate::oauth::authorize::non_empty;

/// Credentials a client presented with a request.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ClientCredentials {
    /// Client identifier.
    pub client_id: Option<String>,
    /// Client secret, for confidential clients.
    pub client_secret: Option<String>,
}

impl std::fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "***"))
            .finish()
    }
}

impl ClientCredentials {
    /// Credentials for a public client.
    #[must_use]
    pub fn public(client_id: impl Into<String>) -> Self {
        Self {
            client_id: Some(client_id.into()),
            client_secret: None,
        }
    }

    /// Credentials for a confidential client.
    #[must_use]
    pub fn confidential(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: Some(client_id.into()),
            client_secret: Some(client_secret.into()),
        }
    }

    /// Combines an optional `Authorization` header with body parameters.
    #[must_use]
    pub fn resolve(
        authorization: Option<&str>,
        body_client_id: Option<&str>,
        body_client_secret: Option<&str>,
    ) -> Self {
        if let Some((client_id, client_secret)) = authorization.and_then(parse_basic_auth) {
            return Self {
                client_id: non_empty(Some(&client_id)).map(str::to_string),
                client_secret: non_empty(Some(&client_secret)).map(str::to_string),
            };
        }

        Self {
            client_id: non_empty(body_client_id).map(str::to_string),
            client_secret: non_empty(body_client_secret).map(str::to_string),
        }
    }

    /// The presented client id.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidClient` if no client id was presented.
    pub fn require_client_id(&self) -> AuthResult<&str> {
        self.client_id
            .as_deref()
            .ok_or_else(|| AuthError::invalid_client("No client credentials provided"))
    }

    /// The presented secret, if any.
    #[must_use]
    pub fn secret(&self) -> Option<&str> {
        self.client_secret.as_deref()
    }
}

/// Parses HTTP Basic Auth header value.
///
/// Returns `Some((client_id, client_secret))` if valid, `None` otherwise.
#[must_use]
pub fn parse_basic_auth(header_value: &str) -> Option<(String, String)> {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;

    let encoded = header_value.trim().strip_prefix("Basic ")?;
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let credentials = String::from_utf8(decoded).ok()?;

    // Split on first colon (password may contain colons)
    let (client_id, client_secret) = credentials.split_once(':')?;

    Some((client_id.to_string(), client_secret.to_string()))
}
