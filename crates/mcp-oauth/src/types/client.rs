//! OAuth client domain types.
//!
//! [`OAuthClient`] is the persisted registration. [`ClientMetadata`] is the
//! RFC 7591 registration request and [`RegisteredClient`] the response that
//! carries the plaintext secret exactly once.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::oauth::redirect_uri;

// =============================================================================
// Grant Type
// =============================================================================

/// OAuth 2.1 grant types supported by this server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
    /// Authorization code flow with PKCE.
    AuthorizationCode,
    /// Refresh token flow.
    RefreshToken,
}

impl GrantType {
    /// Parses a `grant_type` value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "authorization_code" => Some(Self::AuthorizationCode),
            "refresh_token" => Some(Self::RefreshToken),
            _ => None,
        }
    }

    /// Returns the OAuth 2.0 grant_type parameter value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthorizationCode => "authorization_code",
            Self::RefreshToken => "refresh_token",
        }
    }
}

impl std::fmt::Display for GrantType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Response Type
// =============================================================================

/// Authorization endpoint response types. OAuth 2.1 only keeps `code`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    /// Authorization code.
    Code,
}

impl ResponseType {
    /// Returns the `response_type` parameter value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Code => "code",
        }
    }
}

// =============================================================================
// Token Endpoint Auth Method
// =============================================================================

/// Token endpoint authentication methods (RFC 7591 section 2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenEndpointAuthMethod {
    /// Public client, no secret.
    None,
    /// Client secret via HTTP Basic Auth.
    ClientSecretBasic,
    /// Client secret in the request body.
    ClientSecretPost,
}

impl TokenEndpointAuthMethod {
    /// Parses a `token_endpoint_auth_method` value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "none" => Some(Self::None),
            "client_secret_basic" => Some(Self::ClientSecretBasic),
            "client_secret_post" => Some(Self::ClientSecretPost),
            _ => None,
        }
    }

    /// Returns the string representation of the auth method.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::ClientSecretBasic => "client_secret_basic",
            Self::ClientSecretPost => "client_secret_post",
        }
    }

    /// Returns `true` if clients using this method hold a secret.
    #[must_use]
    pub fn requires_secret(&self) -> bool {
        !matches!(self, Self::None)
    }
}

impl std::fmt::Display for TokenEndpointAuthMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Client
// =============================================================================

/// A registered OAuth client. Immutable after registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthClient {
    /// Server-generated client identifier.
    pub client_id: String,

    /// Bcrypt hash of the client secret. `None` for public clients.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret_hash: Option<String>,

    /// Human-readable display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,

    /// Exact-match redirect URIs.
    pub redirect_uris: Vec<String>,

    /// Grant types this client may use.
    pub grant_types: Vec<GrantType>,

    /// Response types this client may request.
    pub response_types: Vec<ResponseType>,

    /// How the client authenticates at the token endpoint.
    pub token_endpoint_auth_method: TokenEndpointAuthMethod,

    /// Space-delimited scope the client registered with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// Registration time.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// Last modification time.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl OAuthClient {
    /// Returns `true` if the client holds a secret.
    #[must_use]
    pub fn is_confidential(&self) -> bool {
        self.client_secret_hash.is_some()
    }

    /// Checks if a grant type is allowed for this client.
    #[must_use]
    pub fn is_grant_type_allowed(&self, grant_type: GrantType) -> bool {
        self.grant_types.contains(&grant_type)
    }

    /// Checks a requested redirect URI against the registered set.
    ///
    /// Matching is exact, except for the loopback rule described in
    /// [`redirect_uri::matches`].
    #[must_use]
    pub fn is_redirect_uri_allowed(&self, uri: &str) -> bool {
        self.redirect_uris
            .iter()
            .any(|registered| redirect_uri::matches(registered, uri))
    }
}

// =============================================================================
// Registration
// =============================================================================

/// Client registration request (RFC 7591 section 2).
///
/// Enumerated fields are kept as strings so that unknown values surface as
/// `invalid_client_metadata` rather than a deserialization failure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ClientMetadata {
    /// Redirect URIs. At least one is required.
    #[serde(default)]
    pub redirect_uris: Vec<String>,

    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,

    /// Requested grant types. Defaults to `authorization_code` + `refresh_token`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grant_types: Option<Vec<String>>,

    /// Requested response types. Defaults to `code`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_types: Option<Vec<String>>,

    /// Token endpoint auth method. Defaults to `client_secret_basic`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_endpoint_auth_method: Option<String>,

    /// Space-delimited scope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

/// Registration metadata after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedClientMetadata {
    /// Redirect URIs.
    pub redirect_uris: Vec<String>,
    /// Display name.
    pub client_name: Option<String>,
    /// Grant types.
    pub grant_types: Vec<GrantType>,
    /// Response types.
    pub response_types: Vec<ResponseType>,
    /// Token endpoint auth method.
    pub token_endpoint_auth_method: TokenEndpointAuthMethod,
    /// Space-delimited scope.
    pub scope: Option<String>,
}

impl ClientMetadata {
    /// Validates the registration request and applies RFC 7591 defaults.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientValidationError`] describing the first problem found.
    pub fn validate(&self) -> Result<ValidatedClientMetadata, ClientValidationError> {
        if self.redirect_uris.is_empty() {
            return Err(ClientValidationError::MissingRedirectUri);
        }
        for uri in &self.redirect_uris {
            redirect_uri::validate_registration(uri)?;
        }

        let grant_types = match &self.grant_types {
            Some(values) if !values.is_empty() => values
                .iter()
                .map(|v| {
                    GrantType::parse(v)
                        .ok_or_else(|| ClientValidationError::UnsupportedGrantType(v.clone()))
                })
                .collect::<Result<Vec<_>, _>>()?,
            _ => vec![GrantType::AuthorizationCode, GrantType::RefreshToken],
        };

        let response_types = match &self.response_types {
            Some(values) if !values.is_empty() => values
                .iter()
                .map(|v| match v.as_str() {
                    "code" => Ok(ResponseType::Code),
                    other => Err(ClientValidationError::UnsupportedResponseType(
                        other.to_string(),
                    )),
                })
                .collect::<Result<Vec<_>, _>>()?,
            _ => vec![ResponseType::Code],
        };

        if grant_types.contains(&GrantType::AuthorizationCode)
            && !response_types.contains(&ResponseType::Code)
        {
            return Err(ClientValidationError::InconsistentResponseTypes);
        }

        let token_endpoint_auth_method = match self.token_endpoint_auth_method.as_deref() {
            Some(method) => TokenEndpointAuthMethod::parse(method)
                .ok_or_else(|| ClientValidationError::UnsupportedAuthMethod(method.to_string()))?,
            None => TokenEndpointAuthMethod::ClientSecretBasic,
        };

        let scope = self
            .scope
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Ok(ValidatedClientMetadata {
            redirect_uris: self.redirect_uris.clone(),
            client_name: self.client_name.clone(),
            grant_types,
            response_types,
            token_endpoint_auth_method,
            scope,
        })
    }
}

/// Client registration response (RFC 7591 section 3.2.1).
///
/// `client_secret` is the plaintext secret. It appears only in this response
/// and is never retrievable again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisteredClient {
    /// Server-generated client identifier.
    pub client_id: String,

    /// Plaintext client secret for confidential clients.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,

    /// Issue time, seconds since the epoch.
    pub client_id_issued_at: i64,

    /// Secret expiry, `0` for never. Present only with a secret.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret_expires_at: Option<i64>,

    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,

    /// Redirect URIs.
    pub redirect_uris: Vec<String>,

    /// Grant types.
    pub grant_types: Vec<GrantType>,

    /// Response types.
    pub response_types: Vec<ResponseType>,

    /// Token endpoint auth method.
    pub token_endpoint_auth_method: TokenEndpointAuthMethod,

    /// Space-delimited scope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl RegisteredClient {
    /// Builds the registration response from the stored client and the
    /// one-time plaintext secret.
    #[must_use]
    pub fn from_client(client: &OAuthClient, plaintext_secret: Option<String>) -> Self {
        let client_secret_expires_at = plaintext_secret.as_ref().map(|_| 0);
        Self {
            client_id: client.client_id.clone(),
            client_secret: plaintext_secret,
            client_id_issued_at: client.created_at.unix_timestamp(),
            client_secret_expires_at,
            client_name: client.client_name.clone(),
            redirect_uris: client.redirect_uris.clone(),
            grant_types: client.grant_types.clone(),
            response_types: client.response_types.clone(),
            token_endpoint_auth_method: client.token_endpoint_auth_method,
            scope: client.scope.clone(),
        }
    }
}

// =============================================================================
// Validation Errors
// =============================================================================

/// Client registration validation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientValidationError {
    /// No redirect URIs supplied.
    #[error("At least one redirect_uri is required")]
    MissingRedirectUri,

    /// A redirect URI is malformed or uses a forbidden form.
    #[error("Invalid redirect_uri '{uri}': {reason}")]
    InvalidRedirectUri {
        /// The offending URI.
        uri: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// Unknown or disallowed grant type.
    #[error("Unsupported grant_type: {0}")]
    UnsupportedGrantType(String),

    /// Unknown or disallowed response type.
    #[error("Unsupported response_type: {0}")]
    UnsupportedResponseType(String),

    /// `authorization_code` requested without the `code` response type.
    #[error("authorization_code grant requires the 'code' response_type")]
    InconsistentResponseTypes,

    /// Unknown token endpoint auth method.
    #[error("Unsupported token_endpoint_auth_method: {0}")]
    UnsupportedAuthMethod(String),
}

impl From<ClientValidationError> for crate::error::AuthError {
    fn from(err: ClientValidationError) -> Self {
        crate::error::AuthError::invalid_client_metadata(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_public_client() -> OAuthClient {
        let now = OffsetDateTime::now_utc();
        OAuthClient {
            client_id: "test-client".to_string(),
            client_secret_hash: None,
            client_name: Some("Test Client".to_string()),
            redirect_uris: vec![
                "https://app.example.com/callback".to_string(),
                "http://localhost:3000/cb".to_string(),
            ],
            grant_types: vec![GrantType::AuthorizationCode, GrantType::RefreshToken],
            response_types: vec![ResponseType::Code],
            token_endpoint_auth_method: TokenEndpointAuthMethod::None,
            scope: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn make_metadata() -> ClientMetadata {
        ClientMetadata {
            redirect_uris: vec!["https://app.example.com/callback".to_string()],
            client_name: Some("Inspector".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_grant_type_parse() {
        assert_eq!(
            GrantType::parse("authorization_code"),
            Some(GrantType::AuthorizationCode)
        );
        assert_eq!(GrantType::parse("refresh_token"), Some(GrantType::RefreshToken));
        assert_eq!(GrantType::parse("password"), None);
        assert_eq!(GrantType::parse("client_credentials"), None);
    }

    #[test]
    fn test_redirect_uri_allowed() {
        let client = make_public_client();
        assert!(client.is_redirect_uri_allowed("https://app.example.com/callback"));
        assert!(client.is_redirect_uri_allowed("http://localhost:4000/cb"));
        assert!(!client.is_redirect_uri_allowed("https://app.example.com/callback/"));
        assert!(!client.is_redirect_uri_allowed("http://evil.com/cb"));
    }

    #[test]
    fn test_client_is_public_without_secret() {
        let client = make_public_client();
        assert!(!client.is_confidential());
        assert!(client.is_grant_type_allowed(GrantType::RefreshToken));
    }

    #[test]
    fn test_metadata_defaults() {
        let validated = make_metadata().validate().unwrap();
        assert_eq!(
            validated.grant_types,
            vec![GrantType::AuthorizationCode, GrantType::RefreshToken]
        );
        assert_eq!(validated.response_types, vec![ResponseType::Code]);
        assert_eq!(
            validated.token_endpoint_auth_method,
            TokenEndpointAuthMethod::ClientSecretBasic
        );
    }

    #[test]
    fn test_metadata_requires_redirect_uri() {
        let metadata = ClientMetadata::default();
        assert_eq!(
            metadata.validate().unwrap_err(),
            ClientValidationError::MissingRedirectUri
        );
    }

    #[test]
    fn test_metadata_rejects_implicit_grant() {
        let mut metadata = make_metadata();
        metadata.grant_types = Some(vec!["implicit".to_string()]);
        assert!(matches!(
            metadata.validate().unwrap_err(),
            ClientValidationError::UnsupportedGrantType(_)
        ));

        let mut metadata = make_metadata();
        metadata.response_types = Some(vec!["token".to_string()]);
        assert!(matches!(
            metadata.validate().unwrap_err(),
            ClientValidationError::UnsupportedResponseType(_)
        ));
    }

    #[test]
    fn test_metadata_rejects_unknown_auth_method() {
        let mut metadata = make_metadata();
        metadata.token_endpoint_auth_method = Some("private_key_jwt".to_string());
        assert!(matches!(
            metadata.validate().unwrap_err(),
            ClientValidationError::UnsupportedAuthMethod(_)
        ));
    }

    #[test]
    fn test_metadata_rejects_fragment_redirect() {
        let mut metadata = make_metadata();
        metadata.redirect_uris = vec!["https://app.example.com/cb#frag".to_string()];
        assert!(matches!(
            metadata.validate().unwrap_err(),
            ClientValidationError::InvalidRedirectUri { .. }
        ));
    }

    #[test]
    fn test_registered_client_omits_secret_for_public() {
        let client = make_public_client();
        let registered = RegisteredClient::from_client(&client, None);
        let json = serde_json::to_value(&registered).unwrap();
        assert!(json.get("client_secret").is_none());
        assert!(json.get("client_secret_expires_at").is_none());
        assert_eq!(json["token_endpoint_auth_method"], "none");
    }
}
