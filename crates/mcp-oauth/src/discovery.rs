//! Discovery documents.
//!
//! - Authorization server metadata, served at
//!   `/.well-known/oauth-authorization-server` (RFC 8414)
//! - Protected resource metadata, served at
//!   `/.well-known/oauth-protected-resource` (RFC 9728)
//!
//! MCP clients start from the protected resource document to find the
//! authorization server, then read its metadata to find the endpoints.

use serde::Serialize;

use crate::config::AuthConfig;

/// Authorization endpoint path, relative to `base_path`.
pub const AUTHORIZE_PATH: &str = "/authorize";
/// Identity provider callback path, relative to `base_path`.
pub const CALLBACK_PATH: &str = "/callback";
/// Token endpoint path, relative to `base_path`.
pub const TOKEN_PATH: &str = "/token";
/// Introspection endpoint path, relative to `base_path`.
pub const INTROSPECT_PATH: &str = "/introspect";
/// Revocation endpoint path, relative to `base_path`.
pub const REVOKE_PATH: &str = "/revoke";
/// Registration endpoint path, relative to `base_path`.
pub const REGISTER_PATH: &str = "/register";

/// Authorization server metadata document.
///
/// # Example Response
///
/// ```json
/// {
///   "issuer": "https://auth.example.com",
///   "authorization_endpoint": "https://auth.example.com/oauth/authorize",
///   "token_endpoint": "https://auth.example.com/oauth/token",
///   "response_types_supported": ["code"],
///   "grant_types_supported": ["authorization_code", "refresh_token"],
///   "code_challenge_methods_supported": ["S256"]
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationServerMetadata {
    /// Issuer URL.
    pub issuer: String,

    /// URL of the authorization endpoint.
    pub authorization_endpoint: String,

    /// URL of the token endpoint.
    pub token_endpoint: String,

    /// URL of the registration endpoint, when registration is enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration_endpoint: Option<String>,

    /// URL of the revocation endpoint.
    pub revocation_endpoint: String,

    /// URL of the introspection endpoint.
    pub introspection_endpoint: String,

    /// Always `["code"]`.
    pub response_types_supported: Vec<String>,

    /// Supported grant types.
    pub grant_types_supported: Vec<String>,

    /// Always `["S256"]`.
    pub code_challenge_methods_supported: Vec<String>,

    /// Client authentication methods accepted at the token endpoint.
    pub token_endpoint_auth_methods_supported: Vec<String>,

    /// Client authentication methods accepted at the revocation endpoint.
    pub revocation_endpoint_auth_methods_supported: Vec<String>,

    /// Client authentication methods accepted at the introspection endpoint.
    pub introspection_endpoint_auth_methods_supported: Vec<String>,

    /// Advertised scopes.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub scopes_supported: Vec<String>,
}

impl AuthorizationServerMetadata {
    /// Builds the document from configuration.
    #[must_use]
    pub fn build(config: &AuthConfig) -> Self {
        let auth_methods: Vec<String> = ["none", "client_secret_basic", "client_secret_post"]
            .into_iter()
            .map(String::from)
            .collect();

        Self {
            issuer: config.issuer_url().to_string(),
            authorization_endpoint: config.endpoint_url(AUTHORIZE_PATH),
            token_endpoint: config.endpoint_url(TOKEN_PATH),
            registration_endpoint: config
                .registration
                .enabled
                .then(|| config.endpoint_url(REGISTER_PATH)),
            revocation_endpoint: config.endpoint_url(REVOKE_PATH),
            introspection_endpoint: config.endpoint_url(INTROSPECT_PATH),
            response_types_supported: vec!["code".to_string()],
            grant_types_supported: vec![
                "authorization_code".to_string(),
                "refresh_token".to_string(),
            ],
            code_challenge_methods_supported: vec!["S256".to_string()],
            revocation_endpoint_auth_methods_supported: auth_methods.clone(),
            introspection_endpoint_auth_methods_supported: auth_methods.clone(),
            token_endpoint_auth_methods_supported: auth_methods,
            scopes_supported: config.discovery.scopes_supported.clone(),
        }
    }
}

/// Protected resource metadata document.
#[derive(Debug, Clone, Serialize)]
pub struct ProtectedResourceMetadata {
    /// Resource identifier.
    pub resource: String,

    /// Authorization servers that issue tokens for this resource.
    pub authorization_servers: Vec<String>,

    /// Advertised scopes.
    pub scopes_supported: Vec<String>,

    /// Always `["header"]`.
    pub bearer_methods_supported: Vec<String>,

    /// Human-readable documentation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_documentation: Option<String>,
}

impl ProtectedResourceMetadata {
    /// Builds the document from configuration.
    #[must_use]
    pub fn build(config: &AuthConfig) -> Self {
        Self {
            resource: config.resource.clone(),
            authorization_servers: vec![config.issuer_url().to_string()],
            scopes_supported: config.discovery.scopes_supported.clone(),
            bearer_methods_supported: vec!["header".to_string()],
            resource_documentation: config.discovery.resource_documentation.clone(),
        }
    }
}
