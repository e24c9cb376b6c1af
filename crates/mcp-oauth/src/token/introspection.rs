//! Token introspection (RFC 7662)
//!
//! Resource servers call the introspection endpoint to check an opaque
//! token. Only the client a token was issued to sees its metadata; for every
//! other caller, and for unknown, expired or revoked tokens, the response is
//! exactly `{"active": false}`.
//!
//! # References
//!
//! - [RFC 7662 - OAuth 2.0 Token Introspection](https://tools.ietf.org/html/rfc7662)

use serde::Serialize;

use crate::oauth::client_auth::ClientCredentials;

/// Token introspection request.
#[derive(Debug, Clone)]
pub struct IntrospectionRequest {
    /// The token to introspect.
    pub token: String,

    /// Optional hint about the token type. Unknown hints are ignored.
    pub token_type_hint: Option<String>,

    /// Credentials of the calling client.
    pub credentials: ClientCredentials,
}

/// Token introspection response.
///
/// Inactive responses serialize to `{"active": false}` and nothing else.
#[derive(Debug, Clone, Serialize, Default, PartialEq, Eq)]
pub struct IntrospectionResponse {
    /// Whether the token is currently active.
    pub active: bool,

    /// Space-separated granted scope.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// Client the token was issued to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    /// Human-readable identifier of the resource owner.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// `access_token` or `refresh_token`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,

    /// Expiration time (Unix timestamp).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,

    /// Issued at time (Unix timestamp).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    /// Subject (user id).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Audience, the bound resource.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,

    /// Issuer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    /// Resource indicator the token is bound to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,

    /// Stored user profile.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_profile_id: Option<String>,
}

impl IntrospectionResponse {
    /// Response for any token the caller may not learn about.
    #[must_use]
    pub fn inactive() -> Self {
        Self::default()
    }

    /// Empty active response.
    #[must_use]
    pub fn active() -> Self {
        Self {
            active: true,
            ..Default::default()
        }
    }

    /// Sets the scope.
    #[must_use]
    pub fn with_scope(mut self, scope: Option<String>) -> Self {
        self.scope = scope;
        self
    }

    /// Sets the client ID.
    #[must_use]
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Sets the username.
    #[must_use]
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Sets the token type.
    #[must_use]
    pub fn with_token_type(mut self, token_type: impl Into<String>) -> Self {
        self.token_type = Some(token_type.into());
        self
    }

    /// Sets `iat` and `exp`.
    #[must_use]
    pub fn with_lifetime(mut self, iat: i64, exp: i64) -> Self {
        self.iat = Some(iat);
        self.exp = Some(exp);
        self
    }

    /// Sets the subject.
    #[must_use]
    pub fn with_sub(mut self, sub: impl Into<String>) -> Self {
        self.sub = Some(sub.into());
        self
    }

    /// Sets the bound resource as both `resource` and `aud`.
    #[must_use]
    pub fn with_resource(mut self, resource: Option<String>) -> Self {
        self.aud = resource.clone();
        self.resource = resource;
        self
    }

    /// Sets the issuer.
    #[must_use]
    pub fn with_iss(mut self, iss: impl Into<String>) -> Self {
        self.iss = Some(iss.into());
        self
    }

    /// Sets the user profile id.
    #[must_use]
    pub fn with_user_profile_id(mut self, id: impl Into<String>) -> Self {
        self.user_profile_id = Some(id.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inactive_serializes_to_active_only() {
        let json = serde_json::to_value(IntrospectionResponse::inactive()).unwrap();
        assert_eq!(json, serde_json::json!({ "active": false }));
    }

    #[test]
    fn test_active_response() {
        let response = IntrospectionResponse::active()
            .with_client_id("client-a")
            .with_scope(Some("read".to_string()))
            .with_token_type("access_token")
            .with_sub("github:42")
            .with_resource(Some("https://mcp.example.com".to_string()))
            .with_lifetime(1_700_000_000, 1_700_003_600);

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["active"], true);
        assert_eq!(json["client_id"], "client-a");
        assert_eq!(json["aud"], "https://mcp.example.com");
        assert_eq!(json["resource"], "https://mcp.example.com");
        assert_eq!(json["exp"], 1_700_003_600);
        assert!(json.get("username").is_none());
    }
}
