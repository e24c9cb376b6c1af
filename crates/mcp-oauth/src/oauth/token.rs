//! Token endpoint request and error types.
//!
//! # Supported Grant Types
//!
//! - `authorization_code` - Exchange authorization code for tokens
//! - `refresh_token` - Rotate a refresh token

use serde::{Deserialize, Serialize};

use crate::AuthResult;
use crate::error::AuthError;
use crate::oauth::authorize::non_empty;
use crate::oauth::client_auth::ClientCredentials;
use crate::types::GrantType;

/// Token request parameters, as sent in a form or JSON body.
///
/// Different fields are required depending on the `grant_type`:
///
/// - `authorization_code`: code, code_verifier, (optional) redirect_uri, resource
/// - `refresh_token`: refresh_token, (optional) scope
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenRequest {
    /// OAuth 2.0 grant type.
    #[serde(default)]
    pub grant_type: Option<String>,

    /// Authorization code (for authorization_code grant).
    #[serde(default)]
    pub code: Option<String>,

    /// Redirect URI (must match authorization request).
    #[serde(default)]
    pub redirect_uri: Option<String>,

    /// PKCE code verifier (for authorization_code grant).
    #[serde(default)]
    pub code_verifier: Option<String>,

    /// Refresh token (for refresh_token grant).
    #[serde(default)]
    pub refresh_token: Option<String>,

    /// Client ID (for public clients or client_secret_post).
    #[serde(default)]
    pub client_id: Option<String>,

    /// Client secret (for client_secret_post authentication).
    #[serde(default)]
    pub client_secret: Option<String>,

    /// Requested scope (for refresh_token grant, must be subset of original).
    #[serde(default)]
    pub scope: Option<String>,

    /// Resource indicator (RFC 8707).
    #[serde(default)]
    pub resource: Option<String>,

    /// Alias of `resource`, used when `resource` is absent.
    #[serde(default)]
    pub audience: Option<String>,
}

/// Authorization code redemption.
#[derive(Debug, Clone)]
pub struct CodeExchangeRequest {
    /// The authorization code.
    pub code: String,
    /// Redirect URI from the authorization request, if resent.
    pub redirect_uri: Option<String>,
    /// PKCE code verifier.
    pub code_verifier: Option<String>,
    /// Resource indicator, if resent.
    pub resource: Option<String>,
    /// Client credentials.
    pub credentials: ClientCredentials,
}

/// Refresh token rotation.
#[derive(Debug, Clone)]
pub struct RefreshExchangeRequest {
    /// The refresh token being rotated.
    pub refresh_token: String,
    /// Narrower scope, if requested.
    pub scope: Option<String>,
    /// Resource indicator, if resent.
    pub resource: Option<String>,
    /// Client credentials.
    pub credentials: ClientCredentials,
}

/// A token request dispatched by grant type.
#[derive(Debug, Clone)]
pub enum TokenGrantRequest {
    /// `grant_type=authorization_code`
    AuthorizationCode(CodeExchangeRequest),
    /// `grant_type=refresh_token`
    RefreshToken(RefreshExchangeRequest),
}

impl TokenRequest {
    /// Validates the grant-specific parameters.
    ///
    /// `authorization` is the raw `Authorization` header, if any.
    ///
    /// # Errors
    ///
    /// - `InvalidRequest` if `grant_type` or a required parameter is missing
    /// - `UnsupportedGrantType` for any other grant type
    pub fn into_grant(self, authorization: Option<&str>) -> AuthResult<TokenGrantRequest> {
        let credentials = ClientCredentials::resolve(
            authorization,
            self.client_id.as_deref(),
            self.client_secret.as_deref(),
        );
        let resource = non_empty(self.resource.as_deref())
            .or_else(|| non_empty(self.audience.as_deref()))
            .map(str::to_string);

        let grant_type = non_empty(self.grant_type.as_deref())
            .ok_or_else(|| AuthError::invalid_request("grant_type is required"))?;

        match GrantType::parse(grant_type) {
            Some(GrantType::AuthorizationCode) => {
                let code = required(self.code.as_deref(), "code")?;
                Ok(TokenGrantRequest::AuthorizationCode(CodeExchangeRequest {
                    code,
                    redirect_uri: non_empty(self.redirect_uri.as_deref()).map(str::to_string),
                    code_verifier: non_empty(self.code_verifier.as_deref()).map(str::to_string),
                    resource,
                    credentials,
                }))
            }
            Some(GrantType::RefreshToken) => {
                let refresh_token = required(self.refresh_token.as_deref(), "refresh_token")?;
                Ok(TokenGrantRequest::RefreshToken(RefreshExchangeRequest {
                    refresh_token,
                    scope: non_empty(self.scope.as_deref()).map(str::to_string),
                    resource,
                    credentials,
                }))
            }
            None => Err(AuthError::unsupported_grant_type(grant_type)),
        }
    }
}

fn required(value: Option<&str>, name: &str) -> AuthResult<String> {
    non_empty(value)
        .map(str::to_string)
        .ok_or_else(|| AuthError::invalid_request(format!("{name} is required")))
}

/// OAuth 2.0 error response body.
///
/// ```json
/// {
///   "error": "invalid_grant",
///   "error_description": "Invalid authorization code"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenError {
    /// OAuth 2.0 error code.
    pub error: String,

    /// Human-readable error description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
}

impl From<&AuthError> for TokenError {
    fn from(err: &AuthError) -> Self {
        Self {
            error: err.oauth_error_code().to_string(),
            error_description: Some(err.public_description()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_request_deserialization() {
        let json = r#"{
            "grant_type": "authorization_code",
            "code": "SplxlOBeZQQYbYS6WxSbIA",
            "redirect_uri": "https://app.example.com/callback",
            "code_verifier": "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk",
            "client_id": "my-app"
        }"#;

        let request: TokenRequest = serde_json::from_str(json).unwrap();
        let TokenGrantRequest::AuthorizationCode(exchange) = request.into_grant(None).unwrap()
        else {
            panic!("expected authorization_code grant");
        };
        assert_eq!(exchange.code, "SplxlOBeZQQYbYS6WxSbIA");
        assert_eq!(
            exchange.code_verifier.as_deref(),
            Some("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk")
        );
        assert_eq!(exchange.credentials, ClientCredentials::public("my-app"));
    }

    #[test]
    fn test_audience_is_resource_alias() {
        let request = TokenRequest {
            grant_type: Some("refresh_token".to_string()),
            refresh_token: Some("rt".to_string()),
            audience: Some("https://mcp.example.com".to_string()),
            ..Default::default()
        };
        let TokenGrantRequest::RefreshToken(refresh) = request.into_grant(None).unwrap() else {
            panic!("expected refresh_token grant");
        };
        assert_eq!(refresh.resource.as_deref(), Some("https://mcp.example.com"));
    }

    #[test]
    fn test_missing_parameters() {
        let err = TokenRequest::default().into_grant(None).unwrap_err();
        assert_eq!(err.oauth_error_code(), "invalid_request");

        let request = TokenRequest {
            grant_type: Some("authorization_code".to_string()),
            code: Some(String::new()),
            ..Default::default()
        };
        let err = request.into_grant(None).unwrap_err();
        assert_eq!(err.oauth_error_code(), "invalid_request");
    }

    #[test]
    fn test_unsupported_grant_type() {
        let request = TokenRequest {
            grant_type: Some("password".to_string()),
            ..Default::default()
        };
        let err = request.into_grant(None).unwrap_err();
        assert_eq!(err.oauth_error_code(), "unsupported_grant_type");
    }

    #[test]
    fn test_error_body_hides_server_details() {
        let body = TokenError::from(&AuthError::storage("connection refused to 10.0.0.5"));
        assert_eq!(body.error, "server_error");
        assert_eq!(body.error_description.as_deref(), Some("Internal server error"));
    }
}
