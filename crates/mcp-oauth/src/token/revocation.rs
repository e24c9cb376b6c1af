//! Token revocation (RFC 7009)
//!
//! The revocation endpoint always answers 200 OK once the client has
//! authenticated, whether or not the token existed, so it cannot be used to
//! probe for valid tokens. A client can only revoke tokens issued to it.
//!
//! # References
//!
//! - [RFC 7009 - OAuth 2.0 Token Revocation](https://tools.ietf.org/html/rfc7009)

use serde::{Deserialize, Serialize};

use crate::oauth::client_auth::ClientCredentials;

/// Token revocation request.
#[derive(Debug, Clone)]
pub struct RevocationRequest {
    /// The token to revoke.
    pub token: String,

    /// Optional hint about the token type. Unknown hints are ignored.
    pub token_type_hint: Option<String>,

    /// Credentials of the calling client.
    pub credentials: ClientCredentials,
}

/// Kind of opaque token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenTypeHint {
    /// The token is an access token.
    AccessToken,
    /// The token is a refresh token.
    RefreshToken,
}

impl TokenTypeHint {
    /// Parses a `token_type_hint` value. Unknown values yield `None`.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "access_token" => Some(Self::AccessToken),
            "refresh_token" => Some(Self::RefreshToken),
            _ => None,
        }
    }

    /// Returns the token type hint as a string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AccessToken => "access_token",
            Self::RefreshToken => "refresh_token",
        }
    }

    /// The other kind of token.
    #[must_use]
    pub fn other(self) -> Self {
        match self {
            Self::AccessToken => Self::RefreshToken,
            Self::RefreshToken => Self::AccessToken,
        }
    }

    /// Lookup order for a request carrying `hint`.
    ///
    /// The hinted kind is tried first; without a usable hint, access tokens
    /// are tried before refresh tokens.
    #[must_use]
    pub fn lookup_order(hint: Option<&str>) -> [Self; 2] {
        let first = hint.and_then(Self::parse).unwrap_or(Self::AccessToken);
        [first, first.other()]
    }
}

impl std::fmt::Display for TokenTypeHint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!(
            TokenTypeHint::parse("access_token"),
            Some(TokenTypeHint::AccessToken)
        );
        assert_eq!(
            TokenTypeHint::parse("refresh_token"),
            Some(TokenTypeHint::RefreshToken)
        );
        assert_eq!(TokenTypeHint::parse("id_token"), None);
    }

    #[test]
    fn test_lookup_order() {
        assert_eq!(
            TokenTypeHint::lookup_order(Some("refresh_token")),
            [TokenTypeHint::RefreshToken, TokenTypeHint::AccessToken]
        );
        assert_eq!(
            TokenTypeHint::lookup_order(None),
            [TokenTypeHint::AccessToken, TokenTypeHint::RefreshToken]
        );
        assert_eq!(
            TokenTypeHint::lookup_order(Some("bogus")),
            [TokenTypeHint::AccessToken, TokenTypeHint::RefreshToken]
        );
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&TokenTypeHint::RefreshToken).unwrap();
        assert_eq!(json, "\"refresh_token\"");
    }
}
