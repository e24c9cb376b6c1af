//! Authorization endpoint request parameters.

use serde::Deserialize;

/// Query parameters of an authorization request.
///
/// Every field is optional at the wire level so that missing parameters can
/// be reported as `invalid_request` instead of a deserialization error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthorizeRequest {
    /// Must be `code`.
    pub response_type: Option<String>,
    /// Registered client identifier.
    pub client_id: Option<String>,
    /// Registered redirect URI.
    pub redirect_uri: Option<String>,
    /// PKCE code challenge.
    pub code_challenge: Option<String>,
    /// PKCE challenge method, must be `S256`.
    pub code_challenge_method: Option<String>,
    /// Opaque client state, echoed back with the code.
    pub state: Option<String>,
    /// Space-delimited scope.
    pub scope: Option<String>,
    /// Resource indicator (RFC 8707).
    pub resource: Option<String>,
}

impl AuthorizeRequest {
    /// Creates a request with the mandatory authorization code parameters.
    #[must_use]
    pub fn code(
        client_id: impl Into<String>,
        redirect_uri: impl Into<String>,
        code_challenge: impl Into<String>,
    ) -> Self {
        Self {
            response_type: Some("code".to_string()),
            client_id: Some(client_id.into()),
            redirect_uri: Some(redirect_uri.into()),
            code_challenge: Some(code_challenge.into()),
            code_challenge_method: Some("S256".to_string()),
            ..Default::default()
        }
    }

    /// Sets the client state.
    #[must_use]
    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    /// Sets the scope.
    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Sets the resource indicator.
    #[must_use]
    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }
}

/// Returns the value if it is present and not blank.
pub(crate) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
