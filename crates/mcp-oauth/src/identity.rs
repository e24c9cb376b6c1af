//! External identity provider adapter.
//!
//! The authorization server never authenticates users itself. It sends the
//! browser to an upstream provider (GitHub, Google, an enterprise OIDC
//! issuer, ...) and trusts the identity the adapter returns on callback.
//!
//! # Flow
//!
//! 1. **Start** - [`IdentityProvider::authorization_url`] builds the upstream
//!    URL; the session state is passed as the upstream `state`.
//! 2. **Callback** - the provider redirects to the callback endpoint with
//!    [`CallbackParams`].
//! 3. **Authenticate** - [`IdentityProvider::authenticate`] redeems the
//!    upstream code and maps the user to an [`ExternalIdentity`].

use async_trait::async_trait;
use serde::Deserialize;

use crate::AuthResult;
use crate::types::ExternalIdentity;

/// Query parameters the identity provider sends back to the callback.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    /// Upstream authorization code.
    #[serde(default)]
    pub code: Option<String>,
    /// Echo of the session state.
    #[serde(default)]
    pub state: Option<String>,
    /// Upstream error code, e.g. `access_denied`.
    #[serde(default)]
    pub error: Option<String>,
    /// Upstream error description.
    #[serde(default)]
    pub error_description: Option<String>,
}

impl CallbackParams {
    /// Returns `true` if the provider reported an error or sent no code.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.error.is_some() || self.code.as_deref().is_none_or(str::is_empty)
    }
}

/// Adapter for one upstream identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Provider name, used as the namespace of user ids (`name:user_id`).
    fn name(&self) -> &str;

    /// Builds the URL the browser is sent to.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider configuration cannot produce a URL.
    fn authorization_url(&self, state: &str, callback_url: &str) -> AuthResult<String>;

    /// Redeems the callback and returns the authenticated user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::IdentityProvider` when the upstream exchange or
    /// profile fetch fails.
    async fn authenticate(
        &self,
        callback: &CallbackParams,
        callback_url: &str,
    ) -> AuthResult<ExternalIdentity>;
}
