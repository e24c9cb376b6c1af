//! Authorization session coordination.
//!
//! An authorization request is parked in an [`OAuthSession`] while the user
//! authenticates at the external identity provider. The session is bound to
//! the browser with an HMAC:
//!
//! ```text
//! session_state = base64url(HMAC-SHA256(hmac_secret, session_id + ":" + nonce))
//! ```
//!
//! `session_state` is sent to the identity provider as its `state` parameter
//! and, together with `session_id`, handed back to the caller as a
//! [`SessionBinding`] to keep on the client side (cookies in the HTTP layer).
//! When the provider redirects back, the caller presents the binding and the
//! stored state must match it exactly. Knowing `session_id` alone is not
//! enough to forge a valid state without the server secret and the nonce.
//!
//! Session lifecycle: created by [`begin`](AuthorizationSessionCoordinator::begin),
//! then deleted on successful redemption, on failed verification, or lazily
//! once expired.

use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::AuthResult;
use crate::crypto::{constant_time_eq, fingerprint, hmac_sha256_base64url, random_base64url};
use crate::error::AuthError;
use crate::oauth::authorize::{AuthorizeRequest, non_empty};
use crate::oauth::pkce::{PkceChallenge, PkceChallengeMethod};
use crate::oauth::registry::ClientRegistry;
use crate::oauth::scope;
use crate::storage::SessionStorage;
use crate::types::{GrantType, OAuthSession};

/// Random bytes in a session id and in a nonce.
const SESSION_RANDOM_BYTES: usize = 32;

/// Client-held half of an authorization session.
///
/// The caller stores this across the identity provider redirect and
/// presents it again on callback.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionBinding {
    /// Session identifier.
    pub session_id: String,
    /// HMAC binding value, also used as the IdP `state`.
    pub session_state: String,
}

impl std::fmt::Debug for SessionBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionBinding")
            .field("session_id", &fingerprint(&self.session_id))
            .field("session_state", &"***")
            .finish()
    }
}

/// Result of starting an authorization flow.
#[derive(Debug, Clone)]
pub struct AuthorizationStart {
    /// Binding to keep on the client side.
    pub binding: SessionBinding,
    /// The persisted session.
    pub session: OAuthSession,
}

impl AuthorizationStart {
    /// The `state` value to send to the identity provider.
    #[must_use]
    pub fn idp_state(&self) -> &str {
        &self.binding.session_state
    }
}

/// Creates authorization sessions and verifies their binding on return.
pub struct AuthorizationSessionCoordinator {
    sessions: Arc<dyn SessionStorage>,
    registry: ClientRegistry,
    resource: String,
    session_lifetime: Duration,
    hmac_secret: Vec<u8>,
}

impl AuthorizationSessionCoordinator {
    /// Creates a coordinator.
    ///
    /// `resource` is the protected-resource identifier that authorization
    /// requests must target.
    pub fn new(
        sessions: Arc<dyn SessionStorage>,
        registry: ClientRegistry,
        resource: impl Into<String>,
        session_lifetime: Duration,
        hmac_secret: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            sessions,
            registry,
            resource: resource.into(),
            session_lifetime,
            hmac_secret: hmac_secret.into(),
        }
    }

    /// Validates an authorization request and opens a session for it.
    ///
    /// # Errors
    ///
    /// - `UnsupportedResponseType` unless `response_type` is `code`
    /// - `InvalidClient` for an unknown client
    /// - `InvalidRequest` for a missing or unregistered redirect URI, or a
    ///   missing, malformed or non-S256 PKCE challenge
    /// - `UnauthorizedClient` if the client may not use the code grant
    /// - `InvalidTarget` if `resource` names a different resource
    /// - storage errors
    pub async fn begin(&self, request: &AuthorizeRequest) -> AuthResult<AuthorizationStart> {
        // 1. Validate response_type
        let response_type = non_empty(request.response_type.as_deref())
            .ok_or_else(|| AuthError::invalid_request("response_type is required"))?;
        if response_type != "code" {
            return Err(AuthError::unsupported_response_type(response_type));
        }

        // 2. Validate client and redirect_uri
        let client_id = non_empty(request.client_id.as_deref())
            .ok_or_else(|| AuthError::invalid_request("client_id is required"))?;
        let client = self
            .registry
            .find(client_id)
            .await?
            .ok_or_else(|| AuthError::invalid_client("Unknown client"))?;

        let redirect_uri = non_empty(request.redirect_uri.as_deref())
            .ok_or_else(|| AuthError::invalid_request("redirect_uri is required"))?;
        if !client.is_redirect_uri_allowed(redirect_uri) {
            warn!(client_id = %client_id, "Authorization request with unregistered redirect_uri");
            return Err(AuthError::invalid_request(
                "redirect_uri is not registered for this client",
            ));
        }

        if !client.is_grant_type_allowed(GrantType::AuthorizationCode) {
            return Err(AuthError::unauthorized_client(
                "Client is not allowed to use the authorization_code grant",
            ));
        }

        // 3. Bind to the protected resource
        let resource = match non_empty(request.resource.as_deref()) {
            Some(resource) if resource != self.resource => {
                return Err(AuthError::invalid_target("Unknown resource"));
            }
            Some(resource) => resource.to_string(),
            None => self.resource.clone(),
        };

        // 4. PKCE is mandatory, S256 only
        let code_challenge = non_empty(request.code_challenge.as_deref())
            .ok_or_else(|| AuthError::invalid_request("code_challenge is required"))?;
        if request.code_challenge_method.as_deref() != Some(PkceChallengeMethod::S256.as_str()) {
            return Err(AuthError::invalid_request(
                "code_challenge_method must be S256",
            ));
        }
        let code_challenge = PkceChallenge::new(code_challenge)
            .map_err(|_| AuthError::invalid_request("Invalid code_challenge"))?;

        // 5. Create the HMAC-bound session
        let session_id = random_base64url(SESSION_RANDOM_BYTES);
        let nonce = random_base64url(SESSION_RANDOM_BYTES);
        let session_state = self.session_state(&session_id, &nonce)?;

        let now = OffsetDateTime::now_utc();
        let session = OAuthSession {
            session_id: session_id.clone(),
            state: session_state.clone(),
            client_id: Some(client.client_id.clone()),
            redirect_uri: Some(redirect_uri.to_string()),
            code_challenge: Some(code_challenge.as_str().to_string()),
            code_challenge_method: Some(PkceChallengeMethod::S256),
            oauth_state: request.state.clone(),
            scope: scope::normalize(request.scope.as_deref()).or_else(|| client.scope.clone()),
            resource: Some(resource),
            created_at: now,
            expires_at: now + self.session_lifetime,
        };
        self.sessions.create(&session).await?;

        debug!(
            client_id = %client.client_id,
            session = %fingerprint(&session_id),
            "Authorization session created"
        );

        Ok(AuthorizationStart {
            binding: SessionBinding {
                session_id,
                session_state,
            },
            session,
        })
    }

    /// Verifies a returning binding and returns its session.
    ///
    /// Any failure deletes the session, so a binding can only be tried once.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::AccessDenied` if the session is missing, expired or
    /// its state does not match, or a storage error.
    pub async fn verify(&self, binding: &SessionBinding) -> AuthResult<OAuthSession> {
        let denied = || AuthError::access_denied("Invalid or expired authorization session");

        let Some(session) = self.sessions.find(&binding.session_id).await? else {
            debug!(session = %fingerprint(&binding.session_id), "Authorization session not found");
            return Err(denied());
        };

        if session.is_expired() {
            self.sessions.delete(&session.session_id).await?;
            debug!(session = %fingerprint(&session.session_id), "Authorization session expired");
            return Err(denied());
        }

        if !constant_time_eq(&session.state, &binding.session_state) {
            self.sessions.delete(&session.session_id).await?;
            warn!(
                session = %fingerprint(&session.session_id),
                client_id = ?session.client_id,
                "Authorization session state mismatch"
            );
            return Err(denied());
        }

        Ok(session)
    }

    /// Deletes a session.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    pub async fn discard(&self, session_id: &str) -> AuthResult<()> {
        self.sessions.delete(session_id).await?;
        Ok(())
    }

    /// Session lifetime, used to size the client-side cookies.
    #[must_use]
    pub fn session_lifetime(&self) -> Duration {
        self.session_lifetime
    }

    fn session_state(&self, session_id: &str, nonce: &str) -> AuthResult<String> {
        hmac_sha256_base64url(&self.hmac_secret, &format!("{session_id}:{nonce}"))
    }
}
