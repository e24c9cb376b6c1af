//! Authorization code exchange engine.
//!
//! Drives the flow once the user is back from the identity provider:
//!
//! 1. [`complete_authentication`](AuthorizationCodeExchangeEngine::complete_authentication)
//!    turns a verified session plus an external identity into a single-use
//!    authorization code and the client redirect.
//! 2. [`exchange_code`](AuthorizationCodeExchangeEngine::exchange_code)
//!    redeems the code for a token pair after client authentication and PKCE.
//! 3. [`exchange_refresh_token`](AuthorizationCodeExchangeEngine::exchange_refresh_token)
//!    rotates a refresh token.
//!
//! Introspection and revocation policy lives here too. Neither ever returns
//! an error: every failure collapses to `{"active": false}` or a silent
//! no-op, so they cannot be used to probe for tokens.

use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use tracing::{debug, error, info, warn};
use url::Url;
use uuid::Uuid;

use crate::AuthResult;
use crate::cipher::TokenCipher;
use crate::crypto::{fingerprint, random_base64url};
use crate::error::AuthError;
use crate::oauth::client_auth::ClientCredentials;
use crate::oauth::pkce::{PkceChallengeMethod, verify_code_verifier};
use crate::oauth::registry::ClientRegistry;
use crate::oauth::session::{AuthorizationSessionCoordinator, SessionBinding};
use crate::oauth::token::{CodeExchangeRequest, RefreshExchangeRequest};
use crate::storage::{AuthorizationCodeStorage, UserProfileStorage};
use crate::token::{
    IntrospectionRequest, IntrospectionResponse, OpaqueTokenManager, RevocationRequest,
    TokenTypeHint,
};
use crate::types::{
    AccessTokenMetadata, AuthorizationCode, ExternalIdentity, GrantType, OAuthSession,
    RefreshTokenMetadata, TokenGrant, TokenPair, UserProfile,
};

/// Random bytes in an authorization code.
const AUTHORIZATION_CODE_BYTES: usize = 32;

/// Orchestrates code issuance, code and refresh exchange, introspection and
/// revocation.
pub struct AuthorizationCodeExchangeEngine {
    sessions: Arc<AuthorizationSessionCoordinator>,
    registry: ClientRegistry,
    tokens: Arc<OpaqueTokenManager>,
    codes: Arc<dyn AuthorizationCodeStorage>,
    users: Arc<dyn UserProfileStorage>,
    cipher: Option<Arc<dyn TokenCipher>>,
    code_lifetime: Duration,
    allow_plain_pkce: bool,
    issuer: Option<String>,
}

impl AuthorizationCodeExchangeEngine {
    /// Creates an engine.
    pub fn new(
        sessions: Arc<AuthorizationSessionCoordinator>,
        registry: ClientRegistry,
        tokens: Arc<OpaqueTokenManager>,
        codes: Arc<dyn AuthorizationCodeStorage>,
        users: Arc<dyn UserProfileStorage>,
        code_lifetime: Duration,
    ) -> Self {
        Self {
            sessions,
            registry,
            tokens,
            codes,
            users,
            cipher: None,
            code_lifetime,
            allow_plain_pkce: false,
            issuer: None,
        }
    }

    /// Sets the cipher for provider tokens. Without one, provider tokens are
    /// not persisted at all.
    #[must_use]
    pub fn with_token_cipher(mut self, cipher: Arc<dyn TokenCipher>) -> Self {
        self.cipher = Some(cipher);
        self
    }

    /// Accepts codes bound to a `plain` PKCE challenge.
    #[must_use]
    pub fn with_plain_pkce(mut self, allow: bool) -> Self {
        self.allow_plain_pkce = allow;
        self
    }

    /// Sets the `iss` reported by introspection.
    #[must_use]
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    /// Completes a successful identity provider login.
    ///
    /// Returns the client redirect URL carrying `code` and the client's
    /// original `state`.
    ///
    /// # Errors
    ///
    /// - `AccessDenied` if the binding does not verify or the session is
    ///   incomplete
    /// - cipher, storage or internal errors
    pub async fn complete_authentication(
        &self,
        binding: &SessionBinding,
        identity: ExternalIdentity,
    ) -> AuthResult<String> {
        let session = self.sessions.verify(binding).await?;
        let pending = match PendingAuthorization::from_session(&session) {
            Some(pending) => pending,
            None => {
                self.sessions.discard(&session.session_id).await?;
                warn!(
                    session = %fingerprint(&session.session_id),
                    "Authorization session is incomplete"
                );
                return Err(AuthError::access_denied(
                    "Invalid or expired authorization session",
                ));
            }
        };

        let profile = self.upsert_profile(identity).await?;

        let code = AuthorizationCode {
            code: random_base64url(AUTHORIZATION_CODE_BYTES),
            user_id: profile.user_id.clone(),
            client_id: pending.client_id.to_string(),
            redirect_uri: pending.redirect_uri.to_string(),
            code_challenge: pending.code_challenge.to_string(),
            code_challenge_method: pending.code_challenge_method,
            resource: session.resource.clone(),
            scope: session.scope.clone(),
            user_profile_id: profile.profile_id.clone(),
            expires_at: OffsetDateTime::now_utc() + self.code_lifetime,
        };
        self.codes.create(&code).await?;
        self.sessions.discard(&session.session_id).await?;

        info!(
            client_id = %code.client_id,
            user_id = %code.user_id,
            code = %fingerprint(&code.code),
            "Issued authorization code"
        );

        let mut params = vec![("code", code.code.as_str())];
        if let Some(state) = session.oauth_state.as_deref() {
            params.push(("state", state));
        }
        client_redirect(pending.redirect_uri, &params)
    }

    /// Ends a flow the identity provider rejected.
    ///
    /// The session is verified and deleted, and the client is sent back with
    /// `error=access_denied`.
    ///
    /// # Errors
    ///
    /// Returns `AccessDenied` if the binding does not verify, or a storage
    /// error.
    pub async fn fail_authentication(&self, binding: &SessionBinding) -> AuthResult<String> {
        let session = self.sessions.verify(binding).await?;
        self.sessions.discard(&session.session_id).await?;

        let Some(redirect_uri) = session.redirect_uri.as_deref() else {
            return Err(AuthError::access_denied(
                "Invalid or expired authorization session",
            ));
        };
        debug!(client_id = ?session.client_id, "Identity provider denied authorization");

        let mut params = vec![
            ("error", "access_denied"),
            ("error_description", "The user or identity provider denied the request"),
        ];
        if let Some(state) = session.oauth_state.as_deref() {
            params.push(("state", state));
        }
        client_redirect(redirect_uri, &params)
    }

    /// Redeems an authorization code.
    ///
    /// # Errors
    ///
    /// - `InvalidClient` if client authentication fails
    /// - `InvalidRequest` if `code_verifier` is missing
    /// - `InvalidGrant` for every code, binding or PKCE failure, with one
    ///   generic message
    /// - `UnauthorizedClient` if the client may not use the code grant
    /// - storage errors
    pub async fn exchange_code(&self, request: CodeExchangeRequest) -> AuthResult<TokenPair> {
        let client_id = request.credentials.require_client_id()?;
        let denied = || AuthError::invalid_grant("Invalid authorization code");

        // 1. Code lookup and expiry
        let Some(code) = self.codes.find(&request.code).await? else {
            debug!(code = %fingerprint(&request.code), "Unknown authorization code");
            return Err(denied());
        };
        if code.is_expired() {
            self.codes.delete(&request.code).await?;
            debug!(code = %fingerprint(&request.code), "Authorization code expired");
            return Err(denied());
        }
        if code.client_id != client_id {
            warn!(
                client_id = %client_id,
                code = %fingerprint(&request.code),
                "Authorization code presented by another client"
            );
            return Err(denied());
        }

        // 2. Resource and redirect binding
        let Some(resource) = code.resource.as_deref() else {
            return Err(denied());
        };
        if request
            .resource
            .as_deref()
            .is_some_and(|requested| requested != resource)
        {
            return Err(denied());
        }
        if request
            .redirect_uri
            .as_deref()
            .is_some_and(|uri| uri != code.redirect_uri)
        {
            return Err(denied());
        }

        // 3. Client authentication
        let client = self
            .registry
            .authenticate(client_id, request.credentials.secret())
            .await?;
        if !client.is_grant_type_allowed(GrantType::AuthorizationCode) {
            return Err(AuthError::unauthorized_client(
                "Client is not allowed to use the authorization_code grant",
            ));
        }

        // 4. PKCE
        let verifier = request
            .code_verifier
            .as_deref()
            .ok_or_else(|| AuthError::invalid_request("code_verifier is required"))?;
        if code.code_challenge_method == PkceChallengeMethod::Plain && !self.allow_plain_pkce {
            return Err(denied());
        }
        if verify_code_verifier(verifier, &code.code_challenge, code.code_challenge_method)
            .is_err()
        {
            warn!(client_id = %client_id, "PKCE verification failed");
            return Err(denied());
        }

        // 5. Single-use redemption
        let Some(code) = self.codes.take(&request.code).await? else {
            warn!(
                client_id = %client_id,
                code = %fingerprint(&request.code),
                "Authorization code redeemed concurrently"
            );
            return Err(denied());
        };

        let grant = TokenGrant {
            user_id: code.user_id,
            client_id: code.client_id,
            scope: code.scope,
            resource: code.resource,
            user_profile_id: code.user_profile_id,
        };
        self.tokens.issue(grant, None, 0).await
    }

    /// Rotates a refresh token.
    ///
    /// # Errors
    ///
    /// - `InvalidClient` if client authentication fails
    /// - `UnauthorizedClient` if the client may not use refresh tokens
    /// - `InvalidGrant` for unknown, expired, foreign or reused tokens, or a
    ///   resource that differs from the grant
    /// - `InvalidScope` if the requested scope exceeds the grant
    /// - storage errors
    pub async fn exchange_refresh_token(
        &self,
        request: RefreshExchangeRequest,
    ) -> AuthResult<TokenPair> {
        let client_id = request.credentials.require_client_id()?;
        let client = self
            .registry
            .authenticate(client_id, request.credentials.secret())
            .await?;
        if !client.is_grant_type_allowed(GrantType::RefreshToken) {
            return Err(AuthError::unauthorized_client(
                "Client is not allowed to use the refresh_token grant",
            ));
        }

        if let Some(requested) = request.resource.as_deref() {
            let current = self.tokens.validate_refresh(&request.refresh_token).await?;
            if current.is_some_and(|meta| meta.resource.as_deref() != Some(requested)) {
                return Err(AuthError::invalid_grant("Invalid refresh token"));
            }
        }

        self.tokens
            .rotate(&request.refresh_token, client_id, request.scope.as_deref())
            .await
    }

    /// Introspects a token on behalf of an authenticated client.
    pub async fn introspect(&self, request: &IntrospectionRequest) -> IntrospectionResponse {
        let Some(client_id) = self.authenticate_quietly(&request.credentials).await else {
            return IntrospectionResponse::inactive();
        };

        let Some((kind, record)) = self
            .find_token(&request.token, request.token_type_hint.as_deref())
            .await
        else {
            return IntrospectionResponse::inactive();
        };

        if record.client_id != client_id {
            debug!(
                client_id = %client_id,
                token = %fingerprint(&request.token),
                "Introspection of a token owned by another client"
            );
            return IntrospectionResponse::inactive();
        }

        let username = self.username(&record).await;
        let mut response = IntrospectionResponse::active()
            .with_scope(record.scope)
            .with_client_id(record.client_id)
            .with_username(username)
            .with_token_type(kind.as_str())
            .with_sub(record.user_id)
            .with_resource(record.resource)
            .with_user_profile_id(record.user_profile_id)
            .with_lifetime(
                record.issued_at.unix_timestamp(),
                record.expires_at.unix_timestamp(),
            );
        if let Some(issuer) = &self.issuer {
            response = response.with_iss(issuer.clone());
        }
        response
    }

    /// Revokes a token on behalf of an authenticated client.
    ///
    /// Always completes. Tokens the caller does not own are left alone, and
    /// revoking a refresh token removes only that token.
    pub async fn revoke(&self, request: &RevocationRequest) {
        let Some(client_id) = self.authenticate_quietly(&request.credentials).await else {
            return;
        };

        let Some((kind, record)) = self
            .find_token(&request.token, request.token_type_hint.as_deref())
            .await
        else {
            return;
        };

        if record.client_id != client_id {
            warn!(
                client_id = %client_id,
                token = %fingerprint(&request.token),
                "Revocation of a token owned by another client ignored"
            );
            return;
        }

        self.tokens.revoke(&request.token, kind).await;
    }

    async fn upsert_profile(&self, identity: ExternalIdentity) -> AuthResult<UserProfile> {
        let (encrypted_access_token, encrypted_refresh_token, provider_token_expires_at) =
            match (&identity.tokens, &self.cipher) {
                (Some(tokens), Some(cipher)) => {
                    let access = cipher.encrypt(&tokens.access_token).await?;
                    let refresh = match tokens.refresh_token.as_deref() {
                        Some(refresh) => Some(cipher.encrypt(refresh).await?),
                        None => None,
                    };
                    (Some(access), refresh, tokens.expires_at)
                }
                (Some(_), None) => {
                    debug!(
                        provider = %identity.provider,
                        "No token cipher configured, provider tokens not stored"
                    );
                    (None, None, None)
                }
                (None, _) => (None, None, None),
            };

        let now = OffsetDateTime::now_utc();
        let profile = UserProfile {
            profile_id: Uuid::new_v4().to_string(),
            user_id: identity.user_id(),
            provider: identity.provider,
            provider_user_id: identity.provider_user_id,
            username: identity.username,
            email: identity.email,
            display_name: identity.display_name,
            avatar_url: identity.avatar_url,
            raw_profile: identity.raw_profile,
            encrypted_access_token,
            encrypted_refresh_token,
            provider_token_expires_at,
            created_at: now,
            updated_at: now,
        };
        self.users.upsert(&profile).await
    }

    /// Authenticates a caller, absorbing every failure.
    async fn authenticate_quietly(
        &self,
        credentials: &ClientCredentials,
    ) -> Option<String> {
        let client_id = credentials.client_id.as_deref()?;
        match self
            .registry
            .authenticate(client_id, credentials.secret())
            .await
        {
            Ok(client) => Some(client.client_id),
            Err(e) if e.is_server_error() => {
                error!(client_id = %client_id, error = %e, "Client authentication failed");
                None
            }
            Err(_) => None,
        }
    }

    /// Looks a token up in hint order, absorbing storage failures.
    async fn find_token(
        &self,
        token: &str,
        hint: Option<&str>,
    ) -> Option<(TokenTypeHint, TokenRecord)> {
        for kind in TokenTypeHint::lookup_order(hint) {
            let found = match kind {
                TokenTypeHint::AccessToken => self
                    .tokens
                    .validate_access(token)
                    .await
                    .map(|meta| meta.map(TokenRecord::from)),
                TokenTypeHint::RefreshToken => self
                    .tokens
                    .validate_refresh(token)
                    .await
                    .map(|meta| meta.map(TokenRecord::from)),
            };
            match found {
                Ok(Some(record)) => return Some((kind, record)),
                Ok(None) => continue,
                Err(e) => {
                    error!(token = %fingerprint(token), kind = %kind, error = %e, "Token lookup failed");
                    return None;
                }
            }
        }
        None
    }

    async fn username(&self, record: &TokenRecord) -> String {
        match self.users.find_by_id(&record.user_profile_id).await {
            Ok(Some(profile)) => profile.username.unwrap_or_else(|| record.user_id.clone()),
            Ok(None) => record.user_id.clone(),
            Err(e) => {
                error!(error = %e, "User profile lookup failed");
                record.user_id.clone()
            }
        }
    }
}

/// Session fields that must all be present to issue a code.
struct PendingAuthorization<'a> {
    client_id: &'a str,
    redirect_uri: &'a str,
    code_challenge: &'a str,
    code_challenge_method: PkceChallengeMethod,
}

impl<'a> PendingAuthorization<'a> {
    fn from_session(session: &'a OAuthSession) -> Option<Self> {
        Some(Self {
            client_id: session.client_id.as_deref()?,
            redirect_uri: session.redirect_uri.as_deref()?,
            code_challenge: session.code_challenge.as_deref()?,
            code_challenge_method: session.code_challenge_method?,
        })
    }
}

/// Token fields shared by access and refresh tokens.
struct TokenRecord {
    user_id: String,
    client_id: String,
    scope: Option<String>,
    resource: Option<String>,
    user_profile_id: String,
    issued_at: OffsetDateTime,
    expires_at: OffsetDateTime,
}

impl From<AccessTokenMetadata> for TokenRecord {
    fn from(meta: AccessTokenMetadata) -> Self {
        Self {
            user_id: meta.user_id,
            client_id: meta.client_id,
            scope: meta.scope,
            resource: meta.resource,
            user_profile_id: meta.user_profile_id,
            issued_at: meta.issued_at,
            expires_at: meta.expires_at,
        }
    }
}

impl From<RefreshTokenMetadata> for TokenRecord {
    fn from(meta: RefreshTokenMetadata) -> Self {
        Self {
            user_id: meta.user_id,
            client_id: meta.client_id,
            scope: meta.scope,
            resource: meta.resource,
            user_profile_id: meta.user_profile_id,
            issued_at: meta.issued_at,
            expires_at: meta.expires_at,
        }
    }
}

fn client_redirect(redirect_uri: &str, params: &[(&str, &str)]) -> AuthResult<String> {
    let mut url = Url::parse(redirect_uri)
        .map_err(|e| AuthError::internal(format!("Stored redirect_uri is invalid: {e}")))?;
    {
        let mut query = url.query_pairs_mut();
        for (name, value) in params {
            query.append_pair(name, value);
        }
    }
    Ok(url.into())
}
