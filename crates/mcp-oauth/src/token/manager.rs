//! Opaque token issuance, validation, rotation and revocation.
//!
//! Access and refresh tokens are 64 random bytes, base64url encoded. The
//! store only sees their SHA-256 hash.
//!
//! # Refresh token families
//!
//! Every refresh token belongs to a family (one lineage of rotations) and
//! carries a generation counter. Rotation consumes the presented token and
//! issues a new pair in the same family with `generation + 1`. When the store
//! supports used-token markers, presenting a token that was already rotated
//! away is treated as theft: every token in the family is revoked, so both
//! the attacker and the legitimate client lose access and the user has to
//! authorize again.

use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::AuthResult;
use crate::crypto::{fingerprint, hash_token, random_base64url};
use crate::error::AuthError;
use crate::oauth::scope;
use crate::storage::{TokenStorage, UsedRefreshTokenStorage};
use crate::token::revocation::TokenTypeHint;
use crate::types::{
    AccessTokenMetadata, RefreshTokenMetadata, TokenGrant, TokenPair, UsedRefreshToken,
};

/// Random bytes in an access or refresh token.
pub const TOKEN_RANDOM_BYTES: usize = 64;

/// Issues and manages opaque tokens.
pub struct OpaqueTokenManager {
    tokens: Arc<dyn TokenStorage>,
    used: Option<Arc<dyn UsedRefreshTokenStorage>>,
    access_token_lifetime: Duration,
    refresh_token_lifetime: Duration,
}

impl OpaqueTokenManager {
    /// Creates a token manager without reuse detection.
    pub fn new(
        tokens: Arc<dyn TokenStorage>,
        access_token_lifetime: Duration,
        refresh_token_lifetime: Duration,
    ) -> Self {
        Self {
            tokens,
            used: None,
            access_token_lifetime,
            refresh_token_lifetime,
        }
    }

    /// Enables refresh-token reuse detection.
    #[must_use]
    pub fn with_reuse_tracking(mut self, used: Option<Arc<dyn UsedRefreshTokenStorage>>) -> Self {
        self.used = used;
        self
    }

    /// Access token lifetime.
    #[must_use]
    pub fn access_token_lifetime(&self) -> Duration {
        self.access_token_lifetime
    }

    /// Issues a new access/refresh token pair.
    ///
    /// A fresh family is started when `family_id` is `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if either record cannot be stored.
    pub async fn issue(
        &self,
        grant: TokenGrant,
        family_id: Option<String>,
        generation: u32,
    ) -> AuthResult<TokenPair> {
        let access_token = random_base64url(TOKEN_RANDOM_BYTES);
        let refresh_token = random_base64url(TOKEN_RANDOM_BYTES);
        let family_id = family_id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let now = OffsetDateTime::now_utc();

        let access = AccessTokenMetadata {
            user_id: grant.user_id.clone(),
            client_id: grant.client_id.clone(),
            scope: grant.scope.clone(),
            resource: grant.resource.clone(),
            user_profile_id: grant.user_profile_id.clone(),
            family_id: family_id.clone(),
            issued_at: now,
            expires_at: now + self.access_token_lifetime,
        };
        let refresh = RefreshTokenMetadata {
            user_id: grant.user_id,
            client_id: grant.client_id,
            scope: grant.scope,
            resource: grant.resource,
            user_profile_id: grant.user_profile_id,
            family_id,
            generation,
            issued_at: now,
            expires_at: now + self.refresh_token_lifetime,
        };

        self.tokens
            .create_access(&hash_token(&access_token), &access)
            .await?;
        self.tokens
            .create_refresh(&hash_token(&refresh_token), &refresh)
            .await?;

        info!(
            client_id = %refresh.client_id,
            family = %fingerprint(&refresh.family_id),
            generation = refresh.generation,
            access_token = %fingerprint(&access_token),
            "Issued token pair"
        );

        Ok(TokenPair {
            access_token,
            refresh_token,
            token_type: "bearer".to_string(),
            expires_in: self.access_token_lifetime.as_secs(),
            scope: refresh.scope,
        })
    }

    /// Looks up an access token. Expired tokens are deleted and reported absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    pub async fn validate_access(&self, token: &str) -> AuthResult<Option<AccessTokenMetadata>> {
        let hash = hash_token(token);
        let Some(metadata) = self.tokens.find_access(&hash).await? else {
            return Ok(None);
        };
        if metadata.is_expired() {
            self.tokens.delete_access(&hash).await?;
            debug!(token = %fingerprint(token), "Deleted expired access token");
            return Ok(None);
        }
        Ok(Some(metadata))
    }

    /// Looks up a refresh token. Expired tokens are deleted and reported absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    pub async fn validate_refresh(&self, token: &str) -> AuthResult<Option<RefreshTokenMetadata>> {
        let hash = hash_token(token);
        let Some(metadata) = self.tokens.find_refresh(&hash).await? else {
            return Ok(None);
        };
        if metadata.is_expired() {
            self.tokens.delete_refresh(&hash).await?;
            debug!(token = %fingerprint(token), "Deleted expired refresh token");
            return Ok(None);
        }
        Ok(Some(metadata))
    }

    /// Rotates a refresh token.
    ///
    /// `requested_scope`, when given, must be a subset of the original grant
    /// and becomes the scope of the new pair.
    ///
    /// # Errors
    ///
    /// - `InvalidGrant` if the token is unknown, expired, owned by another
    ///   client, or was already used (which also revokes its family)
    /// - `InvalidScope` if `requested_scope` exceeds the grant
    /// - storage errors
    pub async fn rotate(
        &self,
        refresh_token: &str,
        client_id: &str,
        requested_scope: Option<&str>,
    ) -> AuthResult<TokenPair> {
        let hash = hash_token(refresh_token);
        let denied = || AuthError::invalid_grant("Invalid refresh token");

        // 1. Replay of a rotated-away token
        if let Some(used) = &self.used {
            if let Some(marker) = used.find_used(&hash).await? {
                self.reuse_detected(refresh_token, &marker.family_id).await?;
                return Err(denied());
            }
        }

        // 2. Validate without mutating
        let Some(metadata) = self.validate_refresh(refresh_token).await? else {
            return Err(denied());
        };
        if metadata.client_id != client_id {
            warn!(
                client_id = %client_id,
                token = %fingerprint(refresh_token),
                "Refresh token presented by a client that does not own it"
            );
            return Err(denied());
        }
        let new_scope = scope::narrow(requested_scope, metadata.scope.as_deref())?;

        // 3. Consume and reissue
        if let Some(used) = &self.used {
            let marker = UsedRefreshToken {
                family_id: metadata.family_id.clone(),
                client_id: metadata.client_id.clone(),
                generation: metadata.generation,
                used_at: OffsetDateTime::now_utc(),
                expires_at: metadata.expires_at,
            };
            if !used.mark_used(&hash, &marker).await? {
                self.reuse_detected(refresh_token, &metadata.family_id).await?;
                return Err(denied());
            }
        }
        let Some(consumed) = self.tokens.take_refresh(&hash).await? else {
            debug!(token = %fingerprint(refresh_token), "Refresh token consumed concurrently");
            return Err(denied());
        };

        let mut grant = consumed.grant();
        grant.scope = new_scope;
        let next_generation = consumed.generation.saturating_add(1);
        let pair = self
            .issue(grant, Some(consumed.family_id), next_generation)
            .await?;

        info!(
            client_id = %client_id,
            generation = next_generation,
            "Rotated refresh token"
        );
        Ok(pair)
    }

    /// Deletes a token. Best effort: failures are logged and reported as `false`.
    pub async fn revoke(&self, token: &str, kind: TokenTypeHint) -> bool {
        let hash = hash_token(token);
        let result = match kind {
            TokenTypeHint::AccessToken => self.tokens.delete_access(&hash).await,
            TokenTypeHint::RefreshToken => self.tokens.delete_refresh(&hash).await,
        };
        match result {
            Ok(deleted) => {
                if deleted {
                    info!(token = %fingerprint(token), kind = %kind, "Revoked token");
                }
                deleted
            }
            Err(e) => {
                error!(token = %fingerprint(token), kind = %kind, error = %e, "Token revocation failed");
                false
            }
        }
    }

    /// Revokes every token in a family.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    pub async fn revoke_family(&self, family_id: &str) -> AuthResult<u64> {
        self.tokens.revoke_family(family_id).await
    }

    async fn reuse_detected(&self, refresh_token: &str, family_id: &str) -> AuthResult<()> {
        let revoked = self.revoke_family(family_id).await?;
        warn!(
            token = %fingerprint(refresh_token),
            family = %fingerprint(family_id),
            revoked,
            "Refresh token reuse detected, revoked token family"
        );
        Ok(())
    }
}
