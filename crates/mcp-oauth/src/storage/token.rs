//! Opaque token storage traits.
//!
//! All keys are SHA-256 hashes of the token value, never the token itself.

use async_trait::async_trait;

use crate::AuthResult;
use crate::types::{AccessTokenMetadata, RefreshTokenMetadata, UsedRefreshToken};

/// Storage trait for access and refresh tokens.
///
/// # Atomicity
///
/// [`take_refresh`](Self::take_refresh) must fetch and delete in one step so
/// that two concurrent rotations of the same refresh token cannot both
/// succeed.
#[async_trait]
pub trait TokenStorage: Send + Sync {
    /// Stores an access token record.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn create_access(
        &self,
        token_hash: &str,
        metadata: &AccessTokenMetadata,
    ) -> AuthResult<()>;

    /// Finds an access token record. Expired records are returned as stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_access(&self, token_hash: &str) -> AuthResult<Option<AccessTokenMetadata>>;

    /// Deletes an access token record.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn delete_access(&self, token_hash: &str) -> AuthResult<bool>;

    /// Stores a refresh token record.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn create_refresh(
        &self,
        token_hash: &str,
        metadata: &RefreshTokenMetadata,
    ) -> AuthResult<()>;

    /// Finds a refresh token record. Expired records are returned as stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_refresh(&self, token_hash: &str) -> AuthResult<Option<RefreshTokenMetadata>>;

    /// Atomically removes and returns a refresh token record.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn take_refresh(&self, token_hash: &str) -> AuthResult<Option<RefreshTokenMetadata>>;

    /// Deletes a refresh token record.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn delete_refresh(&self, token_hash: &str) -> AuthResult<bool>;

    /// Deletes every access and refresh token issued under a family.
    ///
    /// # Returns
    ///
    /// Returns the number of records deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn revoke_family(&self, family_id: &str) -> AuthResult<u64>;

    /// Deletes expired access and refresh token records.
    ///
    /// # Errors
    ///
    /// Returns an error if the cleanup operation fails.
    async fn cleanup_expired(&self) -> AuthResult<u64>;
}

/// Optional capability: markers for refresh tokens that were rotated away.
///
/// Stores without this capability still rotate tokens, but cannot tell a
/// replayed token from an unknown one and so never revoke the family.
#[async_trait]
pub trait UsedRefreshTokenStorage: Send + Sync {
    /// Records that a refresh token was used.
    ///
    /// This is a test-and-set: it returns `true` if the marker was created
    /// and `false` if the token was already marked.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn mark_used(&self, token_hash: &str, marker: &UsedRefreshToken) -> AuthResult<bool>;

    /// Returns the marker for a token, if it was used.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_used(&self, token_hash: &str) -> AuthResult<Option<UsedRefreshToken>>;
}
