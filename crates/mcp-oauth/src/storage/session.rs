//! Authorization session and authorization code storage traits.

use async_trait::async_trait;

use crate::AuthResult;
use crate::types::{AuthorizationCode, OAuthSession};

/// Storage trait for authorization sessions.
///
/// Sessions live for the duration of one trip to the identity provider.
/// Lookups return expired sessions as stored; the caller checks expiry and
/// deletes them.
#[async_trait]
pub trait SessionStorage: Send + Sync {
    /// Stores a new session keyed by `session.session_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn create(&self, session: &OAuthSession) -> AuthResult<()>;

    /// Finds a session by its ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find(&self, session_id: &str) -> AuthResult<Option<OAuthSession>>;

    /// Deletes a session.
    ///
    /// # Returns
    ///
    /// Returns `true` if a session was deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn delete(&self, session_id: &str) -> AuthResult<bool>;

    /// Deletes expired sessions.
    ///
    /// # Returns
    ///
    /// Returns the number of sessions deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the cleanup operation fails.
    async fn cleanup_expired(&self) -> AuthResult<u64>;
}

/// Storage trait for single-use authorization codes.
///
/// # Atomicity
///
/// [`take`](Self::take) must fetch and delete in one step: when two callers
/// race on the same code, exactly one receives it and the other sees `None`.
/// This is what makes a code redeemable at most once.
#[async_trait]
pub trait AuthorizationCodeStorage: Send + Sync {
    /// Stores a new code keyed by `code.code`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn create(&self, code: &AuthorizationCode) -> AuthResult<()>;

    /// Finds a code without consuming it.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find(&self, code: &str) -> AuthResult<Option<AuthorizationCode>>;

    /// Atomically removes and returns a code.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn take(&self, code: &str) -> AuthResult<Option<AuthorizationCode>>;

    /// Deletes a code.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn delete(&self, code: &str) -> AuthResult<bool>;

    /// Deletes expired codes.
    ///
    /// # Errors
    ///
    /// Returns an error if the cleanup operation fails.
    async fn cleanup_expired(&self) -> AuthResult<u64>;
}
