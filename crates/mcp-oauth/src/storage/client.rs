//! Client storage trait.

use async_trait::async_trait;

use crate::AuthResult;
use crate::types::OAuthClient;

/// Storage trait for OAuth client registrations.
///
/// Clients are immutable after registration, so there is no update
/// operation. The stored `client_secret_hash` is a bcrypt hash; the
/// plaintext secret never reaches the store.
#[async_trait]
pub trait ClientStorage: Send + Sync {
    /// Stores a new client.
    ///
    /// # Errors
    ///
    /// Returns an error if a client with the same ID exists or the storage
    /// operation fails.
    async fn create(&self, client: &OAuthClient) -> AuthResult<()>;

    /// Finds a client by its client ID.
    ///
    /// # Returns
    ///
    /// Returns `Some(client)` if found, `None` if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_client_id(&self, client_id: &str) -> AuthResult<Option<OAuthClient>>;

    /// Deletes a client.
    ///
    /// # Returns
    ///
    /// Returns `true` if a client was deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn delete(&self, client_id: &str) -> AuthResult<bool>;

    /// Lists clients with pagination.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn list(&self, limit: usize, offset: usize) -> AuthResult<Vec<OAuthClient>>;
}
