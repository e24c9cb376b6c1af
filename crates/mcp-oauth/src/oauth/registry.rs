//! Client registry: registration, redirect URI checks and client authentication.
//!
//! Confidential clients receive a 32-byte random secret, hex encoded. Only
//! its bcrypt hash is stored; the plaintext is returned once from
//! [`ClientRegistry::register`]. Secrets are always verified with bcrypt,
//! which compares in constant time, and any bcrypt error counts as a failed
//! verification.

use std::sync::Arc;

use time::OffsetDateTime;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::AuthResult;
use crate::crypto::random_hex;
use crate::error::AuthError;
use crate::storage::ClientStorage;
use crate::types::{ClientMetadata, OAuthClient, RegisteredClient};

/// bcrypt work factor for client secrets.
pub const CLIENT_SECRET_BCRYPT_COST: u32 = 10;

/// Random bytes in a generated client secret.
const CLIENT_SECRET_BYTES: usize = 32;

/// Registers and authenticates OAuth clients.
#[derive(Clone)]
pub struct ClientRegistry {
    clients: Arc<dyn ClientStorage>,
    default_scope: Option<String>,
}

impl ClientRegistry {
    /// Creates a registry over the given client storage.
    pub fn new(clients: Arc<dyn ClientStorage>) -> Self {
        Self {
            clients,
            default_scope: None,
        }
    }

    /// Sets the scope assigned to clients that register without one.
    #[must_use]
    pub fn with_default_scope(mut self, scope: Option<String>) -> Self {
        self.default_scope = scope;
        self
    }

    /// Registers a new client (RFC 7591).
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidClientMetadata` for invalid metadata, or a
    /// storage/internal error if the client cannot be persisted.
    pub async fn register(&self, metadata: ClientMetadata) -> AuthResult<RegisteredClient> {
        let validated = metadata.validate()?;

        let client_id = Uuid::new_v4().to_string();
        let plaintext_secret = validated
            .token_endpoint_auth_method
            .requires_secret()
            .then(|| random_hex(CLIENT_SECRET_BYTES));

        let client_secret_hash = match &plaintext_secret {
            Some(secret) => Some(hash_secret(secret.clone()).await?),
            None => None,
        };

        let now = OffsetDateTime::now_utc();
        let client = OAuthClient {
            client_id,
            client_secret_hash,
            client_name: validated.client_name,
            redirect_uris: validated.redirect_uris,
            grant_types: validated.grant_types,
            response_types: validated.response_types,
            token_endpoint_auth_method: validated.token_endpoint_auth_method,
            scope: validated.scope.or_else(|| self.default_scope.clone()),
            created_at: now,
            updated_at: now,
        };

        self.clients.create(&client).await?;

        info!(
            client_id = %client.client_id,
            auth_method = %client.token_endpoint_auth_method,
            redirect_uris = client.redirect_uris.len(),
            "Registered OAuth client"
        );

        Ok(RegisteredClient::from_client(&client, plaintext_secret))
    }

    /// Looks up a client.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    pub async fn find(&self, client_id: &str) -> AuthResult<Option<OAuthClient>> {
        self.clients.find_by_client_id(client_id).await
    }

    /// Returns `true` if `redirect_uri` is registered for the client.
    ///
    /// Unknown clients have no valid redirect URIs.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    pub async fn validate_redirect_uri(
        &self,
        client_id: &str,
        redirect_uri: &str,
    ) -> AuthResult<bool> {
        Ok(self
            .find(client_id)
            .await?
            .is_some_and(|client| client.is_redirect_uri_allowed(redirect_uri)))
    }

    /// Returns `true` if the presented credentials authenticate the client.
    ///
    /// Public clients must present no secret. Confidential clients must
    /// present a secret that matches the stored hash.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails. Verification
    /// failures are reported as `Ok(false)`.
    pub async fn validate_client_credentials(
        &self,
        client_id: &str,
        client_secret: Option<&str>,
    ) -> AuthResult<bool> {
        match self.find(client_id).await? {
            Some(client) => Ok(check_secret(&client, client_secret).await),
            None => Ok(false),
        }
    }

    /// Authenticates a client and returns its registration.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidClient` for unknown clients and bad
    /// credentials, without saying which, or a storage error.
    pub async fn authenticate(
        &self,
        client_id: &str,
        client_secret: Option<&str>,
    ) -> AuthResult<OAuthClient> {
        let Some(client) = self.find(client_id).await? else {
            debug!(client_id = %client_id, "Unknown client");
            return Err(AuthError::invalid_client("Client authentication failed"));
        };

        if !check_secret(&client, client_secret).await {
            warn!(client_id = %client_id, "Client authentication failed");
            return Err(AuthError::invalid_client("Client authentication failed"));
        }

        Ok(client)
    }
}

async fn check_secret(client: &OAuthClient, presented: Option<&str>) -> bool {
    match (&client.client_secret_hash, presented) {
        (None, None) => true,
        (None, Some(_)) | (Some(_), None) => false,
        (Some(hash), Some(secret)) => verify_secret(secret.to_string(), hash.clone()).await,
    }
}

async fn hash_secret(secret: String) -> AuthResult<String> {
    tokio::task::spawn_blocking(move || bcrypt::hash(secret, CLIENT_SECRET_BCRYPT_COST))
        .await
        .map_err(|e| AuthError::internal(format!("bcrypt task failed: {e}")))?
        .map_err(|e| AuthError::internal(format!("Failed to hash client secret: {e}")))
}

async fn verify_secret(secret: String, hash: String) -> bool {
    match tokio::task::spawn_blocking(move || bcrypt::verify(secret, &hash)).await {
        Ok(Ok(valid)) => valid,
        Ok(Err(e)) => {
            warn!(error = %e, "bcrypt verification error");
            false
        }
        Err(e) => {
            warn!(error = %e, "bcrypt task failed");
            false
        }
    }
}
