//! Authorization server assembly.
//!
//! [`AuthorizationServer`] wires the four components to one configuration
//! and one set of stores. Embedders build it once and share it (it is cheap
//! to clone) between the HTTP layer and any in-process token validation.

use std::sync::Arc;

use tracing::{debug, info};

use crate::AuthResult;
use crate::cipher::TokenCipher;
use crate::config::{AuthConfig, ConfigError};
use crate::oauth::{AuthorizationCodeExchangeEngine, AuthorizationSessionCoordinator, ClientRegistry};
use crate::storage::AuthStores;
use crate::token::OpaqueTokenManager;

/// The assembled authorization server.
#[derive(Clone)]
pub struct AuthorizationServer {
    config: Arc<AuthConfig>,
    stores: AuthStores,
    registry: ClientRegistry,
    sessions: Arc<AuthorizationSessionCoordinator>,
    tokens: Arc<OpaqueTokenManager>,
    engine: Arc<AuthorizationCodeExchangeEngine>,
    cipher: Option<Arc<dyn TokenCipher>>,
}

impl AuthorizationServer {
    /// Validates the configuration and builds the components.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the configuration is invalid.
    pub fn new(config: AuthConfig, stores: AuthStores) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::assemble(Arc::new(config), stores, None))
    }

    /// Encrypts provider tokens with `cipher` before they are stored.
    #[must_use]
    pub fn with_token_cipher(self, cipher: Arc<dyn TokenCipher>) -> Self {
        Self::assemble(self.config, self.stores, Some(cipher))
    }

    fn assemble(
        config: Arc<AuthConfig>,
        stores: AuthStores,
        cipher: Option<Arc<dyn TokenCipher>>,
    ) -> Self {
        let registry = ClientRegistry::new(stores.clients.clone())
            .with_default_scope(config.registration.default_scope.clone());

        let sessions = Arc::new(AuthorizationSessionCoordinator::new(
            stores.sessions.clone(),
            registry.clone(),
            config.resource.clone(),
            config.oauth.session_lifetime,
            config.oauth.hmac_secret.expose().as_bytes().to_vec(),
        ));

        let tokens = Arc::new(
            OpaqueTokenManager::new(
                stores.tokens.clone(),
                config.oauth.access_token_lifetime,
                config.oauth.refresh_token_lifetime,
            )
            .with_reuse_tracking(stores.used_refresh_tokens.clone()),
        );

        let mut engine = AuthorizationCodeExchangeEngine::new(
            sessions.clone(),
            registry.clone(),
            tokens.clone(),
            stores.codes.clone(),
            stores.users.clone(),
            config.oauth.authorization_code_lifetime,
        )
        .with_plain_pkce(config.oauth.allow_plain_pkce)
        .with_issuer(config.issuer_url());
        if let Some(cipher) = &cipher {
            engine = engine.with_token_cipher(cipher.clone());
        }

        debug!(
            issuer = %config.issuer_url(),
            resource = %config.resource,
            reuse_detection = stores.used_refresh_tokens.is_some(),
            provider_token_encryption = cipher.is_some(),
            "Authorization server assembled"
        );

        Self {
            config,
            stores,
            registry,
            sessions,
            tokens,
            engine: Arc::new(engine),
            cipher,
        }
    }

    /// Server configuration.
    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Client registry.
    #[must_use]
    pub fn registry(&self) -> &ClientRegistry {
        &self.registry
    }

    /// Authorization session coordinator.
    #[must_use]
    pub fn sessions(&self) -> &AuthorizationSessionCoordinator {
        &self.sessions
    }

    /// Token manager, for validating bearer tokens in-process.
    #[must_use]
    pub fn tokens(&self) -> &OpaqueTokenManager {
        &self.tokens
    }

    /// Exchange engine.
    #[must_use]
    pub fn engine(&self) -> &AuthorizationCodeExchangeEngine {
        &self.engine
    }

    /// Returns `true` if provider tokens are encrypted before storage.
    #[must_use]
    pub fn encrypts_provider_tokens(&self) -> bool {
        self.cipher.is_some()
    }

    /// Removes expired sessions, codes and tokens. Returns the number removed.
    ///
    /// # Errors
    ///
    /// Returns the first storage error.
    pub async fn cleanup_expired(&self) -> AuthResult<u64> {
        let sessions = self.stores.sessions.cleanup_expired().await?;
        let codes = self.stores.codes.cleanup_expired().await?;
        let tokens = self.stores.tokens.cleanup_expired().await?;
        let total = sessions + codes + tokens;
        if total > 0 {
            info!(sessions, codes, tokens, "Removed expired authorization records");
        }
        Ok(total)
    }
}
