//! # mcp-oauth
//!
//! Embeddable OAuth 2.1 authorization server for MCP (Model Context
//! Protocol) backends.
//!
//! This crate provides:
//! - Dynamic client registration (RFC 7591) with bcrypt-hashed secrets
//! - Authorization sessions bound to the browser across an external
//!   identity provider login
//! - Authorization code flow with mandatory PKCE (S256)
//! - Opaque access and refresh tokens with rotation and reuse detection
//! - Resource indicators (RFC 8707), introspection (RFC 7662) and
//!   revocation (RFC 7009)
//! - Discovery documents (RFC 8414, RFC 9728)
//!
//! ## Overview
//!
//! The server never authenticates users itself. An [`IdentityProvider`]
//! adapter sends the browser upstream and turns the callback into an
//! identity; the server turns that identity into an authorization code and,
//! on exchange, into tokens bound to one protected resource.
//!
//! ## Modules
//!
//! - [`config`] - Server configuration and loading
//! - [`oauth`] - Client registry, sessions, code exchange
//! - [`token`] - Opaque token manager, introspection and revocation types
//! - [`identity`] - External identity provider adapter
//! - [`discovery`] - Metadata documents
//! - [`storage`] - Storage traits for authorization data
//! - [`http`] - Axum HTTP handlers for the OAuth endpoints
//! - [`server`] - Component assembly

pub mod cipher;
pub mod config;
pub mod crypto;
pub mod discovery;
pub mod error;
pub mod http;
pub mod identity;
pub mod oauth;
pub mod server;
pub mod storage;
pub mod token;
pub mod types;

#[cfg(test)]
mod testing;

pub use cipher::{AesGcmTokenCipher, CipherError, TokenCipher};
pub use config::{AuthConfig, ConfigError, SecretString};
pub use discovery::{AuthorizationServerMetadata, ProtectedResourceMetadata};
pub use error::{AuthError, ErrorCategory};
pub use identity::{CallbackParams, IdentityProvider};
pub use oauth::{
    AuthorizationCodeExchangeEngine, AuthorizationSessionCoordinator, AuthorizeRequest,
    ClientCredentials, ClientRegistry, SessionBinding,
};
pub use server::AuthorizationServer;
pub use storage::{
    AuthStores, AuthorizationCodeStorage, ClientStorage, SessionStorage, TokenStorage,
    UsedRefreshTokenStorage, UserProfileStorage,
};
pub use token::{IntrospectionResponse, OpaqueTokenManager};
pub use types::{
    ClientMetadata, ExternalIdentity, GrantType, OAuthClient, RegisteredClient, TokenPair,
    UserProfile,
};

/// Type alias for authorization server results.
pub type AuthResult<T> = Result<T, AuthError>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use mcp_oauth::prelude::*;
/// ```
pub mod prelude {
    pub use crate::AuthResult;
    pub use crate::cipher::{AesGcmTokenCipher, TokenCipher};
    pub use crate::config::{AuthConfig, ConfigError};
    pub use crate::error::{AuthError, ErrorCategory};
    pub use crate::http::router;
    pub use crate::identity::{CallbackParams, IdentityProvider};
    pub use crate::server::AuthorizationServer;
    pub use crate::storage::AuthStores;
    pub use crate::types::{ExternalIdentity, ProviderTokens, TokenPair};
}
