//! OAuth 2.1 authorization server components.
//!
//! This module provides:
//!
//! - Client registration and authentication
//! - Authorization sessions bound to the browser across the IdP redirect
//! - Authorization code issuance and exchange
//! - PKCE (S256) support, mandatory for every client
//!
//! # Authorization Code Flow
//!
//! - [`registry`] - Client registry
//! - [`session`] - Authorization session coordinator
//! - [`exchange`] - Code and refresh token exchange, introspection, revocation
//! - [`pkce`] - PKCE challenge/verifier implementation
//!
//! # Example
//!
//! ```ignore
//! use mcp_oauth::oauth::{AuthorizeRequest, PkceChallenge, PkceVerifier};
//!
//! // Client generates PKCE verifier and challenge
//! let verifier = PkceVerifier::generate();
//! let challenge = PkceChallenge::from_verifier(&verifier);
//!
//! // Server opens a session and sends the user to the identity provider
//! let start = coordinator
//!     .begin(&AuthorizeRequest::code(client_id, redirect_uri, challenge.as_str()))
//!     .await?;
//! let idp_url = provider.authorization_url(start.idp_state(), &callback_url)?;
//!
//! // On return, trade the identity for a code and redirect the client
//! let redirect = engine.complete_authentication(&start.binding, identity).await?;
//! ```

pub mod authorize;
pub mod client_auth;
pub mod exchange;
pub mod pkce;
pub mod redirect_uri;
pub mod registry;
pub mod scope;
pub mod session;
pub mod token;

pub use authorize::AuthorizeRequest;
pub use client_auth::{ClientCredentials, parse_basic_auth};
pub use exchange::AuthorizationCodeExchangeEngine;
pub use pkce::{PkceChallenge, PkceChallengeMethod, PkceError, PkceVerifier};
pub use registry::{CLIENT_SECRET_BCRYPT_COST, ClientRegistry};
pub use session::{AuthorizationSessionCoordinator, AuthorizationStart, SessionBinding};
pub use token::{
    CodeExchangeRequest, RefreshExchangeRequest, TokenError, TokenGrantRequest, TokenRequest,
};
