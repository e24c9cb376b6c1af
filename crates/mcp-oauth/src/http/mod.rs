//! Axum HTTP surface for the authorization server.
//!
//! # Endpoints
//!
//! Mounted under `base_path` (default `/oauth`):
//!
//! - `GET  /authorize` - [`authorize`] starts a flow and redirects to the IdP
//! - `GET  /callback` - [`callback`] completes it and redirects to the client
//! - `POST /token` - [`token`] code and refresh exchange
//! - `POST /introspect` - [`introspect`] (RFC 7662)
//! - `POST /revoke` - [`revoke`] (RFC 7009)
//! - `POST /register` - [`register`] (RFC 7591), when enabled
//!
//! At the root:
//!
//! - `GET /.well-known/oauth-authorization-server` (RFC 8414)
//! - `GET /.well-known/oauth-protected-resource` (RFC 9728)
//!
//! # Usage
//!
//! ```ignore
//! let server = AuthorizationServer::new(config, store.stores())?;
//! let app = mcp_oauth::http::router(server, Arc::new(GitHubProvider::new(...)));
//! axum::serve(listener, app).await?;
//! ```

pub mod authorize;
pub mod callback;
pub mod cookies;
pub mod discovery;
pub mod extract;
pub mod introspect;
pub mod register;
pub mod revoke;
pub mod token;

use std::sync::Arc;

use axum::Router;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde::Serialize;
use tracing::{debug, error};

use crate::discovery::{
    AUTHORIZE_PATH, CALLBACK_PATH, INTROSPECT_PATH, REGISTER_PATH, REVOKE_PATH, TOKEN_PATH,
};
use crate::error::AuthError;
use crate::identity::IdentityProvider;
use crate::oauth::TokenError;
use crate::server::AuthorizationServer;

pub use extract::FormOrJson;

/// Shared state of every handler.
#[derive(Clone)]
pub struct OAuthState {
    /// The assembled authorization server.
    pub server: AuthorizationServer,
    /// Upstream identity provider.
    pub provider: Arc<dyn IdentityProvider>,
}

impl OAuthState {
    /// Creates handler state.
    pub fn new(server: AuthorizationServer, provider: Arc<dyn IdentityProvider>) -> Self {
        Self { server, provider }
    }

    /// Absolute URL of the IdP callback endpoint.
    #[must_use]
    pub fn callback_url(&self) -> String {
        self.server.config().endpoint_url(CALLBACK_PATH)
    }

    /// Path the session binding cookies are scoped to.
    #[must_use]
    pub fn callback_path(&self) -> String {
        format!(
            "{}{}",
            self.server.config().base_path.trim_end_matches('/'),
            CALLBACK_PATH
        )
    }
}

/// Builds the router with every endpoint.
pub fn router(server: AuthorizationServer, provider: Arc<dyn IdentityProvider>) -> Router {
    let config = server.config().clone();
    let state = OAuthState::new(server, provider);
    let base = config.base_path.trim_end_matches('/');
    let path = |endpoint: &str| format!("{base}{endpoint}");

    let mut router = Router::new()
        .route(&path(AUTHORIZE_PATH), get(authorize::authorize))
        .route(&path(CALLBACK_PATH), get(callback::callback))
        .route(&path(TOKEN_PATH), post(token::token))
        .route(&path(INTROSPECT_PATH), post(introspect::introspect))
        .route(&path(REVOKE_PATH), post(revoke::revoke))
        .route(
            "/.well-known/oauth-authorization-server",
            get(discovery::authorization_server_metadata),
        )
        .route(
            "/.well-known/oauth-protected-resource",
            get(discovery::protected_resource_metadata),
        );

    if config.registration.enabled {
        router = router.route(&path(REGISTER_PATH), post(register::register));
    }

    router.with_state(state)
}

/// HTTP status for an error.
#[must_use]
pub fn error_status(err: &AuthError) -> StatusCode {
    match err {
        AuthError::InvalidClient { .. } => StatusCode::UNAUTHORIZED,
        _ if err.is_server_error() => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_REQUEST,
    }
}

/// JSON response with `Cache-Control: no-store` and `Pragma: no-cache`.
pub fn no_store_json<T: Serialize>(status: StatusCode, body: &T) -> Response {
    (
        status,
        [
            (header::CACHE_CONTROL, "no-store"),
            (header::PRAGMA, "no-cache"),
        ],
        axum::Json(body),
    )
        .into_response()
}

/// Renders an OAuth error body. Server errors are logged with their detail
/// and rendered with a generic description.
pub fn error_response(err: &AuthError) -> Response {
    if err.is_server_error() {
        error!(error = %err, category = %err.category(), "Authorization server failure");
    } else if err.is_authentication_error() {
        debug!(code = err.oauth_error_code(), "Authentication failed");
    }

    let status = error_status(err);
    let mut response = no_store_json(status, &TokenError::from(err));
    if status == StatusCode::UNAUTHORIZED {
        response.headers_mut().insert(
            header::WWW_AUTHENTICATE,
            header::HeaderValue::from_static("Basic realm=\"oauth\""),
        );
    }
    response
}
