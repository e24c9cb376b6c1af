//! Discovery endpoint handlers.

use axum::Json;
use axum::extract::State;

use crate::discovery::{AuthorizationServerMetadata, ProtectedResourceMetadata};

use super::OAuthState;

/// `GET /.well-known/oauth-authorization-server`.
pub async fn authorization_server_metadata(
    State(state): State<OAuthState>,
) -> Json<AuthorizationServerMetadata> {
    Json(AuthorizationServerMetadata::build(state.server.config()))
}

/// `GET /.well-known/oauth-protected-resource`.
pub async fn protected_resource_metadata(
    State(state): State<OAuthState>,
) -> Json<ProtectedResourceMetadata> {
    Json(ProtectedResourceMetadata::build(state.server.config()))
}
