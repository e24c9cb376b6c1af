//! Dynamic client registration endpoint handler (RFC 7591).
//!
//! ```ignore
//! POST /oauth/register
//! Content-Type: application/json
//!
//! {
//!   "client_name": "My MCP Client",
//!   "redirect_uris": ["http://localhost:3000/callback"],
//!   "token_endpoint_auth_method": "none"
//! }
//! ```
//!
//! Answers `201` with the registered client. The plaintext secret of a
//! confidential client appears in this response only.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::Response;

use crate::error::AuthError;
use crate::types::ClientMetadata;

use super::{OAuthState, error_response, no_store_json};

/// `POST /register`.
pub async fn register(
    State(state): State<OAuthState>,
    body: Result<Json<ClientMetadata>, JsonRejection>,
) -> Response {
    let Json(metadata) = match body {
        Ok(body) => body,
        Err(rejection) => {
            return error_response(&AuthError::invalid_client_metadata(rejection.body_text()));
        }
    };

    match state.server.registry().register(metadata).await {
        Ok(client) => no_store_json(StatusCode::CREATED, &client),
        Err(err) => error_response(&err),
    }
}
