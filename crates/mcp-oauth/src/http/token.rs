//! Token endpoint handler.
//!
//! ```ignore
//! POST /oauth/token
//! Content-Type: application/x-www-form-urlencoded
//!
//! grant_type=authorization_code
//! &code=SplxlOBeZQQYbYS6WxSbIA
//! &redirect_uri=http://localhost:3000/callback
//! &code_verifier=dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk
//! &client_id=my-app
//! &resource=https://mcp.example.com
//! ```

use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use tracing::debug;

use crate::oauth::{TokenGrantRequest, TokenRequest};

use super::{FormOrJson, OAuthState, error_response, no_store_json};

/// `POST /token`.
///
/// Client credentials come from `Authorization: Basic` or the body; the
/// header wins when both are sent.
pub async fn token(
    State(state): State<OAuthState>,
    headers: HeaderMap,
    FormOrJson(request): FormOrJson<TokenRequest>,
) -> Response {
    debug!(grant_type = ?request.grant_type, "Processing token request");

    let authorization = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    let grant = match request.into_grant(authorization) {
        Ok(grant) => grant,
        Err(err) => return error_response(&err),
    };

    let engine = state.server.engine();
    let result = match grant {
        TokenGrantRequest::AuthorizationCode(request) => engine.exchange_code(request).await,
        TokenGrantRequest::RefreshToken(request) => engine.exchange_refresh_token(request).await,
    };

    match result {
        Ok(pair) => no_store_json(StatusCode::OK, &pair),
        Err(err) => error_response(&err),
    }
}
