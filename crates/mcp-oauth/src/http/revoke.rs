//! Token revocation endpoint handler (RFC 7009).
//!
//! Always answers `200` with an empty body, whether or not the token was
//! known, owned by the caller, or already revoked.

use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tracing::debug;

use crate::oauth::ClientCredentials;
use crate::token::RevocationRequest;

use super::{FormOrJson, OAuthState};

/// Revocation request body.
#[derive(Debug, Default, Deserialize)]
pub struct RevokeForm {
    /// Token to revoke.
    #[serde(default)]
    pub token: Option<String>,
    /// `access_token` or `refresh_token`.
    #[serde(default)]
    pub token_type_hint: Option<String>,
    /// Client id for `client_secret_post` or public clients.
    #[serde(default)]
    pub client_id: Option<String>,
    /// Client secret for `client_secret_post`.
    #[serde(default)]
    pub client_secret: Option<String>,
}

/// `POST /revoke`.
pub async fn revoke(
    State(state): State<OAuthState>,
    headers: HeaderMap,
    body: Result<FormOrJson<RevokeForm>, Response>,
) -> Response {
    let form = match body {
        Ok(FormOrJson(form)) => form,
        Err(_) => {
            debug!("Unreadable revoke body treated as empty");
            RevokeForm::default()
        }
    };

    if let Some(token) = form.token.filter(|token| !token.is_empty()) {
        let credentials = ClientCredentials::resolve(
            headers
                .get(AUTHORIZATION)
                .and_then(|value| value.to_str().ok()),
            form.client_id.as_deref(),
            form.client_secret.as_deref(),
        );
        let request = RevocationRequest {
            token,
            token_type_hint: form.token_type_hint,
            credentials,
        };
        state.server.engine().revoke(&request).await;
    }

    StatusCode::OK.into_response()
}
