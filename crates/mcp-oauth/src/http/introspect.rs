//! Token introspection endpoint handler (RFC 7662).
//!
//! Always answers `200`. Anything the caller may not learn about, including
//! a missing token, yields `{"active": false}`.

use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use serde::Deserialize;
use tracing::debug;

use crate::oauth::ClientCredentials;
use crate::token::{IntrospectionRequest, IntrospectionResponse};

use super::{FormOrJson, OAuthState, no_store_json};

/// Introspection request body.
#[derive(Debug, Default, Deserialize)]
pub struct IntrospectForm {
    /// Token to inspect.
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

/// `POST /introspect`.
pub async fn introspect(
    State(state): State<OAuthState>,
    headers: HeaderMap,
    body: Result<FormOrJson<IntrospectForm>, Response>,
) -> Response {
    let form = match body {
        Ok(FormOrJson(form)) => form,
        Err(_) => {
            debug!("Unreadable introspect body treated as empty");
            IntrospectForm::default()
        }
    };

    let Some(token) = form.token.filter(|token| !token.is_empty()) else {
        return no_store_json(StatusCode::OK, &IntrospectionResponse::inactive());
    };

    let credentials = ClientCredentials::resolve(
        headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok()),
        form.client_id.as_deref(),
        form.client_secret.as_deref(),
    );
    let request = IntrospectionRequest {
        token,
        token_type_hint: form.token_type_hint,
        credentials,
    };

    let response = state.server.engine().introspect(&request).await;
    no_store_json(StatusCode::OK, &response)
}
