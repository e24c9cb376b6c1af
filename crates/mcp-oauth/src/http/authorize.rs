//! Authorization endpoint handler.
//!
//! # Flow
//!
//! ```text
//! GET /oauth/authorize?response_type=code&client_id=...&redirect_uri=...
//!     &code_challenge=...&code_challenge_method=S256&state=...&resource=...
//!     ├─► Invalid request → JSON 400 (never redirected)
//!     └─► Valid → session opened, binding cookies set,
//!                 303 to the identity provider
//! ```

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::http::header::WWW_AUTHENTICATE;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::CookieJar;
use tracing::{debug, warn};

use crate::error::AuthError;
use crate::oauth::AuthorizeRequest;

use super::{OAuthState, cookies, error_response};

/// `GET /authorize`.
pub async fn authorize(
    State(state): State<OAuthState>,
    jar: CookieJar,
    query: Result<Query<AuthorizeRequest>, QueryRejection>,
) -> Response {
    let Query(request) = match query {
        Ok(query) => query,
        Err(rejection) => {
            return render_error(&AuthError::invalid_request(rejection.body_text()));
        }
    };

    let sessions = state.server.sessions();
    let start = match sessions.begin(&request).await {
        Ok(start) => start,
        Err(err) => {
            debug!(
                client_id = ?request.client_id,
                error = %err,
                "Rejected authorization request"
            );
            return render_error(&err);
        }
    };

    let idp_url = match state
        .provider
        .authorization_url(start.idp_state(), &state.callback_url())
    {
        Ok(url) => url,
        Err(err) => {
            if let Err(discard_err) = sessions.discard(&start.binding.session_id).await {
                warn!(error = %discard_err, "Failed to discard authorization session");
            }
            return render_error(&err);
        }
    };

    debug!(
        provider = %state.provider.name(),
        client_id = ?start.session.client_id,
        "Redirecting to identity provider"
    );

    let jar = cookies::store_binding(
        jar,
        &state.server.config().cookies,
        &state.callback_path(),
        sessions.session_lifetime(),
        &start.binding,
    );
    (jar, Redirect::to(&idp_url)).into_response()
}

/// Client errors are always `400` here, `invalid_client` included.
fn render_error(err: &AuthError) -> Response {
    let mut response = error_response(err);
    if response.status() == StatusCode::UNAUTHORIZED {
        *response.status_mut() = StatusCode::BAD_REQUEST;
        response.headers_mut().remove(WWW_AUTHENTICATE);
    }
    response
}
