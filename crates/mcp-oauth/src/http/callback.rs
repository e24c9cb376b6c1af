//! Identity provider callback handler.
//!
//! # Flow
//!
//! ```text
//! GET /oauth/callback?code=...&state=...
//!     ├─► Missing binding cookies → access_denied
//!     ├─► IdP state ≠ cookie state → session discarded, access_denied
//!     ├─► IdP error or failed upstream exchange
//!     │       → 303 redirect_uri?error=access_denied&state=...
//!     └─► Identity obtained → 303 redirect_uri?code=...&state=...
//! ```
//!
//! The binding cookies are cleared on every outcome.

use axum::extract::{Query, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::CookieJar;
use tracing::warn;

use crate::crypto::{constant_time_eq, fingerprint};
use crate::error::AuthError;
use crate::identity::CallbackParams;

use super::{OAuthState, cookies, error_response};

/// `GET /callback`.
pub async fn callback(
    State(state): State<OAuthState>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Response {
    let config = &state.server.config().cookies;
    let binding = cookies::read_binding(&jar, config);
    let jar = cookies::clear_binding(jar, config, &state.callback_path());

    let Some(binding) = binding else {
        warn!("Callback without authorization session cookies");
        let err = AuthError::access_denied("Invalid or expired authorization session");
        return (jar, error_response(&err)).into_response();
    };

    let state_matches = params
        .state
        .as_deref()
        .is_some_and(|idp_state| constant_time_eq(idp_state, &binding.session_state));
    if !state_matches {
        warn!(
            session = %fingerprint(&binding.session_id),
            "Identity provider state does not match session"
        );
        if let Err(err) = state.server.sessions().discard(&binding.session_id).await {
            warn!(error = %err, "Failed to discard authorization session");
        }
        let err = AuthError::access_denied("Invalid or expired authorization session");
        return (jar, error_response(&err)).into_response();
    }

    let engine = state.server.engine();
    let result = if params.is_failure() {
        warn!(
            provider = %state.provider.name(),
            error = ?params.error,
            "Identity provider reported a failure"
        );
        engine.fail_authentication(&binding).await
    } else {
        match state
            .provider
            .authenticate(&params, &state.callback_url())
            .await
        {
            Ok(identity) => engine.complete_authentication(&binding, identity).await,
            Err(err) => {
                warn!(
                    provider = %state.provider.name(),
                    error = %err,
                    "Identity provider authentication failed"
                );
                engine.fail_authentication(&binding).await
            }
        }
    };

    match result {
        Ok(url) => (jar, Redirect::to(&url)).into_response(),
        Err(err) => (jar, error_response(&err)).into_response(),
    }
}
