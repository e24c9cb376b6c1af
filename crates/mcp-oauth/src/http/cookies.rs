//! Session binding cookies.
//!
//! The [`SessionBinding`] returned by the coordinator rides across the
//! identity provider redirect in two cookies:
//!
//! - `{prefix}_session_id`
//! - `{prefix}_session_state`
//!
//! Both are `HttpOnly`, `SameSite=Lax` and scoped to the callback path.

use std::time::Duration;

use axum_extra::extract::CookieJar;
use cookie::{Cookie, SameSite};

use crate::config::CookieConfig;
use crate::oauth::SessionBinding;

/// Name of the cookie holding the session id.
#[must_use]
pub fn session_id_cookie(config: &CookieConfig) -> String {
    format!("{}_session_id", config.prefix)
}

/// Name of the cookie holding the session state.
#[must_use]
pub fn session_state_cookie(config: &CookieConfig) -> String {
    format!("{}_session_state", config.prefix)
}

/// Adds the binding cookies to the jar.
pub fn store_binding(
    jar: CookieJar,
    config: &CookieConfig,
    path: &str,
    lifetime: Duration,
    binding: &SessionBinding,
) -> CookieJar {
    let build = |name: String, value: String| {
        Cookie::build((name, value))
            .http_only(true)
            .secure(config.secure)
            .same_site(SameSite::Lax)
            .path(path.to_string())
            .max_age(time::Duration::seconds(lifetime.as_secs() as i64))
            .build()
    };

    jar.add(build(session_id_cookie(config), binding.session_id.clone()))
        .add(build(
            session_state_cookie(config),
            binding.session_state.clone(),
        ))
}

/// Reads the binding back. Returns `None` unless both cookies are present
/// and non-empty.
#[must_use]
pub fn read_binding(jar: &CookieJar, config: &CookieConfig) -> Option<SessionBinding> {
    let session_id = jar.get(&session_id_cookie(config))?.value().to_string();
    let session_state = jar.get(&session_state_cookie(config))?.value().to_string();
    if session_id.is_empty() || session_state.is_empty() {
        return None;
    }
    Some(SessionBinding {
        session_id,
        session_state,
    })
}

/// Expires both cookies.
pub fn clear_binding(jar: CookieJar, config: &CookieConfig, path: &str) -> CookieJar {
    let expired = |name: String| Cookie::build((name, "")).path(path.to_string());
    jar.remove(expired(session_id_cookie(config)))
        .remove(expired(session_state_cookie(config)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding() -> SessionBinding {
        SessionBinding {
            session_id: "sid".to_string(),
            session_state: "state".to_string(),
        }
    }

    #[test]
    fn test_cookie_names_use_prefix() {
        let config = CookieConfig::default();
        assert_eq!(session_id_cookie(&config), "mcp_oauth_session_id");
        assert_eq!(session_state_cookie(&config), "mcp_oauth_session_state");
    }

    #[test]
    fn test_store_and_read_binding() {
        let config = CookieConfig::default();
        let jar = store_binding(
            CookieJar::new(),
            &config,
            "/oauth/callback",
            Duration::from_secs(600),
            &binding(),
        );

        let cookie = jar.get("mcp_oauth_session_state").unwrap();
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.path(), Some("/oauth/callback"));
        assert_eq!(cookie.max_age(), Some(time::Duration::seconds(600)));

        assert_eq!(read_binding(&jar, &config), Some(binding()));
    }

    #[test]
    fn test_read_binding_requires_both_cookies() {
        let config = CookieConfig::default();
        let jar = CookieJar::new().add(Cookie::new("mcp_oauth_session_id", "sid"));
        assert!(read_binding(&jar, &config).is_none());

        let jar = jar.add(Cookie::new("mcp_oauth_session_state", ""));
        assert!(read_binding(&jar, &config).is_none());
    }

    #[test]
    fn test_clear_binding() {
        let config = CookieConfig::default();
        let jar = store_binding(
            CookieJar::new(),
            &config,
            "/oauth/callback",
            Duration::from_secs(600),
            &binding(),
        );
        let jar = clear_binding(jar, &config, "/oauth/callback");
        assert!(read_binding(&jar, &config).is_none());
    }
}
