//! Redirect URI validation.
//!
//! Requested redirect URIs must match a registered URI exactly, compared as
//! strings. The single exception follows RFC 8252 section 7.3: native clients
//! listening on the loopback interface cannot know their port in advance, so
//! when both URIs point at `localhost` or `127.0.0.1` the port may differ as
//! long as scheme, host text, path and query are byte-identical. There is no
//! wildcard, prefix or normalization-based matching.

use url::Url;

use crate::types::ClientValidationError;

/// Hosts that qualify for the loopback port exception.
const LOOPBACK_HOSTS: [&str; 2] = ["localhost", "127.0.0.1"];

/// Schemes that can never be redirect targets.
const FORBIDDEN_SCHEMES: [&str; 4] = ["javascript", "data", "file", "vbscript"];

/// Returns `true` if `requested` may be used where `registered` was registered.
#[must_use]
pub fn matches(registered: &str, requested: &str) -> bool {
    if registered == requested {
        return true;
    }
    loopback_matches(registered, requested)
}

/// Returns `true` if the host is one of the loopback names we accept.
#[must_use]
pub fn is_loopback_host(host: &str) -> bool {
    LOOPBACK_HOSTS.contains(&host)
}

fn loopback_matches(registered: &str, requested: &str) -> bool {
    let (Some(registered_parts), Some(requested_parts)) =
        (RawUri::split(registered), RawUri::split(requested))
    else {
        return false;
    };

    // The parser only confirms both hosts resolve to loopback; every
    // comparison below is on the raw text.
    let parsed_loopback = |uri: &str| {
        Url::parse(uri)
            .ok()
            .and_then(|url| url.host_str().map(is_loopback_host))
            .unwrap_or(false)
    };

    is_loopback_host(registered_parts.host)
        && is_loopback_host(requested_parts.host)
        && parsed_loopback(registered)
        && parsed_loopback(requested)
        && registered_parts.scheme == requested_parts.scheme
        && registered_parts.path_and_query == requested_parts.path_and_query
}

/// Raw `scheme://host[:port]path?query` pieces of a URI, no normalization.
struct RawUri<'a> {
    scheme: &'a str,
    host: &'a str,
    path_and_query: &'a str,
}

impl<'a> RawUri<'a> {
    /// Splits a URI without userinfo or fragment; anything else is `None`.
    fn split(uri: &'a str) -> Option<Self> {
        let (scheme, rest) = uri.split_once("://")?;
        if uri.contains('#') {
            return None;
        }

        let authority_end = rest.find(['/', '?']).unwrap_or(rest.len());
        let (authority, path_and_query) = rest.split_at(authority_end);
        if authority.contains('@') {
            return None;
        }

        let host = match authority.rsplit_once(':') {
            Some((host, port)) if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => {
                host
            }
            Some(_) => return None,
            None => authority,
        };

        Some(Self {
            scheme,
            host,
            path_and_query,
        })
    }
}

/// Validates a redirect URI at registration time.
///
/// Accepted forms are absolute `https` URIs, `http` URIs on a loopback host,
/// and private-use schemes for native apps. Fragments are never allowed.
///
/// # Errors
///
/// Returns `ClientValidationError::InvalidRedirectUri` with the reason.
pub fn validate_registration(uri: &str) -> Result<(), ClientValidationError> {
    let invalid = |reason: &'static str| ClientValidationError::InvalidRedirectUri {
        uri: uri.to_string(),
        reason,
    };

    let parsed = Url::parse(uri).map_err(|_| invalid("must be an absolute URI"))?;

    if parsed.fragment().is_some() {
        return Err(invalid("must not contain a fragment"));
    }

    match parsed.scheme() {
        "https" => {}
        "http" => {
            let loopback = parsed.host_str().is_some_and(is_loopback_host);
            if !loopback {
                return Err(invalid("http is only allowed for loopback hosts"));
            }
        }
        scheme if FORBIDDEN_SCHEMES.contains(&scheme) => {
            return Err(invalid("scheme is not allowed"));
        }
        _ => {}
    }

    Ok(())
}
