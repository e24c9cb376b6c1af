//! Space-delimited scope handling.

use std::collections::HashSet;

use crate::AuthResult;
use crate::error::AuthError;

/// Splits a space-delimited scope string into its tokens.
pub fn scope_tokens(scope: &str) -> impl Iterator<Item = &str> {
    scope.split_whitespace()
}

/// Normalizes a scope string: collapses whitespace and drops duplicates,
/// keeping first-seen order. Blank input yields `None`.
#[must_use]
pub fn normalize(scope: Option<&str>) -> Option<String> {
    let mut seen = HashSet::new();
    let tokens: Vec<&str> = scope
        .map(scope_tokens)
        .into_iter()
        .flatten()
        .filter(|token| seen.insert(*token))
        .collect();
    if tokens.is_empty() {
        None
    } else {
        Some(tokens.join(" "))
    }
}

/// Resolves the scope for a refresh request.
///
/// Without a requested scope the original grant is kept. A requested scope
/// must be a token-wise subset of the grant; it is never silently narrowed.
///
/// # Errors
///
/// Returns `AuthError::InvalidScope` if any requested token was not granted.
pub fn narrow(requested: Option<&str>, granted: Option<&str>) -> AuthResult<Option<String>> {
    let Some(requested) = normalize(requested) else {
        return Ok(granted.map(str::to_string));
    };

    let granted: HashSet<&str> = granted.map(scope_tokens).into_iter().flatten().collect();
    if scope_tokens(&requested).all(|token| granted.contains(token)) {
        Ok(Some(requested))
    } else {
        Err(AuthError::invalid_scope(
            "Requested scope exceeds original grant",
        ))
    }
}
