//! Storage traits for authorization server state.
//!
//! This module defines storage interfaces for:
//!
//! - OAuth client registrations
//! - Authorization sessions and codes
//! - Access and refresh tokens, with optional reuse markers
//! - User profiles
//!
//! # Implementations
//!
//! - `mcp-oauth-memory` - in-memory backend

pub mod client;
pub mod session;
pub mod token;
pub mod user;

use std::sync::Arc;

pub use client::ClientStorage;
pub use session::{AuthorizationCodeStorage, SessionStorage};
pub use token::{TokenStorage, UsedRefreshTokenStorage};
pub use user::UserProfileStorage;

/// The set of storage collaborators the engine runs on.
#[derive(Clone)]
pub struct AuthStores {
    /// Client registrations.
    pub clients: Arc<dyn ClientStorage>,
    /// Authorization sessions.
    pub sessions: Arc<dyn SessionStorage>,
    /// Authorization codes.
    pub codes: Arc<dyn AuthorizationCodeStorage>,
    /// Access and refresh tokens.
    pub tokens: Arc<dyn TokenStorage>,
    /// User profiles.
    pub users: Arc<dyn UserProfileStorage>,
    /// Refresh reuse markers, when the backend supports them.
    pub used_refresh_tokens: Option<Arc<dyn UsedRefreshTokenStorage>>,
}

impl AuthStores {
    /// Creates a store set without reuse tracking.
    pub fn new(
        clients: Arc<dyn ClientStorage>,
        sessions: Arc<dyn SessionStorage>,
        codes: Arc<dyn AuthorizationCodeStorage>,
        tokens: Arc<dyn TokenStorage>,
        users: Arc<dyn UserProfileStorage>,
    ) -> Self {
        Self {
            clients,
            sessions,
            codes,
            tokens,
            users,
            used_refresh_tokens: None,
        }
    }

    /// Enables refresh-token reuse detection.
    #[must_use]
    pub fn with_reuse_tracking(mut self, used: Arc<dyn UsedRefreshTokenStorage>) -> Self {
        self.used_refresh_tokens = Some(used);
        self
    }
}
