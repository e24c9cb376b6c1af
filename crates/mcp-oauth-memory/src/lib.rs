//! In-memory storage backend for the MCP OAuth authorization server.
//!
//! This crate provides [`InMemoryAuthStore`], an implementation of every
//! storage trait from `mcp-oauth` on top of `dashmap`, including the
//! optional refresh-token reuse markers. State lives for the life of the
//! process, which suits tests and single-node deployments.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use mcp_oauth::{AuthConfig, AuthorizationServer};
//! use mcp_oauth_memory::InMemoryAuthStore;
//!
//! let store = Arc::new(InMemoryAuthStore::new());
//! let server = AuthorizationServer::new(config, store.stores())?;
//! let app = mcp_oauth::http::router(server, provider);
//! ```

pub mod store;

pub use store::InMemoryAuthStore;

/// Creates a shareable in-memory store.
#[must_use]
pub fn create_auth_store() -> std::sync::Arc<InMemoryAuthStore> {
    std::sync::Arc::new(InMemoryAuthStore::new())
}
