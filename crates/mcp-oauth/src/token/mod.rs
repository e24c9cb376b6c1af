//! Opaque token management.
//!
//! This module provides:
//!
//! - Access and refresh token issuance and validation
//! - Refresh token rotation with family-wide reuse revocation
//! - Token introspection (RFC 7662)
//! - Token revocation (RFC 7009)

pub mod introspection;
pub mod manager;
pub mod revocation;

pub use introspection::{IntrospectionRequest, IntrospectionResponse};
pub use manager::{OpaqueTokenManager, TOKEN_RANDOM_BYTES};
pub use revocation::{RevocationRequest, TokenTypeHint};
