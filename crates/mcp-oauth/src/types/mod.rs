//! Domain types for the authorization server.

pub mod client;
pub mod session;
pub mod token;
pub mod user;

pub use client::{
    ClientMetadata, ClientValidationError, GrantType, OAuthClient, RegisteredClient, ResponseType,
    TokenEndpointAuthMethod, ValidatedClientMetadata,
};
pub use session::{AuthorizationCode, OAuthSession};
pub use token::{
    AccessTokenMetadata, RefreshTokenMetadata, TokenGrant, TokenPair, UsedRefreshToken,
};
pub use user::{ExternalIdentity, ProviderTokens, UserProfile};
