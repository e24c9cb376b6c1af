//! User profile storage trait.

use async_trait::async_trait;

use crate::AuthResult;
use crate::types::UserProfile;

/// Storage trait for user profiles keyed by `(provider, provider_user_id)`.
#[async_trait]
pub trait UserProfileStorage: Send + Sync {
    /// Inserts or updates a profile.
    ///
    /// When a profile with the same `(provider, provider_user_id)` exists, its
    /// `profile_id` and `created_at` are kept and every other field is
    /// replaced. The stored profile is returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn upsert(&self, profile: &UserProfile) -> AuthResult<UserProfile>;

    /// Finds a profile by provider identity.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_provider(
        &self,
        provider: &str,
        provider_user_id: &str,
    ) -> AuthResult<Option<UserProfile>>;

    /// Finds a profile by its ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_id(&self, profile_id: &str) -> AuthResult<Option<UserProfile>>;
}
