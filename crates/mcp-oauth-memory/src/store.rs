//! DashMap-backed implementation of every storage trait.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use time::OffsetDateTime;
use tracing::debug;

use mcp_oauth::AuthResult;
use mcp_oauth::error::AuthError;
use mcp_oauth::storage::{
    AuthStores, AuthorizationCodeStorage, ClientStorage, SessionStorage, TokenStorage,
    UsedRefreshTokenStorage, UserProfileStorage,
};
use mcp_oauth::types::{
    AccessTokenMetadata, AuthorizationCode, OAuthClient, OAuthSession, RefreshTokenMetadata,
    UsedRefreshToken, UserProfile,
};

/// In-memory authorization store.
///
/// Every map is keyed the way the engine looks records up: clients by id,
/// sessions by session id, codes by code value, tokens and reuse markers by
/// token hash. Single-use operations (`take`, `take_refresh`, `mark_used`)
/// are atomic per key.
#[derive(Default)]
pub struct InMemoryAuthStore {
    clients: DashMap<String, OAuthClient>,
    sessions: DashMap<String, OAuthSession>,
    codes: DashMap<String, AuthorizationCode>,
    access_tokens: DashMap<String, AccessTokenMetadata>,
    refresh_tokens: DashMap<String, RefreshTokenMetadata>,
    used_refresh_tokens: DashMap<String, UsedRefreshToken>,
    profiles: DashMap<String, UserProfile>,
    /// `(provider, provider_user_id)` to profile id.
    identities: DashMap<(String, String), String>,
}

impl InMemoryAuthStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store set for [`mcp_oauth::AuthorizationServer`], with refresh-token
    /// reuse detection enabled.
    #[must_use]
    pub fn stores(self: &Arc<Self>) -> AuthStores {
        AuthStores::new(
            self.clone(),
            self.clone(),
            self.clone(),
            self.clone(),
            self.clone(),
        )
        .with_reuse_tracking(self.clone())
    }

    /// Removes expired sessions, codes, tokens and reuse markers. Returns the
    /// number of records removed.
    pub fn cleanup_expired(&self) -> u64 {
        let removed = self.sweep_sessions()
            + self.sweep_codes()
            + self.sweep_tokens()
            + self.sweep_used_markers();
        if removed > 0 {
            debug!(removed, "Swept expired in-memory authorization records");
        }
        removed
    }

    /// Number of live authorization sessions.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Number of unredeemed authorization codes.
    #[must_use]
    pub fn code_count(&self) -> usize {
        self.codes.len()
    }

    /// Number of stored access tokens.
    #[must_use]
    pub fn access_token_count(&self) -> usize {
        self.access_tokens.len()
    }

    /// Number of stored refresh tokens.
    #[must_use]
    pub fn refresh_token_count(&self) -> usize {
        self.refresh_tokens.len()
    }

    /// Number of stored user profiles.
    #[must_use]
    pub fn profile_count(&self) -> usize {
        self.profiles.len()
    }

    fn sweep_sessions(&self) -> u64 {
        retain_counting(&self.sessions, |session| !session.is_expired())
    }

    fn sweep_codes(&self) -> u64 {
        retain_counting(&self.codes, |code| !code.is_expired())
    }

    fn sweep_tokens(&self) -> u64 {
        retain_counting(&self.access_tokens, |token| !token.is_expired())
            + retain_counting(&self.refresh_tokens, |token| !token.is_expired())
    }

    fn sweep_used_markers(&self) -> u64 {
        let now = OffsetDateTime::now_utc();
        retain_counting(&self.used_refresh_tokens, |marker| marker.expires_at > now)
    }
}

fn retain_counting<V>(map: &DashMap<String, V>, mut keep: impl FnMut(&V) -> bool) -> u64 {
    let mut removed = 0u64;
    map.retain(|_, value| {
        let kept = keep(value);
        if !kept {
            removed += 1;
        }
        kept
    });
    removed
}

#[async_trait]
impl ClientStorage for InMemoryAuthStore {
    async fn create(&self, client: &OAuthClient) -> AuthResult<()> {
        match self.clients.entry(client.client_id.clone()) {
            Entry::Occupied(_) => Err(AuthError::storage(format!(
                "client {} already exists",
                client.client_id
            ))),
            Entry::Vacant(entry) => {
                entry.insert(client.clone());
                Ok(())
            }
        }
    }

    async fn find_by_client_id(&self, client_id: &str) -> AuthResult<Option<OAuthClient>> {
        Ok(self.clients.get(client_id).map(|client| client.clone()))
    }

    async fn delete(&self, client_id: &str) -> AuthResult<bool> {
        Ok(self.clients.remove(client_id).is_some())
    }

    async fn list(&self, limit: usize, offset: usize) -> AuthResult<Vec<OAuthClient>> {
        let mut clients: Vec<OAuthClient> = self
            .clients
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        clients.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.client_id.cmp(&b.client_id))
        });
        Ok(clients.into_iter().skip(offset).take(limit).collect())
    }
}

#[async_trait]
impl SessionStorage for InMemoryAuthStore {
    async fn create(&self, session: &OAuthSession) -> AuthResult<()> {
        self.sessions
            .insert(session.session_id.clone(), session.clone());
        Ok(())
    }

    async fn find(&self, session_id: &str) -> AuthResult<Option<OAuthSession>> {
        Ok(self.sessions.get(session_id).map(|session| session.clone()))
    }

    async fn delete(&self, session_id: &str) -> AuthResult<bool> {
        Ok(self.sessions.remove(session_id).is_some())
    }

    async fn cleanup_expired(&self) -> AuthResult<u64> {
        Ok(self.sweep_sessions())
    }
}

#[async_trait]
impl AuthorizationCodeStorage for InMemoryAuthStore {
    async fn create(&self, code: &AuthorizationCode) -> AuthResult<()> {
        self.codes.insert(code.code.clone(), code.clone());
        Ok(())
    }

    async fn find(&self, code: &str) -> AuthResult<Option<AuthorizationCode>> {
        Ok(self.codes.get(code).map(|code| code.clone()))
    }

    async fn take(&self, code: &str) -> AuthResult<Option<AuthorizationCode>> {
        Ok(self.codes.remove(code).map(|(_, code)| code))
    }

    async fn delete(&self, code: &str) -> AuthResult<bool> {
        Ok(self.codes.remove(code).is_some())
    }

    async fn cleanup_expired(&self) -> AuthResult<u64> {
        Ok(self.sweep_codes())
    }
}

#[async_trait]
impl TokenStorage for InMemoryAuthStore {
    async fn create_access(
        &self,
        token_hash: &str,
        metadata: &AccessTokenMetadata,
    ) -> AuthResult<()> {
        self.access_tokens
            .insert(token_hash.to_string(), metadata.clone());
        Ok(())
    }

    async fn find_access(&self, token_hash: &str) -> AuthResult<Option<AccessTokenMetadata>> {
        Ok(self.access_tokens.get(token_hash).map(|token| token.clone()))
    }

    async fn delete_access(&self, token_hash: &str) -> AuthResult<bool> {
        Ok(self.access_tokens.remove(token_hash).is_some())
    }

    async fn create_refresh(
        &self,
        token_hash: &str,
        metadata: &RefreshTokenMetadata,
    ) -> AuthResult<()> {
        self.refresh_tokens
            .insert(token_hash.to_string(), metadata.clone());
        Ok(())
    }

    async fn find_refresh(&self, token_hash: &str) -> AuthResult<Option<RefreshTokenMetadata>> {
        Ok(self.refresh_tokens.get(token_hash).map(|token| token.clone()))
    }

    async fn take_refresh(&self, token_hash: &str) -> AuthResult<Option<RefreshTokenMetadata>> {
        Ok(self.refresh_tokens.remove(token_hash).map(|(_, token)| token))
    }

    async fn delete_refresh(&self, token_hash: &str) -> AuthResult<bool> {
        Ok(self.refresh_tokens.remove(token_hash).is_some())
    }

    async fn revoke_family(&self, family_id: &str) -> AuthResult<u64> {
        let removed = retain_counting(&self.access_tokens, |token| token.family_id != family_id)
            + retain_counting(&self.refresh_tokens, |token| token.family_id != family_id);
        debug!(family_id, removed, "Removed token family");
        Ok(removed)
    }

    async fn cleanup_expired(&self) -> AuthResult<u64> {
        Ok(self.sweep_tokens() + self.sweep_used_markers())
    }
}

#[async_trait]
impl UsedRefreshTokenStorage for InMemoryAuthStore {
    async fn mark_used(&self, token_hash: &str, marker: &UsedRefreshToken) -> AuthResult<bool> {
        match self.used_refresh_tokens.entry(token_hash.to_string()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(entry) => {
                entry.insert(marker.clone());
                Ok(true)
            }
        }
    }

    async fn find_used(&self, token_hash: &str) -> AuthResult<Option<UsedRefreshToken>> {
        Ok(self
            .used_refresh_tokens
            .get(token_hash)
            .map(|marker| marker.clone()))
    }
}

#[async_trait]
impl UserProfileStorage for InMemoryAuthStore {
    async fn upsert(&self, profile: &UserProfile) -> AuthResult<UserProfile> {
        let key = (profile.provider.clone(), profile.provider_user_id.clone());

        // The identity entry stays locked until the profile is written
        let stored = match self.identities.entry(key) {
            Entry::Occupied(entry) => {
                let profile_id = entry.get().clone();
                let created_at = self
                    .profiles
                    .get(&profile_id)
                    .map_or(profile.created_at, |existing| existing.created_at);
                let stored = UserProfile {
                    profile_id,
                    created_at,
                    ..profile.clone()
                };
                self.profiles
                    .insert(stored.profile_id.clone(), stored.clone());
                stored
            }
            Entry::Vacant(entry) => {
                self.profiles
                    .insert(profile.profile_id.clone(), profile.clone());
                entry.insert(profile.profile_id.clone());
                profile.clone()
            }
        };
        Ok(stored)
    }

    async fn find_by_provider(
        &self,
        provider: &str,
        provider_user_id: &str,
    ) -> AuthResult<Option<UserProfile>> {
        let key = (provider.to_string(), provider_user_id.to_string());
        let Some(profile_id) = self.identities.get(&key).map(|id| id.clone()) else {
            return Ok(None);
        };
        Ok(self.profiles.get(&profile_id).map(|profile| profile.clone()))
    }

    async fn find_by_id(&self, profile_id: &str) -> AuthResult<Option<UserProfile>> {
        Ok(self.profiles.get(profile_id).map(|profile| profile.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use mcp_oauth::types::{GrantType, ResponseType, TokenEndpointAuthMethod};

    fn client(id: &str) -> OAuthClient {
        let now = OffsetDateTime::now_utc();
        OAuthClient {
            client_id: id.to_string(),
            client_secret_hash: None,
            client_name: None,
            redirect_uris: vec!["http://localhost:3000/cb".to_string()],
            grant_types: vec![GrantType::AuthorizationCode, GrantType::RefreshToken],
            response_types: vec![ResponseType::Code],
            token_endpoint_auth_method: TokenEndpointAuthMethod::None,
            scope: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn refresh(family_id: &str, expires_in: time::Duration) -> RefreshTokenMetadata {
        let now = OffsetDateTime::now_utc();
        RefreshTokenMetadata {
            user_id: "github:1".to_string(),
            client_id: "client".to_string(),
            scope: None,
            resource: Some("https://mcp.example.com".to_string()),
            user_profile_id: "profile".to_string(),
            family_id: family_id.to_string(),
            generation: 0,
            issued_at: now,
            expires_at: now + expires_in,
        }
    }

    fn profile(profile_id: &str, username: &str) -> UserProfile {
        let now = OffsetDateTime::now_utc();
        UserProfile {
            profile_id: profile_id.to_string(),
            user_id: "github:42".to_string(),
            provider: "github".to_string(),
            provider_user_id: "42".to_string(),
            username: Some(username.to_string()),
            email: None,
            display_name: None,
            avatar_url: None,
            raw_profile: serde_json::Value::Null,
            encrypted_access_token: None,
            encrypted_refresh_token: None,
            provider_token_expires_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_duplicate_client_rejected() {
        let store = InMemoryAuthStore::new();
        ClientStorage::create(&store, &client("a")).await.unwrap();
        assert!(ClientStorage::create(&store, &client("a")).await.is_err());
        assert_eq!(store.list(10, 0).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_refresh_take_is_single_use() {
        let store = Arc::new(InMemoryAuthStore::new());
        store
            .create_refresh("hash", &refresh("family", time::Duration::hours(1)))
            .await
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.take_refresh("hash").await.unwrap().is_some()
            }));
        }
        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_mark_used_once() {
        let store = InMemoryAuthStore::new();
        let now = OffsetDateTime::now_utc();
        let marker = UsedRefreshToken {
            family_id: "family".to_string(),
            client_id: "client".to_string(),
            generation: 0,
            used_at: now,
            expires_at: now + time::Duration::days(1),
        };
        assert!(store.mark_used("hash", &marker).await.unwrap());
        assert!(!store.mark_used("hash", &marker).await.unwrap());
        assert!(store.find_used("hash").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_revoke_family_only_touches_family() {
        let store = InMemoryAuthStore::new();
        store
            .create_refresh("a", &refresh("one", time::Duration::hours(1)))
            .await
            .unwrap();
        store
            .create_refresh("b", &refresh("one", time::Duration::hours(1)))
            .await
            .unwrap();
        store
            .create_refresh("c", &refresh("two", time::Duration::hours(1)))
            .await
            .unwrap();

        assert_eq!(store.revoke_family("one").await.unwrap(), 2);
        assert_eq!(store.refresh_token_count(), 1);
        assert!(store.find_refresh("c").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_upsert_keeps_profile_id() {
        let store = InMemoryAuthStore::new();
        let first = store.upsert(&profile("p1", "octocat")).await.unwrap();
        let second = store.upsert(&profile("p2", "renamed")).await.unwrap();

        assert_eq!(first.profile_id, "p1");
        assert_eq!(second.profile_id, "p1");
        assert_eq!(second.created_at, first.created_at);
        assert_eq!(second.username.as_deref(), Some("renamed"));
        assert_eq!(store.profile_count(), 1);

        let found = store.find_by_provider("github", "42").await.unwrap().unwrap();
        assert_eq!(found.username.as_deref(), Some("renamed"));
        assert!(store.find_by_provider("github", "43").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cleanup_expired() {
        let store = InMemoryAuthStore::new();
        store
            .create_refresh("live", &refresh("f", time::Duration::hours(1)))
            .await
            .unwrap();
        store
            .create_refresh("dead", &refresh("f", time::Duration::seconds(-1)))
            .await
            .unwrap();

        assert_eq!(store.cleanup_expired(), 1);
        assert_eq!(store.refresh_token_count(), 1);
        assert_eq!(store.cleanup_expired(), 0);
    }
}
