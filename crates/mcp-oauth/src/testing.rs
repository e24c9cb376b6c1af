//! Mock storage shared by unit tests.

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use crate::AuthResult;
use crate::error::AuthError;
use crate::storage::{
    AuthStores, AuthorizationCodeStorage, ClientStorage, SessionStorage, TokenStorage,
    UsedRefreshTokenStorage, UserProfileStorage,
};
use crate::types::{
    AccessTokenMetadata, AuthorizationCode, OAuthClient, OAuthSession, RefreshTokenMetadata,
    UsedRefreshToken, UserProfile,
};

/// Mock store implementing every storage trait over `RwLock<HashMap>`.
#[derive(Default)]
pub struct MockStore {
    clients: RwLock<HashMap<String, OAuthClient>>,
    sessions: RwLock<HashMap<String, OAuthSession>>,
    codes: RwLock<HashMap<String, AuthorizationCode>>,
    access: RwLock<HashMap<String, AccessTokenMetadata>>,
    refresh: RwLock<HashMap<String, RefreshTokenMetadata>>,
    used: RwLock<HashMap<String, UsedRefreshToken>>,
    users: RwLock<HashMap<String, UserProfile>>,
    failing: AtomicBool,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store set with reuse tracking enabled.
    pub fn stores(self: &std::sync::Arc<Self>) -> AuthStores {
        self.stores_without_reuse_tracking()
            .with_reuse_tracking(self.clone())
    }

    /// Store set without the optional reuse capability.
    pub fn stores_without_reuse_tracking(self: &std::sync::Arc<Self>) -> AuthStores {
        AuthStores::new(
            self.clone(),
            self.clone(),
            self.clone(),
            self.clone(),
            self.clone(),
        )
    }

    /// Makes every token lookup fail with a storage error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn corrupt_client_secret(&self, client_id: &str, hash: &str) {
        if let Some(client) = self.clients.write().unwrap().get_mut(client_id) {
            client.client_secret_hash = Some(hash.to_string());
        }
    }

    pub fn session_count(&self) -> usize {
        self.sessions.read().unwrap().len()
    }

    pub fn code_count(&self) -> usize {
        self.codes.read().unwrap().len()
    }

    pub fn access_count(&self) -> usize {
        self.access.read().unwrap().len()
    }

    pub fn refresh_count(&self) -> usize {
        self.refresh.read().unwrap().len()
    }

    pub fn user_profiles(&self) -> Vec<UserProfile> {
        self.users.read().unwrap().values().cloned().collect()
    }

    fn check(&self) -> AuthResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(AuthError::storage("mock storage failure"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ClientStorage for MockStore {
    async fn create(&self, client: &OAuthClient) -> AuthResult<()> {
        self.clients
            .write()
            .unwrap()
            .insert(client.client_id.clone(), client.clone());
        Ok(())
    }

    async fn find_by_client_id(&self, client_id: &str) -> AuthResult<Option<OAuthClient>> {
        Ok(self.clients.read().unwrap().get(client_id).cloned())
    }

    async fn delete(&self, client_id: &str) -> AuthResult<bool> {
        Ok(self.clients.write().unwrap().remove(client_id).is_some())
    }

    async fn list(&self, limit: usize, offset: usize) -> AuthResult<Vec<OAuthClient>> {
        Ok(self
            .clients
            .read()
            .unwrap()
            .values()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl SessionStorage for MockStore {
    async fn create(&self, session: &OAuthSession) -> AuthResult<()> {
        self.sessions
            .write()
            .unwrap()
            .insert(session.session_id.clone(), session.clone());
        Ok(())
    }

    async fn find(&self, session_id: &str) -> AuthResult<Option<OAuthSession>> {
        Ok(self.sessions.read().unwrap().get(session_id).cloned())
    }

    async fn delete(&self, session_id: &str) -> AuthResult<bool> {
        Ok(self.sessions.write().unwrap().remove(session_id).is_some())
    }

    async fn cleanup_expired(&self) -> AuthResult<u64> {
        let mut sessions = self.sessions.write().unwrap();
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired());
        Ok((before - sessions.len()) as u64)
    }
}

#[async_trait]
impl AuthorizationCodeStorage for MockStore {
    async fn create(&self, code: &AuthorizationCode) -> AuthResult<()> {
        self.codes
            .write()
            .unwrap()
            .insert(code.code.clone(), code.clone());
        Ok(())
    }

    async fn find(&self, code: &str) -> AuthResult<Option<AuthorizationCode>> {
        Ok(self.codes.read().unwrap().get(code).cloned())
    }

    async fn take(&self, code: &str) -> AuthResult<Option<AuthorizationCode>> {
        Ok(self.codes.write().unwrap().remove(code))
    }

    async fn delete(&self, code: &str) -> AuthResult<bool> {
        Ok(self.codes.write().unwrap().remove(code).is_some())
    }

    async fn cleanup_expired(&self) -> AuthResult<u64> {
        let mut codes = self.codes.write().unwrap();
        let before = codes.len();
        codes.retain(|_, c| !c.is_expired());
        Ok((before - codes.len()) as u64)
    }
}

#[async_trait]
impl TokenStorage for MockStore {
    async fn create_access(
        &self,
        token_hash: &str,
        metadata: &AccessTokenMetadata,
    ) -> AuthResult<()> {
        self.check()?;
        self.access
            .write()
            .unwrap()
            .insert(token_hash.to_string(), metadata.clone());
        Ok(())
    }

    async fn find_access(&self, token_hash: &str) -> AuthResult<Option<AccessTokenMetadata>> {
        self.check()?;
        Ok(self.access.read().unwrap().get(token_hash).cloned())
    }

    async fn delete_access(&self, token_hash: &str) -> AuthResult<bool> {
        self.check()?;
        Ok(self.access.write().unwrap().remove(token_hash).is_some())
    }

    async fn create_refresh(
        &self,
        token_hash: &str,
        metadata: &RefreshTokenMetadata,
    ) -> AuthResult<()> {
        self.check()?;
        self.refresh
            .write()
            .unwrap()
            .insert(token_hash.to_string(), metadata.clone());
        Ok(())
    }

    async fn find_refresh(&self, token_hash: &str) -> AuthResult<Option<RefreshTokenMetadata>> {
        self.check()?;
        Ok(self.refresh.read().unwrap().get(token_hash).cloned())
    }

    async fn take_refresh(&self, token_hash: &str) -> AuthResult<Option<RefreshTokenMetadata>> {
        self.check()?;
        Ok(self.refresh.write().unwrap().remove(token_hash))
    }

    async fn delete_refresh(&self, token_hash: &str) -> AuthResult<bool> {
        self.check()?;
        Ok(self.refresh.write().unwrap().remove(token_hash).is_some())
    }

    async fn revoke_family(&self, family_id: &str) -> AuthResult<u64> {
        self.check()?;
        let mut access = self.access.write().unwrap();
        let mut refresh = self.refresh.write().unwrap();
        let before = access.len() + refresh.len();
        access.retain(|_, t| t.family_id != family_id);
        refresh.retain(|_, t| t.family_id != family_id);
        Ok((before - access.len() - refresh.len()) as u64)
    }

    async fn cleanup_expired(&self) -> AuthResult<u64> {
        let mut access = self.access.write().unwrap();
        let mut refresh = self.refresh.write().unwrap();
        let before = access.len() + refresh.len();
        access.retain(|_, t| !t.is_expired());
        refresh.retain(|_, t| !t.is_expired());
        Ok((before - access.len() - refresh.len()) as u64)
    }
}

#[async_trait]
impl UsedRefreshTokenStorage for MockStore {
    async fn mark_used(&self, token_hash: &str, marker: &UsedRefreshToken) -> AuthResult<bool> {
        let mut used = self.used.write().unwrap();
        if used.contains_key(token_hash) {
            return Ok(false);
        }
        used.insert(token_hash.to_string(), marker.clone());
        Ok(true)
    }

    async fn find_used(&self, token_hash: &str) -> AuthResult<Option<UsedRefreshToken>> {
        Ok(self.used.read().unwrap().get(token_hash).cloned())
    }
}

#[async_trait]
impl UserProfileStorage for MockStore {
    async fn upsert(&self, profile: &UserProfile) -> AuthResult<UserProfile> {
        let mut users = self.users.write().unwrap();
        let existing = users
            .values()
            .find(|p| {
                p.provider == profile.provider && p.provider_user_id == profile.provider_user_id
            })
            .cloned();
        let stored = match existing {
            Some(existing) => UserProfile {
                profile_id: existing.profile_id,
                created_at: existing.created_at,
                ..profile.clone()
            },
            None => profile.clone(),
        };
        users.insert(stored.profile_id.clone(), stored.clone());
        Ok(stored)
    }

    async fn find_by_provider(
        &self,
        provider: &str,
        provider_user_id: &str,
    ) -> AuthResult<Option<UserProfile>> {
        Ok(self
            .users
            .read()
            .unwrap()
            .values()
            .find(|p| p.provider == provider && p.provider_user_id == provider_user_id)
            .cloned())
    }

    async fn find_by_id(&self, profile_id: &str) -> AuthResult<Option<UserProfile>> {
        Ok(self.users.read().unwrap().get(profile_id).cloned())
    }
}
