//! In-memory identity store.

use super::user::{IdentityStore, Principal};
use crate::auth::password::{PasswordConfig, PasswordHasher};
use crate::error::{LockwardError, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

#[derive(Clone)]
struct StoredUser {
    principal: Principal,
    password_hash: String,
}

/// Identity store backed by a concurrent map, with Argon2id-hashed passwords.
///
/// Cloning shares the underlying map.
#[derive(Clone, Default)]
pub struct InMemoryIdentityStore {
    users: Arc<DashMap<String, StoredUser>>,
    hasher: PasswordHasher,
}

impl InMemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store using cheap hashing parameters, for tests.
    pub fn fast() -> Self {
        Self::with_hasher(PasswordHasher::new(PasswordConfig::fast()))
    }

    pub fn with_hasher(hasher: PasswordHasher) -> Self {
        Self {
            users: Arc::new(DashMap::new()),
            hasher,
        }
    }

    /// Create a user with a generated id.
    pub fn add_user(&self, username: &str, password: &str) -> Result<Principal> {
        self.insert(Principal::new(uuid::Uuid::new_v4().to_string(), username), password)
    }

    /// Create a user with administrative privilege.
    pub fn add_administrator(&self, username: &str, password: &str) -> Result<Principal> {
        self.insert(
            Principal::new(uuid::Uuid::new_v4().to_string(), username).administrator(),
            password,
        )
    }

    /// Insert or replace a user.
    pub fn insert(&self, principal: Principal, password: &str) -> Result<Principal> {
        let username = principal.username.to_lowercase();
        if self
            .users
            .iter()
            .any(|entry| entry.key() != &principal.id && entry.principal.username.to_lowercase() == username)
        {
            return Err(LockwardError::bad_request(format!(
                "Username already taken: {}",
                principal.username
            )));
        }

        let password_hash = self.hasher.hash(password)?;
        self.users.insert(
            principal.id.clone(),
            StoredUser {
                principal: principal.clone(),
                password_hash,
            },
        );
        Ok(principal)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    fn password_hash(&self, id: &str) -> Result<String> {
        self.users
            .get(id)
            .map(|user| user.password_hash.clone())
            .ok_or_else(|| LockwardError::not_found(format!("User {} does not exist", id)))
    }
}

#[async_trait]
impl IdentityStore for InMemoryIdentityStore {
    async fn get_user(&self, id: &str) -> Result<Option<Principal>> {
        Ok(self.users.get(id).map(|user| user.principal.clone()))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Principal>> {
        let username = username.trim().to_lowercase();
        Ok(self
            .users
            .iter()
            .find(|entry| entry.principal.username.to_lowercase() == username)
            .map(|entry| entry.principal.clone()))
    }

    async fn verify_password(&self, id: &str, password: &str) -> Result<bool> {
        let hash = self.password_hash(id)?;
        self.hasher.verify(password, &hash)
    }

    async fn update_password(&self, id: &str, new_password: &str) -> Result<()> {
        let new_hash = self.hasher.hash(new_password)?;
        let mut user = self
            .users
            .get_mut(id)
            .ok_or_else(|| LockwardError::not_found(format!("User {} does not exist", id)))?;
        user.password_hash = new_hash;
        Ok(())
    }
}
