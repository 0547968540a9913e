//! User accounts and credential checks.

use std::sync::{Mutex, MutexGuard};

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::models::{Role, User};

/// Store for user accounts.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Create a user with a freshly salted password hash.
    /// Returns `None` when the email is already registered.
    async fn create(&self, email: &str, password: &str, role: Role) -> Result<Option<User>>;

    /// Check credentials. Returns `None` for an unknown email or a wrong
    /// password, indistinguishably.
    async fn authenticate(&self, email: &str, password: &str) -> Result<Option<User>>;

    /// Find a user by id.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;

    /// Find a user by email (case-insensitive).
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
}

/// Hex SHA-256 over password+salt. Demo-grade hashing; a real deployment
/// would use a memory-hard KDF here.
fn hash_password(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hasher.update(salt.as_bytes());
    hex::encode(hasher.finalize())
}

/// In-memory implementation of UserStore.
pub struct MemoryUserStore {
    users: Mutex<Vec<User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self {
            users: Mutex::new(Vec::new()),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<User>>> {
        self.users
            .lock()
            .map_err(|_| anyhow::anyhow!("user store lock poisoned"))
    }
}

impl Default for MemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create(&self, email: &str, password: &str, role: Role) -> Result<Option<User>> {
        let mut users = self.lock()?;

        if users.iter().any(|u| u.email.eq_ignore_ascii_case(email)) {
            return Ok(None);
        }

        let salt = Uuid::new_v4().to_string();
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: hash_password(password, &salt),
            salt,
            role,
            created_at: Utc::now(),
        };
        users.push(user.clone());

        Ok(Some(user))
    }

    async fn authenticate(&self, email: &str, password: &str) -> Result<Option<User>> {
        let users = self.lock()?;

        let Some(user) = users.iter().find(|u| u.email.eq_ignore_ascii_case(email)) else {
            return Ok(None);
        };
        if hash_password(password, &user.salt) != user.password_hash {
            return Ok(None);
        }

        Ok(Some(user.clone()))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let users = self.lock()?;
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let users = self.lock()?;
        Ok(users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }
}
