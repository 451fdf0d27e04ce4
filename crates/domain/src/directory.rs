//! User directory: resolves usernames to identities.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use common::{UserIdentity, UserRole};
use thiserror::Error;

/// Errors reported by a user directory.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("User directory unavailable: {0}")]
    Unavailable(String),
}

/// External source of user identities.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Looks up a user by username. `None` if no such user exists.
    async fn resolve(&self, username: &str) -> Result<Option<UserIdentity>, DirectoryError>;

    /// Counts users holding a role.
    async fn count_by_role(&self, role: UserRole) -> Result<u64, DirectoryError>;
}

/// In-memory directory keyed by username.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserDirectory {
    users: Arc<RwLock<HashMap<String, UserIdentity>>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a user.
    pub fn insert(&self, user: UserIdentity) {
        self.users
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(user.username.clone(), user);
    }

    /// Creates a directory holding the given users.
    pub fn with_users(users: impl IntoIterator<Item = UserIdentity>) -> Self {
        let directory = Self::new();
        for user in users {
            directory.insert(user);
        }
        directory
    }

    pub fn len(&self) -> usize {
        self.users
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn resolve(&self, username: &str) -> Result<Option<UserIdentity>, DirectoryError> {
        Ok(self
            .users
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(username)
            .cloned())
    }

    async fn count_by_role(&self, role: UserRole) -> Result<u64, DirectoryError> {
        let users = self.users.read().unwrap_or_else(PoisonError::into_inner);
        Ok(users.values().filter(|user| user.role == role).count() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolve_known_and_unknown() {
        let alice = UserIdentity::customer("alice");
        let directory = InMemoryUserDirectory::with_users([alice.clone()]);

        assert_eq!(directory.resolve("alice").await.unwrap(), Some(alice));
        assert_eq!(directory.resolve("mallory").await.unwrap(), None);
    }

    #[tokio::test]
    async fn count_by_role() {
        let directory = InMemoryUserDirectory::with_users([
            UserIdentity::customer("alice"),
            UserIdentity::customer("bob"),
            UserIdentity::admin("root"),
        ]);

        assert_eq!(directory.count_by_role(UserRole::Customer).await.unwrap(), 2);
        assert_eq!(directory.count_by_role(UserRole::Admin).await.unwrap(), 1);
        assert_eq!(directory.len(), 3);
    }
}
