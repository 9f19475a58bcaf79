//! Host application collaborators
//!
//! The role catalog, user accounts and login history belong to the host
//! application. The engine only reads them, except for the role-set write on
//! [`UserDirectory::replace_roles`]. In-memory implementations are provided for
//! embedding and tests.

use crate::error::{Result, SyncError};
use crate::types::{Role, RoleId, UserAccount, UserId};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Read-only role catalog
#[async_trait]
pub trait RoleCatalog: Send + Sync {
    /// List all roles in catalog order
    async fn list_roles(&self) -> Result<Vec<Role>>;
}

/// User accounts owned by the host
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// List all user accounts in directory order
    async fn list_users(&self) -> Result<Vec<UserAccount>>;

    /// Get a user account by ID
    async fn get_user(&self, id: UserId) -> Result<Option<UserAccount>>;

    /// Replace the account's role set and flag it as directory-managed
    async fn replace_roles(&self, id: UserId, roles: &BTreeSet<RoleId>) -> Result<()>;
}

/// Login event history
#[async_trait]
pub trait LoginHistory: Send + Sync {
    /// IDs of users with at least one recorded login
    async fn users_with_logins(&self) -> Result<BTreeSet<UserId>>;
}

/// In-memory role catalog
pub struct InMemoryRoleCatalog {
    roles: Vec<Role>,
}

impl InMemoryRoleCatalog {
    pub fn new(roles: Vec<Role>) -> Self {
        Self { roles }
    }
}

#[async_trait]
impl RoleCatalog for InMemoryRoleCatalog {
    async fn list_roles(&self) -> Result<Vec<Role>> {
        Ok(self.roles.clone())
    }
}

/// In-memory user directory
pub struct InMemoryUserDirectory {
    users: Arc<RwLock<Vec<UserAccount>>>,
}

impl InMemoryUserDirectory {
    pub fn new(users: Vec<UserAccount>) -> Self {
        Self {
            users: Arc::new(RwLock::new(users)),
        }
    }

    /// Add a user account at the end of the directory
    pub async fn add_user(&self, user: UserAccount) {
        self.users.write().await.push(user);
    }

    /// Remove a user account, returning it if present
    pub async fn remove_user(&self, id: UserId) -> Option<UserAccount> {
        let mut users = self.users.write().await;
        let index = users.iter().position(|u| u.id == id)?;
        Some(users.remove(index))
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn list_users(&self) -> Result<Vec<UserAccount>> {
        Ok(self.users.read().await.clone())
    }

    async fn get_user(&self, id: UserId) -> Result<Option<UserAccount>> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn replace_roles(&self, id: UserId, roles: &BTreeSet<RoleId>) -> Result<()> {
        let mut users = self.users.write().await;
        let user = users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| SyncError::Storage(format!("user {} does not exist", id)))?;

        user.role_ids = roles.clone();
        user.directory_managed = true;
        Ok(())
    }
}

/// In-memory login history
#[derive(Default)]
pub struct InMemoryLoginHistory {
    logged_in: Arc<RwLock<BTreeSet<UserId>>>,
}

impl InMemoryLoginHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a login event for a user
    pub async fn record_login(&self, id: UserId) {
        self.logged_in.write().await.insert(id);
    }
}

#[async_trait]
impl LoginHistory for InMemoryLoginHistory {
    async fn users_with_logins(&self) -> Result<BTreeSet<UserId>> {
        Ok(self.logged_in.read().await.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replace_roles_marks_managed() {
        let users = InMemoryUserDirectory::new(vec![
            UserAccount::new(1, "alice", "Alice Martin").with_roles([9]),
        ]);

        let roles: BTreeSet<RoleId> = [1, 2].into_iter().collect();
        users.replace_roles(1, &roles).await.unwrap();

        let alice = users.get_user(1).await.unwrap().unwrap();
        assert_eq!(alice.role_ids, roles);
        assert!(alice.directory_managed);
    }

    #[tokio::test]
    async fn test_add_and_remove_users() {
        let users = InMemoryUserDirectory::new(vec![UserAccount::new(1, "alice", "Alice Martin")]);
        users.add_user(UserAccount::new(2, "bob", "Bob Durand")).await;

        let logins: Vec<String> = users.list_users().await.unwrap().into_iter().map(|u| u.login).collect();
        assert_eq!(logins, vec!["alice", "bob"]);

        let removed = users.remove_user(1).await.unwrap();
        assert_eq!(removed.login, "alice");
        assert!(users.remove_user(1).await.is_none());
        assert!(users.get_user(1).await.unwrap().is_none());
        assert!(matches!(
            users.replace_roles(1, &BTreeSet::new()).await,
            Err(SyncError::Storage(_))
        ));
    }

    #[tokio::test]
    async fn test_replace_roles_unknown_user() {
        let users = InMemoryUserDirectory::new(Vec::new());
        let result = users.replace_roles(7, &BTreeSet::new()).await;
        assert!(matches!(result, Err(SyncError::Storage(_))));
    }

    #[tokio::test]
    async fn test_login_history() {
        let history = InMemoryLoginHistory::new();
        history.record_login(3).await;
        history.record_login(3).await;
        history.record_login(1).await;

        let ids: Vec<UserId> = history.users_with_logins().await.unwrap().into_iter().collect();
        assert_eq!(ids, vec![1, 3]);
    }
}
