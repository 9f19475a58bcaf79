//! Directory group persistence

use crate::error::{Result, SyncError};
use crate::types::{DirectoryGroup, GroupId};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "postgres")]
pub use postgres::PostgresGroupStore;

/// Directory group store trait
///
/// Group names are unique. Implementations reject a second group with an
/// existing name instead of creating a duplicate.
#[async_trait]
pub trait GroupStore: Send + Sync {
    /// Get a group by ID
    async fn get(&self, id: GroupId) -> Result<Option<DirectoryGroup>>;

    /// Find a group by exact (case-sensitive) name
    async fn find_by_name(&self, name: &str) -> Result<Option<DirectoryGroup>>;

    /// List all groups ordered by ID
    async fn list(&self) -> Result<Vec<DirectoryGroup>>;

    /// Insert a new group, assigning its ID
    ///
    /// The `id` field of the argument is ignored.
    async fn insert(&self, group: DirectoryGroup) -> Result<DirectoryGroup>;

    /// Overwrite every field of an existing group
    async fn update(&self, group: &DirectoryGroup) -> Result<()>;
}

struct Groups {
    by_id: BTreeMap<GroupId, DirectoryGroup>,
    next_id: GroupId,
}

/// In-memory group store implementation
pub struct InMemoryGroupStore {
    groups: Arc<RwLock<Groups>>,
}

impl InMemoryGroupStore {
    /// Create a new empty in-memory group store
    pub fn new() -> Self {
        Self {
            groups: Arc::new(RwLock::new(Groups {
                by_id: BTreeMap::new(),
                next_id: 1,
            })),
        }
    }
}

impl Default for InMemoryGroupStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GroupStore for InMemoryGroupStore {
    async fn get(&self, id: GroupId) -> Result<Option<DirectoryGroup>> {
        let groups = self.groups.read().await;
        Ok(groups.by_id.get(&id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<DirectoryGroup>> {
        let groups = self.groups.read().await;
        Ok(groups.by_id.values().find(|g| g.name == name).cloned())
    }

    async fn list(&self) -> Result<Vec<DirectoryGroup>> {
        let groups = self.groups.read().await;
        Ok(groups.by_id.values().cloned().collect())
    }

    async fn insert(&self, mut group: DirectoryGroup) -> Result<DirectoryGroup> {
        let mut groups = self.groups.write().await;

        if groups.by_id.values().any(|g| g.name == group.name) {
            return Err(SyncError::Conflict(format!(
                "directory group '{}' already exists",
                group.name
            )));
        }

        group.id = groups.next_id;
        groups.next_id += 1;
        groups.by_id.insert(group.id, group.clone());

        Ok(group)
    }

    async fn update(&self, group: &DirectoryGroup) -> Result<()> {
        let mut groups = self.groups.write().await;

        if groups
            .by_id
            .values()
            .any(|g| g.name == group.name && g.id != group.id)
        {
            return Err(SyncError::Conflict(format!(
                "directory group '{}' already exists",
                group.name
            )));
        }

        match groups.by_id.get_mut(&group.id) {
            Some(existing) => {
                *existing = group.clone();
                Ok(())
            }
            None => Err(SyncError::GroupNotFound(format!("id {}", group.id))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_group_store_lifecycle() {
        let store = InMemoryGroupStore::new();

        let created = store.insert(DirectoryGroup::new(0, "GG_Sales")).await.unwrap();
        assert_eq!(created.id, 1);

        let second = store.insert(DirectoryGroup::new(0, "GG_Support")).await.unwrap();
        assert_eq!(second.id, 2);

        let found = store.find_by_name("GG_Sales").await.unwrap().unwrap();
        assert_eq!(found.id, 1);

        // Exact-case lookup
        assert!(store.find_by_name("gg_sales").await.unwrap().is_none());

        let mut updated = found.clone();
        updated.member_names = vec!["Alice Martin".to_string()];
        store.update(&updated).await.unwrap();
        assert_eq!(store.get(1).await.unwrap().unwrap().member_names.len(), 1);

        let all = store.list().await.unwrap();
        assert_eq!(all.iter().map(|g| g.id).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_duplicate_name_rejected() {
        let store = InMemoryGroupStore::new();
        store.insert(DirectoryGroup::new(0, "GG_Sales")).await.unwrap();

        let result = store.insert(DirectoryGroup::new(0, "GG_Sales")).await;
        assert!(matches!(result, Err(SyncError::Conflict(_))));
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_missing_group() {
        let store = InMemoryGroupStore::new();
        let result = store.update(&DirectoryGroup::new(42, "GG_Ghost")).await;
        assert!(matches!(result, Err(SyncError::GroupNotFound(_))));
    }
}
