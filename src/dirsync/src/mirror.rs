//! Local mirror of directory groups
//!
//! Groups are keyed by their unique, case-sensitive name. Directory imports
//! only ever touch membership and the import timestamp; roles and links are
//! owned by the mapping and linking operations.

use crate::error::{Result, SyncError};
use crate::inheritance::InheritanceResolver;
use crate::store::GroupStore;
use crate::types::{DirectoryGroup, GroupId, RoleId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info};

/// Result of an upsert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertOutcome {
    Created,
    Updated,
}

/// Directory group mirror
#[derive(Clone)]
pub struct GroupMirror {
    store: Arc<dyn GroupStore>,
    resolver: InheritanceResolver,
}

impl GroupMirror {
    pub fn new(store: Arc<dyn GroupStore>) -> Self {
        let resolver = InheritanceResolver::new(store.clone());
        Self { store, resolver }
    }

    /// Underlying store
    pub fn store(&self) -> &Arc<dyn GroupStore> {
        &self.store
    }

    /// Resolver bound to this mirror's store
    pub fn resolver(&self) -> &InheritanceResolver {
        &self.resolver
    }

    pub async fn get(&self, id: GroupId) -> Result<Option<DirectoryGroup>> {
        self.store.get(id).await
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<DirectoryGroup>> {
        self.store.find_by_name(name).await
    }

    pub async fn list(&self) -> Result<Vec<DirectoryGroup>> {
        self.store.list().await
    }

    /// Record a directory snapshot of one group
    ///
    /// Creates the group with no roles if absent. Otherwise overwrites
    /// membership and import time only.
    pub async fn upsert_from_snapshot(
        &self,
        name: &str,
        members: Vec<String>,
        timestamp: DateTime<Utc>,
    ) -> Result<UpsertOutcome> {
        match self.store.find_by_name(name).await? {
            Some(mut group) => {
                group.member_names = members;
                group.last_import = Some(timestamp);
                self.store.update(&group).await?;
                debug!(group = %name, members = group.member_names.len(), "Updated directory group");
                Ok(UpsertOutcome::Updated)
            }
            None => {
                let mut group = DirectoryGroup::new(0, name);
                group.member_names = members;
                group.last_import = Some(timestamp);
                let group = self.store.insert(group).await?;
                debug!(group = %name, id = group.id, "Created directory group");
                Ok(UpsertOutcome::Created)
            }
        }
    }

    /// Create a group, resolving inheritance immediately when a link is given
    pub async fn create_group(
        &self,
        name: &str,
        explicit_roles: BTreeSet<RoleId>,
        linked_group: Option<GroupId>,
    ) -> Result<DirectoryGroup> {
        if name.is_empty() {
            return Err(SyncError::InvalidInput(
                "directory group name cannot be empty".to_string(),
            ));
        }

        if let Some(link) = linked_group {
            self.require(link).await?;
        }

        let mut group = DirectoryGroup::new(0, name);
        group.explicit_role_ids = explicit_roles;
        group.linked_group = linked_group;
        self.resolver.refresh(&mut group).await?;

        let group = self.store.insert(group).await?;
        info!(group = %group.name, id = group.id, linked = ?group.linked_group, "Directory group created");
        Ok(group)
    }

    /// Set or clear a group's link and resolve inheritance immediately
    ///
    /// Exactly the roles the previous link contributed are dropped; explicit
    /// roles are kept even when the old link also provided them.
    pub async fn set_linked_group(
        &self,
        group_id: GroupId,
        link: Option<GroupId>,
    ) -> Result<DirectoryGroup> {
        let mut group = self.require(group_id).await?;

        if let Some(link_id) = link {
            if link_id == group_id {
                return Err(SyncError::InvalidInput(format!(
                    "directory group '{}' cannot be linked to itself",
                    group.name
                )));
            }
            self.require(link_id).await?;
        }

        let previous = std::mem::take(&mut group.inherited_role_ids);
        group.linked_group = link;
        self.resolver.refresh(&mut group).await?;
        self.store.update(&group).await?;

        info!(
            group = %group.name,
            linked = ?group.linked_group,
            dropped = previous.difference(&group.inherited_role_ids).count(),
            inherited = group.inherited_role_ids.len(),
            "Directory group link changed"
        );

        Ok(group)
    }

    /// Replace a group's explicitly assigned roles and re-resolve inheritance
    ///
    /// Groups linking to this one are not touched.
    pub async fn set_explicit_roles(
        &self,
        group_id: GroupId,
        roles: BTreeSet<RoleId>,
    ) -> Result<DirectoryGroup> {
        let mut group = self.require(group_id).await?;
        group.explicit_role_ids = roles;
        self.resolver.refresh(&mut group).await?;
        self.store.update(&group).await?;
        Ok(group)
    }

    async fn require(&self, id: GroupId) -> Result<DirectoryGroup> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| SyncError::GroupNotFound(format!("id {}", id)))
    }
}
