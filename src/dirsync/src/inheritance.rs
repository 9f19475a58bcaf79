//! One-hop role inheritance between linked directory groups
//!
//! A group linked to another group inherits the linked group's *current*
//! effective roles at the moment of resolution. Resolution is pull-based:
//! nothing is recomputed when the linked group changes later, and a single
//! call never looks past the immediate link. Chains `A → B → C` converge over
//! repeated mapping runs only.

use crate::error::Result;
use crate::store::GroupStore;
use crate::types::{DirectoryGroup, RoleId};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Resolves a group's effective role set through its link
#[derive(Clone)]
pub struct InheritanceResolver {
    groups: Arc<dyn GroupStore>,
}

impl InheritanceResolver {
    pub fn new(groups: Arc<dyn GroupStore>) -> Self {
        Self { groups }
    }

    /// Roles the linked group currently contributes
    ///
    /// Empty when the group has no link. A link to a group that no longer
    /// exists contributes nothing.
    pub async fn linked_roles(&self, group: &DirectoryGroup) -> Result<BTreeSet<RoleId>> {
        let Some(linked_id) = group.linked_group else {
            return Ok(BTreeSet::new());
        };

        match self.groups.get(linked_id).await? {
            Some(linked) => {
                let roles = linked.assigned_role_ids();
                debug!(
                    group = %group.name,
                    linked = %linked.name,
                    inherited = roles.len(),
                    "Resolved linked group roles"
                );
                Ok(roles)
            }
            None => {
                warn!(
                    group = %group.name,
                    linked_group = linked_id,
                    "Linked directory group not found; nothing inherited"
                );
                Ok(BTreeSet::new())
            }
        }
    }

    /// Effective role set: explicit roles plus the linked group's current roles
    pub async fn resolve(&self, group: &DirectoryGroup) -> Result<BTreeSet<RoleId>> {
        let mut roles = group.explicit_role_ids.clone();
        roles.extend(self.linked_roles(group).await?);
        Ok(roles)
    }

    /// Replace the group's inherited snapshot with a fresh pull from its link
    pub async fn refresh(&self, group: &mut DirectoryGroup) -> Result<()> {
        group.inherited_role_ids = self.linked_roles(group).await?;
        Ok(())
    }
}
