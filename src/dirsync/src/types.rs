//! Core directory sync types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Mirror-local directory group identifier
pub type GroupId = i64;

/// Host role identifier
pub type RoleId = i64;

/// Host user account identifier
pub type UserId = i64;

/// Local mirror of one directory group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryGroup {
    /// Mirror-assigned identifier
    pub id: GroupId,

    /// Directory group name (unique, case-sensitive)
    pub name: String,

    /// Resolved member display names in directory order, duplicates kept
    #[serde(default)]
    pub member_names: Vec<String>,

    /// Time of the last directory import, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_import: Option<DateTime<Utc>>,

    /// Group this one inherits resolved roles from (one hop)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linked_group: Option<GroupId>,

    /// Roles assigned to this group directly
    #[serde(default)]
    pub explicit_role_ids: BTreeSet<RoleId>,

    /// Snapshot of the roles the linked group contributed at the last resolution
    #[serde(default)]
    pub inherited_role_ids: BTreeSet<RoleId>,
}

impl DirectoryGroup {
    /// Create an empty group with no roles and no link
    pub fn new(id: GroupId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            member_names: Vec::new(),
            last_import: None,
            linked_group: None,
            explicit_role_ids: BTreeSet::new(),
            inherited_role_ids: BTreeSet::new(),
        }
    }

    /// Effective role set: explicit roles plus the inherited snapshot
    pub fn assigned_role_ids(&self) -> BTreeSet<RoleId> {
        self.explicit_role_ids
            .union(&self.inherited_role_ids)
            .copied()
            .collect()
    }
}

/// Role catalog entry (read-only)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    /// Category name, `None` for uncategorized roles
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl Role {
    pub fn new(id: RoleId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            category: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

/// Coarse access level of a user account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Public,
    Portal,
    Internal,
}

/// Marker roles that determine a user's tier
///
/// A marker left as `None` is treated as absent from the catalog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierMarkers {
    #[serde(default)]
    pub public: Option<RoleId>,
    #[serde(default)]
    pub portal: Option<RoleId>,
    #[serde(default)]
    pub internal: Option<RoleId>,
}

/// Host user account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: UserId,

    /// Login name
    pub login: String,

    /// Display name, matched against directory member names
    pub display_name: String,

    /// Current role assignment
    #[serde(default)]
    pub role_ids: BTreeSet<RoleId>,

    /// Set once the role set has been written by a sync pass
    #[serde(default)]
    pub directory_managed: bool,
}

impl UserAccount {
    pub fn new(id: UserId, login: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id,
            login: login.into(),
            display_name: display_name.into(),
            role_ids: BTreeSet::new(),
            directory_managed: false,
        }
    }

    pub fn with_roles(mut self, roles: impl IntoIterator<Item = RoleId>) -> Self {
        self.role_ids.extend(roles);
        self
    }

    /// Check whether the account holds a role
    pub fn has_role(&self, role: RoleId) -> bool {
        self.role_ids.contains(&role)
    }

    /// Derive the tier from marker-role membership
    ///
    /// Internal wins over portal, portal over public. Accounts holding none of
    /// the configured markers have no tier.
    pub fn tier(&self, markers: &TierMarkers) -> Option<Tier> {
        if self.holds_marker(markers.internal) {
            Some(Tier::Internal)
        } else if self.holds_marker(markers.portal) {
            Some(Tier::Portal)
        } else if self.holds_marker(markers.public) {
            Some(Tier::Public)
        } else {
            None
        }
    }

    /// Holds the public or portal marker, whatever else it holds
    pub fn is_restricted(&self, markers: &TierMarkers) -> bool {
        self.holds_marker(markers.portal) || self.holds_marker(markers.public)
    }

    fn holds_marker(&self, marker: Option<RoleId>) -> bool {
        marker.is_some_and(|id| self.has_role(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assigned_roles_union() {
        let mut group = DirectoryGroup::new(1, "GG_Sales");
        group.explicit_role_ids = [9].into_iter().collect();
        group.inherited_role_ids = [1, 2, 9].into_iter().collect();

        assert_eq!(group.assigned_role_ids(), [1, 2, 9].into_iter().collect());
    }

    #[test]
    fn test_tier_derivation() {
        let markers = TierMarkers {
            public: Some(10),
            portal: Some(11),
            internal: Some(12),
        };

        let portal = UserAccount::new(1, "alice", "Alice").with_roles([11, 40]);
        assert_eq!(portal.tier(&markers), Some(Tier::Portal));

        let both = UserAccount::new(2, "bob", "Bob").with_roles([10, 12]);
        assert_eq!(both.tier(&markers), Some(Tier::Internal));

        let none = UserAccount::new(3, "carol", "Carol").with_roles([40]);
        assert_eq!(none.tier(&markers), None);

        // Unconfigured markers never match
        assert_eq!(portal.tier(&TierMarkers::default()), None);
    }

    #[test]
    fn test_restricted_ignores_internal_marker() {
        let markers = TierMarkers {
            public: Some(10),
            portal: Some(11),
            internal: Some(12),
        };

        assert!(UserAccount::new(1, "alice", "Alice").with_roles([11]).is_restricted(&markers));
        assert!(UserAccount::new(2, "bob", "Bob").with_roles([10, 12]).is_restricted(&markers));
        assert!(!UserAccount::new(3, "carol", "Carol").with_roles([12]).is_restricted(&markers));
        assert!(!UserAccount::new(4, "dan", "Dan").with_roles([11]).is_restricted(&TierMarkers::default()));
    }

    #[test]
    fn test_role_serde_skips_missing_category() {
        let role = Role::new(3, "Manager");
        let json = serde_json::to_string(&role).unwrap();
        assert_eq!(json, r#"{"id":3,"name":"Manager"}"#);

        let parsed: Role = serde_json::from_str(r#"{"id":3,"name":"Manager","category":"Sales"}"#).unwrap();
        assert_eq!(parsed, Role::new(3, "Manager").with_category("Sales"));
    }
}
