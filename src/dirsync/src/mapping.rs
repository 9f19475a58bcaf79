//! Rule-driven permission mapping
//!
//! A mapping document assigns role specifiers to directory groups:
//!
//! ```json
//! {
//!     "GG_Sales": ["Sales/Manager", "Employee"],
//!     "GG_Support": ["Helpdesk/User"]
//! }
//! ```
//!
//! The document arrives base64 encoded. A specifier is either a bare role
//! name or `Category/RoleName`; both forms match case-insensitively. Group
//! names match the mirror exactly.

use crate::error::{Result, SyncError};
use crate::mirror::GroupMirror;
use crate::types::{Role, RoleId, UserAccount, UserId};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, info, warn};

/// Decoded mapping document, in document order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingRules {
    entries: Vec<(String, Vec<String>)>,
}

impl MappingRules {
    /// Decode a base64-encoded JSON mapping document
    pub fn decode(blob: &str) -> Result<Self> {
        let compact: String = blob.chars().filter(|c| !c.is_ascii_whitespace()).collect();

        let bytes = STANDARD
            .decode(compact.as_bytes())
            .map_err(|e| SyncError::InvalidInput(format!("mapping is not valid base64: {}", e)))?;

        let document: Value = serde_json::from_slice(&bytes)
            .map_err(|e| SyncError::InvalidInput(format!("mapping is not valid JSON: {}", e)))?;

        Self::from_json(document)
    }

    /// Build rules from an already parsed JSON document
    pub fn from_json(document: Value) -> Result<Self> {
        let Value::Object(map) = document else {
            return Err(SyncError::InvalidInput(
                "mapping must be a JSON object keyed by directory group name".to_string(),
            ));
        };

        let mut entries = Vec::with_capacity(map.len());
        for (group, value) in map {
            let Value::Array(items) = value else {
                return Err(SyncError::InvalidInput(format!(
                    "mapping for '{}' must be an array of role specifiers",
                    group
                )));
            };

            let specifiers = items
                .into_iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s),
                    other => Err(SyncError::InvalidInput(format!(
                        "mapping for '{}' contains a non-string specifier: {}",
                        group, other
                    ))),
                })
                .collect::<Result<Vec<_>>>()?;

            entries.push((group, specifiers));
        }

        Ok(Self { entries })
    }

    /// Group name and specifier list pairs
    pub fn entries(&self) -> &[(String, Vec<String>)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parsed role specifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleSpecifier {
    /// Bare role name
    Name(String),
    /// `Category/RoleName`
    Qualified { category: String, name: String },
}

impl RoleSpecifier {
    /// Parse a specifier, splitting on the first `/`
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        match raw.split_once('/') {
            Some((category, name)) => Self::Qualified {
                category: category.trim().to_string(),
                name: name.trim().to_string(),
            },
            None => Self::Name(raw.to_string()),
        }
    }
}

impl std::fmt::Display for RoleSpecifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Name(name) => write!(f, "{}", name),
            Self::Qualified { category, name } => write!(f, "{}/{}", category, name),
        }
    }
}

/// Unicode default case folding, so `Straße` and `STRASSE` compare equal
fn fold(value: &str) -> String {
    caseless::default_case_fold_str(value)
}

/// Case-folded view of the role catalog, in catalog order
///
/// A blank category counts as no category.
pub struct RoleIndex {
    roles: Vec<(RoleId, String, Option<String>)>,
}

impl RoleIndex {
    pub fn new(catalog: &[Role]) -> Self {
        let roles = catalog
            .iter()
            .map(|role| {
                let category = role
                    .category
                    .as_deref()
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .map(fold);
                (role.id, fold(&role.name), category)
            })
            .collect();
        Self { roles }
    }

    /// First catalog role matching the specifier
    ///
    /// Bare names may match roles in several categories; catalog order decides.
    pub fn resolve(&self, specifier: &RoleSpecifier) -> Option<RoleId> {
        match specifier {
            RoleSpecifier::Name(name) => {
                let name = fold(name);
                self.roles
                    .iter()
                    .find(|(_, role_name, _)| *role_name == name)
                    .map(|(id, _, _)| *id)
            }
            RoleSpecifier::Qualified { category, name } => {
                let category = fold(category);
                let name = fold(name);
                self.roles
                    .iter()
                    .find(|(_, role_name, role_category)| {
                        *role_name == name && role_category.as_deref() == Some(category.as_str())
                    })
                    .map(|(id, _, _)| *id)
            }
        }
    }
}

/// Display-name lookup over the preloaded user list
///
/// Keys are case-folded; the first account wins when display names collide.
pub struct MemberIndex {
    by_name: HashMap<String, UserId>,
}

impl MemberIndex {
    pub fn new(users: &[UserAccount]) -> Self {
        let mut by_name = HashMap::with_capacity(users.len());
        for user in users {
            by_name
                .entry(fold(&user.display_name))
                .or_insert(user.id);
        }
        Self { by_name }
    }

    pub fn resolve(&self, member: &str) -> Option<UserId> {
        self.by_name.get(&fold(member)).copied()
    }
}

/// Per-run mapping results
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MappingOutcome {
    /// Aggregated role set per user
    pub user_roles: BTreeMap<UserId, BTreeSet<RoleId>>,
    /// Groups whose role sets were rewritten
    pub groups_updated: Vec<String>,
    /// Mapping entries naming groups absent from the mirror
    pub unknown_groups: Vec<String>,
    /// Specifiers with no catalog match
    pub unmatched_specifiers: Vec<String>,
    /// Member names with no matching user account
    pub unresolved_members: Vec<String>,
}

/// Applies mapping rules to the group mirror and aggregates per-user roles
pub struct PermissionMapper {
    mirror: GroupMirror,
}

impl PermissionMapper {
    pub fn new(mirror: GroupMirror) -> Self {
        Self { mirror }
    }

    /// Map every rule entry onto its group and collect member role sets
    ///
    /// Each known group's explicit roles become the matched specifiers, its
    /// inheritance is resolved fresh and the result is persisted before the
    /// members are accumulated. Users are not written here.
    pub async fn map(
        &self,
        rules: &MappingRules,
        catalog: &[Role],
        users: &[UserAccount],
    ) -> Result<MappingOutcome> {
        let roles = RoleIndex::new(catalog);
        let members = MemberIndex::new(users);
        let mut outcome = MappingOutcome::default();

        for (group_name, specifiers) in rules.entries() {
            info!(group = %group_name, specifiers = ?specifiers, "Applying mapping entry");

            let Some(mut group) = self.mirror.find_by_name(group_name).await? else {
                warn!(group = %group_name, "Directory group not found in mirror; entry skipped");
                outcome.unknown_groups.push(group_name.clone());
                continue;
            };

            let mut matched = BTreeSet::new();
            for raw in specifiers {
                let specifier = RoleSpecifier::parse(raw);
                match roles.resolve(&specifier) {
                    Some(role_id) => {
                        debug!(group = %group_name, specifier = %specifier, role_id, "Role matched");
                        matched.insert(role_id);
                    }
                    None => {
                        warn!(group = %group_name, specifier = %specifier, "No role matches specifier");
                        outcome.unmatched_specifiers.push(specifier.to_string());
                    }
                }
            }

            group.explicit_role_ids = matched;
            self.mirror.resolver().refresh(&mut group).await?;
            self.mirror.store().update(&group).await?;

            let group_roles = group.assigned_role_ids();
            outcome.groups_updated.push(group.name.clone());

            for member in group.member_names.iter().map(|m| m.trim()).filter(|m| !m.is_empty()) {
                match members.resolve(member) {
                    Some(user_id) => {
                        outcome
                            .user_roles
                            .entry(user_id)
                            .or_default()
                            .extend(group_roles.iter().copied());
                    }
                    None => {
                        warn!(group = %group_name, member = %member, "No user account matches member name");
                        outcome.unresolved_members.push(member.to_string());
                    }
                }
            }
        }

        Ok(outcome)
    }
}
