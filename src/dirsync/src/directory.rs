//! Directory access boundary
//!
//! The engine only needs one capability from the directory: a search
//! returning entries with named attribute values. Entries are converted to
//! typed snapshots immediately after the search.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[cfg(feature = "ldap")]
pub mod ldap;

#[cfg(feature = "ldap")]
pub use ldap::LdapDirectoryClient;

/// One search result entry
///
/// Attribute names are stored lowercased so lookups are case-insensitive,
/// as attribute names are in LDAP.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub dn: String,
    attributes: BTreeMap<String, Vec<String>>,
}

impl DirectoryEntry {
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Append values to an attribute
    pub fn with_attribute<I, S>(mut self, name: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes
            .entry(name.to_lowercase())
            .or_default()
            .extend(values.into_iter().map(Into::into));
        self
    }

    /// All values of an attribute
    pub fn values(&self, name: &str) -> &[String] {
        self.attributes
            .get(&name.to_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// First non-blank value of an attribute
    pub fn first(&self, name: &str) -> Option<&str> {
        self.values(name)
            .iter()
            .map(|v| v.as_str())
            .find(|v| !v.trim().is_empty())
    }
}

/// Search-capable directory client
#[async_trait]
pub trait DirectoryClient: Send + Sync {
    /// Search below `base` for entries matching `filter`, returning `attributes`
    async fn search(
        &self,
        base: &str,
        filter: &str,
        attributes: &[&str],
    ) -> Result<Vec<DirectoryEntry>>;
}

/// Validated group entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSnapshot {
    pub dn: String,
    pub name: String,
    pub member_dns: Vec<String>,
}

impl GroupSnapshot {
    /// Extract a group from a search entry; `None` when it carries no name
    pub fn from_entry(entry: &DirectoryEntry, name_attribute: &str, member_attribute: &str) -> Option<Self> {
        let name = entry.first(name_attribute)?.to_string();
        let member_dns = entry
            .values(member_attribute)
            .iter()
            .filter(|dn| !dn.trim().is_empty())
            .cloned()
            .collect();

        Some(Self {
            dn: entry.dn.clone(),
            name,
            member_dns,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_lookup_ignores_case() {
        let entry = DirectoryEntry::new("CN=GG_Sales,OU=Groups,DC=corp")
            .with_attribute("CN", ["GG_Sales"])
            .with_attribute("member", ["CN=Alice,OU=Users,DC=corp"])
            .with_attribute("Member", ["CN=Bob,OU=Users,DC=corp"]);

        assert_eq!(entry.first("cn"), Some("GG_Sales"));
        assert_eq!(entry.values("MEMBER").len(), 2);
        assert!(entry.values("description").is_empty());
    }

    #[test]
    fn test_group_snapshot_requires_name() {
        let unnamed = DirectoryEntry::new("CN=x,DC=corp").with_attribute("cn", [" "]);
        assert!(GroupSnapshot::from_entry(&unnamed, "cn", "member").is_none());

        let named = DirectoryEntry::new("CN=GG_Empty,DC=corp").with_attribute("cn", ["GG_Empty"]);
        let snapshot = GroupSnapshot::from_entry(&named, "cn", "member").unwrap();
        assert_eq!(snapshot.name, "GG_Empty");
        assert!(snapshot.member_dns.is_empty());
    }
}
