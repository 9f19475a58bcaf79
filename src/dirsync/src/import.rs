//! Directory group import
//!
//! Mirrors every directory group and its member display names. Member DNs
//! are resolved one by one against the configured person filter; members that
//! do not resolve to a named person, or whose entry no longer exists, are left
//! out.

use crate::config::DirectoryConfig;
use crate::directory::{DirectoryClient, GroupSnapshot};
use crate::error::{Result, SyncError};
use crate::mirror::{GroupMirror, UpsertOutcome};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Import pass results
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    pub created: Vec<String>,
    pub updated: Vec<String>,
    /// DNs of group entries without a usable name
    pub skipped_entries: Vec<String>,
}

/// Pulls group snapshots from the directory into the mirror
pub struct GroupImporter {
    client: Arc<dyn DirectoryClient>,
    mirror: GroupMirror,
    config: DirectoryConfig,
}

impl GroupImporter {
    pub fn new(
        client: Arc<dyn DirectoryClient>,
        mirror: GroupMirror,
        config: DirectoryConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            client,
            mirror,
            config,
        })
    }

    /// Import all groups
    ///
    /// Any directory or storage failure aborts the batch; groups already
    /// written stay written.
    pub async fn run(&self) -> Result<ImportReport> {
        let mut report = ImportReport::default();
        let config = &self.config;

        let entries = self
            .client
            .search(
                &config.base_dn,
                &config.group_filter,
                &[config.group_name_attribute.as_str(), config.member_attribute.as_str()],
            )
            .await?;

        info!(base_dn = %config.base_dn, entries = entries.len(), "Directory groups fetched");

        for entry in &entries {
            let Some(snapshot) =
                GroupSnapshot::from_entry(entry, &config.group_name_attribute, &config.member_attribute)
            else {
                warn!(dn = %entry.dn, "Directory entry has no group name; skipped");
                report.skipped_entries.push(entry.dn.clone());
                continue;
            };

            let members = self.resolve_members(&snapshot).await?;
            let outcome = self
                .mirror
                .upsert_from_snapshot(&snapshot.name, members, Utc::now())
                .await?;

            match outcome {
                UpsertOutcome::Created => report.created.push(snapshot.name),
                UpsertOutcome::Updated => report.updated.push(snapshot.name),
            }
        }

        info!(
            created = report.created.len(),
            updated = report.updated.len(),
            skipped = report.skipped_entries.len(),
            "Directory group import complete"
        );

        Ok(report)
    }

    async fn resolve_members(&self, snapshot: &GroupSnapshot) -> Result<Vec<String>> {
        let config = &self.config;
        let mut names = Vec::with_capacity(snapshot.member_dns.len());

        for dn in &snapshot.member_dns {
            let found = match self
                .client
                .search(dn, &config.person_filter, &[config.person_name_attribute.as_str()])
                .await
            {
                Ok(found) => found,
                Err(SyncError::EntryNotFound(_)) => {
                    warn!(group = %snapshot.name, member_dn = %dn, "Member entry no longer exists; skipped");
                    continue;
                }
                Err(e) => return Err(e),
            };

            match found.first().and_then(|person| person.first(&config.person_name_attribute)) {
                Some(name) => names.push(name.to_string()),
                None => debug!(group = %snapshot.name, member_dn = %dn, "Member is not a named person"),
            }
        }

        Ok(names)
    }
}
