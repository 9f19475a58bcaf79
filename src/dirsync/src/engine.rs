//! Sync engine entry points
//!
//! Three independent batch jobs share the group mirror:
//!
//! ```text
//! import_groups             DirectoryClient ──▶ GroupMirror
//! apply_permission_mapping  rules + GroupMirror + RoleCatalog + UserDirectory
//!                             ──▶ PermissionMapper ──▶ MembershipReconciler
//! switch_session_users      GroupMirror + LoginHistory + UserDirectory
//!                             ──▶ SessionPromoter
//! ```
//!
//! Runs are not synchronized with each other. Callers must not overlap runs
//! against the same mirror or the same users.

use crate::config::{DirectoryConfig, SyncConfig};
use crate::directory::DirectoryClient;
use crate::error::{Result, SyncError};
use crate::host::{LoginHistory, RoleCatalog, UserDirectory};
use crate::import::{GroupImporter, ImportReport};
use crate::mapping::{MappingRules, PermissionMapper};
use crate::mirror::GroupMirror;
use crate::promotion::{PromotionReport, SessionPromoter};
use crate::reconcile::{MembershipReconciler, ReconcileReport};
use crate::store::GroupStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Host-owned collaborators
#[derive(Clone)]
pub struct HostServices {
    pub roles: Arc<dyn RoleCatalog>,
    pub users: Arc<dyn UserDirectory>,
    pub logins: Arc<dyn LoginHistory>,
}

/// Permission mapping run results
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MappingReport {
    pub groups_updated: Vec<String>,
    pub unknown_groups: Vec<String>,
    pub unmatched_specifiers: Vec<String>,
    pub unresolved_members: Vec<String>,
    pub reconciliation: ReconcileReport,
}

/// Directory sync engine
pub struct SyncEngine {
    config: SyncConfig,
    mirror: GroupMirror,
    host: HostServices,
    directory: Option<(Arc<dyn DirectoryClient>, DirectoryConfig)>,
}

impl SyncEngine {
    /// Create an engine without directory access
    ///
    /// `import_groups` fails with a configuration error until a directory is
    /// attached with [`SyncEngine::with_directory`].
    pub fn new(config: SyncConfig, groups: Arc<dyn GroupStore>, host: HostServices) -> Self {
        Self {
            config,
            mirror: GroupMirror::new(groups),
            host,
            directory: None,
        }
    }

    /// Attach a directory client and its query settings
    pub fn with_directory(
        mut self,
        client: Arc<dyn DirectoryClient>,
        directory_config: DirectoryConfig,
    ) -> Result<Self> {
        directory_config.validate()?;
        self.directory = Some((client, directory_config));
        Ok(self)
    }

    /// Group mirror, for link and explicit-role management
    pub fn mirror(&self) -> &GroupMirror {
        &self.mirror
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Mirror every directory group and its members
    pub async fn import_groups(&self) -> Result<ImportReport> {
        let (client, directory_config) = self.directory.as_ref().ok_or_else(|| {
            SyncError::Configuration("no directory client configured".to_string())
        })?;

        let started = Instant::now();
        let importer = GroupImporter::new(client.clone(), self.mirror.clone(), directory_config.clone())?;
        let report = importer.run().await?;

        info!(elapsed_ms = started.elapsed().as_millis() as u64, "import_groups finished");
        Ok(report)
    }

    /// Apply a base64-encoded JSON mapping document
    ///
    /// The document is decoded before anything is read or written, so a
    /// malformed document leaves groups and users untouched.
    pub async fn apply_permission_mapping(&self, blob: &str) -> Result<MappingReport> {
        let rules = MappingRules::decode(blob)?;
        let started = Instant::now();

        let catalog = self.host.roles.list_roles().await?;
        let users = self.host.users.list_users().await?;
        info!(
            entries = rules.len(),
            roles = catalog.len(),
            users = users.len(),
            "Starting permission mapping"
        );

        let mapper = PermissionMapper::new(self.mirror.clone());
        let outcome = mapper.map(&rules, &catalog, &users).await?;

        let reconciler = MembershipReconciler::new(self.host.users.clone());
        let reconciliation = reconciler.apply(&users, &outcome.user_roles).await?;

        info!(
            groups = outcome.groups_updated.len(),
            unknown_groups = outcome.unknown_groups.len(),
            users = reconciliation.updated.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "apply_permission_mapping finished"
        );

        Ok(MappingReport {
            groups_updated: outcome.groups_updated,
            unknown_groups: outcome.unknown_groups,
            unmatched_specifiers: outcome.unmatched_specifiers,
            unresolved_members: outcome.unresolved_members,
            reconciliation,
        })
    }

    /// Promote logged-in restricted users listed in the gate group
    pub async fn switch_session_users(&self) -> Result<PromotionReport> {
        let promoter = SessionPromoter::new(
            self.mirror.store().clone(),
            self.host.users.clone(),
            self.host.logins.clone(),
            self.config.clone(),
        );
        let report = promoter.run().await?;

        info!(
            promoted = report.promoted.len(),
            skipped = report.skipped.len(),
            "switch_session_users finished"
        );
        Ok(report)
    }
}
