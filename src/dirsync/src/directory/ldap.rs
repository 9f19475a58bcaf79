//! LDAP-backed directory client

use super::{DirectoryClient, DirectoryEntry};
use crate::config::DirectoryConfig;
use crate::error::{Result, SyncError};
use async_trait::async_trait;
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, ResultEntry, Scope, SearchEntry, SearchResult};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// LDAP result code: noSuchObject
const NO_SUCH_OBJECT: u32 = 32;

/// Directory client over `ldap3`
///
/// The configuration is validated at construction, before any network
/// call. The connection is opened and bound on first use and reused for the
/// lifetime of the client.
pub struct LdapDirectoryClient {
    config: DirectoryConfig,
    connection: Mutex<Option<Ldap>>,
}

impl std::fmt::Debug for LdapDirectoryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LdapDirectoryClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl LdapDirectoryClient {
    pub fn new(config: DirectoryConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            connection: Mutex::new(None),
        })
    }

    /// Build a client from `DIRSYNC_LDAP_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(DirectoryConfig::from_env()?)
    }

    pub fn config(&self) -> &DirectoryConfig {
        &self.config
    }

    async fn connection(&self) -> Result<Ldap> {
        let mut guard = self.connection.lock().await;
        if let Some(ldap) = guard.as_ref() {
            return Ok(ldap.clone());
        }

        let ldap = self.connect().await?;
        *guard = Some(ldap.clone());
        Ok(ldap)
    }

    async fn connect(&self) -> Result<Ldap> {
        let url = &self.config.url;
        debug!(url = %url, "Connecting to directory");

        let settings = LdapConnSettings::new()
            .set_conn_timeout(Duration::from_secs(self.config.connect_timeout_secs));

        let (conn, mut ldap) = LdapConnAsync::with_settings(settings, url)
            .await
            .map_err(|e| {
                SyncError::Connectivity(format!("Failed to connect to directory at {}: {}", url, e))
            })?;

        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                warn!(error = %e, "Directory connection driver error");
            }
        });

        let bind_dn = &self.config.bind_dn;
        ldap.simple_bind(bind_dn, &self.config.bind_password)
            .await
            .and_then(|result| result.success())
            .map_err(|e| SyncError::Connectivity(format!("Directory bind failed for {}: {}", bind_dn, e)))?;

        info!(url = %url, bind_dn = %bind_dn, "Directory bind successful");
        Ok(ldap)
    }
}

#[async_trait]
impl DirectoryClient for LdapDirectoryClient {
    async fn search(
        &self,
        base: &str,
        filter: &str,
        attributes: &[&str],
    ) -> Result<Vec<DirectoryEntry>> {
        let mut ldap = self.connection().await?;

        debug!(base = %base, filter = %filter, "Searching directory");

        let result = ldap
            .search(base, Scope::Subtree, filter, attributes.to_vec())
            .await
            .map_err(|e| SyncError::Connectivity(format!("Directory search under {} failed: {}", base, e)))?;

        Ok(search_entries(result, base)?
            .into_iter()
            .map(SearchEntry::construct)
            .map(|entry| {
                entry
                    .attrs
                    .into_iter()
                    .fold(DirectoryEntry::new(entry.dn), |acc, (name, values)| {
                        acc.with_attribute(&name, values)
                    })
            })
            .collect())
    }
}

/// Unwrap a search result; a missing base is reported apart from other failures
fn search_entries(result: SearchResult, base: &str) -> Result<Vec<ResultEntry>> {
    if result.1.rc == NO_SUCH_OBJECT {
        return Err(SyncError::EntryNotFound(base.to_string()));
    }

    result
        .success()
        .map(|(entries, _)| entries)
        .map_err(|e| SyncError::Connectivity(format!("Directory search under {} failed: {}", base, e)))
}
