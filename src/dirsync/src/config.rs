//! Sync engine and directory configuration
//!
//! Configuration is passed in as values at construction time. `from_env`
//! helpers exist for hosts that keep directory credentials in the process
//! environment.

use crate::error::{Result, SyncError};
use crate::types::TierMarkers;
use serde::{Deserialize, Serialize};

/// Default gate-keeping directory group for session promotion
pub const DEFAULT_GATE_GROUP: &str = "RC_ODOO_Login-Prod";

/// Environment variable names read by [`DirectoryConfig::from_env`]
pub mod env {
    pub const URL: &str = "DIRSYNC_LDAP_URL";
    pub const BIND_DN: &str = "DIRSYNC_LDAP_BIND_DN";
    pub const BIND_PASSWORD: &str = "DIRSYNC_LDAP_PASSWORD";
    pub const BASE_DN: &str = "DIRSYNC_LDAP_BASE_DN";
    pub const GROUP_FILTER: &str = "DIRSYNC_LDAP_GROUP_FILTER";
    pub const PERSON_FILTER: &str = "DIRSYNC_LDAP_PERSON_FILTER";
    pub const CONNECT_TIMEOUT: &str = "DIRSYNC_LDAP_CONNECT_TIMEOUT";
}

/// Directory connection and query settings
#[derive(Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// Server URL (e.g., "ldap://10.0.0.5:389")
    #[serde(default)]
    pub url: String,

    /// Bind DN used to authenticate
    #[serde(default)]
    pub bind_dn: String,

    /// Bind password
    #[serde(default)]
    pub bind_password: String,

    /// Search base for group discovery
    #[serde(default)]
    pub base_dn: String,

    /// Filter selecting group entries under `base_dn`
    #[serde(default = "default_group_filter")]
    pub group_filter: String,

    /// Filter applied when resolving a member DN to a person entry
    #[serde(default = "default_person_filter")]
    pub person_filter: String,

    /// Attribute carrying the group name
    #[serde(default = "default_name_attribute")]
    pub group_name_attribute: String,

    /// Attribute listing member DNs on a group entry
    #[serde(default = "default_member_attribute")]
    pub member_attribute: String,

    /// Attribute carrying a person's display name
    #[serde(default = "default_name_attribute")]
    pub person_name_attribute: String,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl std::fmt::Debug for DirectoryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryConfig")
            .field("url", &self.url)
            .field("bind_dn", &self.bind_dn)
            .field("bind_password", &"***REDACTED***")
            .field("base_dn", &self.base_dn)
            .field("group_filter", &self.group_filter)
            .field("person_filter", &self.person_filter)
            .field("group_name_attribute", &self.group_name_attribute)
            .field("member_attribute", &self.member_attribute)
            .field("person_name_attribute", &self.person_name_attribute)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .finish()
    }
}

fn default_group_filter() -> String {
    "(&(objectClass=group)(cn=*))".to_string()
}

fn default_person_filter() -> String {
    "(&(objectClass=person))".to_string()
}

fn default_name_attribute() -> String {
    "cn".to_string()
}

fn default_member_attribute() -> String {
    "member".to_string()
}

fn default_connect_timeout() -> u64 {
    10
}

impl DirectoryConfig {
    /// Create a configuration with the required parameters and default query settings
    pub fn new(
        url: impl Into<String>,
        bind_dn: impl Into<String>,
        bind_password: impl Into<String>,
        base_dn: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            bind_dn: bind_dn.into(),
            bind_password: bind_password.into(),
            base_dn: base_dn.into(),
            group_filter: default_group_filter(),
            person_filter: default_person_filter(),
            group_name_attribute: default_name_attribute(),
            member_attribute: default_member_attribute(),
            person_name_attribute: default_name_attribute(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }

    /// Load from `DIRSYNC_LDAP_*` environment variables and validate
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup and validate
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).unwrap_or_default();

        let mut config = Self::new(
            get(env::URL),
            get(env::BIND_DN),
            get(env::BIND_PASSWORD),
            get(env::BASE_DN),
        );

        if let Some(filter) = lookup(env::GROUP_FILTER).filter(|s| !s.trim().is_empty()) {
            config.group_filter = filter;
        }
        if let Some(filter) = lookup(env::PERSON_FILTER).filter(|s| !s.trim().is_empty()) {
            config.person_filter = filter;
        }
        if let Some(timeout) = lookup(env::CONNECT_TIMEOUT).and_then(|s| s.parse().ok()) {
            config.connect_timeout_secs = timeout;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate that every required parameter is present
    pub fn validate(&self) -> Result<()> {
        let missing: Vec<&str> = [
            ("url", &self.url),
            ("bind_dn", &self.bind_dn),
            ("bind_password", &self.bind_password),
            ("base_dn", &self.base_dn),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();

        if !missing.is_empty() {
            return Err(SyncError::Configuration(format!(
                "missing directory parameters: {}",
                missing.join(", ")
            )));
        }

        if self.connect_timeout_secs == 0 {
            return Err(SyncError::Configuration(
                "connect_timeout_secs must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Engine-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Directory group whose members may be promoted to the internal tier
    #[serde(default = "default_gate_group")]
    pub gate_group_name: String,

    /// Marker roles defining public / portal / internal tiers
    #[serde(default)]
    pub tier_markers: TierMarkers,
}

fn default_gate_group() -> String {
    DEFAULT_GATE_GROUP.to_string()
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            gate_group_name: default_gate_group(),
            tier_markers: TierMarkers::default(),
        }
    }
}

impl SyncConfig {
    pub fn with_gate_group(mut self, name: impl Into<String>) -> Self {
        self.gate_group_name = name.into();
        self
    }

    pub fn with_tier_markers(mut self, markers: TierMarkers) -> Self {
        self.tier_markers = markers;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_from_lookup_complete() {
        let config = DirectoryConfig::from_lookup(lookup_from(&[
            (env::URL, "ldap://10.0.0.5"),
            (env::BIND_DN, "cn=svc,dc=corp,dc=local"),
            (env::BIND_PASSWORD, "secret"),
            (env::BASE_DN, "dc=corp,dc=local"),
            (env::CONNECT_TIMEOUT, "3"),
        ]))
        .unwrap();

        assert_eq!(config.url, "ldap://10.0.0.5");
        assert_eq!(config.group_filter, "(&(objectClass=group)(cn=*))");
        assert_eq!(config.connect_timeout_secs, 3);
    }

    #[test]
    fn test_missing_parameters_reported() {
        let err = DirectoryConfig::from_lookup(lookup_from(&[
            (env::URL, "ldap://10.0.0.5"),
            (env::BIND_PASSWORD, "secret"),
        ]))
        .unwrap_err();

        match err {
            SyncError::Configuration(msg) => {
                assert!(msg.contains("bind_dn"));
                assert!(msg.contains("base_dn"));
                assert!(!msg.contains("url"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = DirectoryConfig::new("ldap://h", "cn=svc", "hunter2", "dc=x");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn test_sync_config_defaults() {
        let config: SyncConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.gate_group_name, DEFAULT_GATE_GROUP);
        assert_eq!(config.tier_markers, TierMarkers::default());
    }
}
