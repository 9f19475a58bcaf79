//! # CretoAI Directory Sync
//!
//! Synchronizes external directory groups into the host's role model.
//!
//! ## Features
//!
//! - **Group mirror** of directory groups and their member display names
//! - **One-hop inheritance** through linked groups, pulled on demand
//! - **Rule-based mapping** of group names to `Category/Role` specifiers
//! - **Destructive reconciliation** of user role sets
//! - **Session promotion** of gate-group members to the internal tier
//!
//! ## Example
//!
//! ```rust
//! use cretoai_dirsync::{
//!     HostServices, InMemoryGroupStore, InMemoryLoginHistory, InMemoryRoleCatalog,
//!     InMemoryUserDirectory, Role, SyncConfig, SyncEngine, UserAccount,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let host = HostServices {
//!         roles: Arc::new(InMemoryRoleCatalog::new(vec![Role::new(1, "Employee")])),
//!         users: Arc::new(InMemoryUserDirectory::new(vec![UserAccount::new(1, "alice", "Alice")])),
//!         logins: Arc::new(InMemoryLoginHistory::new()),
//!     };
//!     let engine = SyncEngine::new(SyncConfig::default(), Arc::new(InMemoryGroupStore::new()), host);
//!
//!     // {"GG_Staff": ["Employee"]}
//!     let report = engine
//!         .apply_permission_mapping("eyJHR19TdGFmZiI6IFsiRW1wbG95ZWUiXX0=")
//!         .await?;
//!     assert_eq!(report.unknown_groups, vec!["GG_Staff"]);
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod directory;
pub mod engine;
pub mod error;
pub mod host;
pub mod import;
pub mod inheritance;
pub mod mapping;
pub mod mirror;
pub mod promotion;
pub mod reconcile;
pub mod store;
pub mod telemetry;
pub mod types;

// Re-export commonly used types
pub use config::{DirectoryConfig, SyncConfig};
pub use directory::{DirectoryClient, DirectoryEntry};
pub use engine::{HostServices, MappingReport, SyncEngine};
pub use error::{Result, SyncError};
pub use host::{
    InMemoryLoginHistory, InMemoryRoleCatalog, InMemoryUserDirectory, LoginHistory, RoleCatalog,
    UserDirectory,
};
pub use import::ImportReport;
pub use inheritance::InheritanceResolver;
pub use mapping::{MappingRules, PermissionMapper, RoleSpecifier};
pub use mirror::GroupMirror;
pub use promotion::{PromotionReport, SessionPromoter};
pub use reconcile::{MembershipReconciler, ReconcileReport};
pub use store::{GroupStore, InMemoryGroupStore};
pub use types::{DirectoryGroup, GroupId, Role, RoleId, Tier, TierMarkers, UserAccount, UserId};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
