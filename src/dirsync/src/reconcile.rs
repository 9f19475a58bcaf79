//! Destructive reconciliation of user role sets
//!
//! For directory-managed users the mapping run is the single source of truth:
//! each user's role set is replaced with exactly the aggregated set, dropping
//! anything the mapping did not reproduce.

use crate::error::Result;
use crate::host::UserDirectory;
use crate::types::{RoleId, UserAccount, UserId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Reconciliation results
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
    /// Users whose role sets were replaced
    pub updated: Vec<UserId>,
    /// User IDs absent from the preloaded account list
    pub missing_users: Vec<UserId>,
}

/// Writes aggregated role sets onto user accounts
pub struct MembershipReconciler {
    users: Arc<dyn UserDirectory>,
}

impl MembershipReconciler {
    pub fn new(users: Arc<dyn UserDirectory>) -> Self {
        Self { users }
    }

    /// Replace each user's role set with exactly the given set
    ///
    /// `accounts` is the user list loaded at the start of the run; it is not
    /// fetched again. A failed write aborts the remaining users. Writes
    /// already made in the same call stay applied.
    pub async fn apply(
        &self,
        accounts: &[UserAccount],
        user_roles: &BTreeMap<UserId, BTreeSet<RoleId>>,
    ) -> Result<ReconcileReport> {
        let mut report = ReconcileReport::default();
        let by_id: HashMap<UserId, &UserAccount> = accounts.iter().map(|u| (u.id, u)).collect();

        for (&user_id, roles) in user_roles {
            let Some(user) = by_id.get(&user_id) else {
                warn!(user_id, "User account not found; no roles applied");
                report.missing_users.push(user_id);
                continue;
            };

            let removed: Vec<RoleId> = user.role_ids.difference(roles).copied().collect();
            self.users.replace_roles(user_id, roles).await?;

            debug!(
                user_id,
                login = %user.login,
                roles = ?roles,
                removed = ?removed,
                "User roles replaced"
            );
            report.updated.push(user_id);
        }

        info!(
            updated = report.updated.len(),
            missing = report.missing_users.len(),
            "Membership reconciliation complete"
        );

        Ok(report)
    }
}
