//! Session promotion to the internal tier
//!
//! Users who have logged in at least once and still sit in the public or
//! portal tier are moved to the internal tier when their display name appears
//! in the gate-keeping directory group. Unlike permission mapping, the member
//! comparison is exact-case.

use crate::config::SyncConfig;
use crate::error::Result;
use crate::host::{LoginHistory, UserDirectory};
use crate::store::GroupStore;
use crate::types::{RoleId, UserId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Candidate left untouched by a promotion pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedCandidate {
    pub user_id: UserId,
    pub login: String,
    /// Held the public or portal marker
    pub restricted: bool,
    /// Listed in the gate group
    pub authorized: bool,
}

/// Promotion pass results
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromotionReport {
    /// Whether the gate group was present in the mirror
    pub gate_group_found: bool,
    pub promoted: Vec<UserId>,
    pub skipped: Vec<SkippedCandidate>,
}

/// Promotes restricted-tier users listed in the gate group
pub struct SessionPromoter {
    groups: Arc<dyn GroupStore>,
    users: Arc<dyn UserDirectory>,
    logins: Arc<dyn LoginHistory>,
    config: SyncConfig,
}

impl SessionPromoter {
    pub fn new(
        groups: Arc<dyn GroupStore>,
        users: Arc<dyn UserDirectory>,
        logins: Arc<dyn LoginHistory>,
        config: SyncConfig,
    ) -> Self {
        Self {
            groups,
            users,
            logins,
            config,
        }
    }

    pub async fn run(&self) -> Result<PromotionReport> {
        let mut report = PromotionReport::default();
        let markers = self.config.tier_markers;

        let Some(internal) = markers.internal else {
            warn!("Internal tier marker role not configured; no users promoted");
            return Ok(report);
        };

        let authorized_names = self.gate_members().await?;
        report.gate_group_found = authorized_names.is_some();
        let authorized_names = authorized_names.unwrap_or_default();

        let promoted_roles: BTreeSet<RoleId> = [internal].into_iter().collect();

        for user_id in self.logins.users_with_logins().await? {
            let Some(user) = self.users.get_user(user_id).await? else {
                debug!(user_id, "Login history references an unknown user");
                continue;
            };

            let restricted = user.is_restricted(&markers);
            let authorized = authorized_names.contains(user.display_name.as_str());

            info!(
                login = %user.login,
                tier = ?user.tier(&markers),
                restricted,
                authorized,
                gate_group = %self.config.gate_group_name,
                "Checking promotion candidate"
            );

            if restricted && authorized {
                self.users.replace_roles(user.id, &promoted_roles).await?;
                info!(login = %user.login, "User promoted to internal tier");
                report.promoted.push(user.id);
            } else {
                info!(login = %user.login, "User does not meet promotion conditions; skipped");
                report.skipped.push(SkippedCandidate {
                    user_id: user.id,
                    login: user.login,
                    restricted,
                    authorized,
                });
            }
        }

        Ok(report)
    }

    /// Trimmed member names of the gate group, `None` when the group is absent
    async fn gate_members(&self) -> Result<Option<HashSet<String>>> {
        let name = &self.config.gate_group_name;
        match self.groups.find_by_name(name).await? {
            Some(group) => Ok(Some(
                group
                    .member_names
                    .iter()
                    .map(|m| m.trim().to_string())
                    .collect(),
            )),
            None => {
                warn!(gate_group = %name, "Gate group not found; no candidate is authorized");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{InMemoryLoginHistory, InMemoryUserDirectory};
    use crate::store::InMemoryGroupStore;
    use crate::types::{DirectoryGroup, TierMarkers, UserAccount};

    const PUBLIC: RoleId = 100;
    const PORTAL: RoleId = 101;
    const INTERNAL: RoleId = 102;

    fn config() -> SyncConfig {
        SyncConfig::default()
            .with_gate_group("GG_Login")
            .with_tier_markers(TierMarkers {
                public: Some(PUBLIC),
                portal: Some(PORTAL),
                internal: Some(INTERNAL),
            })
    }

    async fn fixture(
        members: &[&str],
        users: Vec<UserAccount>,
        logged_in: &[UserId],
    ) -> (Arc<InMemoryGroupStore>, Arc<InMemoryUserDirectory>, Arc<InMemoryLoginHistory>) {
        let groups = Arc::new(InMemoryGroupStore::new());
        let mut gate = DirectoryGroup::new(0, "GG_Login");
        gate.member_names = members.iter().map(|m| m.to_string()).collect();
        groups.insert(gate).await.unwrap();

        let logins = Arc::new(InMemoryLoginHistory::new());
        for id in logged_in {
            logins.record_login(*id).await;
        }

        (groups, Arc::new(InMemoryUserDirectory::new(users)), logins)
    }

    #[tokio::test]
    async fn test_promotes_portal_gate_member() {
        let (groups, users, logins) = fixture(
            &["Alice Martin", " Bob Durand "],
            vec![
                UserAccount::new(1, "alice", "Alice Martin").with_roles([PORTAL, 40]),
                UserAccount::new(2, "bob", "Bob Durand").with_roles([PUBLIC]),
                UserAccount::new(3, "carol", "Carol Petit").with_roles([PORTAL]),
            ],
            &[1, 2, 3],
        )
        .await;

        let promoter = SessionPromoter::new(groups, users.clone(), logins, config());
        let report = promoter.run().await.unwrap();

        assert!(report.gate_group_found);
        assert_eq!(report.promoted, vec![1, 2]);

        let alice = users.get_user(1).await.unwrap().unwrap();
        assert_eq!(alice.role_ids, [INTERNAL].into_iter().collect());
        assert!(alice.directory_managed);

        let carol = users.get_user(3).await.unwrap().unwrap();
        assert_eq!(carol.role_ids, [PORTAL].into_iter().collect());
        assert!(!carol.directory_managed);
    }

    #[tokio::test]
    async fn test_gate_membership_is_case_sensitive() {
        let (groups, users, logins) = fixture(
            &["alice martin"],
            vec![UserAccount::new(1, "alice", "Alice Martin").with_roles([PORTAL])],
            &[1],
        )
        .await;

        let report = SessionPromoter::new(groups, users, logins, config()).run().await.unwrap();
        assert!(report.promoted.is_empty());
        assert_eq!(
            report.skipped,
            vec![SkippedCandidate {
                user_id: 1,
                login: "alice".to_string(),
                restricted: true,
                authorized: false,
            }]
        );
    }

    #[tokio::test]
    async fn test_requires_login_history_and_restricted_tier() {
        let (groups, users, logins) = fixture(
            &["Alice Martin", "Dan Roux"],
            vec![
                UserAccount::new(1, "alice", "Alice Martin").with_roles([PORTAL]),
                UserAccount::new(4, "dan", "Dan Roux").with_roles([INTERNAL, 40]),
            ],
            &[4],
        )
        .await;

        let report = SessionPromoter::new(groups, users.clone(), logins, config())
            .run()
            .await
            .unwrap();
        assert!(report.promoted.is_empty());

        // Never logged in, so untouched
        let alice = users.get_user(1).await.unwrap().unwrap();
        assert_eq!(alice.role_ids, [PORTAL].into_iter().collect());

        // Already internal
        let dan = users.get_user(4).await.unwrap().unwrap();
        assert_eq!(dan.role_ids, [INTERNAL, 40].into_iter().collect());
    }

    #[tokio::test]
    async fn test_missing_gate_group_is_noop() {
        let (groups, users, logins) = fixture(
            &["Alice Martin"],
            vec![UserAccount::new(1, "alice", "Alice Martin").with_roles([PORTAL])],
            &[1],
        )
        .await;

        let config = config().with_gate_group("GG_Absent");
        let report = SessionPromoter::new(groups, users, logins, config).run().await.unwrap();

        assert!(!report.gate_group_found);
        assert!(report.promoted.is_empty());
        assert_eq!(report.skipped.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_internal_marker_is_noop() {
        let (groups, users, logins) = fixture(
            &["Alice Martin"],
            vec![UserAccount::new(1, "alice", "Alice Martin").with_roles([PORTAL])],
            &[1],
        )
        .await;

        let config = SyncConfig::default().with_gate_group("GG_Login").with_tier_markers(TierMarkers {
            public: Some(PUBLIC),
            portal: Some(PORTAL),
            internal: None,
        });

        let report = SessionPromoter::new(groups, users.clone(), logins, config).run().await.unwrap();
        assert!(report.promoted.is_empty());
        assert_eq!(users.get_user(1).await.unwrap().unwrap().role_ids, [PORTAL].into_iter().collect());
    }
}
