/// Group session
///
/// Ties one route context to its gateway and state store for as long as
/// the group is being managed. Write controllers are handed out only for
/// off-chain groups; the API key controller additionally requires that the
/// group has no credentials configured.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::access::AccessController;
use super::gateway::GroupGateway;
use super::group::{Provenance, RouteContext};
use super::lifecycle::GroupLifecycleController;
use super::membership::MembershipController;
use super::search::{member_rows, MemberRow};
use super::store::{GroupStateStore, StoreWrite};
use crate::utils::{format_capacity, shorten_number};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("group '{0}' not found or could not be loaded")]
    NotFound(String),

    #[error("group type mismatch: route says {route}, gateway is {gateway}")]
    ProvenanceMismatch {
        route: Provenance,
        gateway: Provenance,
    },

    #[error("session is closed")]
    Closed,
}

/// Everything the page needs to render, derived from the store
#[derive(Debug, Clone, PartialEq)]
pub struct GroupView {
    pub id: String,
    pub provenance: Provenance,
    pub name: String,
    pub description: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub member_count: usize,
    pub member_count_display: String,
    pub capacity: Option<u64>,
    pub capacity_display: String,
    pub tree_depth: u32,
    /// API key panel: off-chain groups without credentials
    pub show_api_panel: bool,
    pub api_enabled: bool,
    pub api_key: Option<String>,
    pub clipboard: String,
    /// Deletion controls: off-chain groups only
    pub show_danger_zone: bool,
    /// Members matching the current search
    pub members: Vec<MemberRow>,
}

pub struct GroupSession {
    route: RouteContext,
    gateway: GroupGateway,
    store: GroupStateStore,
}

impl GroupSession {
    /// Load the group once. A gateway failure yields no session.
    pub async fn open(route: RouteContext, gateway: GroupGateway) -> Result<Self, SessionError> {
        if route.provenance != gateway.provenance() {
            return Err(SessionError::ProvenanceMismatch {
                route: route.provenance,
                gateway: gateway.provenance(),
            });
        }

        debug!(group_id = %route.group_id, provenance = %route.provenance, "Loading group");
        let group = match gateway.fetch_group(&route.group_id).await {
            Ok(group) => group,
            Err(e) => {
                warn!(group_id = %route.group_id, error = %e, "Failed to load group");
                return Err(SessionError::NotFound(route.group_id));
            }
        };

        info!(
            group_id = %route.group_id,
            provenance = %route.provenance,
            members = group.members.len(),
            "Group loaded"
        );

        Ok(Self {
            store: GroupStateStore::load(group),
            route,
            gateway,
        })
    }

    pub fn route(&self) -> &RouteContext {
        &self.route
    }

    pub fn provenance(&self) -> Provenance {
        self.route.provenance
    }

    pub fn store(&self) -> &GroupStateStore {
        &self.store
    }

    /// Reload the group and replace the store wholesale. On failure the
    /// store is left as it was.
    pub async fn refresh(&self) -> Result<(), SessionError> {
        let group = match self.gateway.fetch_group(&self.route.group_id).await {
            Ok(group) => group,
            Err(e) => {
                warn!(group_id = %self.route.group_id, error = %e, "Failed to refresh group");
                return Err(SessionError::NotFound(self.route.group_id.clone()));
            }
        };

        match self.store.replace(group).await {
            StoreWrite::Applied => Ok(()),
            StoreWrite::Disposed | StoreWrite::Stale => Err(SessionError::Closed),
        }
    }

    /// Member add/remove, off-chain groups only
    pub fn membership(&self) -> Option<MembershipController> {
        let api = self.gateway.api()?;
        Some(MembershipController::new(
            self.route.group_id.clone(),
            self.store.clone(),
            api.clone(),
        ))
    }

    /// API access and key rotation, off-chain groups without credentials only
    pub async fn access(&self) -> Option<AccessController> {
        let api = self.gateway.api()?;
        let snapshot = self.store.snapshot().await?;
        if snapshot.group.has_credentials() {
            return None;
        }

        Some(AccessController::new(
            self.route.group_id.clone(),
            self.store.clone(),
            api.clone(),
        ))
    }

    /// Group deletion, off-chain groups only
    pub async fn lifecycle(&self) -> Option<GroupLifecycleController> {
        let api = self.gateway.api()?;
        let snapshot = self.store.snapshot().await?;

        Some(GroupLifecycleController::new(
            self.route.group_id.clone(),
            snapshot.group.name,
            api.clone(),
        ))
    }

    /// Derived view with members filtered by `search`
    pub async fn view(&self, search: &str) -> Result<GroupView, SessionError> {
        let snapshot = self.store.snapshot().await.ok_or(SessionError::Closed)?;
        let group = snapshot.group;
        let off_chain = self.route.provenance == Provenance::OffChain;
        let capacity = group.capacity();

        Ok(GroupView {
            provenance: self.route.provenance,
            member_count: group.members.len(),
            member_count_display: shorten_number(group.members.len() as u64),
            capacity,
            capacity_display: format_capacity(capacity),
            tree_depth: group.tree_depth,
            show_api_panel: off_chain && !group.has_credentials(),
            api_enabled: group.api_enabled,
            show_danger_zone: off_chain,
            members: member_rows(&group.members, search),
            clipboard: snapshot.clipboard,
            id: group.id,
            name: group.name,
            description: group.description,
            created_at: group.created_at,
            api_key: group.api_key,
        })
    }

    /// Tear down. Responses that arrive later are discarded.
    pub async fn close(&self) {
        debug!(group_id = %self.route.group_id, "Closing session");
        self.store.dispose().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::confirm::AutoConfirm;
    use crate::core::gateway::{GatewayError, MockGroupApi, MockGroupReader};
    use crate::core::group::sample_group;
    use crate::core::outcome::MutationOutcome;
    use std::sync::Arc;

    fn off_chain_route() -> RouteContext {
        RouteContext::new(sample_group().id, Provenance::OffChain)
    }

    #[tokio::test]
    async fn test_open_failure_yields_no_session() {
        let mut api = MockGroupApi::new();
        api.expect_get_group()
            .times(1)
            .returning(|_| Err(GatewayError::NotFound));

        let result = GroupSession::open(off_chain_route(), GroupGateway::OffChain(Arc::new(api))).await;
        assert!(matches!(result, Err(SessionError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_open_rejects_mismatched_gateway() {
        let reader = MockGroupReader::new();
        let result =
            GroupSession::open(off_chain_route(), GroupGateway::OnChain(Arc::new(reader))).await;
        assert!(matches!(result, Err(SessionError::ProvenanceMismatch { .. })));
    }

    #[tokio::test]
    async fn test_on_chain_session_is_read_only() {
        let mut reader = MockGroupReader::new();
        reader.expect_fetch_group().returning(|id| {
            let mut group = sample_group();
            group.id = id.to_string();
            group.name = id.to_string();
            Ok(group)
        });

        let route = RouteContext::new("42", Provenance::OnChain);
        let session = GroupSession::open(route, GroupGateway::OnChain(Arc::new(reader)))
            .await
            .unwrap();

        assert!(session.membership().is_none());
        assert!(session.access().await.is_none());
        assert!(session.lifecycle().await.is_none());

        let view = session.view("").await.unwrap();
        assert!(!view.show_api_panel);
        assert!(!view.show_danger_zone);
        assert_eq!(view.name, "42");
    }

    #[tokio::test]
    async fn test_credentials_hide_api_controls() {
        let mut api = MockGroupApi::new();
        api.expect_get_group().returning(|_| {
            let mut group = sample_group();
            group.credentials = Some(serde_json::json!({ "id": "GITHUB_FOLLOWERS" }));
            Ok(group)
        });

        let session = GroupSession::open(off_chain_route(), GroupGateway::OffChain(Arc::new(api)))
            .await
            .unwrap();

        assert!(session.access().await.is_none());
        assert!(session.membership().is_some());
        assert!(session.lifecycle().await.is_some());
        assert!(!session.view("").await.unwrap().show_api_panel);
    }

    #[tokio::test]
    async fn test_view_derives_counts_and_filters() {
        let mut api = MockGroupApi::new();
        api.expect_get_group().returning(|_| {
            let mut group = sample_group();
            group.members = vec!["Abc123".to_string(), "xyz".to_string()];
            group.api_enabled = true;
            group.api_key = Some("K1".to_string());
            Ok(group)
        });

        let session = GroupSession::open(off_chain_route(), GroupGateway::OffChain(Arc::new(api)))
            .await
            .unwrap();

        let view = session.view("ABC").await.unwrap();
        assert_eq!(view.member_count, 2);
        assert_eq!(view.capacity, Some(65536));
        assert_eq!(view.capacity_display, "65.5k");
        assert_eq!(view.members.len(), 1);
        assert_eq!(view.members[0].id, "Abc123");
        assert!(view.show_api_panel);
        assert!(view.show_danger_zone);
        assert_eq!(view.clipboard, "K1");
    }

    #[tokio::test]
    async fn test_refresh_failure_keeps_state() {
        let mut api = MockGroupApi::new();
        let mut calls = 0;
        api.expect_get_group().times(2).returning(move |_| {
            calls += 1;
            if calls == 1 {
                Ok(sample_group())
            } else {
                Err(GatewayError::Http(502))
            }
        });

        let session = GroupSession::open(off_chain_route(), GroupGateway::OffChain(Arc::new(api)))
            .await
            .unwrap();
        let before = session.store().snapshot().await.unwrap();

        assert!(session.refresh().await.is_err());
        assert_eq!(session.store().snapshot().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_close_discards_in_flight_results() {
        let mut api = MockGroupApi::new();
        api.expect_get_group().returning(|_| Ok(sample_group()));
        api.expect_remove_member().returning(|_, _| Ok(()));

        let session = GroupSession::open(off_chain_route(), GroupGateway::OffChain(Arc::new(api)))
            .await
            .unwrap();
        let membership = session.membership().unwrap();

        session.close().await;

        assert_eq!(
            membership.remove_member("a", &AutoConfirm).await,
            MutationOutcome::Discarded
        );
        assert!(matches!(session.view("").await, Err(SessionError::Closed)));
        assert!(session.access().await.is_none());
    }
}
