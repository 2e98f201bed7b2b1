/// Member add/remove orchestration
///
/// Adding is a trusted append: the add-member sub-flow that produced the id
/// has already persisted it, so no gateway call is made here and the
/// outcome is tagged `LocalOnly`. When the sub-flow got the updated group
/// back from the server, that record replaces the local one instead.
/// Removal waits for the server.

use std::sync::Arc;
use tracing::{debug, info, warn};

use super::confirm::ConfirmationGate;
use super::gateway::{AddMemberAck, GroupApi};
use super::outcome::{MutationOutcome, Reconciliation};
use super::store::GroupStateStore;

#[derive(Clone)]
pub struct MembershipController {
    group_id: String,
    store: GroupStateStore,
    api: Arc<dyn GroupApi>,
}

impl MembershipController {
    pub(crate) fn new(group_id: String, store: GroupStateStore, api: Arc<dyn GroupApi>) -> Self {
        Self {
            group_id,
            store,
            api,
        }
    }

    /// Append the id returned by the add-member sub-flow.
    ///
    /// `None` (or an empty id) means the sub-flow was cancelled. Duplicates
    /// are not filtered.
    pub async fn add_member(&self, member_id: Option<String>) -> MutationOutcome {
        let member_id = match member_id {
            Some(id) if !id.is_empty() => id,
            _ => {
                debug!(group_id = %self.group_id, "Add member cancelled");
                return MutationOutcome::Declined;
            }
        };

        let write = self
            .store
            .patch_members(|members| {
                let mut next = members.to_vec();
                next.push(member_id.clone());
                next
            })
            .await;

        let outcome = MutationOutcome::from_write(write, Reconciliation::LocalOnly);
        if outcome.is_applied() {
            info!(group_id = %self.group_id, member_id = %member_id, "Member appended locally");
        }
        outcome
    }

    /// Apply the server's answer to an add-member request.
    ///
    /// A returned group replaces the store wholesale; an empty answer falls
    /// back to the trusted append.
    pub async fn reconcile_add(&self, member_id: String, ack: AddMemberAck) -> MutationOutcome {
        match ack {
            AddMemberAck::Group(group) => {
                let members = group.members.len();
                let write = self.store.replace(group).await;
                let outcome = MutationOutcome::from_write(write, Reconciliation::ServerConfirmed);
                if outcome.is_applied() {
                    info!(group_id = %self.group_id, member_id = %member_id, members, "Member added");
                }
                outcome
            }
            AddMemberAck::Empty => self.add_member(Some(member_id)).await,
        }
    }

    /// Remove every occurrence of `member_id` once the server acknowledges it.
    ///
    /// Always asks the gateway, even when the id is not in the local list.
    pub async fn remove_member(
        &self,
        member_id: &str,
        gate: &dyn ConfirmationGate,
    ) -> MutationOutcome {
        let prompt = format!("Are you sure you want to remove member '{}'?", member_id);
        if !gate.confirm(&prompt).await {
            return MutationOutcome::Declined;
        }

        debug!(group_id = %self.group_id, member_id, "Removing member");
        if let Err(e) = self.api.remove_member(&self.group_id, member_id).await {
            warn!(group_id = %self.group_id, member_id, error = %e, "Failed to remove member");
            return MutationOutcome::Failed;
        }

        let write = self
            .store
            .patch_members(|members| {
                members
                    .iter()
                    .filter(|m| m.as_str() != member_id)
                    .cloned()
                    .collect()
            })
            .await;

        let outcome = MutationOutcome::from_write(write, Reconciliation::ServerConfirmed);
        if outcome.is_applied() {
            info!(group_id = %self.group_id, member_id, "Member removed");
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::confirm::{AutoConfirm, MockConfirmationGate};
    use crate::core::gateway::{GatewayError, MockGroupApi};
    use crate::core::group::sample_group;

    fn controller(api: MockGroupApi, members: &[&str]) -> (MembershipController, GroupStateStore) {
        let mut group = sample_group();
        group.members = members.iter().map(|m| m.to_string()).collect();
        let store = GroupStateStore::load(group.clone());
        (
            MembershipController::new(group.id, store.clone(), Arc::new(api)),
            store,
        )
    }

    async fn members(store: &GroupStateStore) -> Vec<String> {
        store.snapshot().await.unwrap().group.members
    }

    #[tokio::test]
    async fn test_add_member_cancelled_is_noop() {
        // No expectations: any gateway call panics
        let (ctl, store) = controller(MockGroupApi::new(), &["a", "b"]);

        assert_eq!(ctl.add_member(None).await, MutationOutcome::Declined);
        assert_eq!(ctl.add_member(Some(String::new())).await, MutationOutcome::Declined);
        assert_eq!(members(&store).await, vec!["a", "b"]);
        assert_eq!(store.version().await, 0);
    }

    #[tokio::test]
    async fn test_add_member_appends_without_gateway_call() {
        let (ctl, store) = controller(MockGroupApi::new(), &["a", "b"]);

        let outcome = ctl.add_member(Some("m1".to_string())).await;
        assert_eq!(outcome, MutationOutcome::Applied(Reconciliation::LocalOnly));
        assert_eq!(members(&store).await, vec!["a", "b", "m1"]);

        // Duplicates are appended as-is
        let _ = ctl.add_member(Some("a".to_string())).await;
        assert_eq!(members(&store).await, vec!["a", "b", "m1", "a"]);
    }

    #[tokio::test]
    async fn test_reconcile_add_takes_server_group() {
        let (ctl, store) = controller(MockGroupApi::new(), &["a", "b"]);

        let mut server = sample_group();
        server.members = vec!["x".to_string(), "m".to_string()];
        server.description = Some("updated".to_string());

        let outcome = ctl
            .reconcile_add("m".to_string(), AddMemberAck::Group(server.clone()))
            .await;
        assert_eq!(outcome, MutationOutcome::Applied(Reconciliation::ServerConfirmed));
        assert_eq!(store.snapshot().await.unwrap().group, server);
    }

    #[tokio::test]
    async fn test_reconcile_add_empty_answer_appends_locally() {
        let (ctl, store) = controller(MockGroupApi::new(), &["a"]);

        let outcome = ctl.reconcile_add("m".to_string(), AddMemberAck::Empty).await;
        assert_eq!(outcome, MutationOutcome::Applied(Reconciliation::LocalOnly));
        assert_eq!(members(&store).await, vec!["a", "m"]);
    }

    #[tokio::test]
    async fn test_remove_member_removes_all_occurrences() {
        let mut api = MockGroupApi::new();
        api.expect_remove_member()
            .withf(|id, member| id == "10402173435763029700781503965100" && member == "a")
            .times(1)
            .returning(|_, _| Ok(()));

        let (ctl, store) = controller(api, &["a", "b", "a", "c"]);
        let outcome = ctl.remove_member("a", &AutoConfirm).await;

        assert_eq!(outcome, MutationOutcome::Applied(Reconciliation::ServerConfirmed));
        assert_eq!(members(&store).await, vec!["b", "c"]);
    }

    #[tokio::test]
    async fn test_remove_member_failure_leaves_state() {
        let mut api = MockGroupApi::new();
        api.expect_remove_member()
            .times(1)
            .returning(|_, _| Err(GatewayError::Http(500)));

        let (ctl, store) = controller(api, &["a", "b"]);
        let before = store.snapshot().await.unwrap();

        assert_eq!(ctl.remove_member("a", &AutoConfirm).await, MutationOutcome::Failed);
        assert_eq!(store.snapshot().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_remove_member_declined_skips_gateway() {
        let mut gate = MockConfirmationGate::new();
        gate.expect_confirm()
            .withf(|prompt| prompt.contains("'a'"))
            .times(1)
            .returning(|_| false);

        let (ctl, store) = controller(MockGroupApi::new(), &["a"]);
        assert_eq!(ctl.remove_member("a", &gate).await, MutationOutcome::Declined);
        assert_eq!(members(&store).await, vec!["a"]);
    }

    #[tokio::test]
    async fn test_remove_member_twice_calls_gateway_each_time() {
        let mut api = MockGroupApi::new();
        api.expect_remove_member().times(2).returning(|_, _| Ok(()));

        let (ctl, store) = controller(api, &["a", "m"]);

        assert!(ctl.remove_member("m", &AutoConfirm).await.is_applied());
        assert_eq!(members(&store).await, vec!["a"]);

        assert!(ctl.remove_member("m", &AutoConfirm).await.is_applied());
        assert_eq!(members(&store).await, vec!["a"]);
    }

    #[tokio::test]
    async fn test_remove_after_close_is_discarded() {
        let mut api = MockGroupApi::new();
        api.expect_remove_member().times(1).returning(|_, _| Ok(()));

        let (ctl, store) = controller(api, &["a"]);
        store.dispose().await;

        assert_eq!(ctl.remove_member("a", &AutoConfirm).await, MutationOutcome::Discarded);
    }
}
