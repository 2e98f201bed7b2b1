/// API access toggling and API key rotation
///
/// Both wait for the server before touching local state.

use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::confirm::ConfirmationGate;
use super::gateway::GroupApi;
use super::outcome::{MutationOutcome, Reconciliation};
use super::store::GroupStateStore;

#[derive(Clone)]
pub struct AccessController {
    group_id: String,
    store: GroupStateStore,
    api: Arc<dyn GroupApi>,
}

impl AccessController {
    pub(crate) fn new(group_id: String, store: GroupStateStore, api: Arc<dyn GroupApi>) -> Self {
        Self {
            group_id,
            store,
            api,
        }
    }

    /// Enable or disable API access.
    ///
    /// On success the returned group replaces the store wholesale, unless
    /// another write landed while the request was in flight.
    pub async fn set_api_access(&self, enabled: bool) -> MutationOutcome {
        let issued_at = self.store.version().await;

        debug!(group_id = %self.group_id, enabled, "Updating API access");
        let group = match self.api.update_api_access(&self.group_id, enabled).await {
            Ok(group) => group,
            Err(e) => {
                warn!(group_id = %self.group_id, enabled, error = %e, "Failed to update API access");
                return MutationOutcome::Failed;
            }
        };

        if group.api_enabled && group.api_key.is_none() {
            error!(
                group_id = %self.group_id,
                "Server enabled API access without returning an API key"
            );
        }

        let write = self.store.replace_if_current(group, issued_at).await;
        let outcome = MutationOutcome::from_write(write, Reconciliation::ServerConfirmed);
        match outcome {
            MutationOutcome::Applied(_) => {
                info!(group_id = %self.group_id, enabled, "API access updated")
            }
            _ => debug!(group_id = %self.group_id, ?write, "API access response discarded"),
        }
        outcome
    }

    /// Rotate the API key. Only the key changes locally.
    pub async fn regenerate_api_key(&self, gate: &dyn ConfirmationGate) -> MutationOutcome {
        if !gate
            .confirm("Are you sure you want to generate a new API key?")
            .await
        {
            return MutationOutcome::Declined;
        }

        debug!(group_id = %self.group_id, "Generating API key");
        let key = match self.api.generate_api_key(&self.group_id).await {
            Ok(key) => key,
            Err(e) => {
                warn!(group_id = %self.group_id, error = %e, "Failed to generate API key");
                return MutationOutcome::Failed;
            }
        };

        let write = self.store.set_api_key(key).await;
        let outcome = MutationOutcome::from_write(write, Reconciliation::ServerConfirmed);
        if outcome.is_applied() {
            info!(group_id = %self.group_id, "API key rotated");
        }
        outcome
    }
}
