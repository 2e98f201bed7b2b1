/// Whole-group deletion
///
/// Deletion is gated twice: the typed confirmation text must equal the
/// group name exactly, and then the confirmation gate must say yes. Only
/// an `ArmedRemoval` can issue the call, and `arm` only hands one out when
/// the name matches.

use std::sync::Arc;
use tracing::{debug, info, warn};

use super::confirm::ConfirmationGate;
use super::gateway::GroupApi;
use super::outcome::Navigation;

#[derive(Clone)]
pub struct GroupLifecycleController {
    group_id: String,
    group_name: String,
    api: Arc<dyn GroupApi>,
}

/// Result of a deletion attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalOutcome {
    Removed(Navigation),
    Declined,
    Failed,
}

impl GroupLifecycleController {
    pub(crate) fn new(group_id: String, group_name: String, api: Arc<dyn GroupApi>) -> Self {
        Self {
            group_id,
            group_name,
            api,
        }
    }

    /// Case-sensitive exact match against the group name
    pub fn name_matches(&self, confirmation_text: &str) -> bool {
        confirmation_text == self.group_name
    }

    pub fn arm(&self, confirmation_text: &str) -> Option<ArmedRemoval<'_>> {
        if self.name_matches(confirmation_text) {
            Some(ArmedRemoval { controller: self })
        } else {
            debug!(group_id = %self.group_id, "Group name confirmation does not match");
            None
        }
    }
}

pub struct ArmedRemoval<'a> {
    controller: &'a GroupLifecycleController,
}

impl ArmedRemoval<'_> {
    /// On success the caller should leave the group and go to the groups list.
    /// Local state is not cleaned up here.
    pub async fn remove_group(self, gate: &dyn ConfirmationGate) -> RemovalOutcome {
        let ctl = self.controller;

        if !gate
            .confirm("Are you sure you want to remove this group?")
            .await
        {
            return RemovalOutcome::Declined;
        }

        match ctl.api.remove_group(&ctl.group_id).await {
            Ok(()) => {
                info!(group_id = %ctl.group_id, "Group removed");
                RemovalOutcome::Removed(Navigation::GroupsList)
            }
            Err(e) => {
                warn!(group_id = %ctl.group_id, error = %e, "Failed to remove group");
                RemovalOutcome::Failed
            }
        }
    }
}
