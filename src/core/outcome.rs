/// Mutation outcomes reported back to the caller

use super::store::StoreWrite;

/// How a local change relates to the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// Applied locally on trust; the collaborator that produced it persisted it
    LocalOnly,
    /// Applied after the server acknowledged the change
    ServerConfirmed,
}

#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    Applied(Reconciliation),
    /// The confirmation gate (or the add-member sub-flow) said no. No gateway call was made.
    Declined,
    /// The gateway failed. Local state is unchanged.
    Failed,
    /// The response arrived after the session closed, or raced a newer write
    Discarded,
}

impl MutationOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, MutationOutcome::Applied(_))
    }

    pub(crate) fn from_write(write: StoreWrite, reconciliation: Reconciliation) -> Self {
        match write {
            StoreWrite::Applied => MutationOutcome::Applied(reconciliation),
            StoreWrite::Disposed | StoreWrite::Stale => MutationOutcome::Discarded,
        }
    }
}

/// Where the caller should go after a terminal action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    GroupsList,
}
