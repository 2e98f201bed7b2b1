//! Controller for managing a single Bandada group.
//!
//! Loads the group from the on-chain registry or the off-chain API,
//! keeps a local copy in sync after each mutation, and exposes member,
//! API access and deletion operations gated by the group's provenance.

pub mod core;
pub mod utils;

pub use crate::core::{
    AccessController, GroupGateway, GroupLifecycleController, GroupSession, GroupView,
    MembershipController, MutationOutcome, Provenance, RouteContext,
};
