pub mod group;
pub mod gateway;
pub mod api;
pub mod onchain;
pub mod store;
pub mod outcome;
pub mod confirm;
pub mod membership;
pub mod access;
pub mod lifecycle;
pub mod search;
pub mod session;

pub use group::{Group, Provenance, RouteContext};
pub use gateway::{AddMemberAck, GatewayError, GatewayResult, GroupApi, GroupGateway, GroupReader};
pub use api::ApiClient;
pub use onchain::OnchainReader;
pub use store::{GroupStateStore, StoreSnapshot, StoreWrite};
pub use outcome::{MutationOutcome, Navigation, Reconciliation};
pub use confirm::{AutoConfirm, ConfirmationGate, TerminalGate};
pub use membership::MembershipController;
pub use access::AccessController;
pub use lifecycle::{ArmedRemoval, GroupLifecycleController, RemovalOutcome};
pub use session::{GroupSession, GroupView, SessionError};
