/// Backend gateway capabilities
///
/// Two capability sets:
/// - `GroupReader`: read-only access, the only thing an on-chain registry offers
/// - `GroupApi`: the off-chain API service, reads and writes
///
/// `GroupGateway` selects one of them from the group's provenance. Write
/// controllers can only be built from the `OffChain` variant.

use async_trait::async_trait;
use std::sync::Arc;

#[cfg(test)]
use mockall::automock;

use super::group::{Group, Provenance};

/// Any gateway failure. Controllers treat every variant the same way;
/// the distinction only exists for logging.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("group or member not found")]
    NotFound,

    #[error("server responded with HTTP {0}")]
    Http(u16),

    #[error("request failed: {0}")]
    Transport(String),

    #[error("invalid response payload: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            GatewayError::Decode(e.to_string())
        } else if let Some(status) = e.status() {
            GatewayError::Http(status.as_u16())
        } else {
            GatewayError::Transport(e.to_string())
        }
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Result of an add-member call against the API
#[derive(Debug, Clone, PartialEq)]
pub enum AddMemberAck {
    /// Server answered with the updated group
    Group(Group),
    /// Server answered with no content
    Empty,
}

/// Read-only access to a group registry
#[cfg_attr(test, automock)]
#[async_trait]
pub trait GroupReader: Send + Sync {
    async fn fetch_group(&self, id: &str) -> GatewayResult<Group>;
}

/// Full read/write access to the off-chain API service
#[cfg_attr(test, automock)]
#[async_trait]
pub trait GroupApi: Send + Sync {
    async fn get_group(&self, id: &str) -> GatewayResult<Group>;

    /// Returns the group with a refreshed API key when enabling
    async fn update_api_access(&self, id: &str, api_enabled: bool) -> GatewayResult<Group>;

    /// Rotates the key server-side and returns the new key only
    async fn generate_api_key(&self, id: &str) -> GatewayResult<String>;

    async fn add_member(&self, id: &str, member_id: &str) -> GatewayResult<AddMemberAck>;

    async fn remove_member(&self, id: &str, member_id: &str) -> GatewayResult<()>;

    async fn remove_group(&self, id: &str) -> GatewayResult<()>;
}

/// Gateway selected by provenance
#[derive(Clone)]
pub enum GroupGateway {
    OnChain(Arc<dyn GroupReader>),
    OffChain(Arc<dyn GroupApi>),
}

impl GroupGateway {
    pub fn provenance(&self) -> Provenance {
        match self {
            GroupGateway::OnChain(_) => Provenance::OnChain,
            GroupGateway::OffChain(_) => Provenance::OffChain,
        }
    }

    /// Both backends support fetching
    pub async fn fetch_group(&self, id: &str) -> GatewayResult<Group> {
        match self {
            GroupGateway::OnChain(reader) => reader.fetch_group(id).await,
            GroupGateway::OffChain(api) => api.get_group(id).await,
        }
    }

    /// Write access, only available for off-chain groups
    pub fn api(&self) -> Option<&Arc<dyn GroupApi>> {
        match self {
            GroupGateway::OnChain(_) => None,
            GroupGateway::OffChain(api) => Some(api),
        }
    }
}

impl std::fmt::Debug for GroupGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "GroupGateway({})", self.provenance())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::group::sample_group;

    #[tokio::test]
    async fn test_fetch_routes_by_provenance() {
        let mut reader = MockGroupReader::new();
        reader
            .expect_fetch_group()
            .times(1)
            .returning(|_| Ok(sample_group()));

        let gateway = GroupGateway::OnChain(Arc::new(reader));
        assert_eq!(gateway.provenance(), Provenance::OnChain);
        assert!(gateway.api().is_none());
        assert!(gateway.fetch_group("1").await.is_ok());

        let mut api = MockGroupApi::new();
        api.expect_get_group()
            .times(1)
            .returning(|_| Err(GatewayError::NotFound));

        let gateway = GroupGateway::OffChain(Arc::new(api));
        assert_eq!(gateway.provenance(), Provenance::OffChain);
        assert!(gateway.api().is_some());
        assert!(matches!(
            gateway.fetch_group("1").await,
            Err(GatewayError::NotFound)
        ));
    }
}
