/// On-chain group reader
///
/// Reads groups from the Semaphore registry contract over JSON-RPC:
/// - tree depth from `getMerkleTreeDepth`
/// - members by replaying the group's member events, ordered by leaf index
///
/// On-chain groups are read-only from this client.

use anyhow::{Context, Result};
use async_trait::async_trait;
use ethers::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

use super::gateway::{GatewayError, GatewayResult, GroupReader};
use super::group::Group;

abigen!(
    SemaphoreRegistry,
    r#"[
        function getMerkleTreeDepth(uint256 groupId) external view returns (uint256)
        event MemberAdded(uint256 indexed groupId, uint256 index, uint256 identityCommitment, uint256 merkleTreeRoot)
        event MemberUpdated(uint256 indexed groupId, uint256 index, uint256 identityCommitment, uint256 newIdentityCommitment, uint256 merkleTreeRoot)
        event MemberRemoved(uint256 indexed groupId, uint256 index, uint256 identityCommitment, uint256 merkleTreeRoot)
    ]"#
);

/// Deepest tree the registry supports
const MAX_TREE_DEPTH: u32 = 32;

pub struct OnchainReader<M = Provider<Http>> {
    contract: SemaphoreRegistry<M>,
    start_block: u64,
}

impl OnchainReader<Provider<Http>> {
    pub fn new(rpc_url: &str, contract_address: &str, start_block: u64) -> Result<Self> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .context("Failed to create Ethereum RPC provider")?;

        let address: Address = contract_address
            .parse()
            .with_context(|| format!("Invalid contract address '{}'", contract_address))?;

        Ok(Self::with_client(Arc::new(provider), address, start_block))
    }
}

impl<M: Middleware + 'static> OnchainReader<M> {
    /// `start_block` should be the registry's deployment block; many RPC
    /// providers refuse log queries that start at genesis.
    pub fn with_client(client: Arc<M>, address: Address, start_block: u64) -> Self {
        if start_block == 0 {
            warn!(?address, "Member events will be scanned from genesis; set start_block to the registry deployment block");
        }

        Self {
            contract: SemaphoreRegistry::new(address, client),
            start_block,
        }
    }

    async fn tree_depth(&self, group_id: U256) -> GatewayResult<u32> {
        let depth = self
            .contract
            .get_merkle_tree_depth(group_id)
            .call()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        // Depth 0 means the group was never created
        if depth.is_zero() {
            return Err(GatewayError::NotFound);
        }
        if depth > U256::from(MAX_TREE_DEPTH) {
            return Err(GatewayError::Decode(format!("tree depth {} out of range", depth)));
        }

        Ok(depth.as_u32())
    }

    async fn members(&self, group_id: U256) -> GatewayResult<Vec<String>> {
        let topic = group_topic(group_id);

        let added = self
            .contract
            .member_added_filter()
            .topic1(topic)
            .from_block(self.start_block)
            .query()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let updated = self
            .contract
            .member_updated_filter()
            .topic1(topic)
            .from_block(self.start_block)
            .query()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let removed = self
            .contract
            .member_removed_filter()
            .topic1(topic)
            .from_block(self.start_block)
            .query()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        debug!(
            group_id = %group_id,
            added = added.len(),
            updated = updated.len(),
            removed = removed.len(),
            "Replaying member events"
        );

        Ok(replay_members(
            added.iter().map(|e| (e.index, e.identity_commitment)),
            updated.iter().map(|e| (e.index, e.new_identity_commitment)),
            removed.iter().map(|e| e.index),
        ))
    }
}

#[async_trait]
impl<M: Middleware + 'static> GroupReader for OnchainReader<M> {
    async fn fetch_group(&self, id: &str) -> GatewayResult<Group> {
        // Registry ids are uint256; anything else cannot exist on-chain
        let group_id = U256::from_dec_str(id).map_err(|_| GatewayError::NotFound)?;

        let tree_depth = self.tree_depth(group_id).await?;
        let members = self.members(group_id).await?;

        Ok(Group {
            id: id.to_string(),
            name: id.to_string(),
            description: None,
            tree_depth,
            members,
            api_enabled: false,
            api_key: None,
            credentials: None,
            created_at: None,
        })
    }
}

/// The group id is the first indexed topic of every member event
fn group_topic(group_id: U256) -> H256 {
    let mut bytes = [0u8; 32];
    group_id.to_big_endian(&mut bytes);
    H256::from(bytes)
}

/// Rebuild the member list from events, ordered by leaf index.
/// Events within each kind must be in chain order.
fn replay_members<A, U, R>(added: A, updated: U, removed: R) -> Vec<String>
where
    A: IntoIterator<Item = (U256, U256)>,
    U: IntoIterator<Item = (U256, U256)>,
    R: IntoIterator<Item = U256>,
{
    let mut leaves: BTreeMap<U256, U256> = added.into_iter().collect();

    for (index, commitment) in updated {
        if let Some(leaf) = leaves.get_mut(&index) {
            *leaf = commitment;
        }
    }

    for index in removed {
        leaves.remove(&index);
    }

    leaves.values().map(|c| c.to_string()).collect()
}
