use crate::block::Block;
use crate::ids::{BlockId, NodeId};
use blocksim_core::{SimResult, SimRng};
use num::BigUint;
use std::sync::Arc;

/// A lookup from node id to that node's mining power (hashes/ms), supplied by
/// the caller (the node registry lives in the `blocksim-node` crate, one
/// layer above this one) rather than threaded through every call site.
pub type MiningPowerLookup<'a> = dyn Fn(NodeId) -> u64 + 'a;

/// The consensus contract every node state machine programs against.
/// Proof-of-Work (`blocksim-pow`) is the only implementation in this
/// workspace, but the interface is deliberately consensus-agnostic so that a
/// Proof-of-Stake or other plugin could be substituted without touching the
/// node state machine, message taxonomy or scheduler.
pub trait ConsensusAlgorithm: Send + Sync {
    /// Builds the genesis block a node starts its chain from. `id` is
    /// allocated by the caller (the node registry owns the global block-id
    /// counter) so that genesis blocks minted independently by many nodes
    /// still receive network-unique identities.
    fn genesis_block(&self, id: BlockId, producer: NodeId, mint_time: u64) -> Arc<Block>;

    /// The difficulty a block extending `parent` must meet. Equal to
    /// `parent.difficulty()` between retarget points.
    fn next_difficulty(&self, parent: &Arc<Block>, mining_power_of: &MiningPowerLookup<'_>) -> BigUint;

    /// Mints a new block on top of `parent`, computing its required
    /// difficulty via [`Self::next_difficulty`].
    fn mint_block(
        &self,
        id: BlockId,
        producer: NodeId,
        parent: &Arc<Block>,
        mint_time: u64,
        mining_power_of: &MiningPowerLookup<'_>,
    ) -> Arc<Block> {
        let difficulty = self.next_difficulty(parent, mining_power_of);
        Block::child(id, producer, parent, mint_time, difficulty)
    }

    /// A received block is valid iff it meets the producer-required
    /// difficulty of its parent, and either there is no current tip or it
    /// strictly beats the tip's total difficulty (the fork-choice rule).
    fn is_received_block_valid(
        &self,
        received: &Arc<Block>,
        current_tip: Option<&Arc<Block>>,
        mining_power_of: &MiningPowerLookup<'_>,
    ) -> bool {
        let difficulty_ok = match received.parent() {
            None => true,
            Some(parent) => *received.difficulty() >= self.next_difficulty(parent, mining_power_of),
        };
        let fork_choice_ok = match current_tip {
            None => true,
            Some(tip) => received.total_difficulty() > tip.total_difficulty(),
        };
        difficulty_ok && fork_choice_ok
    }

    /// Samples the waiting time, in virtual ms, until `mining_power`'s next
    /// mining attempt succeeds against the difficulty a child of `tip` would
    /// require.
    fn mining_delay_ms(
        &self,
        rng: &mut SimRng,
        mining_power: u64,
        tip: &Arc<Block>,
        mining_power_of: &MiningPowerLookup<'_>,
    ) -> SimResult<u64>;
}
