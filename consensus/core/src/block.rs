use crate::ids::{BlockId, NodeId};
use num::BigUint;
use std::sync::Arc;

/// An immutable block. Identity, producer, parent linkage and height are
/// consensus-agnostic; `difficulty` and `total_difficulty` are populated by
/// whichever [`crate::ConsensusAlgorithm`] minted the block (Proof-of-Work is
/// the only one this workspace implements, so every block carries them, even
/// though a future Proof-of-Stake plugin might leave `difficulty` at zero and
/// use a different fork-choice signal entirely).
///
/// Blocks are never mutated after construction: the parent chain forms an
/// append-only DAG, and forks are simply blocks sharing a parent.
#[derive(Debug, Clone)]
pub struct Block {
    id: BlockId,
    producer: NodeId,
    parent: Option<Arc<Block>>,
    height: u64,
    mint_time: u64,
    difficulty: BigUint,
    total_difficulty: BigUint,
}

impl Block {
    /// Constructs the genesis block for `producer`: no parent, height 0,
    /// minted at `mint_time`, difficulty entirely its own (no accumulation).
    pub fn genesis(id: BlockId, producer: NodeId, mint_time: u64, difficulty: BigUint) -> Arc<Block> {
        Arc::new(Block { id, producer, parent: None, height: 0, mint_time, total_difficulty: difficulty.clone(), difficulty })
    }

    /// Constructs a child of `parent` with the given `difficulty`;
    /// `total_difficulty` accumulates automatically.
    pub fn child(id: BlockId, producer: NodeId, parent: &Arc<Block>, mint_time: u64, difficulty: BigUint) -> Arc<Block> {
        let total_difficulty = &parent.total_difficulty + &difficulty;
        Arc::new(Block {
            id,
            producer,
            parent: Some(parent.clone()),
            height: parent.height + 1,
            mint_time,
            difficulty,
            total_difficulty,
        })
    }

    pub fn id(&self) -> BlockId {
        self.id
    }

    pub fn producer(&self) -> NodeId {
        self.producer
    }

    pub fn parent(&self) -> Option<&Arc<Block>> {
        self.parent.as_ref()
    }

    pub fn height(&self) -> u64 {
        self.height
    }

    pub fn mint_time(&self) -> u64 {
        self.mint_time
    }

    pub fn difficulty(&self) -> &BigUint {
        &self.difficulty
    }

    pub fn total_difficulty(&self) -> &BigUint {
        &self.total_difficulty
    }

    pub fn is_genesis(&self) -> bool {
        self.parent.is_none()
    }
}

/// Walks parent links to find the ancestor at height `h`. Returns `None` if
/// `h` is negative or above `tip`'s height, matching the source semantics of
/// `getBlockWithHeight`.
pub fn get_block_with_height(tip: &Arc<Block>, h: i64) -> Option<Arc<Block>> {
    if h < 0 || h as u64 > tip.height {
        return None;
    }
    let mut current = tip.clone();
    loop {
        if current.height == h as u64 {
            return Some(current);
        }
        current = current.parent.clone().expect("height invariant guarantees a parent exists above height 0");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(n: u64) -> Arc<Block> {
        let mut tip = Block::genesis(0, 0, 0, BigUint::from(1u32));
        for i in 1..=n {
            tip = Block::child(i, 0, &tip, i * 1000, BigUint::from(1u32));
        }
        tip
    }

    #[test]
    fn get_block_with_height_walks_ancestors() {
        let tip = chain(5);
        for h in 0..=5 {
            let block = get_block_with_height(&tip, h).unwrap();
            assert_eq!(block.height(), h as u64);
        }
    }

    #[test]
    fn get_block_with_height_rejects_out_of_range() {
        let tip = chain(3);
        assert!(get_block_with_height(&tip, -1).is_none());
        assert!(get_block_with_height(&tip, 4).is_none());
    }

    #[test]
    fn total_difficulty_accumulates() {
        let tip = chain(3);
        assert_eq!(*tip.total_difficulty(), BigUint::from(4u32));
    }
}
