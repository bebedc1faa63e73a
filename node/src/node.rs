use blocksim_consensus_core::{Block, BlockId, NodeId, RegionId};
use blocksim_core::Cancel;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Per-(block, peer) download state (§4.E). Keyed externally by
/// `(BlockId, NodeId)` in [`Node::download_state`] rather than carried
/// inside the variant, since the key is also the map key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DownloadState {
    AwaitingCmpct,
    AwaitingFullBlock,
    AwaitingFallback,
    Delivered,
}

/// One participant. Identity, region and mining power are fixed at
/// construction; everything else (tip, in-flight downloads, the mining-task
/// handle, orphan INVs) mutates as the simulation runs.
pub struct Node {
    id: NodeId,
    region: RegionId,
    mining_power: u64,
    use_cbr: bool,
    is_churn: bool,
    neighbors: Vec<NodeId>,
    tip: Arc<Block>,
    mining_task: Option<Cancel>,
    /// Every block this node has validated and incorporated into a chain it
    /// has held as tip (or genesis) — the set against which INVs are
    /// checked to decide whether their parent is locally known.
    known_blocks: HashSet<BlockId>,
    download_state: HashMap<(BlockId, NodeId), DownloadState>,
    /// INVs queued because their parent was not yet in `known_blocks`,
    /// keyed by the missing parent's id and replayed once that id is added.
    orphans: HashMap<BlockId, Vec<(NodeId, Arc<Block>)>>,
}

impl Node {
    pub fn new(id: NodeId, region: RegionId, mining_power: u64, use_cbr: bool, is_churn: bool, genesis: Arc<Block>) -> Self {
        let mut known_blocks = HashSet::new();
        known_blocks.insert(genesis.id());
        Self {
            id,
            region,
            mining_power,
            use_cbr,
            is_churn,
            neighbors: Vec::new(),
            tip: genesis,
            mining_task: None,
            known_blocks,
            download_state: HashMap::new(),
            orphans: HashMap::new(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn region(&self) -> RegionId {
        self.region
    }

    pub fn mining_power(&self) -> u64 {
        self.mining_power
    }

    pub fn use_cbr(&self) -> bool {
        self.use_cbr
    }

    pub fn is_churn(&self) -> bool {
        self.is_churn
    }

    pub fn neighbors(&self) -> &[NodeId] {
        &self.neighbors
    }

    pub fn set_neighbors(&mut self, neighbors: Vec<NodeId>) {
        self.neighbors = neighbors;
    }

    pub fn tip(&self) -> &Arc<Block> {
        &self.tip
    }

    pub fn set_tip(&mut self, block: Arc<Block>) {
        self.tip = block;
    }

    pub fn take_mining_task(&mut self) -> Option<Cancel> {
        self.mining_task.take()
    }

    pub fn set_mining_task(&mut self, cancel: Cancel) {
        self.mining_task = Some(cancel);
    }

    pub fn knows(&self, block_id: BlockId) -> bool {
        self.known_blocks.contains(&block_id)
    }

    pub fn mark_known(&mut self, block_id: BlockId) {
        self.known_blocks.insert(block_id);
    }

    pub fn download_state(&self, key: &(BlockId, NodeId)) -> Option<&DownloadState> {
        self.download_state.get(key)
    }

    pub fn set_download_state(&mut self, key: (BlockId, NodeId), state: DownloadState) {
        self.download_state.insert(key, state);
    }

    pub fn clear_download_state(&mut self, key: &(BlockId, NodeId)) {
        self.download_state.remove(key);
    }

    pub fn queue_orphan(&mut self, missing_parent: BlockId, from: NodeId, block: Arc<Block>) {
        self.orphans.entry(missing_parent).or_default().push((from, block));
    }

    /// Drains and returns every INV that was queued waiting on `block_id`,
    /// so the caller can replay them now that `block_id` is known.
    pub fn take_orphans_waiting_on(&mut self, block_id: BlockId) -> Vec<(NodeId, Arc<Block>)> {
        self.orphans.remove(&block_id).unwrap_or_default()
    }
}
