use crate::node::Node;
use crate::protocol::ProtocolParams;
use blocksim_consensus_core::{BlockId, ConsensusAlgorithm, NodeId};
use blocksim_core::{Scheduler, Simulation, SimRng};
use blocksim_network::NetworkModel;
use blocksim_observer::PropagationObserver;
use std::io::Write;

/// Everything a running simulation needs: the scheduler and PRNG from
/// `blocksim-core`, the network model, the pluggable consensus algorithm,
/// the observer, and the node registry itself. One `SimContext` is the sole
/// mutable state threaded through every task closure — the "principled
/// rewrite" alternative to process-wide singletons.
pub struct SimContext<W: Write> {
    scheduler: Scheduler<Self>,
    rng: SimRng,
    network: NetworkModel,
    consensus: Box<dyn ConsensusAlgorithm>,
    observer: PropagationObserver<W>,
    nodes: Vec<Node>,
    protocol: ProtocolParams,
    next_block_id: BlockId,
}

impl<W: Write> Simulation for SimContext<W> {
    fn scheduler_mut(&mut self) -> &mut Scheduler<Self> {
        &mut self.scheduler
    }
}

impl<W: Write> SimContext<W> {
    pub fn new(
        rng: SimRng,
        network: NetworkModel,
        consensus: Box<dyn ConsensusAlgorithm>,
        observer: PropagationObserver<W>,
        protocol: ProtocolParams,
    ) -> Self {
        Self {
            scheduler: Scheduler::new(),
            rng,
            network,
            consensus,
            observer,
            nodes: Vec::new(),
            protocol,
            next_block_id: 0,
        }
    }

    pub fn alloc_block_id(&mut self) -> BlockId {
        let id = self.next_block_id;
        self.next_block_id += 1;
        id
    }

    pub fn push_node(&mut self, node: Node) -> NodeId {
        let id = node.id();
        self.nodes.push(node);
        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id as usize]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id as usize]
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn max_tip_height(&self) -> u64 {
        self.nodes.iter().map(|n| n.tip().height()).max().unwrap_or(0)
    }

    /// A plain snapshot of every node's mining power, indexed by `NodeId`.
    /// Building this up front (rather than threading a closure borrowing
    /// `&self.nodes`) keeps the borrow checker out of the mutable-scheduling
    /// code paths that need it.
    pub fn mining_power_snapshot(&self) -> Vec<u64> {
        self.nodes.iter().map(Node::mining_power).collect()
    }

    pub fn consensus(&self) -> &dyn ConsensusAlgorithm {
        self.consensus.as_ref()
    }

    /// Splits the borrow of `self` so the consensus algorithm and the PRNG
    /// can be used together in one call (e.g. the mining-delay sampler),
    /// which `ctx.consensus()` and `ctx.rng_mut()` called separately cannot
    /// do: the two immutable/mutable borrows of `self` they'd each take
    /// would overlap.
    pub fn consensus_and_rng_mut(&mut self) -> (&dyn ConsensusAlgorithm, &mut SimRng) {
        (self.consensus.as_ref(), &mut self.rng)
    }

    pub fn network(&self) -> &NetworkModel {
        &self.network
    }

    /// See [`Self::consensus_and_rng_mut`]; same split-borrow need for the
    /// network model's latency/download-time samplers.
    pub fn network_and_rng_mut(&mut self) -> (&NetworkModel, &mut SimRng) {
        (&self.network, &mut self.rng)
    }

    pub fn protocol(&self) -> &ProtocolParams {
        &self.protocol
    }

    pub fn rng_mut(&mut self) -> &mut SimRng {
        &mut self.rng
    }

    pub fn observer_mut(&mut self) -> &mut PropagationObserver<W> {
        &mut self.observer
    }

    pub fn observer(&self) -> &PropagationObserver<W> {
        &self.observer
    }

    pub fn current_time(&self) -> u64 {
        self.scheduler.current_time()
    }
}
