/// Stable integer identity of a node, assigned in creation order starting
/// at 0.
pub type NodeId = u32;

/// Stable integer identity of a block, assigned in minting order.
pub type BlockId = u64;

/// Index into the region-indexed latency/bandwidth/degree-distribution
/// tables a node belongs to.
pub type RegionId = usize;
