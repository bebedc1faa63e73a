use blocksim_consensus_core::NodeId;
use blocksim_core::{SimError, SimResult, SimRng};
use std::collections::BTreeSet;

/// Resolves the `TABLE` strategy id and builds each node's outbound
/// neighbor list. The routing-table policy itself is an external
/// collaborator's concern (§1); these two strategies exist so the
/// simulator is runnable end to end, not as a model of any particular
/// production topology.
pub fn build_topology(table: &str, num_nodes: u32, degree: usize, rng: &mut SimRng) -> SimResult<Vec<Vec<NodeId>>> {
    match table {
        "ring" => Ok(ring(num_nodes)),
        "random-mesh" => Ok(random_mesh(num_nodes, degree, rng)),
        other => Err(SimError::UnknownStrategy { kind: "TABLE", id: other.to_string() }),
    }
}

/// Every node's sole outbound neighbor is the next node, wrapping around.
fn ring(num_nodes: u32) -> Vec<Vec<NodeId>> {
    (0..num_nodes)
        .map(|i| if num_nodes <= 1 { Vec::new() } else { vec![(i + 1) % num_nodes] })
        .collect()
}

/// Each node picks up to `degree` distinct outbound neighbors uniformly at
/// random (excluding itself). Neighbors are collected via a `BTreeSet`
/// rather than a `HashSet`: the resulting order must be deterministic for a
/// fixed seed, since `broadcast_inv` draws one latency sample per neighbor
/// in iteration order — a `HashSet`'s randomized iteration order would
/// reshuffle the PRNG stream differently across runs and break the
/// determinism law (S6) whenever this strategy is selected.
fn random_mesh(num_nodes: u32, degree: usize, rng: &mut SimRng) -> Vec<Vec<NodeId>> {
    (0..num_nodes)
        .map(|i| {
            let mut chosen = BTreeSet::new();
            let target = degree.min(num_nodes.saturating_sub(1) as usize);
            while chosen.len() < target {
                let candidate = rng.uniform_range(0.0, num_nodes as f64) as u32;
                if candidate != i {
                    chosen.insert(candidate);
                }
            }
            chosen.into_iter().collect()
        })
        .collect()
}
