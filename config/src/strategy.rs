use blocksim_consensus_core::ConsensusAlgorithm;
use blocksim_core::{SimError, SimResult};
use blocksim_pow::{PowParams, ProofOfWork};

/// Resolves the `ALGO` strategy id to a concrete [`ConsensusAlgorithm`].
/// Proof-of-Work (`"pow"`) is the only implementation in this workspace; any
/// other id is a fatal configuration error rather than a silent fallback, so
/// that a typo in config does not quietly run the wrong consensus.
pub fn resolve_consensus(algo: &str, params: PowParams) -> SimResult<Box<dyn ConsensusAlgorithm>> {
    match algo {
        "pow" => Ok(Box::new(ProofOfWork::new(params))),
        other => Err(SimError::UnknownStrategy { kind: "ALGO", id: other.to_string() }),
    }
}
