//! Configuration loading and the strategy-id resolution (`TABLE`, `ALGO`)
//! that the simulation driver treats as opaque external collaborators
//! (§1/§9). Only Proof-of-Work is implemented as a concrete
//! `ConsensusAlgorithm`, but the `ALGO` id is resolved through the same
//! unknown-strategy error path a Proof-of-Stake plugin would use.

mod config;
mod network_table;
mod strategy;
mod topology;

pub use config::SimConfig;
pub use network_table::default_network_model;
pub use strategy::resolve_consensus;
pub use topology::build_topology;
