use blocksim_core::{SimError, SimResult};
use blocksim_node::ProtocolParams;
use blocksim_pow::PowParams;
use num::BigUint;
use serde::Deserialize;
use std::path::Path;

/// The recognized configuration options from §6's external-interface table,
/// plus the ambient seed and output-directory settings every run needs.
#[derive(Debug, Clone, Deserialize)]
pub struct SimConfig {
    pub num_of_nodes: u32,
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_average_mining_power")]
    pub average_mining_power: f64,
    #[serde(default = "default_stdev_mining_power")]
    pub stdev_of_mining_power: f64,
    pub end_block_height: u64,
    #[serde(default = "default_block_size_bytes")]
    pub block_size_bytes: u64,
    #[serde(default = "default_compact_block_size_bytes")]
    pub compact_block_size_bytes: u64,
    #[serde(default = "default_cbr_usage_rate")]
    pub cbr_usage_rate: f64,
    #[serde(default = "default_churn_node_rate")]
    pub churn_node_rate: f64,
    #[serde(default = "default_cbr_failure_rate_control")]
    pub cbr_failure_rate_for_control_node: f64,
    #[serde(default = "default_cbr_failure_rate_churn")]
    pub cbr_failure_rate_for_churn_node: f64,
    #[serde(default = "default_fallback_sizes")]
    pub cbr_failure_block_size_distribution_sizes_bytes: Vec<u64>,
    #[serde(default = "default_fallback_weights")]
    pub cbr_failure_block_size_distribution_weights: Vec<f64>,
    #[serde(default = "default_difficulty_interval")]
    pub difficulty_interval: u64,
    #[serde(default = "default_genesis_difficulty")]
    pub genesis_difficulty: u64,
    #[serde(default = "default_table")]
    pub table: String,
    #[serde(default = "default_topology_degree")]
    pub topology_degree: usize,
    #[serde(default = "default_algo")]
    pub algo: String,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    #[serde(default = "default_observer_window")]
    pub observer_window: usize,
}

fn default_interval_ms() -> u64 {
    600_000
}
fn default_average_mining_power() -> f64 {
    100.0
}
fn default_stdev_mining_power() -> f64 {
    20.0
}
fn default_block_size_bytes() -> u64 {
    1_000_000
}
fn default_compact_block_size_bytes() -> u64 {
    20_000
}
fn default_cbr_usage_rate() -> f64 {
    0.85
}
fn default_churn_node_rate() -> f64 {
    0.1
}
fn default_cbr_failure_rate_control() -> f64 {
    0.05
}
fn default_cbr_failure_rate_churn() -> f64 {
    0.25
}
fn default_fallback_sizes() -> Vec<u64> {
    vec![50_000, 200_000, 1_000_000]
}
fn default_fallback_weights() -> Vec<f64> {
    vec![0.5, 0.3, 0.2]
}
fn default_difficulty_interval() -> u64 {
    2016
}
fn default_genesis_difficulty() -> u64 {
    1_000_000
}
fn default_table() -> String {
    "ring".to_string()
}
fn default_topology_degree() -> usize {
    6
}
fn default_algo() -> String {
    "pow".to_string()
}
fn default_seed() -> u64 {
    0
}
fn default_output_dir() -> String {
    ".".to_string()
}
fn default_observer_window() -> usize {
    10
}

impl SimConfig {
    /// Loads and parses a TOML config file. Missing or unparseable config is
    /// a fatal startup error (§7).
    pub fn load(path: impl AsRef<Path>) -> SimResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| SimError::Config(format!("cannot read config file {}: {e}", path.display())))?;
        toml::from_str(&text).map_err(|e| SimError::Config(format!("cannot parse config file {}: {e}", path.display())))
    }

    pub fn protocol_params(&self) -> ProtocolParams {
        ProtocolParams {
            block_size_bytes: self.block_size_bytes,
            compact_block_size_bytes: self.compact_block_size_bytes,
            cbr_failure_rate_control_node: self.cbr_failure_rate_for_control_node,
            cbr_failure_rate_churn_node: self.cbr_failure_rate_for_churn_node,
            cbr_failure_fallback_sizes_bytes: self.cbr_failure_block_size_distribution_sizes_bytes.clone(),
            cbr_failure_fallback_weights: self.cbr_failure_block_size_distribution_weights.clone(),
        }
    }

    pub fn pow_params(&self) -> PowParams {
        PowParams {
            target_interval_ms: self.interval_ms,
            difficulty_interval: self.difficulty_interval,
            genesis_difficulty: BigUint::from(self.genesis_difficulty),
            decimal_scale: 40,
        }
    }
}
