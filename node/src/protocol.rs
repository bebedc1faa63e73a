/// Protocol-level sizing and CBR-failure parameters consumed by the node
/// state machine (§6's external-interface table, minus the strategy ids
/// that belong to the config/topology layer above this crate).
#[derive(Clone, Debug)]
pub struct ProtocolParams {
    pub block_size_bytes: u64,
    pub compact_block_size_bytes: u64,
    pub cbr_failure_rate_control_node: f64,
    pub cbr_failure_rate_churn_node: f64,
    /// Discrete empirical distribution over fallback transfer sizes used
    /// when compact-block relay fails: parallel `sizes`/`weights` arrays fed
    /// to `SimRng::weighted_index`.
    pub cbr_failure_fallback_sizes_bytes: Vec<u64>,
    pub cbr_failure_fallback_weights: Vec<f64>,
}

impl ProtocolParams {
    pub fn cbr_failure_rate(&self, is_churn: bool) -> f64 {
        if is_churn {
            self.cbr_failure_rate_churn_node
        } else {
            self.cbr_failure_rate_control_node
        }
    }
}

impl Default for ProtocolParams {
    fn default() -> Self {
        Self {
            block_size_bytes: 1_000_000,
            compact_block_size_bytes: 20_000,
            cbr_failure_rate_control_node: 0.05,
            cbr_failure_rate_churn_node: 0.25,
            cbr_failure_fallback_sizes_bytes: vec![50_000, 200_000, 1_000_000],
            cbr_failure_fallback_weights: vec![0.5, 0.3, 0.2],
        }
    }
}
