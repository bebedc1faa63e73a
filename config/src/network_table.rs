use blocksim_network::{LatencyParams, NetworkModel, RegionParams};

/// A default region/latency/bandwidth table covering three broad regions
/// (roughly North America, Europe and Asia-Pacific). The tables themselves
/// are an external collaborator's concern (§1) — this default exists so the
/// simulator is runnable end to end without a separate table-loading
/// subsystem, the same role `build_topology`'s built-in strategies play for
/// the `TABLE` id.
pub fn default_network_model() -> NetworkModel {
    let regions = vec![
        RegionParams { assignment_weight: 0.4, upload_bandwidth_bits_per_ms: 10_000.0, download_bandwidth_bits_per_ms: 10_000.0 },
        RegionParams { assignment_weight: 0.35, upload_bandwidth_bits_per_ms: 8_000.0, download_bandwidth_bits_per_ms: 8_000.0 },
        RegionParams { assignment_weight: 0.25, upload_bandwidth_bits_per_ms: 5_000.0, download_bandwidth_bits_per_ms: 5_000.0 },
    ];
    let latency = vec![
        vec![
            LatencyParams { mean_ms: 30.0, stdev_ms: 5.0 },
            LatencyParams { mean_ms: 90.0, stdev_ms: 15.0 },
            LatencyParams { mean_ms: 150.0, stdev_ms: 20.0 },
        ],
        vec![
            LatencyParams { mean_ms: 90.0, stdev_ms: 15.0 },
            LatencyParams { mean_ms: 20.0, stdev_ms: 5.0 },
            LatencyParams { mean_ms: 180.0, stdev_ms: 25.0 },
        ],
        vec![
            LatencyParams { mean_ms: 150.0, stdev_ms: 20.0 },
            LatencyParams { mean_ms: 180.0, stdev_ms: 25.0 },
            LatencyParams { mean_ms: 25.0, stdev_ms: 5.0 },
        ],
    ];
    NetworkModel::new(regions, latency)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_model_has_three_regions_with_a_square_latency_matrix() {
        let model = default_network_model();
        assert_eq!(model.region_count(), 3);
    }
}
