use blocksim_consensus_core::ids::RegionId;
use blocksim_core::SimRng;
use thiserror::Error;

/// A fixed per-message processing term added on top of the sampled network
/// latency, regardless of region pair.
const PROCESSING_DELAY_MS: u64 = 10;

#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("region id {0} is out of range for this network model")]
    UnknownRegion(RegionId),
}

/// Bandwidth and region-assignment weight for one region. Latency between
/// regions is asymmetric-capable (an `a -> b` mean need not equal `b -> a`'s)
/// so it is held in its own square matrix rather than folded into this
/// struct.
#[derive(Clone, Debug)]
pub struct RegionParams {
    /// Relative likelihood a newly created node is assigned this region
    /// (fed into [`SimRng::weighted_index`]).
    pub assignment_weight: f64,
    /// Upload bandwidth, in bits per virtual ms.
    pub upload_bandwidth_bits_per_ms: f64,
    /// Download bandwidth, in bits per virtual ms.
    pub download_bandwidth_bits_per_ms: f64,
}

/// The mean and standard deviation of the latency distribution between an
/// ordered pair of regions.
#[derive(Clone, Copy, Debug)]
pub struct LatencyParams {
    pub mean_ms: f64,
    pub stdev_ms: f64,
}

/// The static, externally-loaded region/latency/bandwidth/degree-distribution
/// tables (§4.B), plus the two operations defined over them.
pub struct NetworkModel {
    regions: Vec<RegionParams>,
    /// `latency[a][b]` is the distribution for a message sent from region
    /// `a` to region `b`.
    latency: Vec<Vec<LatencyParams>>,
}

impl NetworkModel {
    /// Builds a model from a square `latency` matrix and one [`RegionParams`]
    /// per region. `latency.len()` must equal `regions.len()`, and every row
    /// must have that same length; each row/column index corresponds to the
    /// region at that index in `regions`.
    pub fn new(regions: Vec<RegionParams>, latency: Vec<Vec<LatencyParams>>) -> Self {
        assert_eq!(latency.len(), regions.len(), "latency matrix must have one row per region");
        for row in &latency {
            assert_eq!(row.len(), regions.len(), "latency matrix must be square");
        }
        Self { regions, latency }
    }

    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    /// Samples a region for a newly created node, weighted by each region's
    /// [`RegionParams::assignment_weight`].
    pub fn sample_region(&self, rng: &mut SimRng) -> RegionId {
        let weights: Vec<f64> = self.regions.iter().map(|r| r.assignment_weight).collect();
        rng.weighted_index(&weights)
    }

    fn region(&self, region: RegionId) -> Result<&RegionParams, NetworkError> {
        self.regions.get(region).ok_or(NetworkError::UnknownRegion(region))
    }

    /// A random draw from region `a`'s latency distribution to region `b`,
    /// plus the fixed processing term. Never negative: the underlying
    /// truncated-normal sampler floors at zero.
    pub fn message_latency_ms(&self, a: RegionId, b: RegionId, rng: &mut SimRng) -> Result<u64, NetworkError> {
        if a >= self.latency.len() || b >= self.latency.len() {
            return Err(NetworkError::UnknownRegion(if a >= self.latency.len() { a } else { b }));
        }
        let params = self.latency[a][b];
        let sampled = rng.truncated_normal(params.mean_ms, params.stdev_ms, 0.0);
        Ok(sampled.round() as u64 + PROCESSING_DELAY_MS)
    }

    /// Time to transfer `bytes` from `sender`'s region to `receiver`'s
    /// region: the bandwidth-limited transfer time plus one latency draw.
    pub fn download_time_ms(&self, sender: RegionId, receiver: RegionId, bytes: u64, rng: &mut SimRng) -> Result<u64, NetworkError> {
        let sender_params = self.region(sender)?;
        let receiver_params = self.region(receiver)?;
        let bits = bytes as f64 * 8.0;
        let effective_bandwidth = sender_params.upload_bandwidth_bits_per_ms.min(receiver_params.download_bandwidth_bits_per_ms);
        let transfer_ms = bits / effective_bandwidth;
        let latency_ms = self.message_latency_ms(sender, receiver, rng)?;
        Ok(transfer_ms.ceil() as u64 + latency_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform_model(n: usize, mean_ms: f64) -> NetworkModel {
        let regions = (0..n).map(|_| RegionParams { assignment_weight: 1.0, upload_bandwidth_bits_per_ms: 1000.0, download_bandwidth_bits_per_ms: 1000.0 }).collect();
        let latency = (0..n).map(|_| vec![LatencyParams { mean_ms, stdev_ms: 0.0 }; n]).collect();
        NetworkModel::new(regions, latency)
    }

    #[test]
    fn message_latency_includes_processing_delay() {
        let model = uniform_model(2, 100.0);
        let mut rng = SimRng::from_seed(1);
        let latency = model.message_latency_ms(0, 1, &mut rng).unwrap();
        assert_eq!(latency, 110, "zero-stdev distribution should yield mean + processing delay exactly");
    }

    #[test]
    fn download_time_is_bandwidth_limited_plus_latency() {
        let model = uniform_model(2, 100.0);
        let mut rng = SimRng::from_seed(1);
        // 1000 bytes = 8000 bits, at 1000 bits/ms that's 8ms, plus 110ms latency.
        let download = model.download_time_ms(0, 1, 1000, &mut rng).unwrap();
        assert_eq!(download, 8 + 110);
    }

    #[test]
    fn unknown_region_is_reported_not_panicked() {
        let model = uniform_model(1, 50.0);
        let mut rng = SimRng::from_seed(1);
        assert!(matches!(model.download_time_ms(0, 5, 100, &mut rng), Err(NetworkError::UnknownRegion(5))));
    }

    #[test]
    fn region_sampling_respects_weights() {
        let regions = vec![
            RegionParams { assignment_weight: 0.0, upload_bandwidth_bits_per_ms: 1.0, download_bandwidth_bits_per_ms: 1.0 },
            RegionParams { assignment_weight: 1.0, upload_bandwidth_bits_per_ms: 1.0, download_bandwidth_bits_per_ms: 1.0 },
        ];
        let latency = vec![vec![LatencyParams { mean_ms: 1.0, stdev_ms: 0.0 }; 2]; 2];
        let model = NetworkModel::new(regions, latency);
        let mut rng = SimRng::from_seed(3);
        for _ in 0..20 {
            assert_eq!(model.sample_region(&mut rng), 1, "zero-weight region must never be sampled");
        }
    }
}
