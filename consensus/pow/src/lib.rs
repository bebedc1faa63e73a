//! Proof-of-Work consensus (component D): the next-difficulty retarget
//! rule, received-block validity (inherited from the default
//! [`ConsensusAlgorithm`] methods) and the stochastic mining-delay sampler.
//!
//! The sampler draws `delay = floor(ln(u) / ln(1 - p) / miningPower)` with
//! `p = 1 / nextDifficulty`. Computing `ln(1 - p)` directly in `f64` loses
//! all precision once `p` is small enough that `1.0 - p == 1.0` in double
//! precision; we instead expand it as the Mercator series
//! `ln(1 - p) = -sum_{k>=1} p^k / k` evaluated with [`BigDecimal`] at a
//! configurable scale (at least 20 fractional digits), which never needs to
//! form `1 - p` at all and so never cancels.

mod ln;

use bigdecimal::{BigDecimal, ToPrimitive};
use blocksim_consensus_core::block::{get_block_with_height, Block};
use blocksim_consensus_core::consensus_algo::{ConsensusAlgorithm, MiningPowerLookup};
use blocksim_consensus_core::ids::{BlockId, NodeId};
use blocksim_core::{SimError, SimResult, SimRng};
use num::BigUint;
use std::str::FromStr;
use std::sync::Arc;

/// Parameters governing the difficulty retarget rule: a network's consensus
/// parameter table. If two nodes disagreed on these, their fork-choice
/// decisions would desynchronize.
#[derive(Clone, Debug)]
pub struct PowParams {
    /// Target mean time between blocks, in virtual ms.
    pub target_interval_ms: u64,
    /// Number of blocks between difficulty retargets.
    pub difficulty_interval: u64,
    /// Difficulty assigned to every node's genesis block.
    pub genesis_difficulty: BigUint,
    /// Fractional-digit precision used by the mining-delay sampler's
    /// decimal arithmetic. Must be at least 20.
    pub decimal_scale: i64,
}

impl Default for PowParams {
    fn default() -> Self {
        Self { target_interval_ms: 600_000, difficulty_interval: 2016, genesis_difficulty: BigUint::from(1_000_000u64), decimal_scale: 40 }
    }
}

pub struct ProofOfWork {
    params: PowParams,
}

impl ProofOfWork {
    pub fn new(params: PowParams) -> Self {
        assert!(params.decimal_scale >= 20, "decimal scale must be >= 20 to bound the mining-delay sampler's precision loss");
        Self { params }
    }

    /// The difficulty at which `p = 1 / difficulty` first drops to or below
    /// `2^-70`. Reaching it is a fatal configuration error, not a silent
    /// no-mining-attempt result: under the default parameters this branch is
    /// unreachable, and staying silent there would hide a misconfigured
    /// difficulty target instead of reporting it.
    fn unreachable_difficulty_threshold() -> BigUint {
        BigUint::from(2u32).pow(70)
    }
}

impl ConsensusAlgorithm for ProofOfWork {
    fn genesis_block(&self, id: BlockId, producer: NodeId, mint_time: u64) -> Arc<Block> {
        Block::genesis(id, producer, mint_time, self.params.genesis_difficulty.clone())
    }

    /// Equal to the parent's difficulty between retarget points; at every
    /// `difficulty_interval`'th block, scales the parent difficulty by the
    /// ratio of total mining power observed over the window to the target
    /// throughput that power should have produced.
    fn next_difficulty(&self, parent: &Arc<Block>, mining_power_of: &MiningPowerLookup<'_>) -> BigUint {
        let child_height = parent.height() + 1;
        if child_height < self.params.difficulty_interval || child_height % self.params.difficulty_interval != 0 {
            return parent.difficulty().clone();
        }

        let window_start_height = (child_height - self.params.difficulty_interval) as i64;
        let window_start =
            get_block_with_height(parent, window_start_height).expect("difficulty_interval divides child_height exactly");
        let observed_interval_ms = parent.mint_time().saturating_sub(window_start.mint_time());
        if observed_interval_ms == 0 {
            return parent.difficulty().clone();
        }

        let mut total_power: u128 = 0;
        let mut cursor = parent.clone();
        while cursor.height() as i64 > window_start_height {
            total_power += mining_power_of(cursor.producer()) as u128;
            cursor = cursor.parent().expect("cursor above the window boundary always has a parent").clone();
        }

        let next = parent.difficulty().clone() * BigUint::from(total_power) * BigUint::from(self.params.target_interval_ms)
            / BigUint::from(observed_interval_ms);
        next.max(BigUint::from(1u32))
    }

    fn mining_delay_ms(
        &self,
        rng: &mut SimRng,
        mining_power: u64,
        tip: &Arc<Block>,
        mining_power_of: &MiningPowerLookup<'_>,
    ) -> SimResult<u64> {
        if mining_power == 0 {
            return Err(SimError::Arithmetic { where_: "mining_delay_ms", reason: "mining power must be positive".to_string() });
        }

        let next_difficulty = self.next_difficulty(tip, mining_power_of);
        if next_difficulty >= Self::unreachable_difficulty_threshold() {
            return Err(SimError::Arithmetic {
                where_: "mining_delay_ms",
                reason: format!(
                    "next difficulty {next_difficulty} implies p <= 2^-70; this is unreachable under default \
                     parameters and indicates a misconfigured difficulty target"
                ),
            });
        }

        let scale = self.params.decimal_scale;
        let difficulty_dec =
            BigDecimal::from_str(&next_difficulty.to_string()).map_err(|e| decimal_error("next_difficulty", e))?;
        let p = (BigDecimal::from(1) / &difficulty_dec).with_scale(scale);
        let ln_one_minus_p = ln::ln_1_minus_p(&p, scale);

        let u = rng.uniform_open01();
        let ln_u = BigDecimal::from_str(&u.ln().to_string()).map_err(|e| decimal_error("ln(u)", e))?;

        let power_dec = BigDecimal::from_str(&mining_power.to_string()).map_err(|e| decimal_error("mining_power", e))?;
        let delay_dec = ((&ln_u / &ln_one_minus_p) / &power_dec).with_scale(scale);

        let delay_f64 = delay_dec
            .to_f64()
            .ok_or_else(|| SimError::Arithmetic { where_: "mining_delay_ms", reason: "sampled delay overflowed f64".to_string() })?;
        if !delay_f64.is_finite() || delay_f64 < 0.0 {
            return Err(SimError::Arithmetic {
                where_: "mining_delay_ms",
                reason: format!("sampled delay {delay_f64} is not a valid non-negative duration"),
            });
        }
        Ok(delay_f64.floor() as u64)
    }
}

fn decimal_error(where_: &'static str, err: bigdecimal::ParseBigDecimalError) -> SimError {
    SimError::Arithmetic { where_, reason: err.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blocksim_core::SimRng;

    fn params() -> PowParams {
        PowParams { target_interval_ms: 1000, difficulty_interval: 10, genesis_difficulty: BigUint::from(1_000u32), decimal_scale: 30 }
    }

    fn flat_power(_: NodeId) -> u64 {
        1
    }

    #[test]
    fn difficulty_unchanged_between_retarget_points() {
        let pow = ProofOfWork::new(params());
        let genesis = pow.genesis_block(0, 0, 0);
        let child = Block::child(1, 0, &genesis, 100, pow.next_difficulty(&genesis, &flat_power));
        assert_eq!(child.difficulty(), genesis.difficulty());
    }

    #[test]
    fn difficulty_retargets_upward_when_blocks_arrive_faster_than_target() {
        let p = params();
        let pow = ProofOfWork::new(p.clone());
        let mut tip = pow.genesis_block(0, 0, 0);
        let mut id = 1;
        for i in 1..=p.difficulty_interval {
            let difficulty = pow.next_difficulty(&tip, &flat_power);
            tip = Block::child(id, 0, &tip, i * 10, difficulty); // 10ms per block, target is 1000ms
            id += 1;
        }
        let retargeted = pow.next_difficulty(&tip, &flat_power);
        assert!(retargeted > *tip.difficulty(), "faster-than-target block production should raise difficulty");
    }

    #[test]
    fn mining_delay_is_sampled_and_deterministic_for_fixed_seed() {
        let pow = ProofOfWork::new(params());
        let genesis = pow.genesis_block(0, 0, 0);
        let mut rng_a = SimRng::from_seed(7);
        let mut rng_b = SimRng::from_seed(7);
        let delay_a = pow.mining_delay_ms(&mut rng_a, 3, &genesis, &flat_power).unwrap();
        let delay_b = pow.mining_delay_ms(&mut rng_b, 3, &genesis, &flat_power).unwrap();
        assert_eq!(delay_a, delay_b);
    }

    #[test]
    fn mining_delay_rejects_zero_mining_power() {
        let pow = ProofOfWork::new(params());
        let genesis = pow.genesis_block(0, 0, 0);
        let mut rng = SimRng::from_seed(1);
        assert!(pow.mining_delay_ms(&mut rng, 0, &genesis, &flat_power).is_err());
    }

    #[test]
    fn unreachable_difficulty_is_a_fatal_error_not_a_silent_none() {
        let mut p = params();
        p.genesis_difficulty = BigUint::from(2u32).pow(80);
        let pow = ProofOfWork::new(p);
        let genesis = pow.genesis_block(0, 0, 0);
        let mut rng = SimRng::from_seed(1);
        let err = pow.mining_delay_ms(&mut rng, 1, &genesis, &flat_power).unwrap_err();
        assert!(matches!(err, SimError::Arithmetic { .. }));
    }
}
