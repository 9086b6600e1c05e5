// src/backends/mod.rs
//! Generator backends
//!
//! Two algorithm families, each implemented once per SIMD tier. Every
//! backend honours the same contract:
//!
//! - seeded from `(seed, stream)` only, so two backends built from the same
//!   inputs on the same tier emit identical words;
//! - `fill(out)` writes exactly `out.len()` fresh words, where `out.len()` is
//!   a multiple of [`CAPACITY_GRANULE`](crate::config::CAPACITY_GRANULE);
//! - restartable: K fills from a fresh backend always give the same K blocks.
//!
//! The tier is bound when the [`Backend`] is built. Dispatch is a single
//! `match` per buffer refill, never per output word.

pub mod philox;
pub mod xoshiro;

use crate::config::Algorithm;
use crate::tier::SimdTier;

/// SplitMix64, used to expand a 64-bit seed into well-mixed state words.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitMix64 {
    state: u64,
}

impl SplitMix64 {
    pub const GAMMA: u64 = 0x9e37_79b9_7f4a_7c15;

    pub fn new(state: u64) -> Self {
        Self { state }
    }

    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(Self::GAMMA);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        z ^ (z >> 31)
    }
}

/// 64-bit murmur3 finalizer. Bijective, and maps 0 to 0.
#[inline]
pub fn fmix64(mut k: u64) -> u64 {
    k ^= k >> 33;
    k = k.wrapping_mul(0xff51_afd7_ed55_8ccd);
    k ^= k >> 33;
    k = k.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
    k ^ (k >> 33)
}

/// A generator backend bound to one algorithm and one tier.
///
/// Vector variants are only ever built for a tier the host supports; that is
/// the invariant every `unsafe` dispatch below relies on.
pub(crate) enum Backend {
    Xoshiro(xoshiro::Xoshiro256),
    Philox(philox::Philox4x32),
}

impl Backend {
    /// Build the backend. `tier` must already be resolved against the host's
    /// capabilities.
    pub(crate) fn new(algorithm: Algorithm, tier: SimdTier, seed: u64, stream: u64) -> Self {
        match algorithm {
            Algorithm::Xoshiro256StarStar => {
                Backend::Xoshiro(xoshiro::Xoshiro256::new(tier, seed, stream))
            }
            Algorithm::Philox4x32 => Backend::Philox(philox::Philox4x32::new(tier, seed, stream)),
        }
    }

    #[inline]
    pub(crate) fn fill(&mut self, out: &mut [u64]) {
        match self {
            Backend::Xoshiro(g) => g.fill(out),
            Backend::Philox(g) => g.fill(out),
        }
    }

    pub(crate) fn jump(&mut self) {
        match self {
            Backend::Xoshiro(g) => g.jump(),
            Backend::Philox(g) => g.jump(),
        }
    }

    /// Output words produced per backend step.
    pub(crate) fn words_per_step(&self) -> usize {
        match self {
            Backend::Xoshiro(g) => g.words_per_step(),
            Backend::Philox(g) => g.words_per_step(),
        }
    }

    pub(crate) fn tier(&self) -> SimdTier {
        match self {
            Backend::Xoshiro(g) => g.tier(),
            Backend::Philox(g) => g.tier(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CAPACITY_GRANULE;
    use crate::cpu;

    #[test]
    fn test_splitmix_reference_values() {
        // first outputs for state 0, as published with the algorithm
        let mut sm = SplitMix64::new(0);
        assert_eq!(sm.next_u64(), 0xe220_a839_7b1d_cdaf);
        assert_eq!(sm.next_u64(), 0x6e78_9e6a_a1b9_65f4);
    }

    #[test]
    fn test_fmix64_fixes_zero_and_mixes() {
        assert_eq!(fmix64(0), 0);
        assert_ne!(fmix64(1), 1);
        assert_ne!(fmix64(7), fmix64(8));
    }

    #[test]
    fn test_every_step_size_divides_granule() {
        for tier in cpu::capabilities().available_tiers() {
            for algorithm in Algorithm::ALL {
                let backend = Backend::new(algorithm, tier, 1, 0);
                assert_eq!(backend.tier(), tier);
                assert_eq!(
                    CAPACITY_GRANULE % backend.words_per_step(),
                    0,
                    "{} / {}",
                    algorithm,
                    tier
                );
            }
        }
    }

    #[test]
    fn test_backends_are_restartable() {
        for tier in cpu::capabilities().available_tiers() {
            for algorithm in Algorithm::ALL {
                let mut a = Backend::new(algorithm, tier, 99, 3);
                let mut b = Backend::new(algorithm, tier, 99, 3);
                let mut wa = vec![0u64; 64];
                let mut wb = vec![0u64; 64];
                for _ in 0..3 {
                    a.fill(&mut wa);
                    b.fill(&mut wb);
                    assert_eq!(wa, wb, "{} / {}", algorithm, tier);
                }
            }
        }
    }
}
