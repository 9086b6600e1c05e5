// src/config.rs
use crate::error::{validation::unknown_name, RngError};
use crate::normal::NormalMethod;
use crate::tier::SimdTier;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// Environment variable that forces a tier for testing and benchmarking.
pub const FORCE_SIMD_ENV: &str = "FAST_RNG_FORCE_SIMD";

/// Default internal buffer size, in u64 words.
pub const DEFAULT_BUFFER_CAPACITY: usize = 8192;

/// Buffer capacities are rounded up to a multiple of this many words so that
/// every backend refills whole steps. The widest step is Philox on AVX-512:
/// 16 lanes of two words each.
pub const CAPACITY_GRANULE: usize = 32;

/// Core generator family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    /// xoshiro256**: 256 bits of state per lane, rotate/multiply/xor steps.
    Xoshiro256StarStar,
    /// Philox4x32-10: keyed counter-based block generator.
    Philox4x32,
}

impl Algorithm {
    pub const ALL: [Algorithm; 2] = [Algorithm::Xoshiro256StarStar, Algorithm::Philox4x32];

    pub const fn name(self) -> &'static str {
        match self {
            Algorithm::Xoshiro256StarStar => "xoshiro256ss",
            Algorithm::Philox4x32 => "philox4x32",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Algorithm {
    type Err = RngError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "xoshiro" | "xoshiro256ss" | "xoshiro256**" | "state" => Ok(Algorithm::Xoshiro256StarStar),
            "philox" | "philox4x32" | "philox4x32-10" | "counter" => Ok(Algorithm::Philox4x32),
            other => Err(unknown_name("algorithm", other, "xoshiro256ss, philox4x32")),
        }
    }
}

/// Generator configuration. Immutable once a generator is built from it.
#[derive(Debug, Clone, PartialEq)]
pub struct RngConfig {
    pub algorithm: Algorithm,
    pub seed: u64,
    /// Stream / counter-start identifier. Instances sharing a seed but using
    /// distinct streams produce independent sequences.
    pub stream: u64,
    /// Internal buffer size in u64 words (0 selects the default).
    pub buffer_capacity: usize,
    /// Tier override; wins over the environment variable.
    pub force_tier: Option<SimdTier>,
    /// Normal transform override; `None` picks the tier default.
    pub normal_method: Option<NormalMethod>,
    /// Whether `FAST_RNG_FORCE_SIMD` is consulted when `force_tier` is unset.
    pub honor_env_override: bool,
}

impl RngConfig {
    /// Capacity actually allocated: defaulted and rounded up to whole steps.
    ///
    /// Requests too large to round up saturate at the largest multiple of the
    /// granule; allocating that fails with `AllocationFailed`.
    pub fn effective_capacity(&self) -> usize {
        let requested = if self.buffer_capacity == 0 {
            DEFAULT_BUFFER_CAPACITY
        } else {
            self.buffer_capacity
        };
        requested
            .div_ceil(CAPACITY_GRANULE)
            .saturating_mul(CAPACITY_GRANULE)
            & !(CAPACITY_GRANULE - 1)
    }

    /// The tier override in effect: `force_tier`, else the environment.
    pub fn requested_tier(&self) -> Option<SimdTier> {
        if self.force_tier.is_some() {
            return self.force_tier;
        }
        if !self.honor_env_override {
            return None;
        }
        std::env::var(FORCE_SIMD_ENV)
            .ok()
            .and_then(|value| parse_tier_override(&value))
    }

    /// Copy of this configuration for worker `index`, on its own stream.
    pub fn for_worker(&self, index: u64) -> Self {
        RngConfig {
            stream: self.stream.wrapping_add(index),
            ..self.clone()
        }
    }
}

impl Default for RngConfig {
    fn default() -> Self {
        RngConfig {
            algorithm: Algorithm::Xoshiro256StarStar,
            seed: 0xDEAD_BEEF_CAFE_BABE,
            stream: 0,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            force_tier: None,
            normal_method: None,
            honor_env_override: true,
        }
    }
}

/// Parse an override value; unknown names are logged and ignored.
pub fn parse_tier_override(value: &str) -> Option<SimdTier> {
    if value.trim().is_empty() {
        return None;
    }
    match value.parse::<SimdTier>() {
        Ok(tier) => Some(tier),
        Err(err) => {
            warn!(%err, "ignoring {}", FORCE_SIMD_ENV);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = RngConfig::default();
        assert_eq!(cfg.seed, 0xDEAD_BEEF_CAFE_BABE);
        assert_eq!(cfg.stream, 0);
        assert_eq!(cfg.effective_capacity(), DEFAULT_BUFFER_CAPACITY);
    }

    #[test]
    fn test_effective_capacity_rounding() {
        let cfg = |buffer_capacity| RngConfig {
            buffer_capacity,
            ..Default::default()
        };
        assert_eq!(cfg(0).effective_capacity(), DEFAULT_BUFFER_CAPACITY);
        assert_eq!(cfg(1).effective_capacity(), 32);
        assert_eq!(cfg(32).effective_capacity(), 32);
        assert_eq!(cfg(33).effective_capacity(), 64);
        assert_eq!(cfg(1000).effective_capacity(), 1024);

        let huge = cfg(usize::MAX).effective_capacity();
        assert_eq!(huge % CAPACITY_GRANULE, 0);
        assert!(huge > usize::MAX - CAPACITY_GRANULE);
    }

    #[test]
    fn test_force_tier_wins_over_env() {
        let cfg = RngConfig {
            force_tier: Some(SimdTier::Scalar),
            ..Default::default()
        };
        assert_eq!(cfg.requested_tier(), Some(SimdTier::Scalar));
    }

    #[test]
    fn test_env_ignored_when_disabled() {
        let cfg = RngConfig {
            honor_env_override: false,
            ..Default::default()
        };
        assert_eq!(cfg.requested_tier(), None);
    }

    #[test]
    fn test_parse_tier_override() {
        assert_eq!(parse_tier_override("avx512"), Some(SimdTier::Vec512));
        assert_eq!(parse_tier_override("SCALAR"), Some(SimdTier::Scalar));
        assert_eq!(parse_tier_override("mmx"), None);
        assert_eq!(parse_tier_override(""), None);
    }

    #[test]
    fn test_parse_algorithm() {
        assert_eq!("philox".parse::<Algorithm>().unwrap(), Algorithm::Philox4x32);
        assert_eq!(
            "Xoshiro256SS".parse::<Algorithm>().unwrap(),
            Algorithm::Xoshiro256StarStar
        );
        assert!("mt19937".parse::<Algorithm>().is_err());
    }

    #[test]
    fn test_for_worker_offsets_stream() {
        let base = RngConfig {
            stream: u64::MAX,
            ..Default::default()
        };
        assert_eq!(base.for_worker(0).stream, u64::MAX);
        assert_eq!(base.for_worker(1).stream, 0);
        assert_eq!(base.for_worker(3).seed, base.seed);
    }
}
