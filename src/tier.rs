// src/tier.rs
//! SIMD tier selection
//!
//! A tier is chosen exactly once per generator, at construction:
//!
//! 1. an explicit override, if that tier is usable on this host;
//! 2. otherwise the best usable tier in the order
//!    `Vec512 > Vec256 > VecNeon > Scalar`;
//! 3. `Scalar` always qualifies.
//!
//! An override that names an unusable tier is logged and ignored; it never
//! upgrades past what the host supports and never fails construction.

use crate::cpu::CpuCapabilities;
use crate::error::{validation::unknown_name, RngError};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

/// Vector instruction-set level a generator is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimdTier {
    /// Portable 64-bit code, one lane.
    Scalar,
    /// 256-bit AVX2.
    Vec256,
    /// 512-bit AVX-512F.
    Vec512,
    /// 128-bit ARM NEON.
    VecNeon,
}

impl SimdTier {
    /// Preference order used by automatic resolution.
    pub const PREFERENCE: [SimdTier; 4] = [
        SimdTier::Vec512,
        SimdTier::Vec256,
        SimdTier::VecNeon,
        SimdTier::Scalar,
    ];

    /// Register width in bytes; also the alignment of the tier's state.
    pub const fn width_bytes(self) -> usize {
        match self {
            SimdTier::Scalar => 8,
            SimdTier::Vec256 => 32,
            SimdTier::Vec512 => 64,
            SimdTier::VecNeon => 16,
        }
    }

    /// Number of 64-bit lanes a register holds.
    pub const fn u64_lanes(self) -> usize {
        self.width_bytes() / 8
    }

    pub const fn name(self) -> &'static str {
        match self {
            SimdTier::Scalar => "scalar",
            SimdTier::Vec256 => "avx2",
            SimdTier::Vec512 => "avx512",
            SimdTier::VecNeon => "neon",
        }
    }

    /// Whether the tier runs the vectorized polar normal kernel by default.
    pub const fn is_wide(self) -> bool {
        matches!(self, SimdTier::Vec256 | SimdTier::Vec512)
    }
}

impl fmt::Display for SimdTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SimdTier {
    type Err = RngError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "scalar" => Ok(SimdTier::Scalar),
            "avx2" | "vec256" => Ok(SimdTier::Vec256),
            "avx512" | "avx512f" | "vec512" => Ok(SimdTier::Vec512),
            "neon" | "vecneon" => Ok(SimdTier::VecNeon),
            other => Err(unknown_name(
                "simd_tier",
                other,
                "scalar, avx2, vec256, avx512, vec512, neon",
            )),
        }
    }
}

/// Resolve the tier a new generator binds to.
pub fn resolve_tier(requested: Option<SimdTier>, caps: CpuCapabilities) -> SimdTier {
    if let Some(tier) = requested {
        if caps.supports(tier) {
            debug!(%tier, "using requested simd tier");
            return tier;
        }
        warn!(%tier, "requested simd tier is not available on this host, falling back");
    }

    let tier = SimdTier::PREFERENCE
        .iter()
        .copied()
        .find(|&t| caps.supports(t))
        .unwrap_or(SimdTier::Scalar);
    debug!(%tier, "resolved simd tier");
    tier
}

#[cfg(test)]
mod tests {
    use super::*;

    fn x86_avx2_only() -> CpuCapabilities {
        CpuCapabilities::SSE2 | CpuCapabilities::AVX | CpuCapabilities::AVX2 | CpuCapabilities::OS_YMM
    }

    fn x86_avx512() -> CpuCapabilities {
        x86_avx2_only() | CpuCapabilities::AVX512F | CpuCapabilities::OS_ZMM
    }

    #[test]
    fn test_auto_picks_best_available() {
        assert_eq!(resolve_tier(None, x86_avx512()), SimdTier::Vec512);
        assert_eq!(resolve_tier(None, x86_avx2_only()), SimdTier::Vec256);
        assert_eq!(resolve_tier(None, CpuCapabilities::NEON), SimdTier::VecNeon);
        assert_eq!(resolve_tier(None, CpuCapabilities::empty()), SimdTier::Scalar);
    }

    #[test]
    fn test_override_to_lower_tier_is_honored() {
        assert_eq!(
            resolve_tier(Some(SimdTier::Scalar), x86_avx512()),
            SimdTier::Scalar
        );
        assert_eq!(
            resolve_tier(Some(SimdTier::Vec256), x86_avx512()),
            SimdTier::Vec256
        );
    }

    #[test]
    fn test_unavailable_override_falls_through() {
        // must not upgrade past the host nor pick the unusable tier
        assert_eq!(
            resolve_tier(Some(SimdTier::Vec512), x86_avx2_only()),
            SimdTier::Vec256
        );
        assert_eq!(
            resolve_tier(Some(SimdTier::VecNeon), x86_avx2_only()),
            SimdTier::Vec256
        );
        assert_eq!(
            resolve_tier(Some(SimdTier::Vec256), CpuCapabilities::empty()),
            SimdTier::Scalar
        );
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("scalar".parse::<SimdTier>().unwrap(), SimdTier::Scalar);
        assert_eq!("AVX2".parse::<SimdTier>().unwrap(), SimdTier::Vec256);
        assert_eq!(" vec512 ".parse::<SimdTier>().unwrap(), SimdTier::Vec512);
        assert_eq!("Neon".parse::<SimdTier>().unwrap(), SimdTier::VecNeon);
        assert!("sse4".parse::<SimdTier>().is_err());
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        for tier in SimdTier::PREFERENCE {
            assert_eq!(tier.to_string().parse::<SimdTier>().unwrap(), tier);
        }
    }

    #[test]
    fn test_lane_counts() {
        assert_eq!(SimdTier::Scalar.u64_lanes(), 1);
        assert_eq!(SimdTier::Vec256.u64_lanes(), 4);
        assert_eq!(SimdTier::Vec512.u64_lanes(), 8);
        assert_eq!(SimdTier::VecNeon.u64_lanes(), 2);
    }
}
