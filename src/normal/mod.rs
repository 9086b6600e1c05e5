// src/normal/mod.rs
//! Standard normal transforms
//!
//! # Design Philosophy
//!
//! Two interchangeable samplers turn uniform words into N(0, 1) draws:
//! 1. **Ziggurat**: table-driven rejection over 256 strips, branchy but
//!    almost always done after two words. Default on the scalar and NEON tiers.
//! 2. **Polar**: Marsaglia's polar method run a full vector of pairs at a
//!    time, with the accepted lanes compacted afterwards. Default on the
//!    256-bit and 512-bit tiers, where it keeps the whole pipeline vectorized.
//!
//! Both read their uniforms through [`UniformSource`] and never emit NaN or
//! infinities, whatever bit patterns the source produces.

pub mod log;
pub mod polar;
pub mod ziggurat;

use crate::buffer::u64_to_unit_f64;
use crate::error::{validation::unknown_name, RngError};
use crate::tier::SimdTier;
use polar::PolarKernel;
use std::fmt;
use std::str::FromStr;

/// Anything that can hand out uniform 64-bit words.
pub trait UniformSource {
    fn next_u64(&mut self) -> u64;

    fn fill_u64(&mut self, out: &mut [u64]) {
        for slot in out.iter_mut() {
            *slot = self.next_u64();
        }
    }

    /// Uniform double in `[0, 1)`.
    #[inline]
    fn next_f64(&mut self) -> f64 {
        u64_to_unit_f64(self.next_u64())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NormalMethod {
    Ziggurat,
    Polar,
}

impl NormalMethod {
    /// Method used when the configuration does not name one.
    pub const fn default_for(tier: SimdTier) -> Self {
        if tier.is_wide() {
            NormalMethod::Polar
        } else {
            NormalMethod::Ziggurat
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            NormalMethod::Ziggurat => "ziggurat",
            NormalMethod::Polar => "polar",
        }
    }
}

impl fmt::Display for NormalMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for NormalMethod {
    type Err = RngError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ziggurat" | "zig" => Ok(NormalMethod::Ziggurat),
            "polar" | "marsaglia" => Ok(NormalMethod::Polar),
            other => Err(unknown_name("normal_method", other, "ziggurat, polar")),
        }
    }
}

/// Normal sampler bound to a method and, for polar, a tier kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NormalKernel {
    Ziggurat,
    Polar(PolarKernel),
}

impl NormalKernel {
    pub(crate) fn new(method: NormalMethod, tier: SimdTier) -> Self {
        match method {
            NormalMethod::Ziggurat => {
                ziggurat::init();
                NormalKernel::Ziggurat
            }
            NormalMethod::Polar => NormalKernel::Polar(PolarKernel::for_tier(tier)),
        }
    }

    pub(crate) fn method(self) -> NormalMethod {
        match self {
            NormalKernel::Ziggurat => NormalMethod::Ziggurat,
            NormalKernel::Polar(_) => NormalMethod::Polar,
        }
    }

    /// Fill `out` with standard normal draws.
    pub(crate) fn fill<S: UniformSource>(self, src: &mut S, out: &mut [f64]) {
        match self {
            NormalKernel::Ziggurat => {
                for slot in out.iter_mut() {
                    *slot = ziggurat::sample(src);
                }
            }
            NormalKernel::Polar(kernel) => polar::fill(kernel, src, out),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_sources {
    use super::UniformSource;
    use crate::backends::xoshiro::Xoshiro256Scalar;

    impl UniformSource for Xoshiro256Scalar {
        fn next_u64(&mut self) -> u64 {
            Xoshiro256Scalar::next_u64(self)
        }
    }

    /// Weyl sequence over the full word range.
    pub struct Weyl(pub u64);

    impl UniformSource for Weyl {
        fn next_u64(&mut self) -> u64 {
            self.0 = self.0.wrapping_add(0x9e37_79b9_7f4a_7c15);
            self.0
        }
    }

    /// Cycles through a fixed list of words.
    pub struct Pattern {
        pub words: Vec<u64>,
        pub at: usize,
    }

    impl UniformSource for Pattern {
        fn next_u64(&mut self) -> u64 {
            let w = self.words[self.at % self.words.len()];
            self.at += 1;
            w
        }
    }
}
