// src/normal/polar/mod.rs
//! Vectorized Marsaglia polar method
//!
//! # Algorithm
//!
//! For every lane of a vector, in parallel:
//! ```text
//! u, v = 2·U - 1                       (uniform on (-1, 1))
//! s    = u² + v²
//! keep = S_MIN < s < 1
//! s'   = keep ? s : 1                  (rejected lanes get a harmless value)
//! k    = sqrt(clamp(-2 ln(s') / s', 0, K_MAX))
//! z_u, z_v = u·k, v·k                  (non-finite results become 0)
//! ```
//! The kernel returns the `keep` mask. The driver then copies `z_u, z_v` of
//! each kept lane, lane by lane, into the output and draws a fresh vector until
//! the output is full. A vector with no kept lane falls back to one scalar pair
//! drawn with retry, so the loop always advances. Surplus values of the last
//! vector are dropped.
//!
//! A kernel consumes `2L` words per vector: `L` for `u`, then `L` for `v`.

#[cfg(target_arch = "x86_64")]
pub(crate) mod avx2;
#[cfg(target_arch = "x86_64")]
pub(crate) mod avx512;
#[cfg(target_arch = "aarch64")]
pub(crate) mod neon;

use super::{log, UniformSource};
use crate::buffer::u64_to_unit_f64;
use crate::tier::SimdTier;

/// Smallest accepted `s`; below it `-2 ln(s)/s` loses all meaning.
pub const S_MIN: f64 = 1e-300;

/// Upper clamp on `-2 ln(s)/s` before the square root.
pub const K_MAX: f64 = 1e300;

/// Widest kernel, in lanes.
const MAX_LANES: usize = 8;

/// Map a word to `(-1, 1)`; `-1` itself is reachable but always rejected.
#[inline(always)]
pub(crate) fn to_signed_unit(w: u64) -> f64 {
    2.0 * u64_to_unit_f64(w) - 1.0
}

#[inline(always)]
fn finite_or_zero(z: f64) -> f64 {
    if z.abs() < f64::INFINITY {
        z
    } else {
        0.0
    }
}

/// One scalar lane: the normal pair for `(wu, wv)`, or `None` if rejected.
#[inline]
pub fn polar_pair(wu: u64, wv: u64) -> Option<(f64, f64)> {
    let u = to_signed_unit(wu);
    let v = to_signed_unit(wv);
    let s = u * u + v * v;
    if !(s > S_MIN && s < 1.0) {
        return None;
    }
    let k = (-2.0 * log::ln(s) / s).clamp(0.0, K_MAX).sqrt();
    Some((finite_or_zero(u * k), finite_or_zero(v * k)))
}

/// Tier kernel used by the polar driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PolarKernel {
    Scalar,
    #[cfg(target_arch = "x86_64")]
    Avx2,
    #[cfg(target_arch = "x86_64")]
    Avx512,
    #[cfg(target_arch = "aarch64")]
    Neon,
}

impl PolarKernel {
    /// `tier` must be supported by the host.
    pub(crate) fn for_tier(tier: SimdTier) -> Self {
        match tier {
            #[cfg(target_arch = "x86_64")]
            SimdTier::Vec256 => PolarKernel::Avx2,
            #[cfg(target_arch = "x86_64")]
            SimdTier::Vec512 => PolarKernel::Avx512,
            #[cfg(target_arch = "aarch64")]
            SimdTier::VecNeon => PolarKernel::Neon,
            _ => PolarKernel::Scalar,
        }
    }

    pub(crate) fn lanes(self) -> usize {
        match self {
            PolarKernel::Scalar => 1,
            #[cfg(target_arch = "x86_64")]
            PolarKernel::Avx2 => 4,
            #[cfg(target_arch = "x86_64")]
            PolarKernel::Avx512 => 8,
            #[cfg(target_arch = "aarch64")]
            PolarKernel::Neon => 2,
        }
    }

    /// Run one vector: `words` and `z` hold `2 * lanes()` values. Returns the
    /// acceptance mask, bit `j` for lane `j`.
    #[inline]
    fn transform(self, words: &[u64], z: &mut [f64]) -> u32 {
        match self {
            PolarKernel::Scalar => match polar_pair(words[0], words[1]) {
                Some((zu, zv)) => {
                    z[0] = zu;
                    z[1] = zv;
                    1
                }
                None => 0,
            },
            // SAFETY: vector kernels are only selected for supported tiers.
            #[cfg(target_arch = "x86_64")]
            PolarKernel::Avx2 => unsafe { avx2::transform(words, z) },
            #[cfg(target_arch = "x86_64")]
            PolarKernel::Avx512 => unsafe { avx512::transform(words, z) },
            #[cfg(target_arch = "aarch64")]
            PolarKernel::Neon => unsafe { neon::transform(words, z) },
        }
    }
}

/// Single pair drawn until accepted.
#[cold]
fn emergency_pair<S: UniformSource + ?Sized>(src: &mut S) -> (f64, f64) {
    loop {
        let wu = src.next_u64();
        let wv = src.next_u64();
        if let Some(pair) = polar_pair(wu, wv) {
            return pair;
        }
    }
}

/// Fill `out` with standard normal draws using `kernel`.
pub(crate) fn fill<S: UniformSource + ?Sized>(kernel: PolarKernel, src: &mut S, out: &mut [f64]) {
    let lanes = kernel.lanes();
    let mut words = [0u64; 2 * MAX_LANES];
    let mut z = [0f64; 2 * MAX_LANES];
    let words = &mut words[..2 * lanes];
    let z = &mut z[..2 * lanes];

    let mut written = 0;
    while written < out.len() {
        src.fill_u64(words);
        let mask = kernel.transform(words, z);

        if mask == 0 {
            if lanes > 1 {
                let (zu, zv) = emergency_pair(src);
                push(out, &mut written, zu);
                push(out, &mut written, zv);
            }
            continue;
        }

        for lane in 0..lanes {
            if mask & (1 << lane) != 0 {
                push(out, &mut written, z[lane]);
                push(out, &mut written, z[lanes + lane]);
            }
        }
    }
}

#[inline(always)]
fn push(out: &mut [f64], written: &mut usize, value: f64) {
    if let Some(slot) = out.get_mut(*written) {
        *slot = value;
        *written += 1;
    }
}
