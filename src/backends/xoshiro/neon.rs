// src/backends/xoshiro/neon.rs
//! xoshiro256** over the 2 lanes of a 128-bit NEON register.

use super::{jump_lanes, lane_seeds, transpose};
use std::arch::aarch64::*;

const LANES: usize = 2;

macro_rules! rotl {
    ($x:expr, $k:literal) => {
        vorrq_u64(vshlq_n_u64::<$k>($x), vshrq_n_u64::<{ 64 - $k }>($x))
    };
}

#[repr(C, align(16))]
pub struct Xoshiro256Neon {
    s: [[u64; LANES]; 4],
}

impl Xoshiro256Neon {
    pub fn new(seed: u64, stream: u64) -> Self {
        Self {
            s: transpose(lane_seeds::<LANES>(seed, stream)),
        }
    }

    pub fn jump(&mut self) {
        jump_lanes(&mut self.s);
    }

    /// # Safety
    /// The host must support NEON. `out.len()` must be even.
    #[target_feature(enable = "neon")]
    pub unsafe fn fill(&mut self, out: &mut [u64]) {
        debug_assert_eq!(out.len() % LANES, 0);

        let mut s0 = vld1q_u64(self.s[0].as_ptr());
        let mut s1 = vld1q_u64(self.s[1].as_ptr());
        let mut s2 = vld1q_u64(self.s[2].as_ptr());
        let mut s3 = vld1q_u64(self.s[3].as_ptr());

        for chunk in out.chunks_exact_mut(LANES) {
            let x5 = vaddq_u64(vshlq_n_u64::<2>(s1), s1);
            let r = rotl!(x5, 7);
            let result = vaddq_u64(vshlq_n_u64::<3>(r), r);

            let t = vshlq_n_u64::<17>(s1);
            s2 = veorq_u64(s2, s0);
            s3 = veorq_u64(s3, s1);
            s1 = veorq_u64(s1, s2);
            s0 = veorq_u64(s0, s3);
            s2 = veorq_u64(s2, t);
            s3 = rotl!(s3, 45);

            vst1q_u64(chunk.as_mut_ptr(), result);
        }

        vst1q_u64(self.s[0].as_mut_ptr(), s0);
        vst1q_u64(self.s[1].as_mut_ptr(), s1);
        vst1q_u64(self.s[2].as_mut_ptr(), s2);
        vst1q_u64(self.s[3].as_mut_ptr(), s3);
    }
}
