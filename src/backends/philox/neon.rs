// src/backends/philox/neon.rs
//! Philox4x32-10 over the 4 32-bit lanes of a NEON register. The widening
//! multiplies give full 64-bit products, and `vshrn` narrows their high
//! halves back to 32 bits.

use super::{interleave, lane_counters, skip_lanes, Substreams, M0, M1, ROUNDS, W0, W1};
use std::arch::aarch64::*;

const LANES: usize = 4;

#[repr(C, align(16))]
pub struct Philox4x32Neon {
    ctr: [[u32; LANES]; 4],
    key: [u32; 2],
    substreams: Substreams,
}

#[inline]
#[target_feature(enable = "neon")]
unsafe fn mulhi(x: uint32x4_t, m: uint32x4_t) -> uint32x4_t {
    let low = vmull_u32(vget_low_u32(x), vget_low_u32(m));
    let high = vmull_high_u32(x, m);
    vcombine_u32(vshrn_n_u64::<32>(low), vshrn_n_u64::<32>(high))
}

impl Philox4x32Neon {
    pub fn new(seed: u64, stream: u64) -> Self {
        let mut substreams = Substreams::new(seed, stream);
        Self {
            ctr: lane_counters::<LANES>(stream),
            key: substreams.next_key(),
            substreams,
        }
    }

    pub fn skip(&mut self, blocks: u128) {
        skip_lanes(&mut self.ctr, blocks);
    }

    pub fn jump(&mut self) {
        self.key = self.substreams.next_key();
        self.ctr = lane_counters::<LANES>(self.substreams.stream());
    }

    /// # Safety
    /// The host must support NEON. `out.len()` must be a multiple of 8.
    #[target_feature(enable = "neon")]
    pub unsafe fn fill(&mut self, out: &mut [u64]) {
        debug_assert_eq!(out.len() % (2 * LANES), 0);

        let m0 = vdupq_n_u32(M0);
        let m1 = vdupq_n_u32(M1);
        let w0 = vdupq_n_u32(W0);
        let w1 = vdupq_n_u32(W1);
        let k0_init = vdupq_n_u32(self.key[0]);
        let k1_init = vdupq_n_u32(self.key[1]);
        let zero = vdupq_n_u32(0);
        let one = vdupq_n_u32(1);

        let mut c0 = vld1q_u32(self.ctr[0].as_ptr());
        let mut c1 = vld1q_u32(self.ctr[1].as_ptr());
        let mut c2 = vld1q_u32(self.ctr[2].as_ptr());
        let mut c3 = vld1q_u32(self.ctr[3].as_ptr());

        let mut block = [[0u32; LANES]; 4];

        for chunk in out.chunks_exact_mut(2 * LANES) {
            let (mut x0, mut x1, mut x2, mut x3) = (c0, c1, c2, c3);
            let (mut k0, mut k1) = (k0_init, k1_init);

            for _ in 0..ROUNDS {
                let hi0 = mulhi(x0, m0);
                let lo0 = vmulq_u32(x0, m0);
                let hi1 = mulhi(x2, m1);
                let lo1 = vmulq_u32(x2, m1);

                x0 = veorq_u32(veorq_u32(hi1, x1), k0);
                x1 = lo1;
                x2 = veorq_u32(veorq_u32(hi0, x3), k1);
                x3 = lo0;

                k0 = vaddq_u32(k0, w0);
                k1 = vaddq_u32(k1, w1);
            }

            vst1q_u32(block[0].as_mut_ptr(), x0);
            vst1q_u32(block[1].as_mut_ptr(), x1);
            vst1q_u32(block[2].as_mut_ptr(), x2);
            vst1q_u32(block[3].as_mut_ptr(), x3);
            interleave(&block, chunk);

            c0 = vaddq_u32(c0, one);
            let carry0 = vceqq_u32(c0, zero);
            c1 = vsubq_u32(c1, carry0);
            let carry1 = vandq_u32(carry0, vceqq_u32(c1, zero));
            c2 = vsubq_u32(c2, carry1);
            let carry2 = vandq_u32(carry1, vceqq_u32(c2, zero));
            c3 = vsubq_u32(c3, carry2);
        }

        vst1q_u32(self.ctr[0].as_mut_ptr(), c0);
        vst1q_u32(self.ctr[1].as_mut_ptr(), c1);
        vst1q_u32(self.ctr[2].as_mut_ptr(), c2);
        vst1q_u32(self.ctr[3].as_mut_ptr(), c3);
    }
}
