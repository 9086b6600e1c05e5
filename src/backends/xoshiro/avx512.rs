// src/backends/xoshiro/avx512.rs
//! xoshiro256** over 8 lanes of a 512-bit register, using the native
//! 64-bit rotate.

use super::{jump_lanes, lane_seeds, transpose};
use std::arch::x86_64::*;

const LANES: usize = 8;

#[repr(C, align(64))]
pub struct Xoshiro256Avx512 {
    s: [[u64; LANES]; 4],
}

impl Xoshiro256Avx512 {
    pub fn new(seed: u64, stream: u64) -> Self {
        Self {
            s: transpose(lane_seeds::<LANES>(seed, stream)),
        }
    }

    pub fn jump(&mut self) {
        jump_lanes(&mut self.s);
    }

    /// # Safety
    /// The host must support AVX-512F. `out.len()` must be a multiple of 8.
    #[target_feature(enable = "avx512f")]
    pub unsafe fn fill(&mut self, out: &mut [u64]) {
        debug_assert_eq!(out.len() % LANES, 0);

        let mut s0 = _mm512_loadu_si512(self.s[0].as_ptr().cast());
        let mut s1 = _mm512_loadu_si512(self.s[1].as_ptr().cast());
        let mut s2 = _mm512_loadu_si512(self.s[2].as_ptr().cast());
        let mut s3 = _mm512_loadu_si512(self.s[3].as_ptr().cast());

        for chunk in out.chunks_exact_mut(LANES) {
            let x5 = _mm512_add_epi64(_mm512_slli_epi64::<2>(s1), s1);
            let r = _mm512_rol_epi64::<7>(x5);
            let result = _mm512_add_epi64(_mm512_slli_epi64::<3>(r), r);

            let t = _mm512_slli_epi64::<17>(s1);
            s2 = _mm512_xor_si512(s2, s0);
            s3 = _mm512_xor_si512(s3, s1);
            s1 = _mm512_xor_si512(s1, s2);
            s0 = _mm512_xor_si512(s0, s3);
            s2 = _mm512_xor_si512(s2, t);
            s3 = _mm512_rol_epi64::<45>(s3);

            _mm512_storeu_si512(chunk.as_mut_ptr().cast(), result);
        }

        _mm512_storeu_si512(self.s[0].as_mut_ptr().cast(), s0);
        _mm512_storeu_si512(self.s[1].as_mut_ptr().cast(), s1);
        _mm512_storeu_si512(self.s[2].as_mut_ptr().cast(), s2);
        _mm512_storeu_si512(self.s[3].as_mut_ptr().cast(), s3);
    }
}
