// src/backends/xoshiro/avx2.rs
//! xoshiro256** over 4 lanes of a 256-bit register.
//!
//! AVX2 has no 64-bit multiply, so `*5` and `*9` are shift-adds and the
//! rotations are a shift pair joined with `or`.

use super::{jump_lanes, lane_seeds, transpose};
use std::arch::x86_64::*;

const LANES: usize = 4;

macro_rules! rotl {
    ($x:expr, $k:literal) => {
        _mm256_or_si256(_mm256_slli_epi64::<$k>($x), _mm256_srli_epi64::<{ 64 - $k }>($x))
    };
}

/// State words `s[word][lane]`, one 32-byte row per state word.
#[repr(C, align(32))]
pub struct Xoshiro256Avx2 {
    s: [[u64; LANES]; 4],
}

impl Xoshiro256Avx2 {
    pub fn new(seed: u64, stream: u64) -> Self {
        Self {
            s: transpose(lane_seeds::<LANES>(seed, stream)),
        }
    }

    pub fn jump(&mut self) {
        jump_lanes(&mut self.s);
    }

    /// # Safety
    /// The host must support AVX2. `out.len()` must be a multiple of 4.
    #[target_feature(enable = "avx2")]
    pub unsafe fn fill(&mut self, out: &mut [u64]) {
        debug_assert_eq!(out.len() % LANES, 0);

        let mut s0 = _mm256_load_si256(self.s[0].as_ptr().cast());
        let mut s1 = _mm256_load_si256(self.s[1].as_ptr().cast());
        let mut s2 = _mm256_load_si256(self.s[2].as_ptr().cast());
        let mut s3 = _mm256_load_si256(self.s[3].as_ptr().cast());

        for chunk in out.chunks_exact_mut(LANES) {
            // rotl(s1 * 5, 7) * 9
            let x5 = _mm256_add_epi64(_mm256_slli_epi64::<2>(s1), s1);
            let r = rotl!(x5, 7);
            let result = _mm256_add_epi64(_mm256_slli_epi64::<3>(r), r);

            let t = _mm256_slli_epi64::<17>(s1);
            s2 = _mm256_xor_si256(s2, s0);
            s3 = _mm256_xor_si256(s3, s1);
            s1 = _mm256_xor_si256(s1, s2);
            s0 = _mm256_xor_si256(s0, s3);
            s2 = _mm256_xor_si256(s2, t);
            s3 = rotl!(s3, 45);

            _mm256_storeu_si256(chunk.as_mut_ptr().cast(), result);
        }

        _mm256_store_si256(self.s[0].as_mut_ptr().cast(), s0);
        _mm256_store_si256(self.s[1].as_mut_ptr().cast(), s1);
        _mm256_store_si256(self.s[2].as_mut_ptr().cast(), s2);
        _mm256_store_si256(self.s[3].as_mut_ptr().cast(), s3);
    }
}
