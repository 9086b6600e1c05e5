// src/backends/philox/avx2.rs
//! Philox4x32-10 over 8 counter lanes of 32-bit elements.
//!
//! `_mm256_mul_epu32` only multiplies the even 32-bit elements, so the high
//! halves of all eight products come from two multiplies blended together:
//! ```text
//! even = mul_epu32(x, m) >> 32        (hi of lanes 0,2,4,6 in the low halves)
//! odd  = mul_epu32(x >> 32, m)        (hi of lanes 1,3,5,7 in the high halves)
//! hi   = blend(even, odd, 0b10101010)
//! ```

use super::{interleave, lane_counters, skip_lanes, Substreams, M0, M1, ROUNDS, W0, W1};
use std::arch::x86_64::*;

const LANES: usize = 8;

#[repr(C, align(32))]
pub struct Philox4x32Avx2 {
    ctr: [[u32; LANES]; 4],
    key: [u32; 2],
    substreams: Substreams,
}

#[inline]
#[target_feature(enable = "avx2")]
unsafe fn mulhi(x: __m256i, m: __m256i) -> __m256i {
    let even = _mm256_srli_epi64::<32>(_mm256_mul_epu32(x, m));
    let odd = _mm256_mul_epu32(_mm256_srli_epi64::<32>(x), m);
    _mm256_blend_epi32::<0b1010_1010>(even, odd)
}

impl Philox4x32Avx2 {
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
    /// The host must support AVX2. `out.len()` must be a multiple of 16.
    #[target_feature(enable = "avx2")]
    pub unsafe fn fill(&mut self, out: &mut [u64]) {
        debug_assert_eq!(out.len() % (2 * LANES), 0);

        let m0 = _mm256_set1_epi32(M0 as i32);
        let m1 = _mm256_set1_epi32(M1 as i32);
        let w0 = _mm256_set1_epi32(W0 as i32);
        let w1 = _mm256_set1_epi32(W1 as i32);
        let k0_init = _mm256_set1_epi32(self.key[0] as i32);
        let k1_init = _mm256_set1_epi32(self.key[1] as i32);
        let zero = _mm256_setzero_si256();
        let one = _mm256_set1_epi32(1);

        let mut c0 = _mm256_load_si256(self.ctr[0].as_ptr().cast());
        let mut c1 = _mm256_load_si256(self.ctr[1].as_ptr().cast());
        let mut c2 = _mm256_load_si256(self.ctr[2].as_ptr().cast());
        let mut c3 = _mm256_load_si256(self.ctr[3].as_ptr().cast());

        let mut block = Block([[0; LANES]; 4]);

        for chunk in out.chunks_exact_mut(2 * LANES) {
            let (mut x0, mut x1, mut x2, mut x3) = (c0, c1, c2, c3);
            let (mut k0, mut k1) = (k0_init, k1_init);

            for _ in 0..ROUNDS {
                let hi0 = mulhi(x0, m0);
                let lo0 = _mm256_mullo_epi32(x0, m0);
                let hi1 = mulhi(x2, m1);
                let lo1 = _mm256_mullo_epi32(x2, m1);

                x0 = _mm256_xor_si256(_mm256_xor_si256(hi1, x1), k0);
                x1 = lo1;
                x2 = _mm256_xor_si256(_mm256_xor_si256(hi0, x3), k1);
                x3 = lo0;

                k0 = _mm256_add_epi32(k0, w0);
                k1 = _mm256_add_epi32(k1, w1);
            }

            _mm256_store_si256(block.0[0].as_mut_ptr().cast(), x0);
            _mm256_store_si256(block.0[1].as_mut_ptr().cast(), x1);
            _mm256_store_si256(block.0[2].as_mut_ptr().cast(), x2);
            _mm256_store_si256(block.0[3].as_mut_ptr().cast(), x3);
            interleave(&block.0, chunk);

            // all-ones where the word wrapped; subtracting it adds one
            c0 = _mm256_add_epi32(c0, one);
            let carry0 = _mm256_cmpeq_epi32(c0, zero);
            c1 = _mm256_sub_epi32(c1, carry0);
            let carry1 = _mm256_and_si256(carry0, _mm256_cmpeq_epi32(c1, zero));
            c2 = _mm256_sub_epi32(c2, carry1);
            let carry2 = _mm256_and_si256(carry1, _mm256_cmpeq_epi32(c2, zero));
            c3 = _mm256_sub_epi32(c3, carry2);
        }

        _mm256_store_si256(self.ctr[0].as_mut_ptr().cast(), c0);
        _mm256_store_si256(self.ctr[1].as_mut_ptr().cast(), c1);
        _mm256_store_si256(self.ctr[2].as_mut_ptr().cast(), c2);
        _mm256_store_si256(self.ctr[3].as_mut_ptr().cast(), c3);
    }
}

#[repr(C, align(32))]
struct Block([[u32; LANES]; 4]);
