// src/backends/philox/avx512.rs
//! Philox4x32-10 over 16 counter lanes. Same blend trick as the AVX2 tier,
//! with opmask registers for the blend and the carry chain.

use super::{interleave, lane_counters, skip_lanes, Substreams, M0, M1, ROUNDS, W0, W1};
use std::arch::x86_64::*;

const LANES: usize = 16;
const ODD_ELEMENTS: __mmask16 = 0xAAAA;

#[repr(C, align(64))]
pub struct Philox4x32Avx512 {
    ctr: [[u32; LANES]; 4],
    key: [u32; 2],
    substreams: Substreams,
}

#[inline]
#[target_feature(enable = "avx512f")]
unsafe fn mulhi(x: __m512i, m: __m512i) -> __m512i {
    let even = _mm512_srli_epi64::<32>(_mm512_mul_epu32(x, m));
    let odd = _mm512_mul_epu32(_mm512_srli_epi64::<32>(x), m);
    _mm512_mask_blend_epi32(ODD_ELEMENTS, even, odd)
}

impl Philox4x32Avx512 {
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
    /// The host must support AVX-512F. `out.len()` must be a multiple of 32.
    #[target_feature(enable = "avx512f")]
    pub unsafe fn fill(&mut self, out: &mut [u64]) {
        debug_assert_eq!(out.len() % (2 * LANES), 0);

        let m0 = _mm512_set1_epi32(M0 as i32);
        let m1 = _mm512_set1_epi32(M1 as i32);
        let w0 = _mm512_set1_epi32(W0 as i32);
        let w1 = _mm512_set1_epi32(W1 as i32);
        let k0_init = _mm512_set1_epi32(self.key[0] as i32);
        let k1_init = _mm512_set1_epi32(self.key[1] as i32);
        let zero = _mm512_setzero_si512();
        let one = _mm512_set1_epi32(1);

        let mut c0 = _mm512_loadu_si512(self.ctr[0].as_ptr().cast());
        let mut c1 = _mm512_loadu_si512(self.ctr[1].as_ptr().cast());
        let mut c2 = _mm512_loadu_si512(self.ctr[2].as_ptr().cast());
        let mut c3 = _mm512_loadu_si512(self.ctr[3].as_ptr().cast());

        let mut block = [[0u32; LANES]; 4];

        for chunk in out.chunks_exact_mut(2 * LANES) {
            let (mut x0, mut x1, mut x2, mut x3) = (c0, c1, c2, c3);
            let (mut k0, mut k1) = (k0_init, k1_init);

            for _ in 0..ROUNDS {
                let hi0 = mulhi(x0, m0);
                let lo0 = _mm512_mullo_epi32(x0, m0);
                let hi1 = mulhi(x2, m1);
                let lo1 = _mm512_mullo_epi32(x2, m1);

                x0 = _mm512_xor_si512(_mm512_xor_si512(hi1, x1), k0);
                x1 = lo1;
                x2 = _mm512_xor_si512(_mm512_xor_si512(hi0, x3), k1);
                x3 = lo0;

                k0 = _mm512_add_epi32(k0, w0);
                k1 = _mm512_add_epi32(k1, w1);
            }

            _mm512_storeu_si512(block[0].as_mut_ptr().cast(), x0);
            _mm512_storeu_si512(block[1].as_mut_ptr().cast(), x1);
            _mm512_storeu_si512(block[2].as_mut_ptr().cast(), x2);
            _mm512_storeu_si512(block[3].as_mut_ptr().cast(), x3);
            interleave(&block, chunk);

            c0 = _mm512_add_epi32(c0, one);
            let carry0 = _mm512_cmpeq_epi32_mask(c0, zero);
            c1 = _mm512_mask_add_epi32(c1, carry0, c1, one);
            let carry1 = carry0 & _mm512_cmpeq_epi32_mask(c1, zero);
            c2 = _mm512_mask_add_epi32(c2, carry1, c2, one);
            let carry2 = carry1 & _mm512_cmpeq_epi32_mask(c2, zero);
            c3 = _mm512_mask_add_epi32(c3, carry2, c3, one);
        }

        _mm512_storeu_si512(self.ctr[0].as_mut_ptr().cast(), c0);
        _mm512_storeu_si512(self.ctr[1].as_mut_ptr().cast(), c1);
        _mm512_storeu_si512(self.ctr[2].as_mut_ptr().cast(), c2);
        _mm512_storeu_si512(self.ctr[3].as_mut_ptr().cast(), c3);
    }
}
