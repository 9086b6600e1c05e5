// src/normal/polar/avx512.rs
//! Polar kernel over 8 double lanes; lane selection runs on opmasks.

use super::{K_MAX, S_MIN};
use crate::normal::log::{
    EXPONENT_MASK, EXPONENT_OFFSET, LN2, MANTISSA_MASK, MANTISSA_SPLIT, ONE_BITS, SERIES,
    TWO_52_BITS,
};
use std::arch::x86_64::*;

const LANES: usize = 8;

#[inline]
#[target_feature(enable = "avx512f")]
pub(crate) unsafe fn ln_pd(x: __m512d) -> __m512d {
    let bits = _mm512_castpd_si512(x);
    let exponent_bits = _mm512_and_si512(
        _mm512_srli_epi64::<52>(bits),
        _mm512_set1_epi64(EXPONENT_MASK as i64),
    );

    let one = _mm512_set1_pd(1.0);
    let mut m = _mm512_castsi512_pd(_mm512_or_si512(
        _mm512_and_si512(bits, _mm512_set1_epi64(MANTISSA_MASK as i64)),
        _mm512_set1_epi64(ONE_BITS as i64),
    ));
    let mut e = _mm512_sub_pd(
        _mm512_castsi512_pd(_mm512_or_si512(
            exponent_bits,
            _mm512_set1_epi64(TWO_52_BITS as i64),
        )),
        _mm512_set1_pd(EXPONENT_OFFSET),
    );

    let high = _mm512_cmp_pd_mask::<_CMP_GT_OQ>(m, _mm512_set1_pd(MANTISSA_SPLIT));
    m = _mm512_mask_mul_pd(m, high, m, _mm512_set1_pd(0.5));
    e = _mm512_mask_add_pd(e, high, e, one);

    let t = _mm512_div_pd(_mm512_sub_pd(m, one), _mm512_add_pd(m, one));
    let t2 = _mm512_mul_pd(t, t);
    let mut p = _mm512_set1_pd(SERIES[0]);
    for &c in &SERIES[1..] {
        p = _mm512_add_pd(_mm512_mul_pd(p, t2), _mm512_set1_pd(c));
    }
    let two_t = _mm512_mul_pd(_mm512_set1_pd(2.0), t);
    let result = _mm512_add_pd(
        _mm512_mul_pd(two_t, p),
        _mm512_mul_pd(e, _mm512_set1_pd(LN2)),
    );

    let subnormal = _mm512_cmpeq_epi64_mask(exponent_bits, _mm512_setzero_si512());
    if subnormal == 0 {
        return result;
    }
    patch_subnormal(x, result, subnormal)
}

#[cold]
#[target_feature(enable = "avx512f")]
unsafe fn patch_subnormal(x: __m512d, result: __m512d, lanes: __mmask8) -> __m512d {
    let mut xs = [0f64; LANES];
    let mut rs = [0f64; LANES];
    _mm512_storeu_pd(xs.as_mut_ptr(), x);
    _mm512_storeu_pd(rs.as_mut_ptr(), result);
    for lane in 0..LANES {
        if lanes & (1 << lane) != 0 {
            rs[lane] = xs[lane].ln();
        }
    }
    _mm512_loadu_pd(rs.as_ptr())
}

#[inline]
#[target_feature(enable = "avx512f")]
unsafe fn to_signed_unit(w: __m512i) -> __m512d {
    let unit = _mm512_sub_pd(
        _mm512_castsi512_pd(_mm512_or_si512(
            _mm512_srli_epi64::<12>(w),
            _mm512_set1_epi64(ONE_BITS as i64),
        )),
        _mm512_set1_pd(1.0),
    );
    _mm512_sub_pd(_mm512_mul_pd(_mm512_set1_pd(2.0), unit), _mm512_set1_pd(1.0))
}

#[inline]
#[target_feature(enable = "avx512f")]
unsafe fn finite_or_zero(z: __m512d) -> __m512d {
    let finite = _mm512_cmp_pd_mask::<_CMP_LT_OQ>(_mm512_abs_pd(z), _mm512_set1_pd(f64::INFINITY));
    _mm512_maskz_mov_pd(finite, z)
}

/// # Safety
/// The host must support AVX-512F. `words` and `z` hold at least 16 values.
#[target_feature(enable = "avx512f")]
pub(crate) unsafe fn transform(words: &[u64], z: &mut [f64]) -> u32 {
    debug_assert!(words.len() >= 2 * LANES && z.len() >= 2 * LANES);

    let u = to_signed_unit(_mm512_loadu_si512(words.as_ptr().cast()));
    let v = to_signed_unit(_mm512_loadu_si512(words[LANES..].as_ptr().cast()));
    let one = _mm512_set1_pd(1.0);

    let s = _mm512_add_pd(_mm512_mul_pd(u, u), _mm512_mul_pd(v, v));
    let keep = _mm512_cmp_pd_mask::<_CMP_GT_OQ>(s, _mm512_set1_pd(S_MIN))
        & _mm512_cmp_pd_mask::<_CMP_LT_OQ>(s, one);
    let s = _mm512_mask_blend_pd(keep, one, s);

    let ratio = _mm512_div_pd(_mm512_mul_pd(_mm512_set1_pd(-2.0), ln_pd(s)), s);
    let ratio = _mm512_min_pd(
        _mm512_max_pd(ratio, _mm512_setzero_pd()),
        _mm512_set1_pd(K_MAX),
    );
    let k = _mm512_sqrt_pd(ratio);

    _mm512_storeu_pd(z.as_mut_ptr(), finite_or_zero(_mm512_mul_pd(u, k)));
    _mm512_storeu_pd(z[LANES..].as_mut_ptr(), finite_or_zero(_mm512_mul_pd(v, k)));

    u32::from(keep)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normal::log;

    #[test]
    fn test_vector_ln_matches_scalar() {
        if !is_x86_feature_detected!("avx512f") {
            return;
        }
        let x = [
            1.0,
            0.5,
            1e-300,
            f64::from_bits(1),
            5e-320,
            1.414_3,
            0.25,
            f64::MIN_POSITIVE,
        ];
        let mut got = [0f64; LANES];
        unsafe {
            let r = ln_pd(_mm512_loadu_pd(x.as_ptr()));
            _mm512_storeu_pd(got.as_mut_ptr(), r);
        }
        for (g, &xi) in got.iter().zip(&x) {
            assert_eq!(*g, log::ln(xi), "ln({})", xi);
        }
    }
}
