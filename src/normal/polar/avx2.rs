// src/normal/polar/avx2.rs
//! Polar kernel over 4 double lanes.

use super::{K_MAX, S_MIN};
use crate::normal::log::{
    EXPONENT_MASK, EXPONENT_OFFSET, LN2, MANTISSA_MASK, MANTISSA_SPLIT, ONE_BITS, SERIES,
    TWO_52_BITS,
};
use std::arch::x86_64::*;

const LANES: usize = 4;

/// Range-reduced `ln` of four positive doubles; subnormal lanes go through
/// `f64::ln`.
#[inline]
#[target_feature(enable = "avx2")]
pub(crate) unsafe fn ln_pd(x: __m256d) -> __m256d {
    let bits = _mm256_castpd_si256(x);
    let exponent_bits = _mm256_and_si256(
        _mm256_srli_epi64::<52>(bits),
        _mm256_set1_epi64x(EXPONENT_MASK as i64),
    );

    let one = _mm256_set1_pd(1.0);
    let mut m = _mm256_castsi256_pd(_mm256_or_si256(
        _mm256_and_si256(bits, _mm256_set1_epi64x(MANTISSA_MASK as i64)),
        _mm256_set1_epi64x(ONE_BITS as i64),
    ));
    let mut e = _mm256_sub_pd(
        _mm256_castsi256_pd(_mm256_or_si256(
            exponent_bits,
            _mm256_set1_epi64x(TWO_52_BITS as i64),
        )),
        _mm256_set1_pd(EXPONENT_OFFSET),
    );

    let high = _mm256_cmp_pd::<_CMP_GT_OQ>(m, _mm256_set1_pd(MANTISSA_SPLIT));
    m = _mm256_blendv_pd(m, _mm256_mul_pd(m, _mm256_set1_pd(0.5)), high);
    e = _mm256_add_pd(e, _mm256_and_pd(high, one));

    let t = _mm256_div_pd(_mm256_sub_pd(m, one), _mm256_add_pd(m, one));
    let t2 = _mm256_mul_pd(t, t);
    let mut p = _mm256_set1_pd(SERIES[0]);
    for &c in &SERIES[1..] {
        p = _mm256_add_pd(_mm256_mul_pd(p, t2), _mm256_set1_pd(c));
    }
    let two_t = _mm256_mul_pd(_mm256_set1_pd(2.0), t);
    let result = _mm256_add_pd(
        _mm256_mul_pd(two_t, p),
        _mm256_mul_pd(e, _mm256_set1_pd(LN2)),
    );

    let subnormal = _mm256_cmpeq_epi64(exponent_bits, _mm256_setzero_si256());
    if _mm256_movemask_pd(_mm256_castsi256_pd(subnormal)) == 0 {
        return result;
    }
    patch_subnormal(x, result)
}

#[cold]
#[target_feature(enable = "avx2")]
unsafe fn patch_subnormal(x: __m256d, result: __m256d) -> __m256d {
    let mut xs = [0f64; LANES];
    let mut rs = [0f64; LANES];
    _mm256_storeu_pd(xs.as_mut_ptr(), x);
    _mm256_storeu_pd(rs.as_mut_ptr(), result);
    for (r, &x) in rs.iter_mut().zip(&xs) {
        if (x.to_bits() >> 52) & EXPONENT_MASK == 0 {
            *r = x.ln();
        }
    }
    _mm256_loadu_pd(rs.as_ptr())
}

#[inline]
#[target_feature(enable = "avx2")]
unsafe fn to_signed_unit(w: __m256i) -> __m256d {
    let unit = _mm256_sub_pd(
        _mm256_castsi256_pd(_mm256_or_si256(
            _mm256_srli_epi64::<12>(w),
            _mm256_set1_epi64x(ONE_BITS as i64),
        )),
        _mm256_set1_pd(1.0),
    );
    _mm256_sub_pd(_mm256_mul_pd(_mm256_set1_pd(2.0), unit), _mm256_set1_pd(1.0))
}

#[inline]
#[target_feature(enable = "avx2")]
unsafe fn finite_or_zero(z: __m256d) -> __m256d {
    let magnitude = _mm256_andnot_pd(_mm256_set1_pd(-0.0), z);
    let finite = _mm256_cmp_pd::<_CMP_LT_OQ>(magnitude, _mm256_set1_pd(f64::INFINITY));
    _mm256_and_pd(z, finite)
}

/// # Safety
/// The host must support AVX2. `words` and `z` hold at least 8 values.
#[target_feature(enable = "avx2")]
pub(crate) unsafe fn transform(words: &[u64], z: &mut [f64]) -> u32 {
    debug_assert!(words.len() >= 2 * LANES && z.len() >= 2 * LANES);

    let u = to_signed_unit(_mm256_loadu_si256(words.as_ptr().cast()));
    let v = to_signed_unit(_mm256_loadu_si256(words[LANES..].as_ptr().cast()));
    let one = _mm256_set1_pd(1.0);

    let s = _mm256_add_pd(_mm256_mul_pd(u, u), _mm256_mul_pd(v, v));
    let keep = _mm256_and_pd(
        _mm256_cmp_pd::<_CMP_GT_OQ>(s, _mm256_set1_pd(S_MIN)),
        _mm256_cmp_pd::<_CMP_LT_OQ>(s, one),
    );
    let s = _mm256_blendv_pd(one, s, keep);

    let ratio = _mm256_div_pd(_mm256_mul_pd(_mm256_set1_pd(-2.0), ln_pd(s)), s);
    let ratio = _mm256_min_pd(
        _mm256_max_pd(ratio, _mm256_setzero_pd()),
        _mm256_set1_pd(K_MAX),
    );
    let k = _mm256_sqrt_pd(ratio);

    _mm256_storeu_pd(z.as_mut_ptr(), finite_or_zero(_mm256_mul_pd(u, k)));
    _mm256_storeu_pd(z[LANES..].as_mut_ptr(), finite_or_zero(_mm256_mul_pd(v, k)));

    _mm256_movemask_pd(keep) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normal::log;

    #[test]
    fn test_vector_ln_matches_scalar() {
        if !is_x86_feature_detected!("avx2") {
            return;
        }
        let inputs = [
            [1.0, 0.5, 1e-300, 0.999_999],
            [f64::from_bits(1), 5e-320, 1.414_3, 0.25],
            [1e-10, 0.707_1, 3.0, f64::MIN_POSITIVE],
        ];
        for x in inputs {
            let mut got = [0f64; LANES];
            unsafe {
                let r = ln_pd(_mm256_loadu_pd(x.as_ptr()));
                _mm256_storeu_pd(got.as_mut_ptr(), r);
            }
            for (g, &xi) in got.iter().zip(&x) {
                assert_eq!(*g, log::ln(xi), "ln({})", xi);
            }
        }
    }
}
