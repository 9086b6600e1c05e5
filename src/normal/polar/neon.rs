// src/normal/polar/neon.rs
//! Polar kernel over the 2 double lanes of a NEON register.

use super::{K_MAX, S_MIN};
use crate::normal::log::{
    EXPONENT_MASK, EXPONENT_OFFSET, LN2, MANTISSA_MASK, MANTISSA_SPLIT, ONE_BITS, SERIES,
    TWO_52_BITS,
};
use std::arch::aarch64::*;

const LANES: usize = 2;

#[inline]
#[target_feature(enable = "neon")]
pub(crate) unsafe fn ln_pd(x: float64x2_t) -> float64x2_t {
    let bits = vreinterpretq_u64_f64(x);
    let exponent_bits = vandq_u64(vshrq_n_u64::<52>(bits), vdupq_n_u64(EXPONENT_MASK));

    let one = vdupq_n_f64(1.0);
    let mut m = vreinterpretq_f64_u64(vorrq_u64(
        vandq_u64(bits, vdupq_n_u64(MANTISSA_MASK)),
        vdupq_n_u64(ONE_BITS),
    ));
    let mut e = vsubq_f64(
        vreinterpretq_f64_u64(vorrq_u64(exponent_bits, vdupq_n_u64(TWO_52_BITS))),
        vdupq_n_f64(EXPONENT_OFFSET),
    );

    let high = vcgtq_f64(m, vdupq_n_f64(MANTISSA_SPLIT));
    m = vbslq_f64(high, vmulq_f64(m, vdupq_n_f64(0.5)), m);
    e = vbslq_f64(high, vaddq_f64(e, one), e);

    let t = vdivq_f64(vsubq_f64(m, one), vaddq_f64(m, one));
    let t2 = vmulq_f64(t, t);
    let mut p = vdupq_n_f64(SERIES[0]);
    for &c in &SERIES[1..] {
        p = vaddq_f64(vmulq_f64(p, t2), vdupq_n_f64(c));
    }
    let two_t = vmulq_f64(vdupq_n_f64(2.0), t);
    let result = vaddq_f64(vmulq_f64(two_t, p), vmulq_f64(e, vdupq_n_f64(LN2)));

    let subnormal = vceqq_u64(exponent_bits, vdupq_n_u64(0));
    if vgetq_lane_u64::<0>(subnormal) | vgetq_lane_u64::<1>(subnormal) == 0 {
        return result;
    }
    patch_subnormal(x, result)
}

#[cold]
#[target_feature(enable = "neon")]
unsafe fn patch_subnormal(x: float64x2_t, result: float64x2_t) -> float64x2_t {
    let mut xs = [0f64; LANES];
    let mut rs = [0f64; LANES];
    vst1q_f64(xs.as_mut_ptr(), x);
    vst1q_f64(rs.as_mut_ptr(), result);
    for (r, &x) in rs.iter_mut().zip(&xs) {
        if (x.to_bits() >> 52) & EXPONENT_MASK == 0 {
            *r = x.ln();
        }
    }
    vld1q_f64(rs.as_ptr())
}

#[inline]
#[target_feature(enable = "neon")]
unsafe fn to_signed_unit(w: uint64x2_t) -> float64x2_t {
    let unit = vsubq_f64(
        vreinterpretq_f64_u64(vorrq_u64(vshrq_n_u64::<12>(w), vdupq_n_u64(ONE_BITS))),
        vdupq_n_f64(1.0),
    );
    vsubq_f64(vmulq_f64(vdupq_n_f64(2.0), unit), vdupq_n_f64(1.0))
}

#[inline]
#[target_feature(enable = "neon")]
unsafe fn finite_or_zero(z: float64x2_t) -> float64x2_t {
    let finite = vcltq_f64(vabsq_f64(z), vdupq_n_f64(f64::INFINITY));
    vreinterpretq_f64_u64(vandq_u64(vreinterpretq_u64_f64(z), finite))
}

/// # Safety
/// The host must support NEON. `words` and `z` hold at least 4 values.
#[target_feature(enable = "neon")]
pub(crate) unsafe fn transform(words: &[u64], z: &mut [f64]) -> u32 {
    debug_assert!(words.len() >= 2 * LANES && z.len() >= 2 * LANES);

    let u = to_signed_unit(vld1q_u64(words.as_ptr()));
    let v = to_signed_unit(vld1q_u64(words[LANES..].as_ptr()));
    let one = vdupq_n_f64(1.0);

    let s = vaddq_f64(vmulq_f64(u, u), vmulq_f64(v, v));
    let keep = vandq_u64(vcgtq_f64(s, vdupq_n_f64(S_MIN)), vcltq_f64(s, one));
    let s = vbslq_f64(keep, s, one);

    let ratio = vdivq_f64(vmulq_f64(vdupq_n_f64(-2.0), ln_pd(s)), s);
    let ratio = vminq_f64(vmaxq_f64(ratio, vdupq_n_f64(0.0)), vdupq_n_f64(K_MAX));
    let k = vsqrtq_f64(ratio);

    vst1q_f64(z.as_mut_ptr(), finite_or_zero(vmulq_f64(u, k)));
    vst1q_f64(z[LANES..].as_mut_ptr(), finite_or_zero(vmulq_f64(v, k)));

    (vgetq_lane_u64::<0>(keep) & 1) as u32 | ((vgetq_lane_u64::<1>(keep) & 1) as u32) << 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normal::log;

    #[test]
    fn test_vector_ln_matches_scalar() {
        if !std::arch::is_aarch64_feature_detected!("neon") {
            return;
        }
        let inputs = [[1.0, 0.5], [1e-300, f64::from_bits(1)], [1.414_3, 5e-320]];
        for x in inputs {
            let mut got = [0f64; LANES];
            unsafe {
                vst1q_f64(got.as_mut_ptr(), ln_pd(vld1q_f64(x.as_ptr())));
            }
            for (g, &xi) in got.iter().zip(&x) {
                assert_eq!(*g, log::ln(xi), "ln({})", xi);
            }
        }
    }
}
