// src/normal/log.rs
//! Range-reduced natural logarithm
//!
//! # Algorithm
//!
//! ```text
//! x = m · 2^e          m in [1, 2) from the mantissa bits, e from the exponent
//! if m > √2:  m = m/2, e = e + 1          (now m in [√2/2, √2])
//! t = (m - 1) / (m + 1)                   (|t| < 0.1716)
//! ln m = 2t · (1 + t²/3 + t⁴/5 + ... + t¹²/13)
//! ln x = ln m + e · ln 2
//! ```
//! The exponent is turned into a double without an integer conversion by
//! or-ing it into the mantissa of `2^52` and subtracting `2^52 + 1023`.
//! Maximum relative error is about 1.3e-12 over normal inputs.
//!
//! Subnormal inputs (exponent field 0) break the `m · 2^e` split and are
//! handed to `f64::ln`. The vector kernels in [`polar`](super::polar) use the
//! same constants and patch their subnormal lanes the same way.

use std::f64::consts::{LN_2, SQRT_2};

pub(crate) const EXPONENT_MASK: u64 = 0x7ff;
pub(crate) const MANTISSA_MASK: u64 = 0x000F_FFFF_FFFF_FFFF;
pub(crate) const ONE_BITS: u64 = 0x3FF0_0000_0000_0000;
/// Bit pattern of 2^52.
pub(crate) const TWO_52_BITS: u64 = 0x4330_0000_0000_0000;
/// `2^52 + 1023`: removes the magic and the exponent bias in one step.
pub(crate) const EXPONENT_OFFSET: f64 = 4_503_599_627_371_519.0;

/// Series coefficients `1/13, 1/11, ..., 1/3, 1`, in Horner order.
pub(crate) const SERIES: [f64; 7] = [
    1.0 / 13.0,
    1.0 / 11.0,
    1.0 / 9.0,
    1.0 / 7.0,
    1.0 / 5.0,
    1.0 / 3.0,
    1.0,
];

pub(crate) const MANTISSA_SPLIT: f64 = SQRT_2;
pub(crate) const LN2: f64 = LN_2;

/// Natural logarithm of a positive finite `x`.
#[inline]
pub fn ln(x: f64) -> f64 {
    let bits = x.to_bits();
    let exponent_bits = (bits >> 52) & EXPONENT_MASK;
    if exponent_bits == 0 {
        return x.ln();
    }

    let mut m = f64::from_bits((bits & MANTISSA_MASK) | ONE_BITS);
    let mut e = f64::from_bits(exponent_bits | TWO_52_BITS) - EXPONENT_OFFSET;
    if m > MANTISSA_SPLIT {
        m *= 0.5;
        e += 1.0;
    }

    let t = (m - 1.0) / (m + 1.0);
    let t2 = t * t;
    let mut p = SERIES[0];
    for &c in &SERIES[1..] {
        p = p * t2 + c;
    }
    2.0 * t * p + e * LN2
}
