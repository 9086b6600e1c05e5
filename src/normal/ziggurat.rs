// src/normal/ziggurat.rs
//! Marsaglia–Tsang ziggurat for the standard normal
//!
//! # Algorithm
//!
//! The right half of `f(x) = exp(-x²/2)` is covered by 256 stacked regions of
//! equal area `V`: strip 0 is the base rectangle plus the unbounded tail
//! beyond `R`, strips 1..255 are rectangles narrowing towards the peak.
//! ```text
//! x[0]   = V / f(R)          (width of the base rectangle of equal area)
//! x[1]   = R
//! x[i]   = sqrt(-2 ln(V / x[i-1] + f(x[i-1])))     i = 2..255
//! x[256] = 0
//! ```
//! One draw:
//! 1. word 1: strip `i = w & 0xff`, sign from bit 8
//! 2. word 2: `x = u · x[i]`; accept if `x < x[i+1]` (inside the strip below)
//! 3. strip 0: sample the tail `R + a` with `a = -ln(U₁)/R`, `b = -ln(U₂)`,
//!    retrying until `2b > a²`
//! 4. otherwise the wedge: accept if
//!    `f[i+1] + (f[i] - f[i+1]) · U₃ < f(x)`, else start over
//!
//! Step 2 accepts about 98.8% of the time.

use super::UniformSource;
use once_cell::sync::Lazy;
use tracing::debug;

pub const STRIPS: usize = 256;

/// Start of the tail.
pub const R: f64 = 3.654_152_885_361_008_8;

/// Area of every strip.
pub const V: f64 = 0.004_928_673_233_99;

#[inline(always)]
fn density(x: f64) -> f64 {
    (-0.5 * x * x).exp()
}

/// Strip edges and the density at each edge.
#[derive(Debug)]
pub struct ZigguratTable {
    pub x: [f64; STRIPS + 1],
    pub f: [f64; STRIPS + 1],
}

impl ZigguratTable {
    fn build() -> Self {
        let mut x = [0.0; STRIPS + 1];
        x[0] = V / density(R);
        x[1] = R;
        for i in 2..STRIPS {
            x[i] = (-2.0 * (V / x[i - 1] + density(x[i - 1])).ln()).sqrt();
        }
        x[STRIPS] = 0.0;

        let mut f = [0.0; STRIPS + 1];
        for (fi, &xi) in f.iter_mut().zip(x.iter()) {
            *fi = density(xi);
        }

        debug!(x0 = x[0], x255 = x[STRIPS - 1], "built ziggurat table");
        Self { x, f }
    }
}

static TABLE: Lazy<ZigguratTable> = Lazy::new(ZigguratTable::build);

/// The shared table, built on first use.
pub fn table() -> &'static ZigguratTable {
    &TABLE
}

/// Force construction ahead of the first draw.
pub fn init() {
    Lazy::force(&TABLE);
}

/// Draw one standard normal value.
#[inline]
pub fn sample<S: UniformSource + ?Sized>(src: &mut S) -> f64 {
    let t = table();
    loop {
        let w = src.next_u64();
        let i = (w & 0xff) as usize;
        let negative = w & 0x100 != 0;

        let x = src.next_f64() * t.x[i];
        if x < t.x[i + 1] {
            return if negative { -x } else { x };
        }

        if i == 0 {
            let tail = sample_tail(src);
            return if negative { -tail } else { tail };
        }

        let y = t.f[i + 1] + (t.f[i] - t.f[i + 1]) * src.next_f64();
        if y < density(x) {
            return if negative { -x } else { x };
        }
    }
}

/// `R + a` with `a` drawn from the normal tail beyond `R`.
#[cold]
fn sample_tail<S: UniformSource + ?Sized>(src: &mut S) -> f64 {
    loop {
        // 1 - u lies in (0, 1], so both logarithms are finite
        let a = -(1.0 - src.next_f64()).ln() / R;
        let b = -(1.0 - src.next_f64()).ln();
        if 2.0 * b > a * a {
            return R + a;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::xoshiro::Xoshiro256Scalar;
    use crate::math_utils::sample_moments;
    use crate::normal::test_sources::Pattern;

    #[test]
    fn test_table_shape() {
        let t = table();
        assert_eq!(t.x[1], R);
        assert_eq!(t.x[STRIPS], 0.0);
        assert_eq!(t.f[STRIPS], 1.0);
        assert!(t.x[0] > R);
        for i in 1..STRIPS {
            assert!(t.x[i] > t.x[i + 1], "x not decreasing at {}", i);
            assert!(t.f[i] < t.f[i + 1], "f not increasing at {}", i);
        }
    }

    #[test]
    fn test_strips_have_equal_area() {
        let t = table();
        for i in 1..STRIPS - 1 {
            let area = t.x[i] * (t.f[i + 1] - t.f[i]);
            assert!((area - V).abs() < 1e-12, "strip {} area {}", i, area);
        }
        // the topmost strip closes to within table precision
        let top = t.x[STRIPS - 1] * (1.0 - t.f[STRIPS - 1]);
        assert!((top - V).abs() < 1e-10, "top strip area {}", top);
    }

    #[test]
    fn test_moments() {
        let mut src = Xoshiro256Scalar::new(12345, 0);
        let samples: Vec<f64> = (0..200_000).map(|_| sample(&mut src)).collect();
        let (mean, variance) = sample_moments(&samples);
        assert!(mean.abs() < 0.02, "mean {}", mean);
        assert!((variance - 1.0).abs() < 0.03, "variance {}", variance);
    }

    #[test]
    fn test_tail_strip_exceeds_r() {
        // strip 0, positive sign, u close to 1 so x lands past x[1] = R
        let mut src = Pattern {
            words: vec![0, u64::MAX, 1 << 62, 1 << 62],
            at: 0,
        };
        let z = sample(&mut src);
        assert!(z >= R, "tail draw {}", z);
    }

    #[test]
    fn test_extreme_words_stay_finite() {
        let patterns = [
            vec![0u64],
            vec![u64::MAX, u64::MAX >> 1],
            vec![0, u64::MAX],
            vec![u64::MAX, 0],
            vec![0x100, u64::MAX, 0, u64::MAX],
        ];
        for words in patterns {
            let mut src = Pattern { words, at: 0 };
            for _ in 0..64 {
                assert!(sample(&mut src).is_finite());
            }
        }
    }
}
