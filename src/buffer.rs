// src/buffer.rs
//! Buffered word production
//!
//! # Design Philosophy
//!
//! Vector backends are fastest when they run many steps back to back, while
//! callers often want a handful of values at a time. The buffer manager sits
//! between the two:
//! 1. **One allocation**: a 64-byte aligned buffer, sized once at construction
//! 2. **Lazy refill**: the buffer starts empty and is refilled by the bound
//!    backend only when a request finds it exhausted
//! 3. **Chunking invariance**: a request may span several refills; the caller
//!    sees the same word sequence however it splits its requests
//!
//! # Uniform doubles
//!
//! ```text
//! bits = (w >> 12) | 0x3FF0_0000_0000_0000    // a double in [1, 2)
//! u    = f64::from_bits(bits) - 1.0            // in [0, 1), 52-bit grid
//! ```

use crate::backends::Backend;
use crate::error::{RngError, RngResult};
use crate::normal::UniformSource;
use crate::tier::SimdTier;
use tracing::debug;

const ONE_BITS: u64 = 0x3FF0_0000_0000_0000;

/// Map a random word to a double in `[0, 1)` using its top 52 bits.
#[inline(always)]
pub fn u64_to_unit_f64(w: u64) -> f64 {
    f64::from_bits((w >> 12) | ONE_BITS) - 1.0
}

#[repr(C, align(64))]
#[derive(Clone, Copy)]
struct CacheLine([u64; 8]);

const WORDS_PER_LINE: usize = 8;

/// Heap buffer of u64 words aligned to a cache line.
pub(crate) struct AlignedBuf {
    lines: Vec<CacheLine>,
}

impl AlignedBuf {
    /// `words` must be a multiple of 8.
    pub(crate) fn with_words(words: usize) -> RngResult<Self> {
        debug_assert_eq!(words % WORDS_PER_LINE, 0);
        let count = words / WORDS_PER_LINE;

        let mut lines = Vec::new();
        lines
            .try_reserve_exact(count)
            .map_err(|err| RngError::AllocationFailed {
                requested_words: words,
                reason: err.to_string(),
            })?;
        lines.resize(count, CacheLine([0; WORDS_PER_LINE]));
        Ok(Self { lines })
    }

    pub(crate) fn len(&self) -> usize {
        self.lines.len() * WORDS_PER_LINE
    }

    pub(crate) fn words(&self) -> &[u64] {
        // SAFETY: `CacheLine` is `repr(C)` over `[u64; 8]` with no padding,
        // so the lines are a contiguous run of `len()` initialized words.
        unsafe { std::slice::from_raw_parts(self.lines.as_ptr().cast::<u64>(), self.len()) }
    }

    pub(crate) fn words_mut(&mut self) -> &mut [u64] {
        let len = self.len();
        // SAFETY: as in `words`, and the borrow is unique through `&mut self`.
        unsafe { std::slice::from_raw_parts_mut(self.lines.as_mut_ptr().cast::<u64>(), len) }
    }
}

/// Owns the bound backend and the aligned buffer it refills.
pub struct BufferManager {
    backend: Backend,
    buf: AlignedBuf,
    cursor: usize,
    refills: u64,
}

impl BufferManager {
    /// `capacity` is in words and must already be rounded to whole backend
    /// steps (see [`RngConfig::effective_capacity`](crate::config::RngConfig::effective_capacity)).
    pub(crate) fn new(backend: Backend, capacity: usize) -> RngResult<Self> {
        debug_assert_eq!(capacity % backend.words_per_step(), 0);
        let buf = AlignedBuf::with_words(capacity)?;
        debug!(
            capacity,
            tier = %backend.tier(),
            "allocated output buffer"
        );
        Ok(Self {
            backend,
            buf,
            // empty until the first request
            cursor: capacity,
            refills: 0,
        })
    }

    #[inline]
    fn refill(&mut self) {
        self.backend.fill(self.buf.words_mut());
        self.cursor = 0;
        self.refills += 1;
    }

    /// Buffered words not yet handed out.
    #[inline]
    pub fn available(&self) -> usize {
        self.buf.len() - self.cursor
    }

    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        if self.cursor == self.buf.len() {
            self.refill();
        }
        let word = self.buf.words()[self.cursor];
        self.cursor += 1;
        word
    }

    #[inline]
    pub fn next_f64(&mut self) -> f64 {
        u64_to_unit_f64(self.next_u64())
    }

    /// Copy the next `out.len()` words of the sequence into `out`.
    pub fn fill_u64(&mut self, out: &mut [u64]) {
        let mut written = 0;
        while written < out.len() {
            if self.cursor == self.buf.len() {
                self.refill();
            }
            let take = self.available().min(out.len() - written);
            out[written..written + take]
                .copy_from_slice(&self.buf.words()[self.cursor..self.cursor + take]);
            self.cursor += take;
            written += take;
        }
    }

    /// Fill `out` with doubles in `[0, 1)`, one word per value.
    pub fn fill_f64(&mut self, out: &mut [f64]) {
        let mut written = 0;
        while written < out.len() {
            if self.cursor == self.buf.len() {
                self.refill();
            }
            let take = self.available().min(out.len() - written);
            let src = &self.buf.words()[self.cursor..self.cursor + take];
            for (dst, &w) in out[written..written + take].iter_mut().zip(src) {
                *dst = u64_to_unit_f64(w);
            }
            self.cursor += take;
            written += take;
        }
    }

    /// Jump the backend and drop whatever is still buffered.
    pub fn jump(&mut self) {
        self.backend.jump();
        self.cursor = self.buf.len();
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Number of backend refills so far.
    pub fn refills(&self) -> u64 {
        self.refills
    }

    pub fn tier(&self) -> SimdTier {
        self.backend.tier()
    }
}

impl UniformSource for BufferManager {
    #[inline]
    fn next_u64(&mut self) -> u64 {
        BufferManager::next_u64(self)
    }

    #[inline]
    fn fill_u64(&mut self, out: &mut [u64]) {
        BufferManager::fill_u64(self, out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Algorithm, CAPACITY_GRANULE};
    use crate::cpu;

    fn manager(algorithm: Algorithm, tier: SimdTier, capacity: usize) -> BufferManager {
        BufferManager::new(Backend::new(algorithm, tier, 42, 0), capacity).unwrap()
    }

    #[test]
    fn test_unit_double_bounds() {
        assert_eq!(u64_to_unit_f64(0), 0.0);
        assert!(u64_to_unit_f64(u64::MAX) < 1.0);
        assert_eq!(u64_to_unit_f64(u64::MAX), 1.0 - f64::EPSILON);
        assert_eq!(u64_to_unit_f64(1 << 63), 0.5);
        // the low 12 bits never matter
        assert_eq!(u64_to_unit_f64(0xfff), 0.0);
    }

    #[test]
    fn test_buffer_is_cache_line_aligned() {
        let buf = AlignedBuf::with_words(64).unwrap();
        assert_eq!(buf.len(), 64);
        assert_eq!(buf.words().as_ptr() as usize % 64, 0);
    }

    #[test]
    fn test_impossible_allocation_is_reported() {
        let words = usize::MAX / 2 & !(WORDS_PER_LINE - 1);
        match AlignedBuf::with_words(words) {
            Err(RngError::AllocationFailed { requested_words, .. }) => {
                assert_eq!(requested_words, words)
            }
            Err(other) => panic!("unexpected error {}", other),
            Ok(_) => panic!("allocation of {} words should fail", words),
        }
    }

    #[test]
    fn test_first_refill_is_lazy() {
        let m = manager(Algorithm::Xoshiro256StarStar, SimdTier::Scalar, 64);
        assert_eq!(m.refills(), 0);
        assert_eq!(m.available(), 0);
    }

    #[test]
    fn test_refill_counts_at_capacity_boundaries() {
        let cap = 4 * CAPACITY_GRANULE;
        for algorithm in Algorithm::ALL {
            let mut m = manager(algorithm, SimdTier::Scalar, cap);
            let mut out = vec![0u64; cap];
            m.fill_u64(&mut out);
            assert_eq!(m.refills(), 1);

            let mut m = manager(algorithm, SimdTier::Scalar, cap);
            let mut out = vec![0u64; cap + 1];
            m.fill_u64(&mut out);
            assert_eq!(m.refills(), 2);

            let mut m = manager(algorithm, SimdTier::Scalar, cap);
            let mut out = vec![0u64; 2 * cap];
            m.fill_u64(&mut out);
            assert_eq!(m.refills(), 2);
        }
    }

    #[test]
    fn test_split_requests_see_one_sequence() {
        let cap = 2 * CAPACITY_GRANULE;
        for tier in cpu::capabilities().available_tiers() {
            for algorithm in Algorithm::ALL {
                let mut whole = manager(algorithm, tier, cap);
                let mut expected = vec![0u64; 5 * cap + 7];
                whole.fill_u64(&mut expected);

                let mut pieces = manager(algorithm, tier, cap);
                let mut got = Vec::with_capacity(expected.len());
                for len in [1, cap - 1, 3, cap + 5, 0, 2 * cap] {
                    let mut part = vec![0u64; len];
                    pieces.fill_u64(&mut part);
                    got.extend_from_slice(&part);
                }
                while got.len() < expected.len() {
                    got.push(pieces.next_u64());
                }
                assert_eq!(got, expected, "{} / {}", algorithm, tier);
            }
        }
    }

    #[test]
    fn test_doubles_follow_the_word_sequence() {
        let cap = CAPACITY_GRANULE;
        let mut words = manager(Algorithm::Philox4x32, SimdTier::Scalar, cap);
        let mut doubles = manager(Algorithm::Philox4x32, SimdTier::Scalar, cap);

        let mut w = vec![0u64; 3 * cap + 1];
        words.fill_u64(&mut w);
        let mut d = vec![0f64; 3 * cap + 1];
        doubles.fill_f64(&mut d);

        for (word, value) in w.iter().zip(&d) {
            assert_eq!(u64_to_unit_f64(*word), *value);
        }
        assert_eq!(doubles.next_f64(), words.next_f64());
    }

    #[test]
    fn test_jump_discards_buffered_words() {
        let cap = CAPACITY_GRANULE;
        let mut m = manager(Algorithm::Xoshiro256StarStar, SimdTier::Scalar, cap);
        m.next_u64();
        assert_eq!(m.available(), cap - 1);
        m.jump();
        assert_eq!(m.available(), 0);

        let mut fresh = manager(Algorithm::Xoshiro256StarStar, SimdTier::Scalar, cap);
        fresh.jump();
        // the first call after the jump draws from the jumped backend
        let mut skipped = manager(Algorithm::Xoshiro256StarStar, SimdTier::Scalar, cap);
        let mut discard = vec![0u64; cap];
        skipped.fill_u64(&mut discard);
        skipped.jump();
        assert_ne!(fresh.next_u64(), skipped.next_u64());
    }
}
