// src/backends/philox/mod.rs
//! Philox4x32-10 counter-based generator
//!
//! # Algorithm
//!
//! One block maps a 128-bit counter and a 64-bit key to 128 output bits
//! through ten rounds of
//! ```text
//! (hi0, lo0) = mulhilo(M0, x0)
//! (hi1, lo1) = mulhilo(M1, x2)
//! x = [hi1 ^ x1 ^ k0, lo1, hi0 ^ x3 ^ k1, lo0]
//! k = [k0 + W0, k1 + W1]
//! ```
//! Output words are `x1<<32 | x0` then `x3<<32 | x2`.
//!
//! # Lanes
//!
//! All lanes share the key. Lane `j` starts at counter
//! `[0, j << 28, lo32(stream), hi32(stream)]`, so the low 60 bits count
//! blocks, bits 60..63 name the lane and the upper half is the stream. Each
//! lane advances its own 128-bit counter by one block per step with an exact
//! carry chain over all four words.
//!
//! # Jumps
//!
//! `jump()` moves to the next substream instead of adding to the counters:
//! ```text
//! key(n)     = n-th SplitMix64 output of the seed   (n = 0 before any jump)
//! counter(n) = the lane's starting counter
//! ```
//! Counters therefore never leave their lane or stream bits, however often a
//! generator jumps. Keys of one seed repeat only after 2^64 jumps.

#[cfg(target_arch = "x86_64")]
pub(crate) mod avx2;
#[cfg(target_arch = "x86_64")]
pub(crate) mod avx512;
#[cfg(target_arch = "aarch64")]
pub(crate) mod neon;

use super::SplitMix64;
use crate::tier::SimdTier;

pub const M0: u32 = 0xD251_1F53;
pub const M1: u32 = 0xCD9E_8D57;
pub const W0: u32 = 0x9E37_79B9;
pub const W1: u32 = 0xBB67_AE85;

pub const ROUNDS: usize = 10;

/// Bit position of the lane id inside counter word 1.
const LANE_SHIFT: u32 = 28;

#[inline(always)]
fn mulhilo(a: u32, b: u32) -> (u32, u32) {
    let product = u64::from(a) * u64::from(b);
    ((product >> 32) as u32, product as u32)
}

/// One Philox4x32-10 block.
#[inline]
pub fn philox4x32_10(ctr: [u32; 4], key: [u32; 2]) -> [u32; 4] {
    let mut x = ctr;
    let [mut k0, mut k1] = key;
    for _ in 0..ROUNDS {
        let (hi0, lo0) = mulhilo(M0, x[0]);
        let (hi1, lo1) = mulhilo(M1, x[2]);
        x = [hi1 ^ x[1] ^ k0, lo1, hi0 ^ x[3] ^ k1, lo0];
        k0 = k0.wrapping_add(W0);
        k1 = k1.wrapping_add(W1);
    }
    x
}

#[inline(always)]
pub(crate) fn pack(block: [u32; 4]) -> [u64; 2] {
    [
        u64::from(block[1]) << 32 | u64::from(block[0]),
        u64::from(block[3]) << 32 | u64::from(block[2]),
    ]
}

/// Keys for successive substreams of one `(seed, stream)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Substreams {
    keys: SplitMix64,
    stream: u64,
}

impl Substreams {
    pub(crate) fn new(seed: u64, stream: u64) -> Self {
        Self {
            keys: SplitMix64::new(seed),
            stream,
        }
    }

    /// Key of the next substream, shared by every lane.
    pub(crate) fn next_key(&mut self) -> [u32; 2] {
        let k = self.keys.next_u64();
        [k as u32, (k >> 32) as u32]
    }

    pub(crate) fn stream(&self) -> u64 {
        self.stream
    }
}

pub(crate) fn counter_to_u128(ctr: [u32; 4]) -> u128 {
    ctr.iter()
        .rev()
        .fold(0u128, |acc, &w| acc << 32 | u128::from(w))
}

pub(crate) fn counter_from_u128(value: u128) -> [u32; 4] {
    core::array::from_fn(|i| (value >> (32 * i)) as u32)
}

/// Starting counters for `L` lanes, word-major (`ctr[word][lane]`).
pub(crate) fn lane_counters<const L: usize>(stream: u64) -> [[u32; L]; 4] {
    [
        [0; L],
        core::array::from_fn(|lane| (lane as u32) << LANE_SHIFT),
        [stream as u32; L],
        [(stream >> 32) as u32; L],
    ]
}

/// Advance every lane's counter by `blocks`.
pub(crate) fn skip_lanes<const L: usize>(ctr: &mut [[u32; L]; 4], blocks: u128) {
    for lane in 0..L {
        let value = counter_to_u128([ctr[0][lane], ctr[1][lane], ctr[2][lane], ctr[3][lane]]);
        let next = counter_from_u128(value.wrapping_add(blocks));
        for (word, w) in next.into_iter().enumerate() {
            ctr[word][lane] = w;
        }
    }
}

/// Write one step of lane blocks (`x[word][lane]`) as `2L` output words, lane
/// by lane.
#[inline(always)]
pub(crate) fn interleave<const L: usize>(x: &[[u32; L]; 4], out: &mut [u64]) {
    for (lane, pair) in out.chunks_exact_mut(2).take(L).enumerate() {
        let words = pack([x[0][lane], x[1][lane], x[2][lane], x[3][lane]]);
        pair.copy_from_slice(&words);
    }
}

/// Scalar Philox4x32-10, the reference for the vector tiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Philox4x32Scalar {
    ctr: [u32; 4],
    key: [u32; 2],
    substreams: Substreams,
}

fn scalar_counter(stream: u64) -> [u32; 4] {
    let [c0, c1, c2, c3] = lane_counters::<1>(stream);
    [c0[0], c1[0], c2[0], c3[0]]
}

impl Philox4x32Scalar {
    pub fn new(seed: u64, stream: u64) -> Self {
        let mut substreams = Substreams::new(seed, stream);
        Self {
            ctr: scalar_counter(stream),
            key: substreams.next_key(),
            substreams,
        }
    }

    /// Generator at an arbitrary counter and key. Its jumps walk the
    /// SplitMix64 sequence seeded with the key, restarting at block 0 of the
    /// stream held in the upper counter half.
    pub fn with_counter(ctr: [u32; 4], key: [u32; 2]) -> Self {
        let seed = u64::from(key[1]) << 32 | u64::from(key[0]);
        let stream = u64::from(ctr[3]) << 32 | u64::from(ctr[2]);
        let mut substreams = Substreams::new(seed, stream);
        substreams.next_key();
        Self {
            ctr,
            key,
            substreams,
        }
    }

    pub fn counter(&self) -> [u32; 4] {
        self.ctr
    }

    /// Block at the current counter, then advance the counter.
    #[inline]
    pub fn next_block(&mut self) -> [u32; 4] {
        let block = philox4x32_10(self.ctr, self.key);
        self.increment();
        block
    }

    #[inline]
    fn increment(&mut self) {
        for word in self.ctr.iter_mut() {
            *word = word.wrapping_add(1);
            if *word != 0 {
                break;
            }
        }
    }

    /// `out.len()` must be even.
    pub fn fill(&mut self, out: &mut [u64]) {
        debug_assert_eq!(out.len() % 2, 0);
        for pair in out.chunks_exact_mut(2) {
            pair.copy_from_slice(&pack(self.next_block()));
        }
    }

    pub fn skip(&mut self, blocks: u128) {
        self.ctr = counter_from_u128(counter_to_u128(self.ctr).wrapping_add(blocks));
    }

    /// Switch to the next substream.
    pub fn jump(&mut self) {
        self.key = self.substreams.next_key();
        self.ctr = scalar_counter(self.substreams.stream());
    }
}

/// Philox4x32-10 bound to one tier.
pub enum Philox4x32 {
    Scalar(Philox4x32Scalar),
    #[cfg(target_arch = "x86_64")]
    Avx2(Box<avx2::Philox4x32Avx2>),
    #[cfg(target_arch = "x86_64")]
    Avx512(Box<avx512::Philox4x32Avx512>),
    #[cfg(target_arch = "aarch64")]
    Neon(Box<neon::Philox4x32Neon>),
}

impl Philox4x32 {
    pub fn new(tier: SimdTier, seed: u64, stream: u64) -> Self {
        match tier {
            #[cfg(target_arch = "x86_64")]
            SimdTier::Vec256 => Philox4x32::Avx2(Box::new(avx2::Philox4x32Avx2::new(seed, stream))),
            #[cfg(target_arch = "x86_64")]
            SimdTier::Vec512 => {
                Philox4x32::Avx512(Box::new(avx512::Philox4x32Avx512::new(seed, stream)))
            }
            #[cfg(target_arch = "aarch64")]
            SimdTier::VecNeon => Philox4x32::Neon(Box::new(neon::Philox4x32Neon::new(seed, stream))),
            _ => Philox4x32::Scalar(Philox4x32Scalar::new(seed, stream)),
        }
    }

    #[inline]
    pub fn fill(&mut self, out: &mut [u64]) {
        match self {
            Philox4x32::Scalar(g) => g.fill(out),
            // SAFETY: vector variants are only built for tiers the host supports.
            #[cfg(target_arch = "x86_64")]
            Philox4x32::Avx2(g) => unsafe { g.fill(out) },
            #[cfg(target_arch = "x86_64")]
            Philox4x32::Avx512(g) => unsafe { g.fill(out) },
            #[cfg(target_arch = "aarch64")]
            Philox4x32::Neon(g) => unsafe { g.fill(out) },
        }
    }

    /// Advance every lane by `blocks` blocks.
    pub fn skip(&mut self, blocks: u128) {
        match self {
            Philox4x32::Scalar(g) => g.skip(blocks),
            #[cfg(target_arch = "x86_64")]
            Philox4x32::Avx2(g) => g.skip(blocks),
            #[cfg(target_arch = "x86_64")]
            Philox4x32::Avx512(g) => g.skip(blocks),
            #[cfg(target_arch = "aarch64")]
            Philox4x32::Neon(g) => g.skip(blocks),
        }
    }

    /// Switch every lane to the next substream of the seed.
    pub fn jump(&mut self) {
        match self {
            Philox4x32::Scalar(g) => g.jump(),
            #[cfg(target_arch = "x86_64")]
            Philox4x32::Avx2(g) => g.jump(),
            #[cfg(target_arch = "x86_64")]
            Philox4x32::Avx512(g) => g.jump(),
            #[cfg(target_arch = "aarch64")]
            Philox4x32::Neon(g) => g.jump(),
        }
    }

    pub fn tier(&self) -> SimdTier {
        match self {
            Philox4x32::Scalar(_) => SimdTier::Scalar,
            #[cfg(target_arch = "x86_64")]
            Philox4x32::Avx2(_) => SimdTier::Vec256,
            #[cfg(target_arch = "x86_64")]
            Philox4x32::Avx512(_) => SimdTier::Vec512,
            #[cfg(target_arch = "aarch64")]
            Philox4x32::Neon(_) => SimdTier::VecNeon,
        }
    }

    /// Two words per 32-bit lane.
    pub fn words_per_step(&self) -> usize {
        2 * Self::lanes(self.tier())
    }

    /// Counter lanes per step: one per 32-bit vector element.
    pub const fn lanes(tier: SimdTier) -> usize {
        match tier {
            SimdTier::Scalar => 1,
            _ => tier.width_bytes() / 4,
        }
    }
}
