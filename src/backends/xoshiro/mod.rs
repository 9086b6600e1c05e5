// src/backends/xoshiro/mod.rs
//! xoshiro256** state-based generator
//!
//! # Algorithm
//!
//! Four 64-bit words of state per lane:
//! ```text
//! out = rotl(s1 * 5, 7) * 9
//! t   = s1 << 17
//! s2 ^= s0;  s3 ^= s1;  s1 ^= s2;  s0 ^= s3
//! s2 ^= t;   s3 = rotl(s3, 45)
//! ```
//! Every tier runs this exact operation order; only the lane count differs
//! (scalar 1, AVX2 4, AVX-512 8, NEON 2).
//!
//! # Seeding
//!
//! A SplitMix64 sequence started at `seed ^ fmix64(stream)` is drawn lane by
//! lane: lane `j` takes outputs `4j..4j+3` as `s0..s3`. Lane 0 of every tier
//! therefore equals [`Xoshiro256Scalar`] seeded with the same inputs.
//!
//! # Output layout
//!
//! A vector step emits one word per lane; word `k*L + j` is the `k`-th
//! output of lane `j`.

#[cfg(target_arch = "x86_64")]
pub(crate) mod avx2;
#[cfg(target_arch = "x86_64")]
pub(crate) mod avx512;
#[cfg(target_arch = "aarch64")]
pub(crate) mod neon;

use super::{fmix64, SplitMix64};
use crate::tier::SimdTier;

/// Jump polynomial advancing the state by 2^128 steps.
const JUMP: [u64; 4] = [
    0x180e_c6d3_3cfd_0aba,
    0xd5a6_1266_f0c9_392c,
    0xa958_2618_e03f_c9aa,
    0x39ab_dc45_29b1_661c,
];

/// Scalar xoshiro256**, the reference every vector tier is checked against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Xoshiro256Scalar {
    s: [u64; 4],
}

impl Xoshiro256Scalar {
    pub fn new(seed: u64, stream: u64) -> Self {
        let [words] = lane_seeds::<1>(seed, stream);
        Self::from_words(words)
    }

    /// Build from raw state words. An all-zero state is a fixed point of the
    /// recurrence and is replaced by a non-zero one.
    pub fn from_words(words: [u64; 4]) -> Self {
        if words == [0; 4] {
            return Self {
                s: [SplitMix64::GAMMA, 0, 0, 0],
            };
        }
        Self { s: words }
    }

    pub fn state(&self) -> [u64; 4] {
        self.s
    }

    #[inline(always)]
    pub fn next_u64(&mut self) -> u64 {
        let [s0, s1, s2, s3] = &mut self.s;

        let result = s1.wrapping_mul(5).rotate_left(7).wrapping_mul(9);
        let t = *s1 << 17;

        *s2 ^= *s0;
        *s3 ^= *s1;
        *s1 ^= *s2;
        *s0 ^= *s3;
        *s2 ^= t;
        *s3 = s3.rotate_left(45);

        result
    }

    pub fn fill(&mut self, out: &mut [u64]) {
        for slot in out.iter_mut() {
            *slot = self.next_u64();
        }
    }

    /// Advance by 2^128 steps.
    pub fn jump(&mut self) {
        let mut acc = [0u64; 4];
        for word in JUMP {
            for bit in 0..64 {
                if word & (1u64 << bit) != 0 {
                    for (a, s) in acc.iter_mut().zip(self.s.iter()) {
                        *a ^= *s;
                    }
                }
                self.next_u64();
            }
        }
        self.s = acc;
    }
}

/// Initial state words for `L` lanes, lane-major.
pub(crate) fn lane_seeds<const L: usize>(seed: u64, stream: u64) -> [[u64; 4]; L] {
    let mut sm = SplitMix64::new(seed ^ fmix64(stream));
    core::array::from_fn(|_| {
        let words = [sm.next_u64(), sm.next_u64(), sm.next_u64(), sm.next_u64()];
        Xoshiro256Scalar::from_words(words).state()
    })
}

/// Transpose lane-major seeds into word-major vector state (`s[word][lane]`).
pub(crate) fn transpose<const L: usize>(lanes: [[u64; 4]; L]) -> [[u64; L]; 4] {
    core::array::from_fn(|word| core::array::from_fn(|lane| lanes[lane][word]))
}

/// Apply the 2^128 jump to every lane of a word-major vector state.
pub(crate) fn jump_lanes<const L: usize>(s: &mut [[u64; L]; 4]) {
    for lane in 0..L {
        let mut scalar = Xoshiro256Scalar {
            s: [s[0][lane], s[1][lane], s[2][lane], s[3][lane]],
        };
        scalar.jump();
        for (word, value) in scalar.s.into_iter().enumerate() {
            s[word][lane] = value;
        }
    }
}

/// xoshiro256** bound to one tier.
pub enum Xoshiro256 {
    Scalar(Xoshiro256Scalar),
    #[cfg(target_arch = "x86_64")]
    Avx2(Box<avx2::Xoshiro256Avx2>),
    #[cfg(target_arch = "x86_64")]
    Avx512(Box<avx512::Xoshiro256Avx512>),
    #[cfg(target_arch = "aarch64")]
    Neon(Box<neon::Xoshiro256Neon>),
}

impl Xoshiro256 {
    /// `tier` must be supported by the host. Tiers that do not exist on this
    /// architecture degrade to scalar.
    pub fn new(tier: SimdTier, seed: u64, stream: u64) -> Self {
        match tier {
            #[cfg(target_arch = "x86_64")]
            SimdTier::Vec256 => Xoshiro256::Avx2(Box::new(avx2::Xoshiro256Avx2::new(seed, stream))),
            #[cfg(target_arch = "x86_64")]
            SimdTier::Vec512 => {
                Xoshiro256::Avx512(Box::new(avx512::Xoshiro256Avx512::new(seed, stream)))
            }
            #[cfg(target_arch = "aarch64")]
            SimdTier::VecNeon => Xoshiro256::Neon(Box::new(neon::Xoshiro256Neon::new(seed, stream))),
            _ => Xoshiro256::Scalar(Xoshiro256Scalar::new(seed, stream)),
        }
    }

    #[inline]
    pub fn fill(&mut self, out: &mut [u64]) {
        match self {
            Xoshiro256::Scalar(g) => g.fill(out),
            // SAFETY: vector variants are only built for tiers the host supports.
            #[cfg(target_arch = "x86_64")]
            Xoshiro256::Avx2(g) => unsafe { g.fill(out) },
            #[cfg(target_arch = "x86_64")]
            Xoshiro256::Avx512(g) => unsafe { g.fill(out) },
            #[cfg(target_arch = "aarch64")]
            Xoshiro256::Neon(g) => unsafe { g.fill(out) },
        }
    }

    pub fn jump(&mut self) {
        match self {
            Xoshiro256::Scalar(g) => g.jump(),
            #[cfg(target_arch = "x86_64")]
            Xoshiro256::Avx2(g) => g.jump(),
            #[cfg(target_arch = "x86_64")]
            Xoshiro256::Avx512(g) => g.jump(),
            #[cfg(target_arch = "aarch64")]
            Xoshiro256::Neon(g) => g.jump(),
        }
    }

    pub fn tier(&self) -> SimdTier {
        match self {
            Xoshiro256::Scalar(_) => SimdTier::Scalar,
            #[cfg(target_arch = "x86_64")]
            Xoshiro256::Avx2(_) => SimdTier::Vec256,
            #[cfg(target_arch = "x86_64")]
            Xoshiro256::Avx512(_) => SimdTier::Vec512,
            #[cfg(target_arch = "aarch64")]
            Xoshiro256::Neon(_) => SimdTier::VecNeon,
        }
    }

    pub fn words_per_step(&self) -> usize {
        self.tier().u64_lanes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu;

    const GOLDEN_SEED: u64 = 0xDEAD_BEEF_CAFE_BABE;

    #[test]
    fn test_scalar_golden_stream7() {
        let mut g = Xoshiro256Scalar::new(GOLDEN_SEED, 7);
        assert_eq!(g.next_u64(), 0x7102_d24f_c21f_e49d);
        assert_eq!(g.next_u64(), 0xc311_2514_eb9d_8d5d);
        assert_eq!(g.next_u64(), 0xda5a_7278_3035_0f43);
        assert_eq!(g.next_u64(), 0x08f1_dc8e_1928_8288);
    }

    #[test]
    fn test_stream_zero_is_plain_seed() {
        let mut g = Xoshiro256Scalar::new(GOLDEN_SEED, 0);
        assert_eq!(g.next_u64(), 0x2299_b342_1aa7_8b66);
        assert_eq!(g.next_u64(), 0x9af6_5504_83e0_2887);
    }

    #[test]
    fn test_jump_golden() {
        let mut g = Xoshiro256Scalar::new(GOLDEN_SEED, 7);
        g.jump();
        assert_eq!(g.next_u64(), 0x1a31_f345_7bab_b56d);
    }

    #[test]
    fn test_zero_state_is_replaced() {
        let mut g = Xoshiro256Scalar::from_words([0; 4]);
        let first = g.next_u64();
        let second = g.next_u64();
        assert!(first != 0 || second != 0);
    }

    #[test]
    fn test_lane_seeds_are_consecutive_splitmix_outputs() {
        let lanes = lane_seeds::<3>(5, 9);
        let mut sm = SplitMix64::new(5 ^ fmix64(9));
        for lane in lanes {
            for word in lane {
                assert_eq!(word, sm.next_u64());
            }
        }
    }

    #[test]
    fn test_transpose_layout() {
        let lanes = [[1, 2, 3, 4], [5, 6, 7, 8]];
        assert_eq!(transpose(lanes), [[1, 5], [2, 6], [3, 7], [4, 8]]);
    }

    #[test]
    fn test_jump_lanes_matches_scalar_jump() {
        let lanes = lane_seeds::<2>(11, 0);
        let mut vector = transpose(lanes);
        jump_lanes(&mut vector);

        for (lane, words) in lanes.into_iter().enumerate() {
            let mut scalar = Xoshiro256Scalar::from_words(words);
            scalar.jump();
            let got = [vector[0][lane], vector[1][lane], vector[2][lane], vector[3][lane]];
            assert_eq!(got, scalar.state());
        }
    }

    /// Every lane of every available vector tier must equal the scalar
    /// generator seeded with that lane's words.
    #[test]
    fn test_vector_lanes_match_scalar_reference() {
        for tier in cpu::capabilities().available_tiers() {
            let lanes = tier.u64_lanes();
            let mut g = Xoshiro256::new(tier, GOLDEN_SEED, 7);
            let steps = 37;
            let mut out = vec![0u64; lanes * steps];
            g.fill(&mut out);

            let mut sm = SplitMix64::new(GOLDEN_SEED ^ fmix64(7));
            for lane in 0..lanes {
                let words = [sm.next_u64(), sm.next_u64(), sm.next_u64(), sm.next_u64()];
                let mut reference = Xoshiro256Scalar::from_words(words);
                for step in 0..steps {
                    assert_eq!(
                        out[step * lanes + lane],
                        reference.next_u64(),
                        "tier {} lane {} step {}",
                        tier,
                        lane,
                        step
                    );
                }
            }
        }
    }

    #[test]
    fn test_vector_state_survives_between_fills() {
        for tier in cpu::capabilities().available_tiers() {
            let lanes = tier.u64_lanes();
            let mut whole = Xoshiro256::new(tier, 3, 1);
            let mut split = Xoshiro256::new(tier, 3, 1);

            let mut a = vec![0u64; lanes * 8];
            whole.fill(&mut a);

            let mut b = vec![0u64; lanes * 8];
            let (first, second) = b.split_at_mut(lanes * 3);
            split.fill(first);
            split.fill(second);

            assert_eq!(a, b, "tier {}", tier);
        }
    }

    #[test]
    fn test_jump_changes_every_tier() {
        for tier in cpu::capabilities().available_tiers() {
            let lanes = tier.u64_lanes();
            let mut plain = Xoshiro256::new(tier, 1, 0);
            let mut jumped = Xoshiro256::new(tier, 1, 0);
            jumped.jump();

            let mut a = vec![0u64; lanes * 4];
            let mut b = vec![0u64; lanes * 4];
            plain.fill(&mut a);
            jumped.fill(&mut b);
            assert_ne!(a, b, "tier {}", tier);
        }
    }
}
