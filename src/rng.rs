// src/rng.rs
//! Public generator API
//!
//! # Design Philosophy
//!
//! A [`SimdRng`] is built once and then only draws:
//! 1. **Bind once**: CPU detection, tier resolution, backend seeding, buffer
//!    allocation and the choice of normal sampler all happen in
//!    [`SimdRng::new`]. Draw calls never re-check the host.
//! 2. **No draw-time errors**: construction is the only fallible step; the
//!    `generate_*` calls always fill exactly the slice they are given.
//! 3. **Single owner**: every draw takes `&mut self`. Parallel work uses one
//!    instance per worker on distinct streams (see [`crate::parallel`]).
//!
//! # Reproducibility
//!
//! For a fixed `(algorithm, seed, stream, tier)` the u64 sequence is fixed,
//! independent of how the caller splits requests. Different tiers give
//! different sequences for the same seed.

use crate::backends::Backend;
use crate::buffer::BufferManager;
use crate::config::{Algorithm, RngConfig};
use crate::cpu;
use crate::error::RngResult;
use crate::normal::{NormalKernel, NormalMethod};
use crate::tier::{resolve_tier, SimdTier};
use rand::RngCore;
use tracing::debug;

/// Normals produced per batch for [`SimdRng::next_normal`].
const NORMAL_BATCH: usize = 64;

/// Buffered SIMD random number generator.
pub struct SimdRng {
    algorithm: Algorithm,
    seed: u64,
    stream: u64,
    buffer: BufferManager,
    normal: NormalKernel,
    // single normal draws are served from here
    batch: [f64; NORMAL_BATCH],
    batch_at: usize,
}

impl SimdRng {
    /// Build a generator from `config`.
    ///
    /// Fails only when the buffer cannot be allocated. An unusable tier
    /// override silently falls back.
    pub fn new(config: &RngConfig) -> RngResult<Self> {
        let tier = resolve_tier(config.requested_tier(), cpu::capabilities());
        let backend = Backend::new(config.algorithm, tier, config.seed, config.stream);
        let buffer = BufferManager::new(backend, config.effective_capacity())?;

        let method = config
            .normal_method
            .unwrap_or_else(|| NormalMethod::default_for(tier));
        let normal = NormalKernel::new(method, tier);

        debug!(
            algorithm = %config.algorithm,
            %tier,
            normal = %method,
            stream = config.stream,
            "constructed generator"
        );

        Ok(Self {
            algorithm: config.algorithm,
            seed: config.seed,
            stream: config.stream,
            buffer,
            normal,
            batch: [0.0; NORMAL_BATCH],
            batch_at: NORMAL_BATCH,
        })
    }

    /// Generator with default settings apart from these four.
    pub fn with_params(
        seed: u64,
        algorithm: Algorithm,
        stream: u64,
        buffer_capacity: usize,
    ) -> RngResult<Self> {
        Self::new(&RngConfig {
            algorithm,
            seed,
            stream,
            buffer_capacity,
            ..Default::default()
        })
    }

    /// Default xoshiro256** generator on stream 0.
    pub fn from_seed(seed: u64) -> RngResult<Self> {
        Self::new(&RngConfig {
            seed,
            ..Default::default()
        })
    }

    /// Fill `out` with uniform 64-bit words.
    pub fn generate_u64(&mut self, out: &mut [u64]) {
        self.buffer.fill_u64(out);
    }

    /// Fill `out` with doubles in `[0, 1)`.
    pub fn generate_double(&mut self, out: &mut [f64]) {
        self.buffer.fill_f64(out);
    }

    /// Fill `out` with draws from N(`mean`, `stddev`²).
    ///
    /// Values left over from earlier [`next_normal`](Self::next_normal) calls
    /// come first.
    pub fn generate_normal(&mut self, mean: f64, stddev: f64, out: &mut [f64]) {
        let cached = (NORMAL_BATCH - self.batch_at).min(out.len());
        out[..cached].copy_from_slice(&self.batch[self.batch_at..self.batch_at + cached]);
        self.batch_at += cached;
        self.normal.fill(&mut self.buffer, &mut out[cached..]);
        for z in out.iter_mut() {
            *z = mean + stddev * *z;
        }
    }

    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        self.buffer.next_u64()
    }

    #[inline]
    pub fn next_f64(&mut self) -> f64 {
        self.buffer.next_f64()
    }

    /// One standard normal draw, taken from a batch of 64 so the polar
    /// kernels run whole vectors.
    pub fn next_normal(&mut self) -> f64 {
        if self.batch_at == NORMAL_BATCH {
            self.normal.fill(&mut self.buffer, &mut self.batch);
            self.batch_at = 0;
        }
        let z = self.batch[self.batch_at];
        self.batch_at += 1;
        z
    }

    /// Move the backend to a far-away, non-overlapping part of its sequence,
    /// dropping buffered words.
    ///
    /// xoshiro256** jumps 2^128 steps per lane. Philox switches every lane to
    /// the next key of the seed and restarts its counter, so lanes and streams
    /// stay disjoint after any number of jumps.
    pub fn jump(&mut self) {
        self.buffer.jump();
        self.batch_at = NORMAL_BATCH;
    }

    pub fn simd_tier(&self) -> SimdTier {
        self.buffer.tier()
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn normal_method(&self) -> NormalMethod {
        self.normal.method()
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn stream(&self) -> u64 {
        self.stream
    }

    /// Buffer size in words.
    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    /// Backend refills performed so far.
    pub fn refills(&self) -> u64 {
        self.buffer.refills()
    }
}

impl RngCore for SimdRng {
    fn next_u32(&mut self) -> u32 {
        (self.buffer.next_u64() >> 32) as u32
    }

    fn next_u64(&mut self) -> u64 {
        self.buffer.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(8) {
            let bytes = self.buffer.next_u64().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}
