// src/parallel.rs
//! Multi-worker fills on the rayon pool
//!
//! # Design Philosophy
//!
//! A generator is single-owner, so parallel output comes from many
//! generators rather than one shared one:
//! 1. **Fixed chunks**: the output slice is cut into `chunk_len` pieces
//! 2. **One stream per chunk**: chunk `i` is produced by a fresh generator on
//!    stream `base.stream + i`, with the base seed and algorithm
//! 3. **Thread-count independence**: which thread runs a chunk never matters,
//!    so the result depends only on the configuration and `chunk_len`

use crate::config::RngConfig;
use crate::error::{validation::validate_chunk_len, RngResult};
use crate::rng::SimdRng;
use rayon::prelude::*;

/// Splits fills across rayon workers, one stream per chunk.
#[derive(Debug, Clone)]
pub struct ParallelFill {
    config: RngConfig,
    chunk_len: usize,
}

impl ParallelFill {
    pub const DEFAULT_CHUNK_LEN: usize = 1 << 16;

    pub fn new(config: RngConfig, chunk_len: usize) -> RngResult<Self> {
        validate_chunk_len(chunk_len)?;
        Ok(Self { config, chunk_len })
    }

    pub fn chunk_len(&self) -> usize {
        self.chunk_len
    }

    /// The generator that produces chunk `index`.
    pub fn worker(&self, index: u64) -> RngResult<SimdRng> {
        SimdRng::new(&self.config.for_worker(index))
    }

    pub fn fill_u64(&self, out: &mut [u64]) -> RngResult<()> {
        out.par_chunks_mut(self.chunk_len)
            .enumerate()
            .try_for_each(|(i, chunk)| {
                self.worker(i as u64)?.generate_u64(chunk);
                Ok(())
            })
    }

    pub fn fill_f64(&self, out: &mut [f64]) -> RngResult<()> {
        out.par_chunks_mut(self.chunk_len)
            .enumerate()
            .try_for_each(|(i, chunk)| {
                self.worker(i as u64)?.generate_double(chunk);
                Ok(())
            })
    }

    pub fn fill_normal(&self, mean: f64, stddev: f64, out: &mut [f64]) -> RngResult<()> {
        out.par_chunks_mut(self.chunk_len)
            .enumerate()
            .try_for_each(|(i, chunk)| {
                self.worker(i as u64)?.generate_normal(mean, stddev, chunk);
                Ok(())
            })
    }
}
