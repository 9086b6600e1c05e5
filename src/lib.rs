//! # fast-rng: SIMD Random Number Generation with Runtime Tier Dispatch
//!
//! A Rust library for high-throughput pseudo-random number generation. The
//! generator picks the widest vector instruction set the host supports at
//! construction time and stays bound to it.
//!
//! ## Key Features
//!
//! - **Two generator families**: xoshiro256** (state based) and Philox4x32-10
//!   (counter based), each with scalar, AVX2, AVX-512 and NEON backends
//! - **Runtime dispatch**: `cpuid`/`xgetbv` detection, one tier per generator,
//!   override through configuration or `FAST_RNG_FORCE_SIMD`
//! - **Buffered output**: aligned buffer refilled a full capacity at a time
//! - **Normal draws**: ziggurat on narrow tiers, vectorized polar method on
//!   wide tiers
//! - **Reproducible streams**: per-tier golden sequences, one stream per worker
//!   for parallel fills
//! - **`rand` interop**: [`SimdRng`] implements `rand::RngCore`
//!
//! ## Quick Start
//!
//! ```rust
//! use fast_rng::{Algorithm, RngConfig, SimdRng};
//!
//! let config = RngConfig {
//!     algorithm: Algorithm::Philox4x32,
//!     seed: 42,
//!     stream: 7,
//!     ..Default::default()
//! };
//!
//! let mut rng = SimdRng::new(&config).expect("Valid configuration");
//!
//! let mut uniforms = vec![0.0; 1000];
//! rng.generate_double(&mut uniforms);
//! assert!(uniforms.iter().all(|u| (0.0..1.0).contains(u)));
//!
//! let mut normals = vec![0.0; 1000];
//! rng.generate_normal(0.0, 1.0, &mut normals);
//! println!("tier: {}, normal method: {}", rng.simd_tier(), rng.normal_method());
//! ```
//!
//! ## Tiers
//!
//! | Tier      | Instruction set | u64 lanes | Default normal method |
//! |-----------|-----------------|-----------|-----------------------|
//! | `Scalar`  | portable        | 1         | ziggurat              |
//! | `Vec256`  | AVX2            | 4         | polar                 |
//! | `Vec512`  | AVX-512F        | 8         | polar                 |
//! | `VecNeon` | NEON            | 2         | ziggurat              |

// Module declarations
pub mod backends;
pub mod buffer;
pub mod config;
pub mod cpu;
pub mod error;
pub mod math_utils;
pub mod normal;
pub mod parallel;
pub mod rng;
pub mod tier;

// Re-export commonly used types for convenience
pub use config::{Algorithm, RngConfig};
pub use cpu::CpuCapabilities;
pub use error::{RngError, RngResult};
pub use normal::NormalMethod;
pub use parallel::ParallelFill;
pub use rng::SimdRng;
pub use tier::SimdTier;
