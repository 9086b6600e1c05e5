// src/error.rs
use std::fmt;

/// Custom error types for the fast-rng library
///
/// Only construction can fail. Draw calls (`generate_u64`, `generate_double`,
/// `generate_normal`) have no error path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RngError {
    /// The aligned output buffer or the backend state could not be allocated
    AllocationFailed {
        requested_words: usize,
        reason: String,
    },

    /// Invalid configuration value (unknown tier/algorithm name, zero chunk length)
    InvalidConfiguration { field: String, reason: String },
}

impl fmt::Display for RngError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RngError::AllocationFailed {
                requested_words,
                reason,
            } => {
                write!(
                    f,
                    "Failed to allocate buffer of {} u64 words: {}",
                    requested_words, reason
                )
            }
            RngError::InvalidConfiguration { field, reason } => {
                write!(f, "Invalid configuration for '{}': {}", field, reason)
            }
        }
    }
}

impl std::error::Error for RngError {}

/// Result type alias for fast-rng operations
pub type RngResult<T> = Result<T, RngError>;

/// Validation utilities
pub mod validation {
    use super::{RngError, RngResult};

    /// Validate that a parallel chunk length is usable
    pub fn validate_chunk_len(len: usize) -> RngResult<()> {
        if len == 0 {
            Err(RngError::InvalidConfiguration {
                field: "chunk_len".to_string(),
                reason: "must be greater than 0".to_string(),
            })
        } else {
            Ok(())
        }
    }

    /// Build the error returned by `FromStr` impls for unknown names
    pub fn unknown_name(field: &str, value: &str, expected: &str) -> RngError {
        RngError::InvalidConfiguration {
            field: field.to_string(),
            reason: format!("unknown value '{}', expected one of: {}", value, expected),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::validation::*;
    use super::*;

    #[test]
    fn test_validate_chunk_len() {
        assert!(validate_chunk_len(1).is_ok());
        assert!(validate_chunk_len(0).is_err());
    }

    #[test]
    fn test_error_display() {
        let error = RngError::AllocationFailed {
            requested_words: 4096,
            reason: "out of memory".to_string(),
        };

        let display = format!("{}", error);
        assert!(display.contains("4096"));
        assert!(display.contains("out of memory"));
    }

    #[test]
    fn test_unknown_name_error() {
        let error = unknown_name("simd_tier", "sse9", "scalar, avx2");
        let display = format!("{}", error);
        assert!(display.contains("simd_tier"));
        assert!(display.contains("sse9"));
        assert!(display.contains("avx2"));
    }
}
