//! Error type for the strict operations of the crate.
//!
//! Most operations never fail: out-of-range queries are clamped and
//! degenerate distributions yield zero statistics. Only text parsing, sample
//! histograms beyond their value limit and the strict inverse CDF report
//! errors.

use thiserror::Error;

/// Errors raised by parsing and strict queries.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DistributionError {
    /// A density token could not be read as a number or percentage.
    #[error("invalid number {token:?} at position {index}")]
    InvalidNumber {
        /// Zero-based token position.
        index: usize,
        /// Offending token.
        token: String,
    },
    /// A sample token was not a non-negative integer.
    #[error("invalid sample {token:?} at position {index}")]
    InvalidSample {
        /// Zero-based token position.
        index: usize,
        /// Offending token.
        token: String,
    },
    /// A sample beyond the largest value the sample histograms index.
    #[error("sample {value} exceeds the largest supported value {max}")]
    SampleTooLarge {
        /// Offending sample.
        value: u32,
        /// Largest accepted sample.
        max: u32,
    },
    /// Probability outside `[0, 1]` (or NaN) passed to a strict query.
    #[error("probability {0} is outside [0, 1]")]
    InvalidProbability(f64),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, DistributionError>;
