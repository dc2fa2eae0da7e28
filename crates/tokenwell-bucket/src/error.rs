//! Configuration errors for bandwidths and refill policies.

use thiserror::Error;

/// Errors raised while building refill policies, bandwidths and bucket
/// configurations.
///
/// These are construction-time failures only. Bucket state operations never
/// fail at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// Refill token count was zero.
    #[error("refill tokens must be positive, got {tokens}")]
    NonPositiveTokens {
        /// Offending token count.
        tokens: u64,
    },

    /// Refill period was zero or does not fit in `i64` nanoseconds.
    #[error("refill period must be positive and fit in i64 nanoseconds, got {period_nanos}ns")]
    InvalidPeriod {
        /// Offending period in nanoseconds.
        period_nanos: u128,
    },

    /// First refill anchor cannot be placed on the nanosecond timeline.
    #[error("first refill anchor is out of range: {reason}")]
    AnchorOutOfRange {
        /// Why the anchor was rejected.
        reason: String,
    },

    /// Bandwidth capacity was zero.
    #[error("bandwidth capacity must be positive, got {capacity}")]
    NonPositiveCapacity {
        /// Offending capacity.
        capacity: u64,
    },

    /// A bucket needs at least one bandwidth.
    #[error("bucket configuration must contain at least one bandwidth")]
    EmptyBandwidths,

    /// Initial tokens exceed the bandwidth capacity.
    #[error("initial tokens {initial_tokens} exceed capacity {capacity} of bandwidth {index}")]
    InitialTokensExceedCapacity {
        /// Bandwidth position.
        index: usize,
        /// Requested initial tokens.
        initial_tokens: u64,
        /// Capacity of that bandwidth.
        capacity: u64,
    },

    /// Bandwidth index does not exist in the configuration.
    #[error("bandwidth index {index} is out of range for {len} bandwidths")]
    BandwidthIndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of configured bandwidths.
        len: usize,
    },

    /// A bandwidth aligned to a calendar instant was paired with a meter
    /// whose readings are not epoch nanoseconds.
    #[error("bandwidth {index} has a wall-clock anchor but the time meter is not wall-clock based")]
    WallClockRequired {
        /// Bandwidth position.
        index: usize,
    },
}

impl From<tokenwell_common_core::Error> for ConfigurationError {
    fn from(err: tokenwell_common_core::Error) -> Self {
        Self::AnchorOutOfRange {
            reason: err.to_string(),
        }
    }
}

/// Result type alias for configuration operations.
pub type ConfigurationResult<T> = std::result::Result<T, ConfigurationError>;
