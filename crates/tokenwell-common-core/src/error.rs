//! Error types shared across Tokenwell crates.

use thiserror::Error;

/// Errors produced by the common core.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A wall-clock instant cannot be expressed as `i64` nanoseconds since the epoch.
    #[error("instant {instant} is outside the representable nanosecond range")]
    InstantOutOfRange {
        /// RFC 3339 rendering of the offending instant.
        instant: String,
    },
}

/// Result type alias using the common core [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
