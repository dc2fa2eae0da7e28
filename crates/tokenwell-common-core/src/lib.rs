//! Tokenwell common core types and utilities.
//!
//! Every token bucket operation takes the current time as an argument
//! instead of reading a clock itself. This crate provides the clock
//! abstraction ([`TimeMeter`]) that callers use to produce those readings.

#![warn(missing_docs)]

pub mod error;
pub mod time;

pub use error::{Error, Result};
pub use time::{
    nanos_of_datetime, ManualTimeMeter, MonotonicTimeMeter, TimeMeter, WallClockTimeMeter,
};
