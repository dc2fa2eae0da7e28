//! Clock sources expressed as nanosecond readings.

use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{Error, Result};

/// A source of nanosecond timestamps.
///
/// Readings from a single meter must never go backwards. Bucket state
/// tolerates a clock that stalls or repeats a reading, but it only ever
/// moves forward in time.
pub trait TimeMeter: Send + Sync {
    /// Current time in nanoseconds on this meter's timeline.
    fn current_time_nanos(&self) -> i64;

    /// Whether readings are wall-clock nanoseconds since the Unix epoch.
    ///
    /// Refill anchors given as calendar instants are only meaningful on
    /// such meters.
    fn is_wall_clock_based(&self) -> bool {
        false
    }
}

impl<T: TimeMeter + ?Sized> TimeMeter for Arc<T> {
    fn current_time_nanos(&self) -> i64 {
        (**self).current_time_nanos()
    }

    fn is_wall_clock_based(&self) -> bool {
        (**self).is_wall_clock_based()
    }
}

impl<T: TimeMeter + ?Sized> TimeMeter for &T {
    fn current_time_nanos(&self) -> i64 {
        (**self).current_time_nanos()
    }

    fn is_wall_clock_based(&self) -> bool {
        (**self).is_wall_clock_based()
    }
}

/// Monotonic meter backed by [`Instant`].
///
/// Readings are nanoseconds elapsed since the meter was created, so they
/// start near zero and are unaffected by wall-clock adjustments.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicTimeMeter {
    origin: Instant,
}

impl MonotonicTimeMeter {
    /// Create a meter whose zero is the current instant.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicTimeMeter {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeMeter for MonotonicTimeMeter {
    fn current_time_nanos(&self) -> i64 {
        i64::try_from(self.origin.elapsed().as_nanos()).unwrap_or(i64::MAX)
    }
}

/// Wall-clock meter reporting nanoseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, Default)]
pub struct WallClockTimeMeter;

impl TimeMeter for WallClockTimeMeter {
    fn current_time_nanos(&self) -> i64 {
        Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX)
    }

    fn is_wall_clock_based(&self) -> bool {
        true
    }
}

/// Manually driven meter for tests and simulations.
///
/// Clones share the same reading, so a test can keep one handle while a
/// bucket owns another.
#[derive(Clone, Default)]
pub struct ManualTimeMeter {
    nanos: Arc<AtomicI64>,
    wall_clock: bool,
}

impl ManualTimeMeter {
    /// Create a meter reading `start_nanos` on an arbitrary timeline.
    pub fn new(start_nanos: i64) -> Self {
        Self {
            nanos: Arc::new(AtomicI64::new(start_nanos)),
            wall_clock: false,
        }
    }

    /// Create a meter whose readings are epoch nanoseconds, starting at
    /// `start_nanos`.
    pub fn wall_clock(start_nanos: i64) -> Self {
        Self {
            wall_clock: true,
            ..Self::new(start_nanos)
        }
    }

    /// Set the current reading.
    pub fn set_nanos(&self, nanos: i64) {
        self.nanos.store(nanos, Ordering::SeqCst);
    }

    /// Move the reading forward by `nanos`.
    pub fn add_nanos(&self, nanos: i64) {
        self.nanos.fetch_add(nanos, Ordering::SeqCst);
    }

    /// Move the reading forward by `duration`.
    pub fn advance(&self, duration: Duration) {
        self.add_nanos(i64::try_from(duration.as_nanos()).unwrap_or(i64::MAX));
    }
}

impl TimeMeter for ManualTimeMeter {
    fn current_time_nanos(&self) -> i64 {
        self.nanos.load(Ordering::SeqCst)
    }

    fn is_wall_clock_based(&self) -> bool {
        self.wall_clock
    }
}

impl fmt::Debug for ManualTimeMeter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ManualTimeMeter({}ns)", self.current_time_nanos())
    }
}

/// Convert a UTC instant to nanoseconds since the Unix epoch.
pub fn nanos_of_datetime(instant: DateTime<Utc>) -> Result<i64> {
    instant
        .timestamp_nanos_opt()
        .ok_or_else(|| Error::InstantOutOfRange {
            instant: instant.to_rfc3339(),
        })
}
