//! Test utilities for Tokenwell crates.

use std::path::PathBuf;
use std::time::Duration;

use proptest::prelude::*;
use proptest::test_runner::Config;
use tempfile::TempDir;
use tokenwell_bucket::{Bandwidth, BucketConfiguration, RefillPolicy};
use tokenwell_common_core::ManualTimeMeter;

/// Nanoseconds in a millisecond.
pub const MILLIS: i64 = 1_000_000;
/// Nanoseconds in a second.
pub const SECONDS: i64 = 1_000_000_000;

/// Creates a temporary directory that is cleaned up on drop.
pub fn temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Creates a file named `name` with given content inside a fresh temporary directory.
pub fn temp_file(name: &str, content: &str) -> (TempDir, PathBuf) {
    let dir = temp_dir();
    let path = dir.path().join(name);
    std::fs::write(&path, content).expect("Failed to write temp file");
    (dir, path)
}

/// A manual clock starting at zero.
pub fn manual_clock() -> ManualTimeMeter {
    ManualTimeMeter::new(0)
}

/// Smooth bandwidth of `capacity` regenerating `tokens` per `period`.
pub fn smooth_bandwidth(capacity: u64, tokens: u64, period: Duration) -> Bandwidth {
    let refill = RefillPolicy::smooth(tokens, period).expect("valid smooth refill");
    Bandwidth::new(capacity, refill).expect("valid bandwidth")
}

/// Fixed-interval bandwidth of `capacity` releasing `tokens` every `period`.
pub fn fixed_bandwidth(capacity: u64, tokens: u64, period: Duration) -> Bandwidth {
    let refill = RefillPolicy::fixed_interval(tokens, period).expect("valid fixed refill");
    Bandwidth::new(capacity, refill).expect("valid bandwidth")
}

/// Configuration whose bandwidths all start empty.
pub fn empty_configuration(bandwidths: Vec<Bandwidth>) -> BucketConfiguration {
    let len = bandwidths.len();
    let mut config = BucketConfiguration::new(bandwidths).expect("non-empty bandwidths");
    for index in 0..len {
        config = config.with_initial_tokens(index, 0).expect("index in range");
    }
    config
}

/// Standard proptest configuration, honouring `PROPTEST_CASES=quick|ci`.
pub fn proptest_config() -> Config {
    let cases = match std::env::var("PROPTEST_CASES").ok().as_deref() {
        Some("quick") => 32,
        Some("ci") => 1_024,
        _ => 256,
    };
    Config {
        cases,
        ..Config::default()
    }
}

/// Strategy for valid refill policies of either discipline.
///
/// Periods stay between 1ns and 10s and rates between 1 and 1000 tokens so
/// that interesting refills happen within short simulated runs.
pub fn refill_policy() -> impl Strategy<Value = RefillPolicy> {
    (1u64..=1_000, 1u64..=10_000_000_000, any::<bool>()).prop_map(|(tokens, period, fixed)| {
        let period = Duration::from_nanos(period);
        if fixed {
            RefillPolicy::fixed_interval(tokens, period).expect("valid fixed refill")
        } else {
            RefillPolicy::smooth(tokens, period).expect("valid smooth refill")
        }
    })
}

/// Strategy for smooth refill policies only.
pub fn smooth_refill_policy() -> impl Strategy<Value = RefillPolicy> {
    (1u64..=1_000, 1u64..=10_000_000_000).prop_map(|(tokens, period)| {
        RefillPolicy::smooth(tokens, Duration::from_nanos(period)).expect("valid smooth refill")
    })
}

/// Strategy for a bandwidth with capacity between 1 and 10 000.
pub fn bandwidth() -> impl Strategy<Value = Bandwidth> {
    (1u64..=10_000, refill_policy())
        .prop_map(|(capacity, refill)| Bandwidth::new(capacity, refill).expect("valid bandwidth"))
}

/// Strategy for one to four bandwidths.
pub fn bandwidths() -> impl Strategy<Value = Vec<Bandwidth>> {
    prop::collection::vec(bandwidth(), 1..=4)
}

/// A mutation applied to bucket state in property tests.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Move the clock forward by this many nanoseconds and refill.
    Refill(i64),
    /// Consume up to this many tokens, limited to what is available.
    Consume(u64),
    /// Add this many tokens.
    AddTokens(u64),
}

/// Strategy for operation sequences.
pub fn operations() -> impl Strategy<Value = Vec<Operation>> {
    prop::collection::vec(
        prop_oneof![
            (0i64..=20 * SECONDS).prop_map(Operation::Refill),
            (0u64..=10_000).prop_map(Operation::Consume),
            (0u64..=10_000).prop_map(Operation::AddTokens),
        ],
        1..64,
    )
}

/// Assert that a Result is Ok and return the value.
#[macro_export]
macro_rules! assert_ok {
    ($expr:expr) => {
        match $expr {
            Ok(v) => v,
            Err(e) => panic!("Expected Ok, got Err: {:?}", e),
        }
    };
}

/// Assert that a Result is Err and return the error.
#[macro_export]
macro_rules! assert_err {
    ($expr:expr) => {
        match $expr {
            Ok(v) => panic!("Expected Err, got Ok: {:?}", v),
            Err(e) => e,
        }
    };
}
