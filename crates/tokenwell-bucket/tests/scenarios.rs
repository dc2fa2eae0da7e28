//! End-to-end bucket scenarios driven by a manual clock.

use std::time::Duration;
use tokenwell_bucket::{BucketConfiguration, BucketState, ConfigurationError, LocalBucket, RefillPolicy};
use tokenwell_test_utils::{
    assert_err, assert_ok, fixed_bandwidth, manual_clock, smooth_bandwidth, MILLIS, SECONDS,
};

#[test]
fn test_smooth_bucket_trickles_tokens_back() {
    let config = assert_ok!(BucketConfiguration::new(vec![smooth_bandwidth(
        10,
        10,
        Duration::from_millis(1000),
    )]));
    let clock = manual_clock();
    let mut bucket = assert_ok!(LocalBucket::new(config, clock.clone()));

    assert!(bucket.try_consume(10));
    assert_eq!(bucket.available_tokens(), 0);

    clock.set_nanos(100 * MILLIS);
    assert_eq!(bucket.available_tokens(), 1);

    clock.set_nanos(1_000 * MILLIS);
    assert_eq!(bucket.available_tokens(), 10);
}

#[test]
fn test_fixed_interval_bucket_releases_bursts() {
    let config = assert_ok!(BucketConfiguration::new(vec![fixed_bandwidth(
        5,
        5,
        Duration::from_secs(60),
    )]));
    let clock = manual_clock();
    let mut bucket = assert_ok!(LocalBucket::new(config, clock.clone()));
    assert!(bucket.try_consume(5));

    clock.set_nanos(59 * SECONDS);
    assert_eq!(bucket.available_tokens(), 0);
    assert_eq!(bucket.delay_until_possible(1), Some(Duration::from_secs(1)));

    clock.set_nanos(61 * SECONDS);
    assert_eq!(bucket.available_tokens(), 5);
}

#[test]
fn test_tightest_bandwidth_wins() {
    let config = assert_ok!(BucketConfiguration::new(vec![
        smooth_bandwidth(100, 100, Duration::from_secs(60)),
        smooth_bandwidth(10, 1, Duration::from_secs(1)),
    ]));
    let clock = manual_clock();
    let mut bucket = assert_ok!(LocalBucket::new(config, clock.clone()));

    assert_eq!(bucket.available_tokens(), 10);
    assert!(bucket.try_consume(10));
    assert!(!bucket.try_consume(1));

    // After two seconds the per-minute bandwidth has 93 tokens, the per-second one 2.
    clock.set_nanos(2 * SECONDS);
    assert_eq!(bucket.available_tokens(), 2);
    let sizes: Vec<u64> = bucket
        .state()
        .bandwidth_states()
        .iter()
        .map(|record| record.current_size())
        .collect();
    assert_eq!(sizes, vec![93, 2]);
}

#[test]
fn test_wait_estimate_for_partial_bucket() {
    let bandwidths = vec![smooth_bandwidth(10, 10, Duration::from_millis(1000))];
    let config = assert_ok!(assert_ok!(BucketConfiguration::new(bandwidths)).with_initial_tokens(0, 2));
    let mut bucket = assert_ok!(LocalBucket::new(config, manual_clock()));

    assert_eq!(bucket.delay_until_possible(10), Some(Duration::from_millis(800)));
}

#[test]
fn test_optimistic_update_from_snapshot() {
    let bandwidths = vec![smooth_bandwidth(10, 1, Duration::from_secs(1))];
    let config = assert_ok!(BucketConfiguration::new(bandwidths));
    let mut published = BucketState::create_initial_state(&config, 0);

    // Two writers read the same snapshot and compute their next states.
    let mut first = published.copy();
    let mut second = published.copy();
    assert!(first.refill_all_bandwidth(config.bandwidths(), SECONDS) >= 4);
    first.consume(4);
    assert!(second.refill_all_bandwidth(config.bandwidths(), SECONDS) >= 8);
    second.consume(8);

    // The first writer wins; the second retries from the new value.
    published.copy_state_from(&first);
    let mut retry = published.copy();
    assert_eq!(retry.refill_all_bandwidth(config.bandwidths(), SECONDS), 6);
    assert!(retry.delay_nanos_until_possible(config.bandwidths(), 8, SECONDS).unwrap() > 0);

    assert_eq!(published.available_tokens(), 6);
    assert_eq!(second.available_tokens(), 2);
}

#[test]
fn test_invalid_policies_are_rejected() {
    let err = assert_err!(RefillPolicy::smooth(0, Duration::from_secs(1)));
    assert_eq!(err, ConfigurationError::NonPositiveTokens { tokens: 0 });

    let err = assert_err!(RefillPolicy::fixed_interval(1, Duration::ZERO));
    assert_eq!(err, ConfigurationError::InvalidPeriod { period_nanos: 0 });
    assert!(err.to_string().contains("refill period"));
}
