//! Single-owner bucket driven by a time meter.

use std::time::Duration;
use tracing::{debug, trace};

use tokenwell_common_core::TimeMeter;

use crate::configuration::BucketConfiguration;
use crate::error::{ConfigurationError, ConfigurationResult};
use crate::state::BucketState;

/// Outcome of [`LocalBucket::try_consume_and_return_remaining`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsumptionProbe {
    /// Whether the tokens were consumed.
    pub consumed: bool,
    /// Tokens left after the attempt.
    pub remaining_tokens: u64,
    /// Nanoseconds until the request could succeed; zero when it did, `None`
    /// when it never can.
    pub nanos_to_wait_for_refill: Option<u64>,
}

/// Token bucket owned by a single writer.
///
/// Each call reads the meter once, refills every bandwidth against that
/// reading and then acts on the result, so refill, check and consume happen
/// as one step. Wrap it in a mutex to share it between threads.
pub struct LocalBucket<M: TimeMeter> {
    configuration: BucketConfiguration,
    state: BucketState,
    meter: M,
}

impl<M: TimeMeter> LocalBucket<M> {
    /// Create a bucket whose state starts at the meter's current reading.
    ///
    /// Fails with [`ConfigurationError::WallClockRequired`] when a bandwidth
    /// is aligned to a calendar instant but the meter is not a wall clock.
    pub fn new(configuration: BucketConfiguration, meter: M) -> ConfigurationResult<Self> {
        if !meter.is_wall_clock_based() {
            let aligned = configuration
                .bandwidths()
                .iter()
                .position(|bandwidth| bandwidth.refill().has_wall_clock_anchor());
            if let Some(index) = aligned {
                return Err(ConfigurationError::WallClockRequired { index });
            }
        }

        let state = BucketState::create_initial_state(&configuration, meter.current_time_nanos());
        Ok(Self {
            configuration,
            state,
            meter,
        })
    }

    /// Refill against a fresh reading, returning it with the available tokens.
    fn refill(&mut self) -> (i64, u64) {
        let now = self.meter.current_time_nanos();
        let available = self
            .state
            .refill_all_bandwidth(self.configuration.bandwidths(), now);
        (now, available)
    }

    /// Consume `tokens` if every bandwidth has them.
    pub fn try_consume(&mut self, tokens: u64) -> bool {
        let (_, available) = self.refill();
        if tokens > available {
            debug!(requested = tokens, available, "token bucket rejected consumption");
            return false;
        }

        self.state.consume(tokens);
        trace!(consumed = tokens, remaining = available - tokens, "tokens consumed");
        true
    }

    /// Like [`try_consume`](Self::try_consume), but also report what is left
    /// and how long a rejected request would need to wait.
    pub fn try_consume_and_return_remaining(&mut self, tokens: u64) -> ConsumptionProbe {
        let (now, available) = self.refill();
        if tokens > available {
            let wait = self
                .state
                .delay_nanos_until_possible(self.configuration.bandwidths(), tokens, now);
            debug!(requested = tokens, available, wait_nanos = ?wait, "token bucket rejected consumption");
            return ConsumptionProbe {
                consumed: false,
                remaining_tokens: available,
                nanos_to_wait_for_refill: wait,
            };
        }

        self.state.consume(tokens);
        trace!(consumed = tokens, remaining = available - tokens, "tokens consumed");
        ConsumptionProbe {
            consumed: true,
            remaining_tokens: available - tokens,
            nanos_to_wait_for_refill: Some(0),
        }
    }

    /// Tokens that could be consumed right now.
    pub fn available_tokens(&mut self) -> u64 {
        self.refill().1
    }

    /// Grant `tokens` to every bandwidth, up to capacity.
    pub fn add_tokens(&mut self, tokens: u64) {
        self.refill();
        self.state.add_tokens(self.configuration.bandwidths(), tokens);
        debug!(added = tokens, available = self.state.available_tokens(), "tokens added");
    }

    /// Time until `tokens` can be consumed, or `None` if never.
    pub fn delay_until_possible(&mut self, tokens: u64) -> Option<Duration> {
        let (now, _) = self.refill();
        self.state
            .delay_nanos_until_possible(self.configuration.bandwidths(), tokens, now)
            .map(Duration::from_nanos)
    }

    /// Detached copy of the current state.
    pub fn snapshot(&self) -> BucketState {
        self.state.copy()
    }

    /// Replace the current state with a snapshot taken from this bucket.
    pub fn replace_state(&mut self, snapshot: &BucketState) {
        self.state.copy_state_from(snapshot);
    }

    /// Recreate the initial state at the meter's current reading.
    pub fn reset(&mut self) {
        self.state =
            BucketState::create_initial_state(&self.configuration, self.meter.current_time_nanos());
    }

    /// Bucket configuration.
    pub fn configuration(&self) -> &BucketConfiguration {
        &self.configuration
    }

    /// Current state, as of the last operation.
    pub fn state(&self) -> &BucketState {
        &self.state
    }
}
