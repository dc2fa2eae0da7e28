//! Mutable per-bandwidth token accounting.
//!
//! All arithmetic is integer-only. Smooth refill keeps the fractional
//! remainder of every division in a carry term, so refilling in many small
//! steps grants exactly as many tokens as one large step over the same time.
//! Fixed-interval refill instead keeps its refill marker on period
//! boundaries, counted from the configured anchor, and only moves it forward
//! by whole periods.

use std::fmt;
use tracing::trace;

use crate::bandwidth::Bandwidth;
use crate::configuration::BucketConfiguration;
use crate::refill::RefillDiscipline;

/// Accounting record for one bandwidth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BandwidthState {
    current_size: u64,
    last_refill_nanos: i64,
    carry: u64,
}

impl BandwidthState {
    /// Tokens available now.
    pub fn current_size(&self) -> u64 {
        self.current_size
    }

    /// Refill marker.
    ///
    /// For smooth refill this is the clock reading of the last refill. For
    /// fixed-interval refill it is the latest period boundary already
    /// credited, which is ahead of the clock while the first burst is still
    /// to come.
    pub fn last_refill_nanos(&self) -> i64 {
        self.last_refill_nanos
    }

    /// Fraction of a token accrued but not yet granted, as `tokens * nanos`
    /// modulo the period. Always below the period, and always zero for
    /// fixed-interval refill.
    pub fn carry(&self) -> u64 {
        self.carry
    }

    fn saturate(&mut self, capacity: u64) {
        self.current_size = capacity;
        self.carry = 0;
    }

    fn refill(&mut self, bandwidth: &Bandwidth, now: i64) {
        if now <= self.last_refill_nanos {
            return;
        }

        let refill = bandwidth.refill();
        let elapsed = (i128::from(now) - i128::from(self.last_refill_nanos)) as u128;
        let period = u128::from(refill.period_nanos());
        let tokens = u128::from(refill.tokens_per_period());

        let granted = match refill.discipline() {
            RefillDiscipline::Smooth => {
                let numerator = tokens * elapsed + u128::from(self.carry);
                self.last_refill_nanos = now;
                // remainder < period <= i64::MAX
                self.carry = (numerator % period) as u64;
                numerator / period
            }
            RefillDiscipline::FixedInterval { .. } => {
                let periods = elapsed / period;
                // marker + periods * period <= now
                self.last_refill_nanos =
                    (i128::from(self.last_refill_nanos) + (periods * period) as i128) as i64;
                periods.saturating_mul(tokens)
            }
        };

        let capacity = bandwidth.capacity();
        let headroom = u128::from(capacity.saturating_sub(self.current_size));
        if granted >= headroom {
            if headroom > 0 {
                trace!(capacity, granted = %granted, "bandwidth refilled to capacity");
            }
            self.saturate(capacity);
        } else {
            // granted < headroom <= u64::MAX
            self.current_size += granted as u64;
        }
    }

    fn add_tokens(&mut self, bandwidth: &Bandwidth, tokens: u64) {
        let new_size = self.current_size.saturating_add(tokens);
        if new_size >= bandwidth.capacity() {
            self.saturate(bandwidth.capacity());
        } else {
            self.current_size = new_size;
        }
    }

    fn delay_nanos_until_possible(&self, bandwidth: &Bandwidth, tokens: u64, now: i64) -> Option<u64> {
        if tokens <= self.current_size {
            return Some(0);
        }
        if tokens > bandwidth.capacity() {
            return None;
        }

        let refill = bandwidth.refill();
        let deficit = u128::from(tokens - self.current_size);
        let period = u128::from(refill.period_nanos());
        let per_period = u128::from(refill.tokens_per_period());
        let carry = u128::from(self.carry);

        let after_marker = match refill.discipline() {
            // carry < period <= deficit * period, so the numerator stays positive
            RefillDiscipline::Smooth => (deficit * period - carry).div_ceil(per_period),
            RefillDiscipline::FixedInterval { .. } => deficit.div_ceil(per_period) * period,
        };

        // after_marker < 2^127 - 2^64 and the marker offset is within +-2^64
        let ready = after_marker as i128 + i128::from(self.last_refill_nanos) - i128::from(now);
        u64::try_from(ready.max(0)).ok()
    }
}

/// Token accounting for every bandwidth of one rate-limited subject.
///
/// The state does not own its configuration: callers pass the bandwidths
/// of the [`BucketConfiguration`] the state was created from. It performs no
/// synchronization. Concurrent users either keep one owner per subject or
/// mutate a [`copy`](Self::copy) and publish it with compare-and-swap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketState {
    bandwidths: Vec<BandwidthState>,
}

impl BucketState {
    /// Create the state of a new bucket at clock reading `now`.
    ///
    /// Bandwidths start with their explicit initial tokens, or full. Smooth
    /// bandwidths start refilling from `now`; fixed-interval bandwidths
    /// release their first burst one period after `now`, or at the
    /// configured anchor.
    pub fn create_initial_state(configuration: &BucketConfiguration, now: i64) -> Self {
        let bandwidths = configuration
            .bandwidths()
            .iter()
            .enumerate()
            .map(|(index, bandwidth)| BandwidthState {
                current_size: configuration.resolved_initial_tokens(index),
                last_refill_nanos: bandwidth.refill().initial_refill_nanos(now),
                carry: 0,
            })
            .collect();

        Self { bandwidths }
    }

    /// Independent value copy of this state.
    pub fn copy(&self) -> Self {
        self.clone()
    }

    /// Overwrite this state with `source`, which must have the same shape.
    pub fn copy_state_from(&mut self, source: &BucketState) {
        debug_assert_eq!(self.bandwidths.len(), source.bandwidths.len());
        self.bandwidths.clone_from(&source.bandwidths);
    }

    /// Refill a single bandwidth up to clock reading `now`.
    ///
    /// Readings not after the last refill leave the bandwidth untouched.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not a bandwidth of this state.
    pub fn refill(&mut self, index: usize, bandwidth: &Bandwidth, now: i64) {
        self.bandwidths[index].refill(bandwidth, now);
    }

    /// Refill every bandwidth against the same clock reading and return the
    /// number of tokens that can be consumed now.
    ///
    /// That is the minimum across bandwidths, since a consumption must be
    /// allowed by all of them.
    pub fn refill_all_bandwidth(&mut self, bandwidths: &[Bandwidth], now: i64) -> u64 {
        debug_assert_eq!(self.bandwidths.len(), bandwidths.len());
        for (state, bandwidth) in self.bandwidths.iter_mut().zip(bandwidths) {
            state.refill(bandwidth, now);
        }
        self.available_tokens()
    }

    /// Tokens that can be consumed without refilling first.
    pub fn available_tokens(&self) -> u64 {
        self.bandwidths
            .iter()
            .map(BandwidthState::current_size)
            .min()
            .unwrap_or(0)
    }

    /// Remove `tokens` from every bandwidth.
    ///
    /// No sufficiency check is made: callers must have seen at least
    /// `tokens` available via [`refill_all_bandwidth`](Self::refill_all_bandwidth)
    /// or a zero [`delay_nanos_until_possible`](Self::delay_nanos_until_possible).
    pub fn consume(&mut self, tokens: u64) {
        for state in &mut self.bandwidths {
            debug_assert!(
                tokens <= state.current_size,
                "consuming {} tokens with only {} available",
                tokens,
                state.current_size
            );
            state.current_size = state.current_size.saturating_sub(tokens);
        }
    }

    /// Grant `tokens` to every bandwidth outside the refill schedule, up to
    /// each capacity.
    pub fn add_tokens(&mut self, bandwidths: &[Bandwidth], tokens: u64) {
        debug_assert_eq!(self.bandwidths.len(), bandwidths.len());
        for (state, bandwidth) in self.bandwidths.iter_mut().zip(bandwidths) {
            state.add_tokens(bandwidth, tokens);
        }
    }

    /// Nanoseconds after clock reading `now` until `tokens` can be consumed
    /// from every bandwidth.
    ///
    /// The state must already be refilled at `now`; otherwise tokens that
    /// have accrued since the last refill are not counted and the estimate
    /// is too long. A fixed-interval marker still ahead of `now`, such as an
    /// anchor that has not arrived yet, is included in the wait.
    ///
    /// Returns `None` when `tokens` exceeds the capacity of some bandwidth,
    /// because such a request can never succeed.
    pub fn delay_nanos_until_possible(
        &self,
        bandwidths: &[Bandwidth],
        tokens: u64,
        now: i64,
    ) -> Option<u64> {
        debug_assert_eq!(self.bandwidths.len(), bandwidths.len());
        let mut delay = 0;
        for (state, bandwidth) in self.bandwidths.iter().zip(bandwidths) {
            delay = delay.max(state.delay_nanos_until_possible(bandwidth, tokens, now)?);
        }
        Some(delay)
    }

    /// Per-bandwidth records, in configuration order.
    pub fn bandwidth_states(&self) -> &[BandwidthState] {
        &self.bandwidths
    }
}

impl fmt::Display for BucketState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BucketState[")?;
        for (index, state) in self.bandwidths.iter().enumerate() {
            if index > 0 {
                write!(f, ", ")?;
            }
            write!(
                f,
                "{{size={}, last_refill={}ns, carry={}}}",
                state.current_size, state.last_refill_nanos, state.carry
            )?;
        }
        write!(f, "]")
    }
}
