//! Token regeneration policies.

use chrono::{DateTime, Utc};
use std::fmt;
use std::time::Duration;

use crate::error::{ConfigurationError, ConfigurationResult};

/// How regenerated tokens are released into a bandwidth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefillDiscipline {
    /// Tokens trickle in continuously, proportional to elapsed time.
    ///
    /// "10 tokens per second" adds one token every 100ms rather than
    /// waiting a whole second to release all ten.
    Smooth,
    /// The full token count appears at once, each time a whole period has
    /// elapsed.
    FixedInterval {
        /// Instant of the first burst, in the clock's nanosecond timeline.
        /// `None` means one period after the bucket is created.
        first_refill_anchor: Option<i64>,
    },
}

/// Speed of token regeneration for one bandwidth.
///
/// Policies are immutable values. Construction validates the rate, so every
/// policy in existence has a positive token count and a positive period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefillPolicy {
    tokens: u64,
    period_nanos: u64,
    nanos_per_token: u64,
    discipline: RefillDiscipline,
    wall_clock_anchor: bool,
}

impl RefillPolicy {
    fn new(tokens: u64, period: Duration, discipline: RefillDiscipline) -> ConfigurationResult<Self> {
        if tokens == 0 {
            return Err(ConfigurationError::NonPositiveTokens { tokens });
        }

        let period_nanos = period.as_nanos();
        if period_nanos == 0 || period_nanos > i64::MAX as u128 {
            return Err(ConfigurationError::InvalidPeriod { period_nanos });
        }
        let period_nanos = period_nanos as u64;

        Ok(Self {
            tokens,
            period_nanos,
            nanos_per_token: period_nanos.div_ceil(tokens),
            discipline,
            wall_clock_anchor: false,
        })
    }

    /// Regenerate `tokens` per `period` as soon as possible.
    ///
    /// `smooth(600, 1 minute)`, `smooth(10, 1 second)` and
    /// `smooth(1, 100 milliseconds)` all describe the same rate.
    pub fn smooth(tokens: u64, period: Duration) -> ConfigurationResult<Self> {
        Self::new(tokens, period, RefillDiscipline::Smooth)
    }

    /// Release `tokens` at once every `period`, starting one period after the
    /// bucket is created.
    pub fn fixed_interval(tokens: u64, period: Duration) -> ConfigurationResult<Self> {
        Self::new(
            tokens,
            period,
            RefillDiscipline::FixedInterval {
                first_refill_anchor: None,
            },
        )
    }

    /// Release `tokens` at once every `period`, with the first release at
    /// `anchor_nanos` on the clock's timeline.
    pub fn fixed_interval_anchored(
        tokens: u64,
        period: Duration,
        anchor_nanos: i64,
    ) -> ConfigurationResult<Self> {
        Self::new(
            tokens,
            period,
            RefillDiscipline::FixedInterval {
                first_refill_anchor: Some(anchor_nanos),
            },
        )
    }

    /// Like [`fixed_interval_anchored`](Self::fixed_interval_anchored), with
    /// the anchor given as a wall-clock instant.
    ///
    /// The anchor is in epoch nanoseconds, so buckets using this policy need
    /// a wall-clock time meter.
    pub fn fixed_interval_aligned(
        tokens: u64,
        period: Duration,
        first_refill: DateTime<Utc>,
    ) -> ConfigurationResult<Self> {
        let anchor_nanos = tokenwell_common_core::nanos_of_datetime(first_refill)?;
        let policy = Self::fixed_interval_anchored(tokens, period, anchor_nanos)?;
        Ok(Self {
            wall_clock_anchor: true,
            ..policy
        })
    }

    /// Tokens granted per period.
    pub fn tokens_per_period(&self) -> u64 {
        self.tokens
    }

    /// Length of one period in nanoseconds.
    pub fn period_nanos(&self) -> u64 {
        self.period_nanos
    }

    /// Rounded-up time needed to regenerate a single token.
    ///
    /// Diagnostic only; refill arithmetic works on exact fractions.
    pub fn nanos_per_token(&self) -> u64 {
        self.nanos_per_token
    }

    /// Release discipline.
    pub fn discipline(&self) -> RefillDiscipline {
        self.discipline
    }

    /// Configured first-burst instant, for anchored fixed-interval policies.
    pub fn first_refill_anchor(&self) -> Option<i64> {
        match self.discipline {
            RefillDiscipline::FixedInterval { first_refill_anchor } => first_refill_anchor,
            RefillDiscipline::Smooth => None,
        }
    }

    /// Whether the anchor is a calendar instant in epoch nanoseconds.
    pub fn has_wall_clock_anchor(&self) -> bool {
        self.wall_clock_anchor
    }

    /// Whether tokens are released in whole-period bursts.
    pub fn is_fixed_interval(&self) -> bool {
        matches!(self.discipline, RefillDiscipline::FixedInterval { .. })
    }

    /// Refill timestamp a fresh bandwidth starts from.
    ///
    /// Fixed-interval bursts happen one period after this marker, so an
    /// explicit anchor is moved back by one period.
    pub(crate) fn initial_refill_nanos(&self, now: i64) -> i64 {
        match self.discipline {
            RefillDiscipline::Smooth => now,
            RefillDiscipline::FixedInterval {
                first_refill_anchor: None,
            } => now,
            RefillDiscipline::FixedInterval {
                first_refill_anchor: Some(anchor),
            } => anchor.saturating_sub(self.period_nanos as i64),
        }
    }
}

impl fmt::Display for RefillPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.discipline {
            RefillDiscipline::Smooth => {
                write!(f, "smooth {} tokens per {}ns", self.tokens, self.period_nanos)
            }
            RefillDiscipline::FixedInterval { first_refill_anchor } => {
                write!(f, "fixed interval {} tokens per {}ns", self.tokens, self.period_nanos)?;
                if let Some(anchor) = first_refill_anchor {
                    write!(f, " from {}ns", anchor)?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_smooth_policy_values() {
        let policy = RefillPolicy::smooth(10, Duration::from_secs(1)).unwrap();

        assert_eq!(policy.tokens_per_period(), 10);
        assert_eq!(policy.period_nanos(), 1_000_000_000);
        assert_eq!(policy.nanos_per_token(), 100_000_000);
        assert_eq!(policy.discipline(), RefillDiscipline::Smooth);
        assert_eq!(policy.first_refill_anchor(), None);
        assert!(!policy.is_fixed_interval());
    }

    #[test]
    fn test_nanos_per_token_rounds_up() {
        let policy = RefillPolicy::smooth(3, Duration::from_nanos(10)).unwrap();
        assert_eq!(policy.nanos_per_token(), 4);

        // Faster than one token per nanosecond still reports one nanosecond.
        let policy = RefillPolicy::smooth(1_000, Duration::from_nanos(10)).unwrap();
        assert_eq!(policy.nanos_per_token(), 1);
    }

    #[test]
    fn test_zero_tokens_rejected() {
        let err = RefillPolicy::smooth(0, Duration::from_secs(1)).unwrap_err();
        assert_eq!(err, ConfigurationError::NonPositiveTokens { tokens: 0 });

        let err = RefillPolicy::fixed_interval(0, Duration::from_secs(1)).unwrap_err();
        assert_eq!(err, ConfigurationError::NonPositiveTokens { tokens: 0 });
    }

    #[test]
    fn test_zero_period_rejected() {
        let err = RefillPolicy::smooth(1, Duration::ZERO).unwrap_err();
        assert_eq!(err, ConfigurationError::InvalidPeriod { period_nanos: 0 });
    }

    #[test]
    fn test_oversized_period_rejected() {
        let err = RefillPolicy::smooth(1, Duration::from_secs(u64::MAX)).unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidPeriod { .. }));
    }

    #[test]
    fn test_anchor_only_on_fixed_interval() {
        let policy =
            RefillPolicy::fixed_interval_anchored(5, Duration::from_secs(60), 1_000).unwrap();
        assert!(policy.is_fixed_interval());
        assert_eq!(policy.first_refill_anchor(), Some(1_000));

        let policy = RefillPolicy::fixed_interval(5, Duration::from_secs(60)).unwrap();
        assert_eq!(policy.first_refill_anchor(), None);
    }

    #[test]
    fn test_aligned_anchor_uses_epoch_nanos() {
        let first = Utc.with_ymd_and_hms(1970, 1, 1, 0, 1, 0).unwrap();
        let policy = RefillPolicy::fixed_interval_aligned(5, Duration::from_secs(60), first).unwrap();
        assert_eq!(policy.first_refill_anchor(), Some(60_000_000_000));
        assert!(policy.has_wall_clock_anchor());

        let plain = RefillPolicy::fixed_interval_anchored(5, Duration::from_secs(60), 60_000_000_000).unwrap();
        assert!(!plain.has_wall_clock_anchor());
    }

    #[test]
    fn test_aligned_anchor_out_of_range() {
        let first = Utc.with_ymd_and_hms(2500, 1, 1, 0, 0, 0).unwrap();
        let err = RefillPolicy::fixed_interval_aligned(5, Duration::from_secs(60), first).unwrap_err();
        assert!(matches!(err, ConfigurationError::AnchorOutOfRange { .. }));
    }

    #[test]
    fn test_initial_refill_nanos() {
        let smooth = RefillPolicy::smooth(1, Duration::from_nanos(100)).unwrap();
        assert_eq!(smooth.initial_refill_nanos(500), 500);

        let unanchored = RefillPolicy::fixed_interval(1, Duration::from_nanos(100)).unwrap();
        assert_eq!(unanchored.initial_refill_nanos(500), 500);

        let anchored =
            RefillPolicy::fixed_interval_anchored(1, Duration::from_nanos(100), 1_000).unwrap();
        assert_eq!(anchored.initial_refill_nanos(500), 900);

        let extreme =
            RefillPolicy::fixed_interval_anchored(1, Duration::from_nanos(100), i64::MIN).unwrap();
        assert_eq!(extreme.initial_refill_nanos(500), i64::MIN);
    }

    #[test]
    fn test_display() {
        let smooth = RefillPolicy::smooth(10, Duration::from_secs(1)).unwrap();
        assert_eq!(smooth.to_string(), "smooth 10 tokens per 1000000000ns");

        let anchored =
            RefillPolicy::fixed_interval_anchored(5, Duration::from_nanos(60), 7).unwrap();
        assert_eq!(anchored.to_string(), "fixed interval 5 tokens per 60ns from 7ns");
    }
}
