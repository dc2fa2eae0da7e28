//! Bandwidth: a capacity paired with a refill policy.

use std::fmt;

use crate::error::{ConfigurationError, ConfigurationResult};
use crate::refill::RefillPolicy;

/// One limit enforced by a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bandwidth {
    capacity: u64,
    refill: RefillPolicy,
}

impl Bandwidth {
    /// Create a bandwidth holding at most `capacity` tokens.
    pub fn new(capacity: u64, refill: RefillPolicy) -> ConfigurationResult<Self> {
        if capacity == 0 {
            return Err(ConfigurationError::NonPositiveCapacity { capacity });
        }
        Ok(Self { capacity, refill })
    }

    /// Maximum number of tokens.
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Regeneration policy.
    pub fn refill(&self) -> &RefillPolicy {
        &self.refill
    }
}

impl fmt::Display for Bandwidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "capacity {}, {}", self.capacity, self.refill)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_zero_capacity_rejected() {
        let refill = RefillPolicy::smooth(1, Duration::from_secs(1)).unwrap();
        let err = Bandwidth::new(0, refill).unwrap_err();
        assert_eq!(err, ConfigurationError::NonPositiveCapacity { capacity: 0 });
    }

    #[test]
    fn test_display() {
        let refill = RefillPolicy::smooth(1, Duration::from_nanos(5)).unwrap();
        let bandwidth = Bandwidth::new(3, refill).unwrap();
        assert_eq!(bandwidth.to_string(), "capacity 3, smooth 1 tokens per 5ns");
    }
}
