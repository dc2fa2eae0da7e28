//! Serde types for `tokenwell.yaml`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tokenwell_bucket::{Bandwidth, BucketConfiguration, ConfigurationResult, RefillPolicy};

use crate::duration::serde_duration;

/// Root of a Tokenwell configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenwellConfig {
    /// Bucket definitions keyed by name.
    pub buckets: BTreeMap<String, BucketSpec>,
}

impl TokenwellConfig {
    /// Look up a bucket definition by name.
    pub fn bucket(&self, name: &str) -> Option<&BucketSpec> {
        self.buckets.get(name)
    }
}

/// One named bucket: its bandwidths in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketSpec {
    pub bandwidths: Vec<BandwidthSpec>,
}

impl BucketSpec {
    /// Build the validated bucket configuration.
    pub fn to_configuration(&self) -> ConfigurationResult<BucketConfiguration> {
        let bandwidths = self
            .bandwidths
            .iter()
            .map(BandwidthSpec::to_bandwidth)
            .collect::<ConfigurationResult<Vec<_>>>()?;

        let mut configuration = BucketConfiguration::new(bandwidths)?;
        for (index, spec) in self.bandwidths.iter().enumerate() {
            if let Some(tokens) = spec.initial_tokens {
                configuration = configuration.with_initial_tokens(index, tokens)?;
            }
        }
        Ok(configuration)
    }
}

/// A single bandwidth limit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandwidthSpec {
    pub capacity: u64,
    /// Tokens at creation; omitted means a full bucket.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_tokens: Option<u64>,
    pub refill: RefillSpec,
}

impl BandwidthSpec {
    fn to_bandwidth(&self) -> ConfigurationResult<Bandwidth> {
        Bandwidth::new(self.capacity, self.refill.to_policy()?)
    }
}

/// Refill policy as written in YAML, tagged by `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RefillSpec {
    /// Tokens accrue continuously.
    Smooth {
        tokens: u64,
        #[serde(with = "serde_duration")]
        period: Duration,
    },
    /// Whole batches of tokens at period boundaries.
    FixedInterval {
        tokens: u64,
        #[serde(with = "serde_duration")]
        period: Duration,
        /// Wall-clock instant of the first batch.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        first_refill: Option<DateTime<Utc>>,
    },
}

impl RefillSpec {
    /// Build the validated refill policy.
    pub fn to_policy(&self) -> ConfigurationResult<RefillPolicy> {
        match *self {
            RefillSpec::Smooth { tokens, period } => RefillPolicy::smooth(tokens, period),
            RefillSpec::FixedInterval {
                tokens,
                period,
                first_refill: None,
            } => RefillPolicy::fixed_interval(tokens, period),
            RefillSpec::FixedInterval {
                tokens,
                period,
                first_refill: Some(anchor),
            } => RefillPolicy::fixed_interval_aligned(tokens, period, anchor),
        }
    }
}
