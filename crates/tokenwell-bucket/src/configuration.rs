//! Bucket configuration: ordered bandwidths and their initial tokens.

use crate::bandwidth::Bandwidth;
use crate::error::{ConfigurationError, ConfigurationResult};

/// Immutable description of a bucket.
///
/// Bandwidths are evaluated symmetrically; their order only matters for
/// reporting. A bandwidth without explicit initial tokens starts full.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketConfiguration {
    bandwidths: Vec<Bandwidth>,
    initial_tokens: Vec<Option<u64>>,
}

impl BucketConfiguration {
    /// Create a configuration where every bandwidth starts full.
    pub fn new(bandwidths: Vec<Bandwidth>) -> ConfigurationResult<Self> {
        if bandwidths.is_empty() {
            return Err(ConfigurationError::EmptyBandwidths);
        }
        let initial_tokens = vec![None; bandwidths.len()];
        Ok(Self {
            bandwidths,
            initial_tokens,
        })
    }

    /// Start bandwidth `index` with `tokens` instead of its capacity.
    pub fn with_initial_tokens(mut self, index: usize, tokens: u64) -> ConfigurationResult<Self> {
        let len = self.bandwidths.len();
        let bandwidth = self
            .bandwidths
            .get(index)
            .ok_or(ConfigurationError::BandwidthIndexOutOfRange { index, len })?;

        if tokens > bandwidth.capacity() {
            return Err(ConfigurationError::InitialTokensExceedCapacity {
                index,
                initial_tokens: tokens,
                capacity: bandwidth.capacity(),
            });
        }

        self.initial_tokens[index] = Some(tokens);
        Ok(self)
    }

    /// Configured bandwidths, in declaration order.
    pub fn bandwidths(&self) -> &[Bandwidth] {
        &self.bandwidths
    }

    /// Explicit initial tokens per bandwidth.
    pub fn initial_tokens(&self) -> &[Option<u64>] {
        &self.initial_tokens
    }

    /// Tokens bandwidth `index` holds when a state is created.
    pub(crate) fn resolved_initial_tokens(&self, index: usize) -> u64 {
        self.initial_tokens[index].unwrap_or(self.bandwidths[index].capacity())
    }
}
