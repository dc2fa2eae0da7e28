//! Integer-exact token bucket accounting.
//!
//! A bucket enforces one or more [`Bandwidth`]s at once. Each bandwidth is a
//! capacity plus a [`RefillPolicy`] that regenerates tokens either smoothly
//! or in fixed-interval bursts. [`BucketState`] holds the per-bandwidth
//! counters and implements refill, consumption, top-up and wait estimation
//! against clock readings supplied by the caller.
//!
//! ```
//! use std::time::Duration;
//! use tokenwell_bucket::{Bandwidth, BucketConfiguration, BucketState, RefillPolicy};
//!
//! let refill = RefillPolicy::smooth(10, Duration::from_secs(1))?;
//! let bandwidths = vec![Bandwidth::new(10, refill)?];
//! let config = BucketConfiguration::new(bandwidths)?;
//!
//! let mut state = BucketState::create_initial_state(&config, 0);
//! state.consume(10);
//! assert_eq!(state.refill_all_bandwidth(config.bandwidths(), 100_000_000), 1);
//! # Ok::<(), tokenwell_bucket::ConfigurationError>(())
//! ```

#![warn(missing_docs)]

pub mod bandwidth;
pub mod configuration;
pub mod error;
pub mod local;
pub mod refill;
pub mod state;

pub use bandwidth::Bandwidth;
pub use configuration::BucketConfiguration;
pub use error::{ConfigurationError, ConfigurationResult};
pub use local::{ConsumptionProbe, LocalBucket};
pub use refill::{RefillDiscipline, RefillPolicy};
pub use state::{BandwidthState, BucketState};
