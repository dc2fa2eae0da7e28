//! Bucket definitions for Tokenwell.
//!
//! Buckets are declared in a `tokenwell.yaml` file and turned into
//! [`tokenwell_bucket::BucketConfiguration`] values by [`ConfigLoader`].

pub mod duration;
pub mod loader;
pub mod types;

pub use duration::{format_duration, parse_duration};
pub use loader::*;
pub use types::*;
