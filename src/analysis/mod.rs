//! Derived-metric computations.
//!
//! Everything here is pure: the aggregator feeds fetched series in and
//! publishes whatever comes out.

pub mod metrics;

pub use metrics::*;
