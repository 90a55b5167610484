//! Indicator aggregation and the refresh cycle.
//!
//! The aggregator owns everything derived from upstream data and publishes
//! immutable snapshots by replacement through a watch channel.

pub mod assemble;
pub mod cycle;
pub mod indicator;

use crate::config::{Config, SeriesConfig, WorkforceConfig};
use crate::models::YearIndex;
use anyhow::{Context, Result};
use std::time::Duration;

pub use cycle::CycleToken;
pub use indicator::IndicatorAggregator;

/// Settings the aggregator needs, resolved from [`Config`].
#[derive(Debug, Clone)]
pub struct AggregatorSettings {
    pub years: YearIndex,
    pub series: Vec<SeriesConfig>,
    pub workforce: WorkforceConfig,
    pub inter_request_delay: Duration,
    pub refresh_interval: Duration,
}

impl AggregatorSettings {
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let years = config.year_index().context("invalid year range")?;

        Ok(Self {
            years,
            series: config.series.clone(),
            workforce: config.workforce.clone(),
            inter_request_delay: config.refresh.inter_request_delay(),
            refresh_interval: config.refresh.refresh_interval(),
        })
    }

    /// Number of upstream requests one successful cycle makes, retries excluded.
    pub fn request_count(&self) -> usize {
        self.series.len() + 2
    }
}
