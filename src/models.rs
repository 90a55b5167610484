//! Data models for the indicator pipeline.
//!
//! This module contains the core data structures shared by the fetcher,
//! the metric derivations, the aggregator and the report generators.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Consecutive, inclusive range of years that every aligned sequence is keyed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearIndex {
    start: i32,
    end: i32,
}

impl YearIndex {
    /// Create a year index covering `start..=end`.
    ///
    /// Returns `None` when `start > end`.
    pub fn new(start: i32, end: i32) -> Option<Self> {
        if start > end {
            return None;
        }
        Some(Self { start, end })
    }

    pub fn start(&self) -> i32 {
        self.start
    }

    pub fn end(&self) -> i32 {
        self.end
    }

    /// Number of slots, always `end - start + 1`.
    pub fn len(&self) -> usize {
        (i64::from(self.end) - i64::from(self.start) + 1) as usize
    }

    /// Iterate the years in ascending order.
    pub fn years(&self) -> impl Iterator<Item = i32> {
        self.start..=self.end
    }
}

impl fmt::Display for YearIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start, self.end)
    }
}

/// Identifies one upstream time series.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeriesKey {
    /// Country or aggregate-region code (e.g. `SSF`, `WLD`).
    pub region: String,
    /// Indicator code (e.g. `SP.POP.TOTL`).
    pub indicator: String,
}

impl SeriesKey {
    pub fn new(region: impl Into<String>, indicator: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            indicator: indicator.into(),
        }
    }
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.region, self.indicator)
    }
}

/// One (year, value) pair of a series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObservationPoint {
    pub year: i32,
    /// `None` when the upstream has no data for the year.
    pub value: Option<f64>,
}

/// Year-ordered observations for a single region/indicator pair.
///
/// Holds at most one point per year; when built from duplicates the last one wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Series {
    points: Vec<ObservationPoint>,
}

impl Series {
    /// Build a series from points in any order.
    pub fn from_points(points: impl IntoIterator<Item = ObservationPoint>) -> Self {
        let mut points: Vec<ObservationPoint> = points.into_iter().collect();
        // Stable sort keeps arrival order within a year, so dedup can keep the last.
        points.sort_by_key(|p| p.year);
        let mut deduped: Vec<ObservationPoint> = Vec::with_capacity(points.len());
        for point in points {
            match deduped.last_mut() {
                Some(last) if last.year == point.year => *last = point,
                _ => deduped.push(point),
            }
        }
        Self { points: deduped }
    }

    #[cfg(test)]
    pub fn points(&self) -> &[ObservationPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Value recorded for `year`, if any.
    pub fn value(&self, year: i32) -> Option<f64> {
        self.points
            .binary_search_by_key(&year, |p| p.year)
            .ok()
            .and_then(|i| self.points[i].value)
    }

    /// Most recent point that carries a value.
    pub fn latest(&self) -> Option<(i32, f64)> {
        self.points
            .iter()
            .rev()
            .find_map(|p| p.value.map(|v| (p.year, v)))
    }
}

/// One labelled sequence positionally aligned to a [`YearIndex`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignedSeries {
    pub label: String,
    pub key: SeriesKey,
    pub values: Vec<Option<f64>>,
}

/// Aligned sequences in configuration order, ready for charting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlignedDataset {
    pub series: Vec<AlignedSeries>,
}

impl AlignedDataset {
    #[cfg(test)]
    pub fn get(&self, label: &str) -> Option<&AlignedSeries> {
        self.series.iter().find(|s| s.label == label)
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

/// A derived value for a single year.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct YearValue {
    pub year: i32,
    pub value: Option<f64>,
}

/// Compound annual growth rate of one labelled series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthRate {
    pub label: String,
    pub from_year: i32,
    pub to_year: i32,
    /// Percent per year; `None` when either boundary value is missing.
    pub cagr: Option<f64>,
}

/// Most recent available value of one labelled series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatestValue {
    pub label: String,
    pub year: i32,
    pub value: f64,
}

/// Metrics computed from two or more series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivedMetrics {
    pub growth: Vec<GrowthRate>,
    /// Working-age share of the numerator region within the denominator region, in percent.
    pub workforce_share: Vec<YearValue>,
    /// Last year with a present share value.
    pub latest_share: Option<YearValue>,
    /// Share at the end year of the index.
    pub target_share: Option<YearValue>,
    pub latest_values: Vec<LatestValue>,
}

impl DerivedMetrics {
    pub fn growth_for(&self, label: &str) -> Option<&GrowthRate> {
        self.growth.iter().find(|g| g.label == label)
    }
}

/// Status of the most recent refresh attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "message", rename_all = "lowercase")]
pub enum RefreshStatus {
    Loading,
    Ready,
    Error(String),
}

impl fmt::Display for RefreshStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefreshStatus::Loading => write!(f, "loading"),
            RefreshStatus::Ready => write!(f, "ready"),
            RefreshStatus::Error(msg) => write!(f, "error: {}", msg),
        }
    }
}

/// Read-only view published to consumers after every state change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub year_index: YearIndex,
    pub aligned: AlignedDataset,
    pub derived: DerivedMetrics,
    pub status: RefreshStatus,
    /// Completion time of the last finished cycle.
    pub last_updated: Option<DateTime<Utc>>,
}

impl Snapshot {
    /// Initial snapshot before any data has been fetched.
    pub fn empty(year_index: YearIndex) -> Self {
        Self {
            year_index,
            aligned: AlignedDataset::default(),
            derived: DerivedMetrics::default(),
            status: RefreshStatus::Loading,
            last_updated: None,
        }
    }

    /// Copy of this snapshot carrying a different status.
    pub fn with_status(&self, status: RefreshStatus) -> Self {
        Self {
            status,
            ..self.clone()
        }
    }

    pub fn has_data(&self) -> bool {
        !self.aligned.is_empty()
    }
}
