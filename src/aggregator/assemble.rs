//! Turns fetched series into a publishable snapshot.

use super::AggregatorSettings;
use crate::analysis::{
    build_aligned_dataset, compute_workforce_share, growth_over, latest_share, latest_value,
    share_at,
};
use crate::config::SeriesConfig;
use crate::models::{
    AlignedDataset, AlignedSeries, DerivedMetrics, RefreshStatus, Series, SeriesKey, Snapshot,
};
use chrono::Utc;

/// Series fetched by one cycle.
#[derive(Debug, Clone, Default)]
pub struct FetchedSeries {
    /// Labelled series in configuration order.
    pub labelled: Vec<(SeriesConfig, Series)>,
    pub working_age_numerator: Series,
    pub working_age_denominator: Series,
}

impl FetchedSeries {
    fn aligned_values(&self, settings: &AggregatorSettings, key: &SeriesKey) -> Vec<Option<f64>> {
        self.labelled
            .iter()
            .find(|(entry, _)| &entry.key() == key)
            .map(|(_, series)| build_aligned_dataset(series, &settings.years))
            .unwrap_or_else(|| vec![None; settings.years.len()])
    }
}

/// Build the ready snapshot for a completed cycle.
pub fn assemble_snapshot(settings: &AggregatorSettings, fetched: &FetchedSeries) -> Snapshot {
    let years = &settings.years;

    let aligned = AlignedDataset {
        series: fetched
            .labelled
            .iter()
            .map(|(entry, series)| AlignedSeries {
                label: entry.label.clone(),
                key: entry.key(),
                values: build_aligned_dataset(series, years),
            })
            .collect(),
    };

    let growth = fetched
        .labelled
        .iter()
        .map(|(entry, series)| growth_over(&entry.label, series, years))
        .collect();

    let latest_values = fetched
        .labelled
        .iter()
        .filter_map(|(entry, series)| latest_value(&entry.label, series))
        .collect();

    let workforce = &settings.workforce;
    let workforce_share = compute_workforce_share(
        &fetched.aligned_values(settings, &workforce.numerator_population()),
        &fetched.aligned_values(settings, &workforce.denominator_population()),
        &build_aligned_dataset(&fetched.working_age_numerator, years),
        &build_aligned_dataset(&fetched.working_age_denominator, years),
        years,
    );

    let derived = DerivedMetrics {
        growth,
        latest_share: latest_share(&workforce_share),
        target_share: share_at(&workforce_share, years.end()),
        workforce_share,
        latest_values,
    };

    Snapshot {
        year_index: *years,
        aligned,
        derived,
        status: RefreshStatus::Ready,
        last_updated: Some(Utc::now()),
    }
}
