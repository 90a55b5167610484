//! Series alignment, growth rates and workforce share.

use crate::models::{GrowthRate, LatestValue, Series, YearIndex, YearValue};

/// Align a series to `years`: one slot per year, `None` where the series has no value.
///
/// Exact-year lookup only; gaps are never filled.
pub fn build_aligned_dataset(series: &Series, years: &YearIndex) -> Vec<Option<f64>> {
    years.years().map(|year| series.value(year)).collect()
}

/// Share of region A's working-age population within region B's, in percent, per year.
///
/// All four inputs are aligned to `years`. A year is `None` when any input is
/// missing or region B's working-age population is zero.
pub fn compute_workforce_share(
    pop_a: &[Option<f64>],
    pop_b: &[Option<f64>],
    pct_a: &[Option<f64>],
    pct_b: &[Option<f64>],
    years: &YearIndex,
) -> Vec<YearValue> {
    let at = |values: &[Option<f64>], i: usize| values.get(i).copied().flatten();

    years
        .years()
        .enumerate()
        .map(|(i, year)| {
            let value = match (at(pop_a, i), at(pop_b, i), at(pct_a, i), at(pct_b, i)) {
                (Some(pa), Some(pb), Some(ca), Some(cb)) => {
                    let working_a = pa * (ca / 100.0);
                    let working_b = pb * (cb / 100.0);
                    if working_b == 0.0 {
                        None
                    } else {
                        Some(working_a / working_b * 100.0)
                    }
                }
                _ => None,
            };
            YearValue { year, value }
        })
        .collect()
}

/// Compound annual growth rate between `y0` and `y1`, in percent per year.
///
/// `None` when either boundary value is missing, the start value is zero, or
/// `y1 <= y0`. Negative values are not checked and can produce NaN.
pub fn compute_cagr(series: &Series, y0: i32, y1: i32) -> Option<f64> {
    if y1 <= y0 {
        return None;
    }
    let a = series.value(y0)?;
    let b = series.value(y1)?;
    if a == 0.0 {
        return None;
    }
    let span = f64::from(y1 - y0);
    Some(((b / a).powf(1.0 / span) - 1.0) * 100.0)
}

/// Growth rate of a labelled series over the full index.
pub fn growth_over(label: &str, series: &Series, years: &YearIndex) -> GrowthRate {
    GrowthRate {
        label: label.to_string(),
        from_year: years.start(),
        to_year: years.end(),
        cagr: compute_cagr(series, years.start(), years.end()),
    }
}

/// Most recent year that has a share value.
pub fn latest_share(share: &[YearValue]) -> Option<YearValue> {
    share.iter().rev().find(|p| p.value.is_some()).copied()
}

/// Share entry for a given year, present or not.
pub fn share_at(share: &[YearValue], year: i32) -> Option<YearValue> {
    share.iter().find(|p| p.year == year).copied()
}

/// Latest available value of a labelled series.
pub fn latest_value(label: &str, series: &Series) -> Option<LatestValue> {
    series.latest().map(|(year, value)| LatestValue {
        label: label.to_string(),
        year,
        value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ObservationPoint;

    fn series(points: &[(i32, f64)]) -> Series {
        Series::from_points(points.iter().map(|&(year, value)| ObservationPoint {
            year,
            value: Some(value),
        }))
    }

    fn full_index() -> YearIndex {
        YearIndex::new(1990, 2050).unwrap()
    }

    #[test]
    fn test_aligned_length_matches_index() {
        let s = series(&[(1995, 1.0), (2000, 2.0)]);
        for (start, end) in [(1990, 2050), (2000, 2000), (1960, 1970)] {
            let index = YearIndex::new(start, end).unwrap();
            let aligned = build_aligned_dataset(&s, &index);
            assert_eq!(aligned.len(), (end - start + 1) as usize);
        }
    }

    #[test]
    fn test_aligned_exact_year_lookup_without_fill() {
        let s = series(&[(1990, 10.0), (1992, 30.0)]);
        let index = YearIndex::new(1990, 1993).unwrap();
        assert_eq!(
            build_aligned_dataset(&s, &index),
            vec![Some(10.0), None, Some(30.0), None]
        );
    }

    #[test]
    fn test_aligned_is_idempotent() {
        let s = series(&[(1990, 10.0), (2020, 30.0), (2050, 40.0)]);
        let index = full_index();
        assert_eq!(
            build_aligned_dataset(&s, &index),
            build_aligned_dataset(&s, &index)
        );
    }

    #[test]
    fn test_workforce_share_formula() {
        let index = YearIndex::new(2000, 2000).unwrap();
        let share = compute_workforce_share(
            &[Some(1_000.0)],
            &[Some(8_000.0)],
            &[Some(50.0)],
            &[Some(62.5)],
            &index,
        );
        // (1000 * 0.5) / (8000 * 0.625) * 100 = 10
        let value = share[0].value.unwrap();
        assert!((value - 10.0).abs() < 1e-9);
        assert_eq!(share[0].year, 2000);
    }

    #[test]
    fn test_workforce_share_absent_when_any_input_absent() {
        let index = YearIndex::new(2000, 2004).unwrap();
        let full = vec![Some(100.0); 5];
        let mut pop_a = full.clone();
        let mut pop_b = full.clone();
        let mut pct_a = full.clone();
        let mut pct_b = full.clone();
        pop_a[0] = None;
        pop_b[1] = None;
        pct_a[2] = None;
        pct_b[3] = None;

        let share = compute_workforce_share(&pop_a, &pop_b, &pct_a, &pct_b, &index);

        assert_eq!(share.len(), 5);
        for point in &share[..4] {
            assert!(point.value.is_none(), "year {} should be absent", point.year);
        }
        assert_eq!(share[4].value, Some(100.0));
    }

    #[test]
    fn test_workforce_share_zero_denominator_is_absent() {
        let index = YearIndex::new(2000, 2000).unwrap();
        let share = compute_workforce_share(
            &[Some(1.0)],
            &[Some(0.0)],
            &[Some(50.0)],
            &[Some(50.0)],
            &index,
        );
        assert_eq!(share[0].value, None);
    }

    #[test]
    fn test_workforce_share_short_inputs_are_absent() {
        let index = YearIndex::new(2000, 2002).unwrap();
        let share = compute_workforce_share(
            &[Some(1.0)],
            &[Some(1.0)],
            &[Some(1.0)],
            &[Some(1.0)],
            &index,
        );
        assert_eq!(share.len(), 3);
        assert!(share[0].value.is_some());
        assert!(share[1].value.is_none());
        assert!(share[2].value.is_none());
    }

    #[test]
    fn test_cagr_known_value() {
        let s = series(&[(1990, 100.0), (2050, 800.0)]);
        let cagr = compute_cagr(&s, 1990, 2050).unwrap();
        let expected = (8f64.powf(1.0 / 60.0) - 1.0) * 100.0;
        assert!((cagr - expected).abs() < 1e-12);
        assert!((cagr - 3.53).abs() < 0.01, "got {cagr}");
    }

    #[test]
    fn test_cagr_absent_cases() {
        let s = series(&[(1990, 0.0), (2000, 50.0), (2050, 800.0)]);
        assert_eq!(compute_cagr(&s, 1990, 2050), None, "zero start value");
        assert_eq!(compute_cagr(&s, 1995, 2050), None, "missing start");
        assert_eq!(compute_cagr(&s, 2000, 2049), None, "missing end");
        assert_eq!(compute_cagr(&s, 2050, 2000), None, "inverted range");
    }

    #[test]
    fn test_latest_and_target_share() {
        let share = vec![
            YearValue {
                year: 2022,
                value: Some(15.0),
            },
            YearValue {
                year: 2023,
                value: Some(15.5),
            },
            YearValue {
                year: 2024,
                value: None,
            },
        ];
        assert_eq!(latest_share(&share).map(|p| p.year), Some(2023));
        assert_eq!(share_at(&share, 2024).map(|p| p.value), Some(None));
        assert_eq!(share_at(&share, 2030), None);
        assert_eq!(latest_share(&[]), None);
    }

    #[test]
    fn test_growth_over_full_range() {
        let s = series(&[(1990, 100.0), (2050, 800.0)]);
        let growth = growth_over("World", &s, &full_index());
        assert_eq!(growth.from_year, 1990);
        assert_eq!(growth.to_year, 2050);
        assert!(growth.cagr.unwrap().is_finite());
    }
}
