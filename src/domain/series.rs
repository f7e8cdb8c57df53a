//! Observation series: alignment, derived columns and the freshness gate.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::domain::dates::is_previous_month;

/// One upstream series as fetched, before alignment.
#[derive(Debug, Clone)]
pub struct RawSeries {
    pub code: String,
    pub points: Vec<(NaiveDate, f64)>,
}

/// Time-indexed values for one indicator. Rows are strictly increasing by
/// date with no duplicates.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationSeries {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<(NaiveDate, Vec<f64>)>,
}

/// Result of fetching and validating a series against its expected reference
/// period.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    Fresh(ObservationSeries),
    /// The source has not yet published the expected period.
    Stale {
        latest: NaiveDate,
        expected: NaiveDate,
    },
    NoData,
}

impl ObservationSeries {
    /// Inner-join the raw series on date. Dates missing from any series are
    /// dropped; duplicate dates within a series keep the last value.
    pub fn align(name: &str, raws: &[RawSeries], columns: &[String]) -> Self {
        let maps: Vec<BTreeMap<NaiveDate, f64>> = raws
            .iter()
            .map(|raw| raw.points.iter().cloned().collect())
            .collect();

        let mut rows = Vec::new();
        if let Some(first) = maps.first() {
            'dates: for (&date, &value) in first {
                let mut values = vec![value];
                for map in &maps[1..] {
                    match map.get(&date) {
                        Some(&v) => values.push(v),
                        None => continue 'dates,
                    }
                }
                rows.push((date, values));
            }
        }

        Self {
            name: name.to_string(),
            columns: columns.to_vec(),
            rows,
        }
    }

    pub fn scale(&mut self, multiplier: f64) {
        if multiplier == 1.0 {
            return;
        }
        for (_, values) in &mut self.rows {
            for v in values {
                *v *= multiplier;
            }
        }
    }

    /// Derive percentage-change columns from level data.
    ///
    /// A column labelled `MoM` becomes the month-over-month change of its
    /// levels; a column labelled `YoY` becomes the trailing-12-month
    /// accumulated change. Leading rows where any derived column is undefined
    /// are dropped.
    pub fn derive_raw_columns(&mut self) {
        let mut derived: Vec<Vec<Option<f64>>> = Vec::with_capacity(self.columns.len());
        for (col_idx, label) in self.columns.iter().enumerate() {
            let levels: Vec<f64> = self.rows.iter().map(|(_, v)| v[col_idx]).collect();
            let column = match label.as_str() {
                "MoM" => (0..levels.len()).map(|i| pct_change(&levels, i)).collect(),
                "YoY" => (0..levels.len())
                    .map(|i| accumulated_12m_change(&levels, i))
                    .collect(),
                _ => levels.into_iter().map(Some).collect(),
            };
            derived.push(column);
        }

        let mut rows = Vec::new();
        for (row_idx, (date, _)) in self.rows.iter().enumerate() {
            let values: Option<Vec<f64>> = derived.iter().map(|col| col[row_idx]).collect();
            if let Some(values) = values {
                rows.push((*date, values));
            }
        }
        self.rows = rows;
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.rows.last().map(|(d, _)| *d)
    }

    pub fn last_values(&self) -> Option<&[f64]> {
        self.rows.last().map(|(_, v)| v.as_slice())
    }

    /// Column values in row order.
    pub fn column(&self, idx: usize) -> Vec<f64> {
        self.rows.iter().map(|(_, v)| v[idx]).collect()
    }

    /// Drop observations for the month right after `expected`. Monthly
    /// sources polled mid-month report partial totals for the month in
    /// progress, which must not mask the month being gated on.
    pub fn drop_month_in_progress(&mut self, expected: NaiveDate) {
        self.rows.retain(|(date, _)| !is_previous_month(expected, *date));
    }

    /// Apply the freshness gate: the latest observation must describe the
    /// expected reference period exactly (date-only comparison).
    pub fn into_outcome(self, expected: NaiveDate) -> FetchOutcome {
        match self.last_date() {
            None => FetchOutcome::NoData,
            Some(latest) if latest == expected => FetchOutcome::Fresh(self),
            Some(latest) => FetchOutcome::Stale { latest, expected },
        }
    }
}

/// Percentage change vs. the previous observation, times 100.
pub fn pct_change(levels: &[f64], idx: usize) -> Option<f64> {
    if idx == 0 || idx >= levels.len() {
        return None;
    }
    let prev = levels[idx - 1];
    if prev == 0.0 {
        return None;
    }
    Some((levels[idx] / prev - 1.0) * 100.0)
}

/// Trailing-12-month accumulated change: sum of the last 12 periods over the
/// sum of the 12 before them, minus one, times 100.
pub fn accumulated_12m_change(levels: &[f64], idx: usize) -> Option<f64> {
    if idx + 1 < 24 || idx >= levels.len() {
        return None;
    }
    let recent: f64 = levels[idx + 1 - 12..=idx].iter().sum();
    let prior: f64 = levels[idx + 1 - 24..idx + 1 - 12].iter().sum();
    if prior == 0.0 {
        return None;
    }
    Some((recent / prior - 1.0) * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 1).unwrap()
    }

    fn raw(code: &str, points: Vec<(NaiveDate, f64)>) -> RawSeries {
        RawSeries {
            code: code.to_string(),
            points,
        }
    }

    /// `n` consecutive months of data starting at 2022-01.
    fn monthly(values: &[f64]) -> Vec<(NaiveDate, f64)> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                let year = 2022 + (i / 12) as i32;
                let month = (i % 12) as u32 + 1;
                (NaiveDate::from_ymd_opt(year, month, 1).unwrap(), v)
            })
            .collect()
    }

    #[test]
    fn align_inner_joins_on_date() {
        let a = raw(
            "100",
            vec![(d(2024, 1), 1.0), (d(2024, 2), 2.0), (d(2024, 3), 3.0)],
        );
        let b = raw("101", vec![(d(2024, 2), 20.0), (d(2024, 3), 30.0)]);
        let series =
            ObservationSeries::align("test", &[a, b], &["MoM".to_string(), "YoY".to_string()]);

        assert_eq!(series.rows.len(), 2);
        assert_eq!(series.rows[0], (d(2024, 2), vec![2.0, 20.0]));
        assert_eq!(series.rows[1], (d(2024, 3), vec![3.0, 30.0]));
    }

    #[test]
    fn align_empty_input_gives_empty_series() {
        let series = ObservationSeries::align("test", &[], &[]);
        assert!(series.rows.is_empty());
    }

    #[test]
    fn scale_applies_multiplier_uniformly() {
        let a = raw("100", vec![(d(2024, 1), 1.5), (d(2024, 2), 2.5)]);
        let mut series = ObservationSeries::align("test", &[a], &["MoM".to_string()]);
        series.scale(1000.0);
        assert_eq!(series.rows[0].1, vec![1500.0]);
        assert_eq!(series.rows[1].1, vec![2500.0]);
    }

    #[test]
    fn mom_derivation_from_levels() {
        let a = raw("100", monthly(&[100.0, 110.0, 99.0]));
        let mut series = ObservationSeries::align("test", &[a], &["MoM".to_string()]);
        series.derive_raw_columns();

        // First row has no previous level and is dropped.
        assert_eq!(series.rows.len(), 2);
        assert!((series.rows[0].1[0] - 10.0).abs() < 1e-9);
        assert!((series.rows[1].1[0] - -10.0).abs() < 1e-9);
    }

    #[test]
    fn yoy_derivation_uses_accumulated_12_months() {
        // 24 flat months then one 12 points higher: the trailing-12 sum moves
        // from 1200 to 1212 against a prior-12 sum of 1200.
        let mut values = vec![100.0; 24];
        values.push(112.0);
        let a = raw("100", monthly(&values));
        let mut series = ObservationSeries::align("test", &[a], &["YoY".to_string()]);
        series.derive_raw_columns();

        assert_eq!(series.rows.len(), 2);
        assert!(series.rows[0].1[0].abs() < 1e-9);
        assert!((series.rows[1].1[0] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn partial_current_month_does_not_mask_the_gate() {
        let a = raw("estado", vec![(d(2024, 2), 900.0), (d(2024, 3), 120.0)]);
        let mut series = ObservationSeries::align("test", &[a], &["Estado".to_string()]);
        series.drop_month_in_progress(d(2024, 2));

        assert!(matches!(series.into_outcome(d(2024, 2)), FetchOutcome::Fresh(_)));
    }

    #[test]
    fn partial_current_month_dropped_across_year_boundary() {
        let a = raw("estado", vec![(d(2023, 12), 900.0), (d(2024, 1), 120.0)]);
        let mut series = ObservationSeries::align("test", &[a], &["Estado".to_string()]);
        series.drop_month_in_progress(d(2023, 12));

        assert_eq!(series.last_date(), Some(d(2023, 12)));
        // Anything older stays untouched.
        assert_eq!(series.rows.len(), 1);
    }

    #[test]
    fn freshness_exact_match_required() {
        let a = raw("100", vec![(d(2024, 2), 1.0), (d(2024, 3), 2.0)]);
        let series = ObservationSeries::align("test", &[a], &["MoM".to_string()]);

        match series.clone().into_outcome(d(2024, 3)) {
            FetchOutcome::Fresh(s) => assert_eq!(s.last_date(), Some(d(2024, 3))),
            other => panic!("expected fresh, got {other:?}"),
        }
        match series.into_outcome(d(2024, 4)) {
            FetchOutcome::Stale { latest, expected } => {
                assert_eq!(latest, d(2024, 3));
                assert_eq!(expected, d(2024, 4));
            }
            other => panic!("expected stale, got {other:?}"),
        }
    }

    #[test]
    fn empty_series_yields_no_data() {
        let series = ObservationSeries::align("test", &[], &[]);
        assert!(matches!(series.into_outcome(d(2024, 3)), FetchOutcome::NoData));
    }
}
