use crate::fetch::batch::FetchBatchResult;
use crate::series::row::MergedRow;
use crate::series::sample::SeriesSample;
use log::{debug, warn};
use std::collections::BTreeMap;

/// Merges every successful region's samples into one table, one row per time key.
///
/// Failed regions contribute nothing. A sample whose time key was already seen
/// for the same region replaces the earlier value. Rows come back in
/// chronological order of their [`crate::TimeKey`].
pub fn merge<S: SeriesSample>(batch: &FetchBatchResult<Vec<S>>) -> Vec<MergedRow> {
    let mut rows: BTreeMap<_, MergedRow> = BTreeMap::new();

    for (region, samples) in batch.successes() {
        for sample in samples {
            let key = sample.time_key();
            if sample.is_inverted() {
                warn!(
                    "Region '{}' reported min above max at {}, swapping",
                    region, key
                );
            }
            rows.entry(key)
                .or_insert_with(|| MergedRow::new(key))
                .columns
                .insert(region.to_string(), sample.column_value());
        }
    }

    debug!(
        "Merged {} regions into {} rows",
        batch.success_count(),
        rows.len()
    );
    // BTreeMap keys are TimeKeys, so this is chronological, not lexical.
    rows.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::error::{FetchError, ProviderError};
    use crate::series::row::ColumnValue;
    use crate::series::sample::{DailySample, Sample, TimeKey};
    use chrono::{NaiveDate, NaiveDateTime};
    use std::collections::BTreeMap;

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn hourly(points: &[(NaiveDateTime, f64)]) -> Vec<Sample> {
        points
            .iter()
            .map(|&(timestamp, value)| Sample { timestamp, value })
            .collect()
    }

    fn batch<T>(entries: Vec<(&str, Result<T, FetchError>)>) -> FetchBatchResult<T> {
        FetchBatchResult::from_results(
            entries
                .into_iter()
                .map(|(k, r)| (k.to_string(), r))
                .collect::<BTreeMap<_, _>>(),
        )
    }

    #[test]
    fn test_every_time_key_appears_once() {
        let a = hourly(&[(at(2024, 5, 1, 0), 18.0), (at(2024, 5, 1, 3), 17.5)]);
        let b = hourly(&[
            (at(2024, 5, 1, 3), 16.0),
            (at(2024, 5, 1, 0), 19.0),
            (at(2024, 5, 1, 6), 21.0),
        ]);
        let rows = merge(&batch(vec![("a", Ok(a)), ("b", Ok(b))]));

        let keys: Vec<TimeKey> = rows.iter().map(|r| r.key).collect();
        assert_eq!(
            keys,
            vec![
                TimeKey::Timestamp(at(2024, 5, 1, 0)),
                TimeKey::Timestamp(at(2024, 5, 1, 3)),
                TimeKey::Timestamp(at(2024, 5, 1, 6)),
            ]
        );
        assert_eq!(rows[0].get("a"), Some(ColumnValue::Point(18.0)));
        assert_eq!(rows[0].get("b"), Some(ColumnValue::Point(19.0)));
        assert_eq!(rows[1].get("a"), Some(ColumnValue::Point(17.5)));
        assert_eq!(rows[1].get("b"), Some(ColumnValue::Point(16.0)));
        // Only b reported 06:00
        assert_eq!(rows[2].get("a"), None);
        assert_eq!(rows[2].get("b"), Some(ColumnValue::Point(21.0)));
    }

    #[test]
    fn test_failed_regions_are_skipped() {
        let a = hourly(&[(at(2024, 5, 1, 0), 18.0)]);
        let rows = merge(&batch(vec![
            ("a", Ok(a)),
            (
                "b",
                Err(FetchError::Provider {
                    region: "b".into(),
                    source: ProviderError::Failed("down".into()),
                }),
            ),
        ]));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].columns.keys().collect::<Vec<_>>(), vec!["a"]);
    }

    #[test]
    fn test_inverted_daily_sample_is_swapped() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        let rows = merge(&batch(vec![(
            "a",
            Ok(vec![DailySample {
                date,
                min_value: 20.0,
                max_value: 10.0,
            }]),
        )]));
        assert_eq!(
            rows[0].get("a"),
            Some(ColumnValue::Range {
                min: 10.0,
                max: 20.0
            })
        );
    }

    #[test]
    fn test_rows_sort_across_year_boundary() {
        let a = hourly(&[
            (at(2025, 1, 1, 0), 1.0),
            (at(2024, 12, 31, 21), 2.0),
            (at(2025, 1, 1, 3), 0.5),
        ]);
        let b = vec![
            DailySample {
                date: NaiveDate::from_ymd_opt(2025, 1, 2).unwrap(),
                min_value: -3.0,
                max_value: 4.0,
            },
            DailySample {
                date: NaiveDate::from_ymd_opt(2024, 12, 30).unwrap(),
                min_value: -1.0,
                max_value: 6.0,
            },
        ];

        let hourly_rows = merge(&batch(vec![("a", Ok(a))]));
        let labels: Vec<String> = hourly_rows.iter().map(|r| r.key.to_string()).collect();
        assert_eq!(
            labels,
            vec!["2024-12-31 21:00", "2025-01-01 00:00", "2025-01-01 03:00"]
        );

        let daily_rows = merge(&batch(vec![("b", Ok(b))]));
        let labels: Vec<String> = daily_rows.iter().map(|r| r.key.to_string()).collect();
        assert_eq!(labels, vec!["2024-12-30", "2025-01-02"]);
    }

    #[test]
    fn test_duplicate_key_within_region_keeps_last() {
        let a = hourly(&[(at(2024, 5, 1, 0), 18.0), (at(2024, 5, 1, 0), 18.4)]);
        let rows = merge(&batch(vec![("a", Ok(a))]));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("a"), Some(ColumnValue::Point(18.4)));
    }
}
