//! Payloads published by the four dashboard views.

use crate::fetch::batch::{failure_summary, RegionFailure};
use crate::fetch::provider::BaseTime;
use crate::regions::region::RegionTable;
use crate::series::annotate::overall_extremes;
use crate::series::row::{ColumnValue, MergedRow, RegionExtreme};
use crate::series::sample::YearlySummary;
use crate::validation::range::{ForecastWindow, RegionSelection};
use crate::validation::years::YearSpan;
use chrono::NaiveDate;
use ordered_float::OrderedFloat;
use serde::Serialize;
use std::cmp::Reverse;

/// An annotated short- or medium-range table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastTable {
    pub window: ForecastWindow,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_time: Option<BaseTime>,
    pub selection: RegionSelection,
    pub rows: Vec<MergedRow>,
    pub failures: Vec<RegionFailure>,
}

impl ForecastTable {
    /// Non-fatal note about regions missing from the table.
    pub fn summary(&self) -> Option<String> {
        failure_summary(&self.failures)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotEntry {
    pub region: String,
    pub display_name: String,
    pub value: f64,
}

/// Same-day temperatures of every region, warmest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotTable {
    pub date: NaiveDate,
    pub entries: Vec<SnapshotEntry>,
    pub warmest: Option<RegionExtreme>,
    pub coolest: Option<RegionExtreme>,
    pub failures: Vec<RegionFailure>,
}

impl SnapshotTable {
    /// Builds the table from successful `(region, value)` readings.
    pub fn new(
        date: NaiveDate,
        mut readings: Vec<(String, f64)>,
        failures: Vec<RegionFailure>,
        regions: &RegionTable,
    ) -> Self {
        readings.sort_by(|a, b| a.0.cmp(&b.0));
        let (warmest, coolest) = overall_extremes(
            readings
                .iter()
                .map(|(region, value)| (region.as_str(), ColumnValue::Point(*value))),
            regions,
        );
        let mut entries: Vec<SnapshotEntry> = readings
            .into_iter()
            .map(|(region, value)| SnapshotEntry {
                display_name: regions.display_name(&region).to_string(),
                region,
                value,
            })
            .collect();
        entries.sort_by(|a, b| {
            Reverse(OrderedFloat(a.value))
                .cmp(&Reverse(OrderedFloat(b.value)))
                .then_with(|| a.region.cmp(&b.region))
        });
        Self {
            date,
            entries,
            warmest,
            coolest,
            failures,
        }
    }

    pub fn summary(&self) -> Option<String> {
        failure_summary(&self.failures)
    }
}

/// Annual statistics of one region.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryTable {
    pub region: String,
    pub display_name: String,
    pub years: YearSpan,
    pub rows: Vec<YearlySummary>,
}

impl HistoryTable {
    /// Keeps one row per year inside `years`, ordered by year.
    pub fn new(
        region: &str,
        years: YearSpan,
        mut rows: Vec<YearlySummary>,
        regions: &RegionTable,
    ) -> Self {
        rows.retain(|r| years.start <= r.year && r.year <= years.end);
        rows.sort_by_key(|r| r.year);
        rows.dedup_by_key(|r| r.year);
        Self {
            region: region.to_string(),
            display_name: regions.display_name(region).to_string(),
            years,
            rows,
        }
    }
}
