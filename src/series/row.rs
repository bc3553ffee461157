use crate::series::sample::TimeKey;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

/// A region's value in one merged row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColumnValue {
    /// A single reading (short-range, snapshot).
    Point(f64),
    /// A daily pair (medium-range). `min <= max` always holds.
    Range { min: f64, max: f64 },
}

impl ColumnValue {
    /// Builds a range, swapping the bounds if they arrive inverted.
    pub fn range(min: f64, max: f64) -> Self {
        if min > max {
            ColumnValue::Range { min: max, max: min }
        } else {
            ColumnValue::Range { min, max }
        }
    }

    /// The value that competes for the row maximum.
    pub fn high(&self) -> f64 {
        match *self {
            ColumnValue::Point(v) => v,
            ColumnValue::Range { max, .. } => max,
        }
    }

    /// The value that competes for the row minimum.
    pub fn low(&self) -> f64 {
        match *self {
            ColumnValue::Point(v) => v,
            ColumnValue::Range { min, .. } => min,
        }
    }
}

/// The region holding a row's overall maximum or minimum.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionExtreme {
    pub value: f64,
    pub region: String,
    pub display_name: String,
}

/// One time slot of a merged multi-region table.
///
/// `columns` holds a value only for regions whose fetch succeeded and that
/// reported this time key; absence is normal. The overall extremes are filled
/// in by [`crate::annotate`] and stay `None` when no selected region has a value.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedRow {
    pub key: TimeKey,
    pub columns: BTreeMap<String, ColumnValue>,
    pub max_overall: Option<RegionExtreme>,
    pub min_overall: Option<RegionExtreme>,
}

impl MergedRow {
    pub fn new(key: TimeKey) -> Self {
        Self {
            key,
            columns: BTreeMap::new(),
            max_overall: None,
            min_overall: None,
        }
    }

    pub fn get(&self, region: &str) -> Option<ColumnValue> {
        self.columns.get(region).copied()
    }
}

/// Serializes as one flat chart record, e.g.
/// `{"date": "2024-01-05", "gumi_min": 3.1, "gumi_max": 11.0, "maxOverall": 11.0, ...}`.
impl Serialize for MergedRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry(self.key.field_name(), &self.key)?;
        for (region, value) in &self.columns {
            match *value {
                ColumnValue::Point(v) => map.serialize_entry(region, &v)?,
                ColumnValue::Range { min, max } => {
                    map.serialize_entry(&format!("{region}_min"), &min)?;
                    map.serialize_entry(&format!("{region}_max"), &max)?;
                }
            }
        }
        if let Some(max) = &self.max_overall {
            map.serialize_entry("maxOverall", &max.value)?;
            map.serialize_entry("maxOverallRegion", &max.display_name)?;
        }
        if let Some(min) = &self.min_overall {
            map.serialize_entry("minOverall", &min.value)?;
            map.serialize_entry("minOverallRegion", &min.display_name)?;
        }
        map.end()
    }
}
