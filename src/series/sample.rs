//! Sample shapes returned by a [`crate::WeatherProvider`] and the time key used
//! to line samples from different regions up into one row.

use crate::series::row::ColumnValue;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Alignment key for merged rows.
///
/// Ordering is chronological: `Timestamp` keys compare by date and time,
/// `Date` keys by calendar date. A single table only ever holds one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TimeKey {
    Timestamp(NaiveDateTime),
    Date(NaiveDate),
}

impl TimeKey {
    /// Field name used when a row is serialized for a chart.
    pub fn field_name(&self) -> &'static str {
        match self {
            TimeKey::Timestamp(_) => "dateTime",
            TimeKey::Date(_) => "date",
        }
    }

    pub fn date(&self) -> NaiveDate {
        match self {
            TimeKey::Timestamp(ts) => ts.date(),
            TimeKey::Date(date) => *date,
        }
    }
}

impl fmt::Display for TimeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeKey::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M")),
            TimeKey::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
        }
    }
}

impl Serialize for TimeKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Something that occupies one cell of a merged row.
pub trait SeriesSample {
    fn time_key(&self) -> TimeKey;

    /// The cell value, with any inverted min/max already corrected.
    fn column_value(&self) -> ColumnValue;

    /// Whether the sample arrived with `min > max`.
    fn is_inverted(&self) -> bool {
        false
    }
}

/// One hourly short-range forecast value for a region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: NaiveDateTime,
    pub value: f64,
}

impl SeriesSample for Sample {
    fn time_key(&self) -> TimeKey {
        TimeKey::Timestamp(self.timestamp)
    }

    fn column_value(&self) -> ColumnValue {
        ColumnValue::Point(self.value)
    }
}

/// One medium-range daily forecast pair for a region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySample {
    pub date: NaiveDate,
    pub min_value: f64,
    pub max_value: f64,
}

impl SeriesSample for DailySample {
    fn time_key(&self) -> TimeKey {
        TimeKey::Date(self.date)
    }

    fn column_value(&self) -> ColumnValue {
        ColumnValue::range(self.min_value, self.max_value)
    }

    fn is_inverted(&self) -> bool {
        self.min_value > self.max_value
    }
}

/// Annual statistics for the historical trend view.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearlySummary {
    pub year: i32,
    pub average: f64,
    pub max: f64,
    pub min: f64,
}
