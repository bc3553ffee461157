use crate::validation::range::ForecastClass;
use chrono::NaiveDate;
use thiserror::Error;

/// A user selection that must be corrected before any fetch is issued.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Start date {start} is after end date {end}")]
    StartAfterEnd { start: NaiveDate, end: NaiveDate },

    #[error("{class} window covers {days} days, at most {max_days} are allowed")]
    RangeTooLong {
        class: ForecastClass,
        days: i64,
        max_days: i64,
    },

    #[error("{class} window must start on or after {earliest}, got {start}")]
    StartTooSoon {
        class: ForecastClass,
        start: NaiveDate,
        earliest: NaiveDate,
    },

    #[error("{class} window starts {start}, before the earliest supported date {earliest}")]
    StartTooEarly {
        class: ForecastClass,
        start: NaiveDate,
        earliest: NaiveDate,
    },

    #[error("{class} window starts {start}, after the latest allowed start {latest}")]
    StartTooLate {
        class: ForecastClass,
        start: NaiveDate,
        latest: NaiveDate,
    },

    #[error("Select at least one region to see a forecast")]
    NoRegionsSelected,

    #[error("Start year {start} is after end year {end}")]
    StartYearAfterEndYear { start: i32, end: i32 },

    #[error("Year {year} is outside the selectable range {earliest}-{latest}")]
    YearOutOfRange {
        year: i32,
        earliest: i32,
        latest: i32,
    },
}
