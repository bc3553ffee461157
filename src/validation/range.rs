//! Validation of user-chosen forecast windows and region selections.
//!
//! Everything here is pure: callers pass in "today" and get back either the
//! window to fetch or the reason it was rejected.

use crate::validation::error::ValidationError;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// The two forecast products the dashboard charts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ForecastClass {
    /// Hourly values for at most three calendar days.
    ShortRange,
    /// Daily min/max values for at most seven days, starting three or more days out.
    MediumRange,
}

impl fmt::Display for ForecastClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForecastClass::ShortRange => write!(f, "short-range"),
            ForecastClass::MediumRange => write!(f, "medium-range"),
        }
    }
}

/// An inclusive calendar-date window for one forecast class.
///
/// Construction does not validate; use [`RangeRules::validate`] (or [`validate`])
/// to obtain a window that satisfies the class rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastWindow {
    start: NaiveDate,
    end: NaiveDate,
    class: ForecastClass,
}

impl ForecastWindow {
    pub fn new(start: NaiveDate, end: NaiveDate, class: ForecastClass) -> Self {
        Self { start, end, class }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn class(&self) -> ForecastClass {
        self.class
    }

    /// Number of calendar days covered, counting both ends. Zero or negative
    /// when `end` precedes `start`.
    pub fn inclusive_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// Every date in the window, in order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Domain limits applied by [`RangeRules::validate`].
///
/// Spans are expressed as `end - start` in days, so a span of 2 allows three
/// calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeRules {
    pub short_range_max_span_days: i64,
    pub medium_range_max_span_days: i64,
    /// Medium-range lead, counting today as the first day: with a lead of 3
    /// and today 2024-01-01 the earliest start is 2024-01-03.
    pub medium_range_min_lead_days: i64,
    /// When set, short-range windows may start at most this many days before today.
    pub short_range_max_past_days: Option<i64>,
    /// When set, short-range windows may start at most this many days after today.
    pub short_range_max_ahead_days: Option<i64>,
    /// When set, medium-range windows may start at most this many days after today.
    pub medium_range_max_ahead_days: Option<i64>,
    /// Number of selectable years (ending with the current one) for the history view.
    pub history_years: i32,
}

impl Default for RangeRules {
    fn default() -> Self {
        Self {
            short_range_max_span_days: 2,
            medium_range_max_span_days: 6,
            medium_range_min_lead_days: 3,
            short_range_max_past_days: None,
            short_range_max_ahead_days: Some(0),
            medium_range_max_ahead_days: Some(9),
            history_years: 10,
        }
    }
}

impl RangeRules {
    /// Checks a `start..=end` window against the rules of `class`.
    ///
    /// # Errors
    ///
    /// * [`ValidationError::StartAfterEnd`] whenever `end < start`, for every class.
    /// * [`ValidationError::RangeTooLong`] when the span exceeds the class maximum.
    /// * [`ValidationError::StartTooSoon`] when a medium-range window starts
    ///   before its lead, see [`RangeRules::medium_range_min_lead_days`].
    /// * [`ValidationError::StartTooEarly`] when a short-range lower bound is
    ///   configured and the window starts before it.
    /// * [`ValidationError::StartTooLate`] when the window starts after the
    ///   class's `max_ahead` limit.
    pub fn validate(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        class: ForecastClass,
        today: NaiveDate,
    ) -> Result<ForecastWindow, ValidationError> {
        if start > end {
            return Err(ValidationError::StartAfterEnd { start, end });
        }
        let window = ForecastWindow::new(start, end, class);
        let span = (end - start).num_days();

        match class {
            ForecastClass::ShortRange => {
                if span > self.short_range_max_span_days {
                    return Err(ValidationError::RangeTooLong {
                        class,
                        days: window.inclusive_days(),
                        max_days: self.short_range_max_span_days + 1,
                    });
                }
                if let Some(max_past) = self.short_range_max_past_days {
                    let earliest = today - Duration::days(max_past);
                    if start < earliest {
                        return Err(ValidationError::StartTooEarly {
                            class,
                            start,
                            earliest,
                        });
                    }
                }
                check_latest_start(class, start, today, self.short_range_max_ahead_days)?;
            }
            ForecastClass::MediumRange => {
                if span > self.medium_range_max_span_days {
                    return Err(ValidationError::RangeTooLong {
                        class,
                        days: window.inclusive_days(),
                        max_days: self.medium_range_max_span_days + 1,
                    });
                }
                let earliest = today + Duration::days(self.medium_range_min_lead_days - 1);
                if start < earliest {
                    return Err(ValidationError::StartTooSoon {
                        class,
                        start,
                        earliest,
                    });
                }
                check_latest_start(class, start, today, self.medium_range_max_ahead_days)?;
            }
        }

        Ok(window)
    }
}

fn check_latest_start(
    class: ForecastClass,
    start: NaiveDate,
    today: NaiveDate,
    max_ahead: Option<i64>,
) -> Result<(), ValidationError> {
    let Some(max_ahead) = max_ahead else {
        return Ok(());
    };
    let latest = today + Duration::days(max_ahead);
    if start > latest {
        return Err(ValidationError::StartTooLate {
            class,
            start,
            latest,
        });
    }
    Ok(())
}

/// Validates a window with the default [`RangeRules`].
pub fn validate(
    start: NaiveDate,
    end: NaiveDate,
    class: ForecastClass,
    today: NaiveDate,
) -> Result<ForecastWindow, ValidationError> {
    RangeRules::default().validate(start, end, class, today)
}

/// The set of region keys chosen for one view.
///
/// Iteration is ordered by region key, which is also the tie-break order used
/// when two regions share an extreme value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegionSelection(BTreeSet<String>);

impl RegionSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>) -> bool {
        self.0.insert(key.into())
    }

    pub fn remove(&mut self, key: &str) -> bool {
        self.0.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Rejects an empty selection with [`ValidationError::NoRegionsSelected`].
    pub fn validate(&self) -> Result<&Self, ValidationError> {
        if self.is_empty() {
            return Err(ValidationError::NoRegionsSelected);
        }
        Ok(self)
    }
}

impl<S: Into<String>> FromIterator<S> for RegionSelection {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl<S: Into<String>> From<Vec<S>> for RegionSelection {
    fn from(keys: Vec<S>) -> Self {
        keys.into_iter().collect()
    }
}

impl<S: Into<String>, const N: usize> From<[S; N]> for RegionSelection {
    fn from(keys: [S; N]) -> Self {
        keys.into_iter().collect()
    }
}
