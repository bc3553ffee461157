use crate::validation::error::ValidationError;
use crate::validation::range::RangeRules;
use serde::Serialize;
use std::ops::RangeInclusive;

/// Inclusive range of calendar years for the historical trend view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearSpan {
    pub start: i32,
    pub end: i32,
}

impl YearSpan {
    pub fn new(start: i32, end: i32) -> Self {
        Self { start, end }
    }

    pub fn years(&self) -> RangeInclusive<i32> {
        self.start..=self.end
    }
}

impl RangeRules {
    /// Checks a year span against the selectable history range: the last
    /// `history_years` years ending with `current_year`.
    pub fn validate_years(
        &self,
        span: YearSpan,
        current_year: i32,
    ) -> Result<YearSpan, ValidationError> {
        if span.start > span.end {
            return Err(ValidationError::StartYearAfterEndYear {
                start: span.start,
                end: span.end,
            });
        }
        let earliest = current_year - self.history_years + 1;
        for year in [span.start, span.end] {
            if year < earliest || year > current_year {
                return Err(ValidationError::YearOutOfRange {
                    year,
                    earliest,
                    latest: current_year,
                });
            }
        }
        Ok(span)
    }
}
