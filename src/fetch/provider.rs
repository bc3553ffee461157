//! The seam to the external weather-data service.
//!
//! The dashboard never talks to a forecast API directly; it asks a
//! [`WeatherProvider`] for one region at a time and treats each answer as
//! independent of the others.

use crate::fetch::error::ProviderError;
use crate::regions::region::Region;
use crate::series::sample::{DailySample, Sample, YearlySummary};
use crate::validation::range::ForecastWindow;
use crate::validation::years::YearSpan;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Issuance time of a short-range forecast run, as `HHMM`.
///
/// Only the eight daily runs are valid: 0200, 0500, 0800, 1100, 1400, 1700,
/// 2000 and 2300.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BaseTime(u16);

impl BaseTime {
    pub const ALL: [BaseTime; 8] = [
        BaseTime(200),
        BaseTime(500),
        BaseTime(800),
        BaseTime(1100),
        BaseTime(1400),
        BaseTime(1700),
        BaseTime(2000),
        BaseTime(2300),
    ];

    pub fn hour(&self) -> u32 {
        u32::from(self.0 / 100)
    }
}

impl Default for BaseTime {
    fn default() -> Self {
        BaseTime(1700)
    }
}

impl fmt::Display for BaseTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}", self.0)
    }
}

impl FromStr for BaseTime {
    type Err = ProviderError;

    /// Parses `"1700"`-style strings.
    ///
    /// # Examples
    ///
    /// ```
    /// use forecast_board::BaseTime;
    ///
    /// let base: BaseTime = "0500".parse().unwrap();
    /// assert_eq!(base.to_string(), "0500");
    /// assert!("0600".parse::<BaseTime>().is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ProviderError::InvalidValue {
            field: "base time",
            value: s.to_string(),
        };
        if s.len() != 4 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let hhmm: u16 = s.parse().map_err(|_| invalid())?;
        BaseTime::ALL
            .into_iter()
            .find(|b| b.0 == hhmm)
            .ok_or_else(invalid)
    }
}

impl Serialize for BaseTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A source of temperature data for single regions.
///
/// Every method is one best-effort attempt; retries and timeouts beyond the
/// dashboard's per-region limit are the implementation's business.
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Whether the provider can serve requests at all (e.g. credentials present).
    /// An error here fails the whole fetch cycle before any region is requested.
    fn check_available(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    /// Hourly short-range values for `region` within `window`.
    async fn hourly(
        &self,
        region: &Region,
        window: ForecastWindow,
        base_time: BaseTime,
    ) -> Result<Vec<Sample>, ProviderError>;

    /// Daily min/max medium-range values for `region` within `window`.
    async fn daily(
        &self,
        region: &Region,
        window: ForecastWindow,
    ) -> Result<Vec<DailySample>, ProviderError>;

    /// The temperature of `region` on `date`, for the snapshot map.
    async fn same_day(&self, region: &Region, date: NaiveDate) -> Result<f64, ProviderError>;

    /// Annual summaries of `region` for every year in `years`.
    async fn yearly(
        &self,
        region: &Region,
        years: YearSpan,
    ) -> Result<Vec<YearlySummary>, ProviderError>;
}
