//! A deterministic stand-in for a real forecast service.
//!
//! Values follow a plausible daily cycle with a few degrees of per-region
//! variation, and Daegu districts run warmer than the surrounding cities
//! (urban heat island). The same seed and inputs always give the same numbers.

use crate::fetch::error::ProviderError;
use crate::fetch::provider::{BaseTime, WeatherProvider};
use crate::regions::region::Region;
use crate::series::sample::{DailySample, Sample, YearlySummary};
use crate::validation::range::ForecastWindow;
use crate::validation::years::YearSpan;
use async_trait::async_trait;
use bon::bon;
use chrono::NaiveDate;
use log::debug;
use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};
use std::time::Duration;

const PROVIDER_NAME: &str = "simulated";
const HOURS_PER_DAY: [u32; 8] = [0, 3, 6, 9, 12, 15, 18, 21];

pub struct SimulatedProvider {
    seed: u64,
    failing_regions: BTreeSet<String>,
    latency: Duration,
}

#[bon]
impl SimulatedProvider {
    /// Creates a provider.
    ///
    /// * `.seed(u64)`: Optional. Varies the generated values. Defaults to `0`.
    /// * `.failing_regions(BTreeSet<String>)`: Optional. Regions whose every request fails.
    /// * `.latency(Duration)`: Optional. Delay added to every request. Defaults to none.
    #[builder]
    pub fn new(
        seed: Option<u64>,
        #[builder(default)] failing_regions: BTreeSet<String>,
        latency: Option<Duration>,
    ) -> Self {
        Self {
            seed: seed.unwrap_or(0),
            failing_regions,
            latency: latency.unwrap_or(Duration::ZERO),
        }
    }
}

impl Default for SimulatedProvider {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl SimulatedProvider {
    async fn start_request(&self, region: &Region, operation: &str) -> Result<(), ProviderError> {
        debug!("Simulating {} for region '{}'", operation, region.key);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if self.failing_regions.contains(&region.key) {
            return Err(ProviderError::Failed(format!(
                "simulated outage for '{}'",
                region.key
            )));
        }
        Ok(())
    }

    /// Uniform value in `[0, 1)` derived from the seed and `parts`.
    fn noise(&self, parts: impl Hash) -> f64 {
        let mut hasher = DefaultHasher::new();
        self.seed.hash(&mut hasher);
        parts.hash(&mut hasher);
        (hasher.finish() % 10_000) as f64 / 10_000.0
    }

    fn heat_island_offset(&self, region: &Region, salt: impl Hash) -> f64 {
        let n = self.noise((&region.key, "heat-island", salt));
        if is_urban(region) {
            n * 1.5 + 0.5
        } else {
            -n
        }
    }
}

fn is_urban(region: &Region) -> bool {
    region.key.starts_with("daegu")
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn base_for_hour(hour: u32) -> f64 {
    match hour {
        h if !(6..21).contains(&h) => 18.0,
        h if h < 12 => 25.0,
        _ => 28.0,
    }
}

/// Same-day base temperature for the snapshot map.
fn snapshot_base(region: &Region) -> f64 {
    match region.key.as_str() {
        k if k.starts_with("daegu") => 28.5,
        "gumi" => 27.2,
        "pohang" => 26.8,
        "gyeongju" => 29.1,
        "andong" => 27.5,
        "gimcheon" => 28.0,
        "yeongcheon" => 29.5,
        "cheongdo" => 26.0,
        _ => 27.5,
    }
}

/// Long-term annual mean for the history view.
fn annual_base(region: &Region) -> f64 {
    match region.key.as_str() {
        k if k.starts_with("daegu") => 15.0,
        "gumi" => 14.5,
        "pohang" => 14.0,
        "gyeongju" => 14.8,
        "andong" => 13.5,
        "gimcheon" => 14.2,
        _ => 14.0,
    }
}

#[async_trait]
impl WeatherProvider for SimulatedProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    async fn hourly(
        &self,
        region: &Region,
        window: ForecastWindow,
        base_time: BaseTime,
    ) -> Result<Vec<Sample>, ProviderError> {
        self.start_request(region, "hourly forecast").await?;

        let regional_bias = (region.key.len() % 5) as f64 * 0.1 - 0.2;
        let mut samples = Vec::with_capacity(window.inclusive_days().max(0) as usize * 8);
        for date in window.days() {
            for hour in HOURS_PER_DAY {
                let Some(timestamp) = date.and_hms_opt(hour, 0, 0) else {
                    continue;
                };
                let salt = (&region.key, timestamp, base_time);
                let value = base_for_hour(hour) + self.noise(salt) * 5.0 - 2.0
                    + self.heat_island_offset(region, salt)
                    + regional_bias;
                samples.push(Sample {
                    timestamp,
                    value: round1(value),
                });
            }
        }
        Ok(samples)
    }

    async fn daily(
        &self,
        region: &Region,
        window: ForecastWindow,
    ) -> Result<Vec<DailySample>, ProviderError> {
        self.start_request(region, "daily forecast").await?;

        Ok(window
            .days()
            .map(|date| {
                let mut min = 10.0 + self.noise((&region.key, date, "min")) * 8.0 - 4.0;
                let mut max = 20.0 + self.noise((&region.key, date, "max")) * 8.0 - 4.0;
                if is_urban(region) {
                    min += self.noise((&region.key, date, "urban-min")) + 0.5;
                    max += self.noise((&region.key, date, "urban-max")) * 1.5 + 0.5;
                } else {
                    min -= self.noise((&region.key, date, "rural-min")) * 0.5;
                    max -= self.noise((&region.key, date, "rural-max")) * 0.5;
                }
                if min > max {
                    std::mem::swap(&mut min, &mut max);
                }
                DailySample {
                    date,
                    min_value: round1(min),
                    max_value: round1(max),
                }
            })
            .collect())
    }

    async fn same_day(&self, region: &Region, date: NaiveDate) -> Result<f64, ProviderError> {
        self.start_request(region, "same-day reading").await?;
        let value = snapshot_base(region) + self.noise((&region.key, date)) * 4.0 - 2.0;
        Ok(round1(value))
    }

    async fn yearly(
        &self,
        region: &Region,
        years: YearSpan,
    ) -> Result<Vec<YearlySummary>, ProviderError> {
        self.start_request(region, "yearly summary").await?;

        let base = annual_base(region);
        // Trend is centred two years before the end of the span.
        let reference_year = years.end - 2;
        Ok(years
            .years()
            .map(|year| YearlySummary {
                year,
                average: round1(
                    base + f64::from(year - reference_year) * 0.2
                        + self.noise((&region.key, year, "avg"))
                        - 0.5,
                ),
                max: round1(base + 15.0 + self.noise((&region.key, year, "max")) * 5.0),
                min: round1(base - 15.0 - self.noise((&region.key, year, "min")) * 5.0),
            })
            .collect())
    }
}
