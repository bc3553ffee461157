//! Client for the Korea Meteorological Administration open API.
//!
//! Short-range values come from the village forecast service (`TMP` category
//! on the nx/ny grid), medium-range pairs from the mid-term temperature service
//! (`taMin{n}`/`taMax{n}` per zone). Historical summaries and same-day readings
//! are not offered by these endpoints.

use crate::fetch::error::ProviderError;
use crate::fetch::provider::{BaseTime, WeatherProvider};
use crate::regions::region::Region;
use crate::series::sample::{DailySample, Sample, YearlySummary};
use crate::validation::range::ForecastWindow;
use crate::validation::years::YearSpan;
use async_trait::async_trait;
use chrono::{Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use log::{debug, info, warn};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::BTreeMap;

const PROVIDER_NAME: &str = "kma";
pub const DEFAULT_BASE_URL: &str = "https://apis.data.go.kr/1360000";
const SHORT_RANGE_PATH: &str = "VilageFcstInfoService_2.0/getVilageFcst";
const MEDIUM_RANGE_PATH: &str = "MidFcstInfoService/getMidTa";
const TEMPERATURE_CATEGORY: &str = "TMP";
const RESULT_OK: &str = "00";
const RESULT_NO_DATA: &str = "03";
/// Mid-term temperature fields cover issuance date + 3 ..= + 10.
const MEDIUM_RANGE_LEADS: std::ops::RangeInclusive<i64> = 3..=10;

pub struct KmaProvider {
    client: Client,
    base_url: String,
    service_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    response: ResponseBody<T>,
}

#[derive(Debug, Deserialize)]
struct ResponseBody<T> {
    header: Header,
    body: Option<Body<T>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Header {
    result_code: String,
    result_msg: String,
}

#[derive(Debug, Deserialize)]
struct Body<T> {
    items: Items<T>,
}

#[derive(Debug, Deserialize)]
struct Items<T> {
    #[serde(default = "Vec::new")]
    item: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ShortRangeItem {
    category: String,
    fcst_date: String,
    fcst_time: String,
    fcst_value: String,
}

/// One zone of the mid-term temperature answer; fields are `taMin3`, `taMax3`, ...
type MediumRangeItem = BTreeMap<String, serde_json::Value>;

impl KmaProvider {
    /// Creates a client against the public endpoint.
    pub fn new(service_key: Option<String>) -> Self {
        Self::with_base_url(service_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(service_key: Option<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            service_key: service_key.filter(|k| !k.trim().is_empty()),
        }
    }

    /// Reads `KMA_API_KEY` and, if set, `KMA_API_BASE_URL`.
    pub fn from_env() -> Self {
        let key = std::env::var("KMA_API_KEY").ok();
        match std::env::var("KMA_API_BASE_URL") {
            Ok(url) if !url.trim().is_empty() => Self::with_base_url(key, url),
            _ => Self::new(key),
        }
    }

    fn service_key(&self) -> Result<&str, ProviderError> {
        self.service_key
            .as_deref()
            .ok_or_else(|| ProviderError::Unavailable {
                provider: PROVIDER_NAME,
                reason: "KMA_API_KEY is not set".to_string(),
            })
    }

    /// Issues a GET and unwraps the common response envelope.
    ///
    /// A "no data" answer yields an empty list rather than an error.
    async fn request<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<Vec<T>, ProviderError> {
        let url = format!("{}/{}", self.base_url, path);
        debug!("Requesting {} with {} parameters", url, params.len());

        let response = self
            .client
            .get(&url)
            .query(&[("serviceKey", self.service_key()?)])
            .query(params)
            .send()
            .await
            .map_err(|e| ProviderError::NetworkRequest(url.clone(), e))?;

        let response = match response.error_for_status() {
            Ok(resp) => resp,
            Err(e) => {
                warn!("HTTP error for {}: {:?}", url, e);
                return Err(if let Some(status) = e.status() {
                    ProviderError::HttpStatus {
                        url,
                        status,
                        source: e,
                    }
                } else {
                    ProviderError::NetworkRequest(url, e)
                });
            }
        };

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ProviderError::NetworkRequest(url.clone(), e))?;
        let envelope: Envelope<T> = serde_json::from_slice(&bytes)
            .map_err(|source| ProviderError::Decode { url, source })?;
        unwrap_envelope(envelope)
    }
}

fn unwrap_envelope<T>(envelope: Envelope<T>) -> Result<Vec<T>, ProviderError> {
    let ResponseBody { header, body } = envelope.response;
    match header.result_code.as_str() {
        RESULT_OK => Ok(body.map(|b| b.items.item).unwrap_or_default()),
        RESULT_NO_DATA => Ok(Vec::new()),
        _ => Err(ProviderError::Api {
            code: header.result_code,
            message: header.result_msg,
        }),
    }
}

/// Temperature samples inside `window`, ordered by timestamp.
fn parse_short_range(
    items: Vec<ShortRangeItem>,
    window: ForecastWindow,
) -> Result<Vec<Sample>, ProviderError> {
    let mut samples = Vec::new();
    for item in items
        .into_iter()
        .filter(|i| i.category == TEMPERATURE_CATEGORY)
    {
        let date = NaiveDate::parse_from_str(&item.fcst_date, "%Y%m%d").map_err(|_| {
            ProviderError::InvalidValue {
                field: "fcstDate",
                value: item.fcst_date.clone(),
            }
        })?;
        if !window.contains(date) {
            continue;
        }
        let time = NaiveTime::parse_from_str(&item.fcst_time, "%H%M").map_err(|_| {
            ProviderError::InvalidValue {
                field: "fcstTime",
                value: item.fcst_time.clone(),
            }
        })?;
        let value: f64 = item
            .fcst_value
            .trim()
            .parse()
            .map_err(|_| ProviderError::InvalidValue {
                field: "fcstValue",
                value: item.fcst_value.clone(),
            })?;
        samples.push(Sample {
            timestamp: date.and_time(time),
            value,
        });
    }
    samples.sort_by_key(|s| s.timestamp);
    Ok(samples)
}

fn numeric_field(item: &MediumRangeItem, field: &str) -> Result<Option<f64>, ProviderError> {
    match item.get(field) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::Number(n)) => Ok(n.as_f64()),
        Some(serde_json::Value::String(s)) => {
            s.trim()
                .parse()
                .map(Some)
                .map_err(|_| ProviderError::InvalidValue {
                    field: "taMin/taMax",
                    value: s.clone(),
                })
        }
        Some(other) => Err(ProviderError::InvalidValue {
            field: "taMin/taMax",
            value: other.to_string(),
        }),
    }
}

/// Daily pairs inside `window` from a mid-term answer issued on `issued`.
/// Days missing either bound are skipped.
fn parse_medium_range(
    items: &[MediumRangeItem],
    issued: NaiveDate,
    window: ForecastWindow,
) -> Result<Vec<DailySample>, ProviderError> {
    let Some(item) = items.first() else {
        return Ok(Vec::new());
    };
    let mut samples = Vec::new();
    for lead in MEDIUM_RANGE_LEADS {
        let date = issued + Duration::days(lead);
        if !window.contains(date) {
            continue;
        }
        let min = numeric_field(item, &format!("taMin{lead}"))?;
        let max = numeric_field(item, &format!("taMax{lead}"))?;
        if let (Some(min_value), Some(max_value)) = (min, max) {
            samples.push(DailySample {
                date,
                min_value,
                max_value,
            });
        }
    }
    Ok(samples)
}

/// Most recent mid-term issuance (06:00 or 18:00) at or before `now`.
fn latest_mid_term_issuance(now: NaiveDateTime) -> NaiveDateTime {
    let date = now.date();
    let at = |d: NaiveDate, hour: u32| {
        d.and_time(NaiveTime::MIN) + Duration::hours(i64::from(hour))
    };
    match now.hour() {
        h if h >= 18 => at(date, 18),
        h if h >= 6 => at(date, 6),
        _ => at(date - Duration::days(1), 18),
    }
}

#[async_trait]
impl WeatherProvider for KmaProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    fn check_available(&self) -> Result<(), ProviderError> {
        self.service_key().map(|_| ())
    }

    async fn hourly(
        &self,
        region: &Region,
        window: ForecastWindow,
        base_time: BaseTime,
    ) -> Result<Vec<Sample>, ProviderError> {
        let base_date = window.start() - Duration::days(1);
        let params = [
            ("pageNo", "1".to_string()),
            ("numOfRows", "1000".to_string()),
            ("dataType", "JSON".to_string()),
            ("base_date", base_date.format("%Y%m%d").to_string()),
            ("base_time", base_time.to_string()),
            ("nx", region.coordinates.nx.to_string()),
            ("ny", region.coordinates.ny.to_string()),
        ];
        let items: Vec<ShortRangeItem> = self.request(SHORT_RANGE_PATH, &params).await?;
        let samples = parse_short_range(items, window)?;
        info!(
            "Received {} hourly values for '{}' (run {} {})",
            samples.len(),
            region.key,
            base_date,
            base_time
        );
        Ok(samples)
    }

    async fn daily(
        &self,
        region: &Region,
        window: ForecastWindow,
    ) -> Result<Vec<DailySample>, ProviderError> {
        let zone = region
            .coordinates
            .mid_term_zone
            .as_deref()
            .ok_or_else(|| ProviderError::MissingCoordinates(region.key.clone()))?;
        let issued = latest_mid_term_issuance(Local::now().naive_local());
        let params = [
            ("pageNo", "1".to_string()),
            ("numOfRows", "10".to_string()),
            ("dataType", "JSON".to_string()),
            ("regId", zone.to_string()),
            ("tmFc", issued.format("%Y%m%d%H%M").to_string()),
        ];
        let items: Vec<MediumRangeItem> = self.request(MEDIUM_RANGE_PATH, &params).await?;
        let samples = parse_medium_range(&items, issued.date(), window)?;
        info!(
            "Received {} daily values for '{}' (zone {}, issued {})",
            samples.len(),
            region.key,
            zone,
            issued
        );
        Ok(samples)
    }

    async fn same_day(&self, _region: &Region, _date: NaiveDate) -> Result<f64, ProviderError> {
        Err(ProviderError::Unsupported {
            provider: PROVIDER_NAME,
            operation: "same-day readings",
        })
    }

    async fn yearly(
        &self,
        _region: &Region,
        _years: YearSpan,
    ) -> Result<Vec<YearlySummary>, ProviderError> {
        Err(ProviderError::Unsupported {
            provider: PROVIDER_NAME,
            operation: "yearly summaries",
        })
    }
}
