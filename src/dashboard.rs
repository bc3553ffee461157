//! The main entry point: one [`Dashboard`] owns the provider, the region table
//! and the state of the four views (short-range, medium-range, snapshot and
//! history).

use crate::error::DashboardError;
use crate::fetch::error::{BatchFetchError, FetchError, ProviderError};
use crate::fetch::orchestrator::fetch_all;
use crate::fetch::provider::{BaseTime, WeatherProvider};
use crate::identity::{resolve_session_id, IdentityProvider, LocalIdentity};
use crate::regions::region::{Region, RegionTable};
use crate::series::annotate::annotate;
use crate::series::merge::merge;
use crate::series::sample::SeriesSample;
use crate::utils::local_today;
use crate::validation::range::{ForecastClass, ForecastWindow, RangeRules, RegionSelection};
use crate::validation::years::YearSpan;
use crate::views::state::{ViewHandle, ViewState};
use crate::views::tables::{ForecastTable, HistoryTable, SnapshotTable};
use bon::bon;
use chrono::{Datelike, NaiveDate};
use log::info;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

const DEFAULT_REGION_TIMEOUT: Duration = Duration::from_secs(30);

/// The temperature dashboard client.
///
/// Every view method runs one complete cycle: validate the input, fetch all
/// regions concurrently, merge and annotate the results, then publish the
/// table to that view's state. Regions that fail are listed next to the table
/// instead of failing the view. Starting a new cycle on a view makes any
/// cycle still running on it stale; a stale cycle never overwrites the view
/// and returns [`DashboardError::Superseded`].
///
/// # Examples
///
/// ```rust
/// # use forecast_board::{Dashboard, DashboardError, SimulatedProvider};
/// # use chrono::NaiveDate;
/// # use std::sync::Arc;
/// # #[tokio::main]
/// # async fn main() -> Result<(), DashboardError> {
/// let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
/// let dashboard = Dashboard::builder()
///     .provider(Arc::new(SimulatedProvider::default()))
///     .today(today)
///     .build();
///
/// let table = dashboard
///     .short_range()
///     .start(today)
///     .end(NaiveDate::from_ymd_opt(2024, 6, 2).unwrap())
///     .selection(["daegu-jung", "gumi"])
///     .call()
///     .await?;
/// assert_eq!(table.rows.len(), 16);
/// assert!(table.rows.iter().all(|row| row.max_overall.is_some()));
/// # Ok(())
/// # }
/// ```
pub struct Dashboard {
    provider: Arc<dyn WeatherProvider>,
    regions: RegionTable,
    rules: RangeRules,
    region_timeout: Duration,
    today: Option<NaiveDate>,
    identity: Arc<dyn IdentityProvider>,
    session_id: OnceCell<String>,
    short_range_view: ViewHandle<ForecastTable>,
    medium_range_view: ViewHandle<ForecastTable>,
    snapshot_view: ViewHandle<SnapshotTable>,
    history_view: ViewHandle<HistoryTable>,
}

#[bon]
impl Dashboard {
    /// Creates a dashboard.
    ///
    /// # Arguments
    ///
    /// * `.provider(Arc<dyn WeatherProvider>)`: **Required.** Where temperatures come from.
    /// * `.regions(RegionTable)`: Optional. Defaults to [`RegionTable::builtin`].
    /// * `.rules(RangeRules)`: Optional. Defaults to [`RangeRules::default`].
    /// * `.region_timeout(Duration)`: Optional. Limit for a single region's fetch. Defaults to 30 seconds.
    /// * `.today(NaiveDate)`: Optional. Fixes "today" for validation. Defaults to the local date at each call.
    /// * `.identity(Arc<dyn IdentityProvider>)`: Optional. Defaults to an in-memory [`LocalIdentity`].
    #[builder]
    pub fn new(
        provider: Arc<dyn WeatherProvider>,
        regions: Option<RegionTable>,
        rules: Option<RangeRules>,
        region_timeout: Option<Duration>,
        today: Option<NaiveDate>,
        identity: Option<Arc<dyn IdentityProvider>>,
    ) -> Self {
        Self {
            provider,
            regions: regions.unwrap_or_default(),
            rules: rules.unwrap_or_default(),
            region_timeout: region_timeout.unwrap_or(DEFAULT_REGION_TIMEOUT),
            today,
            identity: identity.unwrap_or_else(|| Arc::new(LocalIdentity::in_memory())),
            session_id: OnceCell::new(),
            short_range_view: ViewHandle::new(),
            medium_range_view: ViewHandle::new(),
            snapshot_view: ViewHandle::new(),
            history_view: ViewHandle::new(),
        }
    }

    /// Hourly forecast table for up to three days.
    ///
    /// # Arguments
    ///
    /// * `.start(NaiveDate)`, `.end(NaiveDate)`: **Required.** Inclusive window.
    /// * `.selection(impl Into<RegionSelection>)`: **Required.** Region keys to chart.
    /// * `.base_time(BaseTime)`: Optional. Forecast run to use. Defaults to `1700`.
    ///
    /// # Errors
    ///
    /// * [`DashboardError::Validation`] for an empty selection or an invalid window.
    ///   The view's previous table is cleared.
    /// * [`DashboardError::Batch`] when the provider cannot serve requests at all.
    /// * [`DashboardError::Superseded`] when another short-range cycle started meanwhile.
    #[builder]
    pub async fn short_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        #[builder(into)] selection: RegionSelection,
        base_time: Option<BaseTime>,
    ) -> Result<ForecastTable, DashboardError> {
        let base_time = base_time.unwrap_or_default();
        self.forecast_cycle(
            &self.short_range_view,
            ForecastClass::ShortRange,
            start,
            end,
            selection,
            Some(base_time),
            move |region, window| self.provider.hourly(region, window, base_time),
        )
        .await
    }

    /// Daily min/max table for up to seven days, starting three or more days out.
    ///
    /// Errors as for [`Dashboard::short_range`].
    #[builder]
    pub async fn medium_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        #[builder(into)] selection: RegionSelection,
    ) -> Result<ForecastTable, DashboardError> {
        self.forecast_cycle(
            &self.medium_range_view,
            ForecastClass::MediumRange,
            start,
            end,
            selection,
            None,
            move |region, window| self.provider.daily(region, window),
        )
        .await
    }

    /// Temperature of every region in the table on `date`, warmest first.
    #[builder]
    pub async fn snapshot(&self, date: NaiveDate) -> Result<SnapshotTable, DashboardError> {
        let ticket = self.snapshot_view.begin().await;
        if let Err(e) = self.ensure_available() {
            self.snapshot_view.fail(ticket, e.to_string()).await?;
            return Err(e.into());
        }

        let selection: RegionSelection = self.regions.keys().collect();
        let batch = fetch_all(
            &self.regions,
            &selection,
            Some(self.region_timeout),
            |region| self.provider.same_day(region, date),
        )
        .await;

        let failures = batch.region_failures(&self.regions);
        let readings = batch
            .into_results()
            .into_iter()
            .filter_map(|(region, result)| result.ok().map(|value| (region, value)))
            .collect();
        let table = SnapshotTable::new(date, readings, failures, &self.regions);
        self.snapshot_view.complete(ticket, table.clone()).await?;
        Ok(table)
    }

    /// Annual average, maximum and minimum of one region.
    ///
    /// # Errors
    ///
    /// * [`DashboardError::Validation`] when the years are reversed or outside the
    ///   selectable range ending with the current year.
    /// * [`DashboardError::RegionFetch`] when the region is unknown or its fetch fails.
    /// * [`DashboardError::Batch`] and [`DashboardError::Superseded`] as for the other views.
    #[builder]
    pub async fn history(
        &self,
        region: &str,
        start_year: i32,
        end_year: i32,
    ) -> Result<HistoryTable, DashboardError> {
        let ticket = self.history_view.begin().await;
        let years = match self
            .rules
            .validate_years(YearSpan::new(start_year, end_year), self.today().year())
        {
            Ok(years) => years,
            Err(e) => {
                self.history_view.reject(ticket, e.clone()).await?;
                return Err(e.into());
            }
        };
        if let Err(e) = self.ensure_available() {
            self.history_view.fail(ticket, e.to_string()).await?;
            return Err(e.into());
        }

        let batch = fetch_all(
            &self.regions,
            &RegionSelection::from([region]),
            Some(self.region_timeout),
            |entry| self.provider.yearly(entry, years),
        )
        .await;
        let outcome = batch
            .into_results()
            .remove(region)
            .unwrap_or_else(|| Err(FetchError::UnknownRegion(region.to_string())));

        match outcome {
            Ok(rows) => {
                let table = HistoryTable::new(region, years, rows, &self.regions);
                self.history_view.complete(ticket, table.clone()).await?;
                Ok(table)
            }
            Err(e) => {
                self.history_view.fail(ticket, e.to_string()).await?;
                Err(e.into())
            }
        }
    }
}

impl Dashboard {
    /// Shared cycle of the two forecast views.
    #[allow(clippy::too_many_arguments)]
    async fn forecast_cycle<'a, S, F, Fut>(
        &'a self,
        view: &ViewHandle<ForecastTable>,
        class: ForecastClass,
        start: NaiveDate,
        end: NaiveDate,
        selection: RegionSelection,
        base_time: Option<BaseTime>,
        fetch: F,
    ) -> Result<ForecastTable, DashboardError>
    where
        S: SeriesSample,
        F: Fn(&'a Region, ForecastWindow) -> Fut,
        Fut: Future<Output = Result<Vec<S>, ProviderError>>,
    {
        let ticket = view.begin().await;
        let validated = selection
            .validate()
            .and_then(|_| self.rules.validate(start, end, class, self.today()));
        let window = match validated {
            Ok(window) => window,
            Err(e) => {
                view.reject(ticket, e.clone()).await?;
                return Err(e.into());
            }
        };
        if let Err(e) = self.ensure_available() {
            view.fail(ticket, e.to_string()).await?;
            return Err(e.into());
        }

        info!(
            "Fetching {} forecast {}..{} for {} regions",
            class,
            window.start(),
            window.end(),
            selection.len()
        );
        let batch = fetch_all(
            &self.regions,
            &selection,
            Some(self.region_timeout),
            |region| fetch(region, window),
        )
        .await;

        let rows = annotate(merge(&batch), &selection, &self.regions);
        let table = ForecastTable {
            window,
            base_time,
            failures: batch.region_failures(&self.regions),
            selection,
            rows,
        };
        view.complete(ticket, table.clone()).await?;
        Ok(table)
    }

    fn ensure_available(&self) -> Result<(), BatchFetchError> {
        self.provider
            .check_available()
            .map_err(BatchFetchError::ProviderUnavailable)
    }

    /// The date validation treats as today.
    pub fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(local_today)
    }

    pub fn regions(&self) -> &RegionTable {
        &self.regions
    }

    pub fn rules(&self) -> &RangeRules {
        &self.rules
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// The anonymous session id, resolved on first use. Never fails.
    pub async fn session_id(&self) -> String {
        self.session_id
            .get_or_init(|| resolve_session_id(self.identity.as_ref()))
            .await
            .clone()
    }

    pub async fn short_range_state(&self) -> ViewState<ForecastTable> {
        self.short_range_view.snapshot().await
    }

    pub async fn medium_range_state(&self) -> ViewState<ForecastTable> {
        self.medium_range_view.snapshot().await
    }

    pub async fn snapshot_state(&self) -> ViewState<SnapshotTable> {
        self.snapshot_view.snapshot().await
    }

    pub async fn history_state(&self) -> ViewState<HistoryTable> {
        self.history_view.snapshot().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::FixedIdentity;
    use crate::providers::simulated::SimulatedProvider;
    use crate::series::row::ColumnValue;
    use crate::series::sample::{DailySample, Sample, YearlySummary};
    use crate::validation::error::ValidationError;
    use crate::views::state::ViewError;
    use async_trait::async_trait;
    use std::collections::BTreeSet;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn today() -> NaiveDate {
        d(2024, 6, 1)
    }

    /// Answers with each region's grid `nx` so results are easy to predict.
    #[derive(Default)]
    struct ScriptedProvider {
        failing: BTreeSet<String>,
        unavailable: bool,
        slow_end: Option<(NaiveDate, Duration)>,
    }

    impl ScriptedProvider {
        fn failing(keys: &[&str]) -> Self {
            Self {
                failing: keys.iter().map(|k| k.to_string()).collect(),
                ..Self::default()
            }
        }

        async fn answer(&self, region: &Region) -> Result<f64, ProviderError> {
            if self.failing.contains(&region.key) {
                return Err(ProviderError::Failed("connection reset".into()));
            }
            Ok(f64::from(region.coordinates.nx))
        }
    }

    #[async_trait]
    impl WeatherProvider for ScriptedProvider {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn check_available(&self) -> Result<(), ProviderError> {
            if self.unavailable {
                return Err(ProviderError::Unavailable {
                    provider: "scripted",
                    reason: "no credentials".into(),
                });
            }
            Ok(())
        }

        async fn hourly(
            &self,
            region: &Region,
            window: ForecastWindow,
            _base_time: BaseTime,
        ) -> Result<Vec<Sample>, ProviderError> {
            if let Some((end, delay)) = self.slow_end {
                if window.end() == end {
                    tokio::time::sleep(delay).await;
                }
            }
            let value = self.answer(region).await?;
            Ok(window
                .days()
                .flat_map(|date| {
                    [0, 12].map(|hour| Sample {
                        timestamp: date.and_hms_opt(hour, 0, 0).unwrap(),
                        value,
                    })
                })
                .collect())
        }

        async fn daily(
            &self,
            region: &Region,
            window: ForecastWindow,
        ) -> Result<Vec<DailySample>, ProviderError> {
            let value = self.answer(region).await?;
            Ok(window
                .days()
                .map(|date| {
                    if region.key == "gumi" {
                        // Arrives inverted
                        DailySample {
                            date,
                            min_value: 20.0,
                            max_value: 10.0,
                        }
                    } else {
                        DailySample {
                            date,
                            min_value: value - 80.0,
                            max_value: value - 70.0,
                        }
                    }
                })
                .collect())
        }

        async fn same_day(&self, region: &Region, _date: NaiveDate) -> Result<f64, ProviderError> {
            self.answer(region).await
        }

        async fn yearly(
            &self,
            region: &Region,
            years: YearSpan,
        ) -> Result<Vec<YearlySummary>, ProviderError> {
            let value = self.answer(region).await?;
            Ok(years
                .years()
                .rev()
                .map(|year| YearlySummary {
                    year,
                    average: value / 10.0,
                    max: value / 2.0,
                    min: -value / 10.0,
                })
                .collect())
        }
    }

    fn dashboard(provider: impl WeatherProvider + 'static) -> Dashboard {
        Dashboard::builder()
            .provider(Arc::new(provider))
            .today(today())
            .build()
    }

    #[tokio::test]
    async fn test_partial_failure_still_renders() -> Result<(), DashboardError> {
        let dashboard = dashboard(ScriptedProvider::failing(&["gumi"]));
        let table = dashboard
            .short_range()
            .start(d(2024, 6, 1))
            .end(d(2024, 6, 2))
            .selection(["andong", "gumi", "pohang"])
            .call()
            .await?;

        assert_eq!(table.rows.len(), 4);
        for row in &table.rows {
            assert_eq!(row.get("andong"), Some(ColumnValue::Point(91.0)));
            assert_eq!(row.get("pohang"), Some(ColumnValue::Point(102.0)));
            assert_eq!(row.get("gumi"), None);
            assert_eq!(row.max_overall.as_ref().unwrap().region, "pohang");
            assert_eq!(row.min_overall.as_ref().unwrap().display_name, "Andong");
        }
        assert_eq!(table.failures.len(), 1);
        assert_eq!(table.failures[0].region, "gumi");
        assert_eq!(
            table.summary().as_deref(),
            Some("some regions failed: Gumi (connection reset)")
        );
        assert_eq!(dashboard.short_range_state().await.data, Some(table));
        Ok(())
    }

    #[tokio::test]
    async fn test_empty_selection_clears_previous_table() -> Result<(), DashboardError> {
        let dashboard = dashboard(ScriptedProvider::default());
        dashboard
            .short_range()
            .start(d(2024, 6, 1))
            .end(d(2024, 6, 1))
            .selection(["andong"])
            .call()
            .await?;
        assert!(dashboard.short_range_state().await.data.is_some());

        let err = dashboard
            .short_range()
            .start(d(2024, 6, 1))
            .end(d(2024, 6, 1))
            .selection(RegionSelection::new())
            .call()
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DashboardError::Validation(ValidationError::NoRegionsSelected)
        ));

        let state = dashboard.short_range_state().await;
        assert_eq!(state.data, None);
        assert!(!state.loading);
        assert_eq!(
            state.error,
            Some(ViewError::Validation(ValidationError::NoRegionsSelected))
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_selection_checked_before_dates() {
        let dashboard = dashboard(ScriptedProvider::default());
        let err = dashboard
            .medium_range()
            .start(d(2024, 6, 10))
            .end(d(2024, 6, 1))
            .selection(Vec::<String>::new())
            .call()
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DashboardError::Validation(ValidationError::NoRegionsSelected)
        ));
    }

    #[tokio::test]
    async fn test_medium_range_validation_and_inverted_pairs() -> Result<(), DashboardError> {
        let dashboard = dashboard(ScriptedProvider::default());

        let err = dashboard
            .medium_range()
            .start(d(2024, 6, 2))
            .end(d(2024, 6, 5))
            .selection(["gumi"])
            .call()
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DashboardError::Validation(ValidationError::StartTooSoon { earliest, .. })
                if earliest == d(2024, 6, 3)
        ));

        let err = dashboard
            .medium_range()
            .start(d(2024, 6, 11))
            .end(d(2024, 6, 12))
            .selection(["gumi"])
            .call()
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DashboardError::Validation(ValidationError::StartTooLate { latest, .. })
                if latest == d(2024, 6, 10)
        ));

        let table = dashboard
            .medium_range()
            .start(d(2024, 6, 4))
            .end(d(2024, 6, 10))
            .selection(["gumi", "pohang"])
            .call()
            .await?;
        assert_eq!(table.rows.len(), 7);
        let first = &table.rows[0];
        assert_eq!(first.get("gumi"), Some(ColumnValue::Range { min: 10.0, max: 20.0 }));
        assert_eq!(first.get("pohang"), Some(ColumnValue::Range { min: 22.0, max: 32.0 }));
        assert_eq!(first.max_overall.as_ref().unwrap().value, 32.0);
        assert_eq!(first.min_overall.as_ref().unwrap().region, "gumi");
        assert_eq!(table.base_time, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_stale_cycle_is_discarded() {
        let provider = ScriptedProvider {
            slow_end: Some((d(2024, 6, 1), Duration::from_millis(200))),
            ..ScriptedProvider::default()
        };
        let dashboard = dashboard(provider);

        let slow = dashboard
            .short_range()
            .start(d(2024, 6, 1))
            .end(d(2024, 6, 1))
            .selection(["andong"])
            .call();
        let fast = async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            dashboard
                .short_range()
                .start(d(2024, 6, 1))
                .end(d(2024, 6, 2))
                .selection(["andong"])
                .call()
                .await
        };
        let (slow, fast) = tokio::join!(slow, fast);

        assert!(matches!(
            slow,
            Err(DashboardError::Superseded {
                generation: 1,
                latest: 2
            })
        ));
        let fast = fast.unwrap();
        let state = dashboard.short_range_state().await;
        assert_eq!(state.generation, 2);
        assert_eq!(state.data.unwrap().window, fast.window);
        assert_eq!(fast.window.end(), d(2024, 6, 2));
    }

    #[tokio::test]
    async fn test_unknown_region_is_listed_not_fatal() -> Result<(), DashboardError> {
        let dashboard = dashboard(ScriptedProvider::default());
        let table = dashboard
            .short_range()
            .start(d(2024, 6, 1))
            .end(d(2024, 6, 1))
            .selection(["andong", "atlantis"])
            .base_time(BaseTime::ALL[0])
            .call()
            .await?;
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.failures[0].region, "atlantis");
        assert_eq!(table.failures[0].reason, "unknown region");
        assert_eq!(table.base_time.map(|b| b.to_string()).as_deref(), Some("0200"));
        Ok(())
    }

    #[tokio::test]
    async fn test_unavailable_provider_fails_whole_view() {
        let dashboard = dashboard(ScriptedProvider {
            unavailable: true,
            ..ScriptedProvider::default()
        });
        let err = dashboard
            .short_range()
            .start(d(2024, 6, 1))
            .end(d(2024, 6, 1))
            .selection(["andong"])
            .call()
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DashboardError::Batch(BatchFetchError::ProviderUnavailable(_))
        ));
        let state = dashboard.short_range_state().await;
        assert_eq!(state.data, None);
        assert!(matches!(state.error, Some(ViewError::Failed(_))));
    }

    #[tokio::test]
    async fn test_snapshot_covers_every_region() -> Result<(), DashboardError> {
        let provider = SimulatedProvider::builder()
            .failing_regions(BTreeSet::from(["pohang".to_string()]))
            .build();
        let dashboard = dashboard(provider);
        let table = dashboard.snapshot().date(today()).call().await?;

        assert_eq!(table.entries.len(), dashboard.regions().len() - 1);
        assert_eq!(table.failures.len(), 1);
        assert!(table
            .entries
            .windows(2)
            .all(|pair| pair[0].value >= pair[1].value));
        assert_eq!(
            table.warmest.as_ref().map(|w| w.value),
            table.entries.first().map(|e| e.value)
        );
        assert_eq!(
            table.coolest.as_ref().map(|c| c.value),
            table.entries.last().map(|e| e.value)
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_history_view() -> Result<(), DashboardError> {
        let dashboard = dashboard(ScriptedProvider::failing(&["gumi"]));

        let table = dashboard
            .history()
            .region("andong")
            .start_year(2020)
            .end_year(2024)
            .call()
            .await?;
        assert_eq!(
            table.rows.iter().map(|r| r.year).collect::<Vec<_>>(),
            vec![2020, 2021, 2022, 2023, 2024]
        );

        let err = dashboard
            .history()
            .region("andong")
            .start_year(2014)
            .end_year(2024)
            .call()
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DashboardError::Validation(ValidationError::YearOutOfRange { year: 2014, .. })
        ));

        let err = dashboard
            .history()
            .region("atlantis")
            .start_year(2020)
            .end_year(2024)
            .call()
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DashboardError::RegionFetch(FetchError::UnknownRegion(_))
        ));

        let err = dashboard
            .history()
            .region("gumi")
            .start_year(2020)
            .end_year(2024)
            .call()
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DashboardError::RegionFetch(FetchError::Provider { .. })
        ));
        assert_eq!(dashboard.history_state().await.data, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_session_id_comes_from_identity() {
        let dashboard = Dashboard::builder()
            .provider(Arc::new(ScriptedProvider::default()))
            .identity(Arc::new(FixedIdentity("session-1".into())))
            .build();
        assert_eq!(dashboard.session_id().await, "session-1");
        assert_eq!(dashboard.provider_name(), "scripted");
    }
}
