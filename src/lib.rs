mod dashboard;
mod error;
mod fetch;
mod identity;
mod providers;
mod regions;
mod series;
mod utils;
mod validation;
mod views;

pub use dashboard::Dashboard;
pub use error::DashboardError;

pub use regions::error::RegionTableError;
pub use regions::region::{GridPoint, Region, RegionTable};

pub use validation::error::ValidationError;
pub use validation::range::{validate, ForecastClass, ForecastWindow, RangeRules, RegionSelection};
pub use validation::years::YearSpan;

pub use series::annotate::{annotate, overall_extremes};
pub use series::merge::merge;
pub use series::row::{ColumnValue, MergedRow, RegionExtreme};
pub use series::sample::{DailySample, Sample, SeriesSample, TimeKey, YearlySummary};

pub use fetch::batch::{failure_summary, FetchBatchResult, RegionFailure};
pub use fetch::error::{BatchFetchError, FetchError, ProviderError};
pub use fetch::orchestrator::fetch_all;
pub use fetch::provider::{BaseTime, WeatherProvider};

pub use providers::kma::KmaProvider;
pub use providers::simulated::SimulatedProvider;

pub use views::state::{CycleTicket, Superseded, ViewError, ViewHandle, ViewState};
pub use views::tables::{ForecastTable, HistoryTable, SnapshotEntry, SnapshotTable};

pub use identity::{
    resolve_session_id, FixedIdentity, IdentityError, IdentityProvider, LocalIdentity,
};
