use crate::fetch::error::{BatchFetchError, FetchError};
use crate::regions::error::RegionTableError;
use crate::validation::error::ValidationError;
use crate::views::state::Superseded;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Batch(#[from] BatchFetchError),

    #[error(transparent)]
    RegionFetch(#[from] FetchError),

    #[error(transparent)]
    RegionTable(#[from] RegionTableError),

    #[error("Result of cycle {generation} discarded, cycle {latest} started meanwhile")]
    Superseded { generation: u64, latest: u64 },
}

impl From<Superseded> for DashboardError {
    fn from(value: Superseded) -> Self {
        DashboardError::Superseded {
            generation: value.generation,
            latest: value.latest,
        }
    }
}
