use crate::validation::error::ValidationError;
use log::warn;
use thiserror::Error;
use tokio::sync::Mutex;

/// Identifies one fetch cycle of a view. Only the most recently issued ticket
/// may change the view's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CycleTicket {
    generation: u64,
}

impl CycleTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// A cycle tried to publish after a newer one had started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Cycle {generation} was superseded by cycle {latest}")]
pub struct Superseded {
    pub generation: u64,
    pub latest: u64,
}

/// What the view shows instead of data.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ViewError {
    #[error(transparent)]
    Validation(ValidationError),

    #[error("{0}")]
    Failed(String),
}

/// Everything a renderer needs for one view.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState<T> {
    pub generation: u64,
    pub loading: bool,
    pub data: Option<T>,
    pub error: Option<ViewError>,
}

impl<T> Default for ViewState<T> {
    fn default() -> Self {
        Self {
            generation: 0,
            loading: false,
            data: None,
            error: None,
        }
    }
}

/// Shared state of a single view, updated only by that view's cycles.
pub struct ViewHandle<T> {
    state: Mutex<ViewState<T>>,
}

impl<T> Default for ViewHandle<T> {
    fn default() -> Self {
        Self {
            state: Mutex::new(ViewState::default()),
        }
    }
}

impl<T> ViewHandle<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new cycle and marks the view as loading. Any cycle still in
    /// flight becomes stale.
    pub async fn begin(&self) -> CycleTicket {
        let mut state = self.state.lock().await;
        state.generation += 1;
        state.loading = true;
        state.error = None;
        CycleTicket {
            generation: state.generation,
        }
    }

    pub async fn is_current(&self, ticket: CycleTicket) -> bool {
        self.state.lock().await.generation == ticket.generation
    }

    /// Publishes fresh data.
    pub async fn complete(&self, ticket: CycleTicket, data: T) -> Result<(), Superseded> {
        self.apply(ticket, |state| {
            state.data = Some(data);
            state.error = None;
        })
        .await
    }

    /// Records a validation failure and clears whatever was displayed.
    pub async fn reject(
        &self,
        ticket: CycleTicket,
        error: ValidationError,
    ) -> Result<(), Superseded> {
        self.apply(ticket, |state| {
            state.data = None;
            state.error = Some(ViewError::Validation(error));
        })
        .await
    }

    /// Records a failure of the whole cycle and clears whatever was displayed.
    pub async fn fail(
        &self,
        ticket: CycleTicket,
        message: impl Into<String>,
    ) -> Result<(), Superseded> {
        let message = message.into();
        self.apply(ticket, |state| {
            state.data = None;
            state.error = Some(ViewError::Failed(message));
        })
        .await
    }

    async fn apply(
        &self,
        ticket: CycleTicket,
        update: impl FnOnce(&mut ViewState<T>),
    ) -> Result<(), Superseded> {
        let mut state = self.state.lock().await;
        if state.generation != ticket.generation {
            warn!(
                "Discarding result of cycle {}, cycle {} is newer",
                ticket.generation, state.generation
            );
            return Err(Superseded {
                generation: ticket.generation,
                latest: state.generation,
            });
        }
        update(&mut state);
        state.loading = false;
        Ok(())
    }
}

impl<T: Clone> ViewHandle<T> {
    pub async fn snapshot(&self) -> ViewState<T> {
        self.state.lock().await.clone()
    }
}
