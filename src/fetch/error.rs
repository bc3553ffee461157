use std::time::Duration;
use thiserror::Error;

/// Failure reported by a [`crate::WeatherProvider`] for a single request.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Network request failed for {0}")]
    NetworkRequest(String, #[source] reqwest::Error),

    #[error("HTTP request failed for {url} with status {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to decode response from {url}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Provider answered with error {code}: {message}")]
    Api { code: String, message: String },

    #[error("Unparseable {field} '{value}' in provider response")]
    InvalidValue { field: &'static str, value: String },

    #[error("Region '{0}' has no coordinates for this forecast product")]
    MissingCoordinates(String),

    #[error("Provider '{provider}' does not support {operation}")]
    Unsupported {
        provider: &'static str,
        operation: &'static str,
    },

    #[error("Provider '{provider}' is not available: {reason}")]
    Unavailable {
        provider: &'static str,
        reason: String,
    },

    #[error("{0}")]
    Failed(String),
}

/// Why one region of a batch produced no data. Never aborts the batch.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Region '{0}' is not in the region table")]
    UnknownRegion(String),

    #[error("Fetching region '{region}' failed")]
    Provider {
        region: String,
        #[source]
        source: ProviderError,
    },

    #[error("Fetching region '{region}' timed out after {after:?}")]
    Timeout { region: String, after: Duration },
}

impl FetchError {
    pub fn region(&self) -> &str {
        match self {
            FetchError::UnknownRegion(region) => region,
            FetchError::Provider { region, .. } => region,
            FetchError::Timeout { region, .. } => region,
        }
    }

    /// Short cause shown to users next to the region name.
    pub fn reason(&self) -> String {
        match self {
            FetchError::UnknownRegion(_) => "unknown region".to_string(),
            FetchError::Provider { source, .. } => source.to_string(),
            FetchError::Timeout { after, .. } => format!("timed out after {after:?}"),
        }
    }
}

/// A failure of the whole fetch cycle, as opposed to individual regions.
#[derive(Debug, Error)]
pub enum BatchFetchError {
    #[error("Weather provider is unavailable")]
    ProviderUnavailable(#[source] ProviderError),
}
