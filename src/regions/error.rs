use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegionTableError {
    #[error("Failed to read region table '{0}'")]
    Read(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse region table '{0}'")]
    Parse(PathBuf, #[source] serde_json::Error),

    #[error("Failed to parse region table")]
    ParseInline(#[from] serde_json::Error),

    #[error("Duplicate region key '{0}'")]
    DuplicateKey(String),

    #[error("Region key must not be empty (display name '{0}')")]
    EmptyKey(String),

    #[error("Region table contains no regions")]
    Empty,
}
