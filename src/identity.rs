//! Anonymous session identity.
//!
//! The dashboard only needs an opaque id to tag a session. Failing to obtain
//! one must never hold up a view, so [`resolve_session_id`] falls back to a
//! fresh random id.

use crate::utils::get_config_dir;
use async_trait::async_trait;
use log::{debug, warn};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::OnceCell;
use uuid::Uuid;

const SESSION_FILE_NAME: &str = "session_id";

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Failed to determine config directory")]
    ConfigDirResolution,

    #[error("Failed to read session id from '{0}'")]
    Read(PathBuf, #[source] std::io::Error),

    #[error("Failed to store session id in '{0}'")]
    Write(PathBuf, #[source] std::io::Error),

    #[error("Identity provider failed: {0}")]
    Failed(String),
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn get_or_create_session_id(&self) -> Result<String, IdentityError>;
}

/// Random id, optionally kept in a file so it survives restarts.
pub struct LocalIdentity {
    path: Option<PathBuf>,
    cached: OnceCell<String>,
}

impl LocalIdentity {
    /// An id that lives as long as this value.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            cached: OnceCell::new(),
        }
    }

    /// An id read from (or first written to) `path`.
    pub fn persistent(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            cached: OnceCell::new(),
        }
    }

    /// An id stored as `<config_dir>/forecast_board/session_id`.
    pub fn from_config_dir() -> Result<Self, IdentityError> {
        let dir = get_config_dir().ok_or(IdentityError::ConfigDirResolution)?;
        Ok(Self::persistent(dir.join(SESSION_FILE_NAME)))
    }

    async fn load_or_store(path: &Path) -> Result<String, IdentityError> {
        match tokio::fs::read_to_string(path).await {
            Ok(contents) if !contents.trim().is_empty() => {
                debug!("Using session id from {}", path.display());
                return Ok(contents.trim().to_string());
            }
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(IdentityError::Read(path.to_path_buf(), e)),
        }

        let id = Uuid::new_v4().to_string();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| IdentityError::Write(path.to_path_buf(), e))?;
        }
        tokio::fs::write(path, &id)
            .await
            .map_err(|e| IdentityError::Write(path.to_path_buf(), e))?;
        debug!("Stored new session id in {}", path.display());
        Ok(id)
    }
}

impl Default for LocalIdentity {
    fn default() -> Self {
        Self::in_memory()
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentity {
    async fn get_or_create_session_id(&self) -> Result<String, IdentityError> {
        let id = self
            .cached
            .get_or_try_init(|| async {
                match &self.path {
                    Some(path) => Self::load_or_store(path).await,
                    None => Ok(Uuid::new_v4().to_string()),
                }
            })
            .await?;
        Ok(id.clone())
    }
}

/// Always answers with the same id.
pub struct FixedIdentity(pub String);

#[async_trait]
impl IdentityProvider for FixedIdentity {
    async fn get_or_create_session_id(&self) -> Result<String, IdentityError> {
        Ok(self.0.clone())
    }
}

/// Asks `provider` for the session id, or makes one up if it fails.
pub async fn resolve_session_id(provider: &dyn IdentityProvider) -> String {
    match provider.get_or_create_session_id().await {
        Ok(id) => id,
        Err(e) => {
            warn!("Could not obtain session id ({}), using a temporary one", e);
            Uuid::new_v4().to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BrokenIdentity;

    #[async_trait]
    impl IdentityProvider for BrokenIdentity {
        async fn get_or_create_session_id(&self) -> Result<String, IdentityError> {
            Err(IdentityError::Failed("sign-in service down".into()))
        }
    }

    #[tokio::test]
    async fn test_in_memory_id_is_stable() -> Result<(), IdentityError> {
        let identity = LocalIdentity::in_memory();
        let first = identity.get_or_create_session_id().await?;
        assert!(Uuid::parse_str(&first).is_ok());
        assert_eq!(identity.get_or_create_session_id().await?, first);
        Ok(())
    }

    #[tokio::test]
    async fn test_persistent_id_survives_restart() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("nested").join(SESSION_FILE_NAME);

        let first = LocalIdentity::persistent(&path)
            .get_or_create_session_id()
            .await?;
        let second = LocalIdentity::persistent(&path)
            .get_or_create_session_id()
            .await?;
        assert_eq!(first, second);
        assert_eq!(std::fs::read_to_string(&path)?, first);
        Ok(())
    }

    #[tokio::test]
    async fn test_failure_falls_back_to_random_id() {
        let id = resolve_session_id(&BrokenIdentity).await;
        assert!(Uuid::parse_str(&id).is_ok());
        assert_eq!(
            resolve_session_id(&FixedIdentity("abc".into())).await,
            "abc"
        );
    }
}
