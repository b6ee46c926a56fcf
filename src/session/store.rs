//! On-disk session persistence

use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};

use super::types::Session;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The blob exists but does not parse
    #[error("session at {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize session: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Single JSON blob holding the captured cookie set
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn exists(&self) -> bool {
        tokio::fs::try_exists(&self.path).await.unwrap_or(false)
    }

    /// Read the persisted session
    ///
    /// `Ok(None)` means no login has been captured yet, which is distinct from
    /// a blob that exists but cannot be parsed.
    pub async fn load(&self) -> Result<Option<Session>, SessionError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == IoErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(SessionError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        let session = serde_json::from_slice::<Session>(&bytes).map_err(|source| {
            SessionError::Corrupt {
                path: self.path.clone(),
                source,
            }
        })?;
        log::debug!(
            "Loaded session with {} cookies from {}",
            session.len(),
            self.path.display()
        );
        Ok(Some(session))
    }

    /// Overwrite any prior session
    pub async fn save(&self, session: &Session) -> Result<(), SessionError> {
        let json = serde_json::to_vec_pretty(session).map_err(SessionError::Serialize)?;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| SessionError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|source| SessionError::Io {
                path: self.path.clone(),
                source,
            })?;
        log::debug!("Saved session to {}", self.path.display());
        Ok(())
    }

    /// Delete the persisted session; returns whether one existed
    pub async fn clear(&self) -> Result<bool, SessionError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == IoErrorKind::NotFound => Ok(false),
            Err(source) => Err(SessionError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }
}
