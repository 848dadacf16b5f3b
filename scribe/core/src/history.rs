//! Chat History Store
//!
//! A single JSON document on disk. Saves replace the whole document: the
//! new contents go to a sibling temp file which is then renamed over the
//! old one, so a reader never sees a half-written file. Each save gets its
//! own temp file, so overlapping saves end with one complete document.

use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Errors from the history store
#[derive(Debug, Error)]
pub enum HistoryError {
    /// Reading or writing the file failed
    #[error("History file {path}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The file or the document is not valid JSON
    #[error("History is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Flat-file history storage
#[derive(Clone, Debug)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    /// Store backed by `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backing file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the stored history
    ///
    /// # Errors
    ///
    /// Fails if the document cannot be written.
    pub async fn save(&self, history: &Value) -> Result<(), HistoryError> {
        let contents = serde_json::to_string_pretty(history)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| self.io_error(source))?;
        }

        let tmp = self.temp_path();
        let written = match tokio::fs::write(&tmp, contents).await {
            Ok(()) => tokio::fs::rename(&tmp, &self.path).await,
            Err(e) => Err(e),
        };
        if let Err(source) = written {
            if let Err(e) = tokio::fs::remove_file(&tmp).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = ?tmp, error = %e, "Failed to remove history temp file");
                }
            }
            return Err(self.io_error(source));
        }

        info!(path = ?self.path, "Chat history saved");
        Ok(())
    }

    /// The stored history, or `None` if nothing has been saved
    ///
    /// # Errors
    ///
    /// Fails if the file exists but cannot be read or parsed.
    pub async fn load(&self) -> Result<Option<Value>, HistoryError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = ?self.path, "No chat history found");
                return Ok(None);
            }
            Err(source) => return Err(self.io_error(source)),
        };
        Ok(Some(serde_json::from_str(&contents)?))
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(format!(".{}.tmp", Uuid::new_v4().simple()));
        self.path.with_file_name(name)
    }

    fn io_error(&self, source: std::io::Error) -> HistoryError {
        HistoryError::Io {
            path: self.path.clone(),
            source,
        }
    }
}
