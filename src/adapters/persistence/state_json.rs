//! Implements StatePort using a JSON file.
//!
//! Persists the watcher's seen grade/message ids and schedule fingerprints so a restart
//! does not re-alert on everything already seen.

use crate::domain::{DomainError, WatchState};
use crate::ports::StatePort;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::warn;

/// JSON file-based watcher state.
pub struct StateJson {
    path: PathBuf,
}

impl StateJson {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait::async_trait]
impl StatePort for StateJson {
    async fn load(&self) -> Result<WatchState, DomainError> {
        match fs::read_to_string(&self.path).await {
            Ok(s) => Ok(serde_json::from_str(&s).unwrap_or_else(|e| {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "corrupt state file; starting fresh"
                );
                WatchState::default()
            })),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(WatchState::default()),
            Err(e) => Err(DomainError::State(format!("read state: {}", e))),
        }
    }

    /// Atomic save using write-replace pattern.
    /// 1. Write to temp file
    /// 2. sync_all() to ensure flush to disk
    /// 3. Atomic rename to target path
    async fn save(&self, state: &WatchState) -> Result<(), DomainError> {
        let json =
            serde_json::to_string_pretty(state).map_err(|e| DomainError::State(e.to_string()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| DomainError::State(format!("create state dir: {}", e)))?;
        }

        let temp_path = self.path.with_extension("json.tmp");
        let mut f = fs::File::create(&temp_path)
            .await
            .map_err(|e| DomainError::State(format!("create temp file: {}", e)))?;
        f.write_all(json.as_bytes())
            .await
            .map_err(|e| DomainError::State(format!("write temp file: {}", e)))?;
        f.sync_all()
            .await
            .map_err(|e| DomainError::State(format!("sync temp file: {}", e)))?;
        drop(f);

        fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| DomainError::State(format!("atomic rename failed: {}", e)))?;

        Ok(())
    }
}
