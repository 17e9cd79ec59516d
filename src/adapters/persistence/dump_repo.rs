//! Implements DumpPort. One pretty-printed JSON file per dataset under the dump directory.

use crate::domain::DomainError;
use crate::ports::DumpPort;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

pub struct DumpRepo {
    base_dir: PathBuf,
}

impl DumpRepo {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}

#[async_trait::async_trait]
impl DumpPort for DumpRepo {
    async fn save_json(
        &self,
        file_name: &str,
        value: &serde_json::Value,
    ) -> Result<PathBuf, DomainError> {
        fs::create_dir_all(&self.base_dir)
            .await
            .map_err(|e| DomainError::Repo(e.to_string()))?;
        // serde_json keeps non-ASCII as UTF-8 (no \u escapes)
        let json =
            serde_json::to_string_pretty(value).map_err(|e| DomainError::Repo(e.to_string()))?;
        let path = self.base_dir.join(file_name);
        fs::write(&path, json)
            .await
            .map_err(|e| DomainError::Repo(format!("write {}: {}", path.display(), e)))?;
        info!(path = %path.display(), "saved dump file");
        Ok(path)
    }
}
