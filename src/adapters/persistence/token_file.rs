//! Implements TokenStore as a plain text file holding the raw access token.

use crate::domain::DomainError;
use crate::ports::TokenStore;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

pub struct TokenFile {
    path: PathBuf,
}

impl TokenFile {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait::async_trait]
impl TokenStore for TokenFile {
    async fn load(&self) -> Result<Option<String>, DomainError> {
        match fs::read_to_string(&self.path).await {
            Ok(s) => {
                let token = s.trim();
                Ok((!token.is_empty()).then(|| token.to_string()))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(DomainError::Repo(format!(
                "read token file {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    async fn save(&self, token: &str) -> Result<(), DomainError> {
        fs::write(&self.path, token.trim()).await.map_err(|e| {
            DomainError::Repo(format!("write token file {}: {}", self.path.display(), e))
        })
    }
}
