//! Domain errors. Used by ports and use cases.
//!
//! Adapters map infrastructure errors into these.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    /// 401/403 from the Magister API. Callers react by refreshing the token.
    #[error("Unauthorized: HTTP {0}")]
    Unauthorized(u16),

    #[error("Magister API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Notification failed: {0}")]
    Notify(String),

    #[error("State error: {0}")]
    State(String),

    #[error("Repository error: {0}")]
    Repo(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("UI error: {0}")]
    Ui(String),
}

impl DomainError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, DomainError::Unauthorized(_))
    }

    /// Map a non-success HTTP status to the matching variant.
    pub fn from_status(status: u16, body: &str) -> Self {
        match status {
            401 | 403 => DomainError::Unauthorized(status),
            _ => DomainError::Api {
                status,
                message: body.chars().take(200).collect(),
            },
        }
    }
}
