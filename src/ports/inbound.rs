//! Inbound port. UI (adapter) calls into the application.

use crate::domain::DomainError;

/// Input port: interactive CLI invokes application use cases.
#[async_trait::async_trait]
pub trait InputPort: Send + Sync {
    /// Show the main menu and run the selected action. Returns when the user quits.
    async fn run(&self) -> Result<(), DomainError>;
}
