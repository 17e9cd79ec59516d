//! Fallback notifier when no webhook is configured: alerts only reach the log.

use crate::domain::DomainError;
use crate::ports::NotifierPort;
use tracing::warn;

pub struct LogNotifier;

#[async_trait::async_trait]
impl NotifierPort for LogNotifier {
    async fn notify(&self, text: &str) -> Result<(), DomainError> {
        warn!(alert = text, "Discord webhook not configured; alert only logged");
        Ok(())
    }
}
