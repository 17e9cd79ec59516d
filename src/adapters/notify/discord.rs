//! Discord adapter. Implements NotifierPort by posting to an incoming webhook.

use crate::adapters::connect_timeout;
use crate::domain::DomainError;
use crate::ports::NotifierPort;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

/// Posts `{"content": text}` to a Discord webhook URL.
pub struct DiscordNotifier {
    client: Client,
    webhook_url: String,
}

impl DiscordNotifier {
    pub fn new(webhook_url: String, timeout: Duration) -> Result<Self, DomainError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout(timeout))
            .build()
            .map_err(|e| DomainError::Notify(format!("build client: {}", e)))?;
        Ok(Self {
            client,
            webhook_url,
        })
    }
}

#[async_trait::async_trait]
impl NotifierPort for DiscordNotifier {
    async fn notify(&self, text: &str) -> Result<(), DomainError> {
        let res = self
            .client
            .post(&self.webhook_url)
            .json(&json!({ "content": text }))
            .send()
            .await
            .map_err(|e| DomainError::Notify(format!("Request failed: {}", e)))?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_else(|_| "unknown".to_string());
            return Err(DomainError::Notify(format!(
                "Discord webhook error {}: {}",
                status, text
            )));
        }

        Ok(())
    }
}
