//! Send a Magister mail to a single person.

use crate::domain::{DomainError, OutgoingMail};
use crate::ports::MagisterGateway;
use crate::usecases::auth_service::AuthService;
use std::sync::Arc;
use tracing::{info, warn};

pub struct MailService {
    gateway: Arc<dyn MagisterGateway>,
    auth: Arc<AuthService>,
}

impl MailService {
    pub fn new(gateway: Arc<dyn MagisterGateway>, auth: Arc<AuthService>) -> Self {
        Self { gateway, auth }
    }

    /// Returns whether Magister accepted the mail.
    pub async fn send(&self, mail: &OutgoingMail) -> Result<bool, DomainError> {
        if mail.subject.trim().is_empty() {
            return Err(DomainError::Config("mail subject must not be empty".into()));
        }
        let accepted = self
            .auth
            .with_fresh_token(self.gateway.as_ref(), || self.gateway.send_mail(mail))
            .await?;
        if accepted {
            info!(recipient = mail.recipient_id, "mail sent");
        } else {
            warn!(recipient = mail.recipient_id, "Magister rejected the mail");
        }
        Ok(accepted)
    }
}
