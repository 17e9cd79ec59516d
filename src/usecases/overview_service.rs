//! Overview use case: latest grades, unread inbox mail and open assignments in one snapshot.
//!
//! Each section fails independently; the UI shows what it could fetch.

use crate::domain::{Assignment, DomainError, Grade, Message, find_inbox};
use crate::ports::MagisterGateway;
use crate::usecases::auth_service::AuthService;
use std::sync::Arc;
use tracing::info;

const GRADES_SHOWN: u32 = 5;
const MESSAGES_SHOWN: u32 = 5;

/// Inbox state. `latest` is only fetched when there is unread mail.
#[derive(Debug)]
pub struct InboxSummary {
    pub unread: u32,
    pub latest: Vec<Message>,
}

#[derive(Debug)]
pub struct Overview {
    pub grades: Result<Vec<Grade>, DomainError>,
    /// Ok(None) when no inbox folder exists.
    pub inbox: Result<Option<InboxSummary>, DomainError>,
    pub open_assignments: Result<Vec<Assignment>, DomainError>,
}

impl Overview {
    fn any_unauthorized(&self) -> bool {
        self.grades.as_ref().err().is_some_and(DomainError::is_unauthorized)
            || self.inbox.as_ref().err().is_some_and(DomainError::is_unauthorized)
            || self
                .open_assignments
                .as_ref()
                .err()
                .is_some_and(DomainError::is_unauthorized)
    }
}

pub struct OverviewService {
    gateway: Arc<dyn MagisterGateway>,
    auth: Arc<AuthService>,
}

impl OverviewService {
    pub fn new(gateway: Arc<dyn MagisterGateway>, auth: Arc<AuthService>) -> Self {
        Self { gateway, auth }
    }

    /// Collect the overview. If any section was rejected for auth, log in again and
    /// collect once more.
    pub async fn collect(&self) -> Result<Overview, DomainError> {
        let token = self.auth.current_token().await?;
        self.gateway.set_token(&token).await;

        let overview = self.collect_once().await;
        if !overview.any_unauthorized() {
            return Ok(overview);
        }
        info!("token rejected; logging in again");
        let token = self.auth.refresh().await?;
        self.gateway.set_token(&token).await;
        Ok(self.collect_once().await)
    }

    async fn collect_once(&self) -> Overview {
        Overview {
            grades: self.gateway.get_grades(GRADES_SHOWN).await,
            inbox: self.inbox().await,
            open_assignments: self.gateway.get_assignments(true).await,
        }
    }

    async fn inbox(&self) -> Result<Option<InboxSummary>, DomainError> {
        let folders = self.gateway.get_folders().await?;
        let Some(inbox) = find_inbox(&folders) else {
            return Ok(None);
        };
        let latest = if inbox.unread_count > 0 {
            self.gateway.get_messages(inbox.id, MESSAGES_SHOWN).await?
        } else {
            Vec::new()
        };
        Ok(Some(InboxSummary {
            unread: inbox.unread_count,
            latest,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecases::auth_service::Credentials;
    use crate::usecases::test_support::{
        FakeAuth, FakeGateway, MemoryTokenStore, grade, inbox, message,
    };

    fn setup(token: &str) -> (Arc<FakeGateway>, Arc<FakeAuth>, OverviewService) {
        let gateway = Arc::new(FakeGateway::default());
        let auth = Arc::new(FakeAuth::new("fresh"));
        let auth_service = Arc::new(AuthService::new(
            Arc::clone(&auth) as _,
            Arc::new(MemoryTokenStore::with(token)),
            Credentials {
                school_url: "https://lyceum.magister.net".into(),
                username: Some("sanne".into()),
                password: Some("pw".into()),
            },
        ));
        let svc = OverviewService::new(Arc::clone(&gateway) as _, auth_service);
        (gateway, auth, svc)
    }

    #[tokio::test]
    async fn unread_mail_fetches_latest() {
        let (gateway, _auth, svc) = setup("tok");
        *gateway.folders.lock().unwrap() = vec![inbox(2)];
        gateway.messages.lock().unwrap().extend([message(1, "a"), message(2, "b")]);
        for i in 0..8 {
            gateway.grades.lock().unwrap().push(grade(i, "vak"));
        }

        let o = svc.collect().await.unwrap();
        assert_eq!(o.grades.unwrap().len(), 5);
        let inbox = o.inbox.unwrap().unwrap();
        assert_eq!(inbox.unread, 2);
        assert_eq!(inbox.latest.len(), 2);
    }

    #[tokio::test]
    async fn no_unread_skips_message_fetch() {
        let (gateway, _auth, svc) = setup("tok");
        gateway.messages.lock().unwrap().push(message(1, "a"));
        let o = svc.collect().await.unwrap();
        assert!(o.inbox.unwrap().unwrap().latest.is_empty());
    }

    #[tokio::test]
    async fn section_errors_are_isolated() {
        let (gateway, _auth, svc) = setup("tok");
        *gateway.folders_error.lock().unwrap() = Some(500);
        let o = svc.collect().await.unwrap();
        assert!(o.grades.is_ok());
        assert!(o.inbox.is_err());
        assert!(o.open_assignments.is_ok());
    }

    #[tokio::test]
    async fn rejected_token_refreshed_once() {
        let (gateway, auth, svc) = setup("stale");
        gateway.accept_only_token("fresh");
        let o = svc.collect().await.unwrap();
        assert!(o.grades.is_ok());
        assert_eq!(auth.logins(), 1);
    }
}
