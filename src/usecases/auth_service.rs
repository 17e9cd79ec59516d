//! Token lifecycle: reuse the cached token, log in when there is none, re-login when it expires.

use crate::domain::DomainError;
use crate::ports::{AuthPort, MagisterGateway, TokenStore};
use std::future::Future;
use std::sync::Arc;
use tracing::info;

/// Login data for one account.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub school_url: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

pub struct AuthService {
    auth: Arc<dyn AuthPort>,
    store: Arc<dyn TokenStore>,
    credentials: Credentials,
}

impl AuthService {
    pub fn new(
        auth: Arc<dyn AuthPort>,
        store: Arc<dyn TokenStore>,
        credentials: Credentials,
    ) -> Self {
        Self {
            auth,
            store,
            credentials,
        }
    }

    /// Cached token if present, otherwise a fresh login (saved for next time).
    pub async fn current_token(&self) -> Result<String, DomainError> {
        if let Some(token) = self.store.load().await? {
            return Ok(token);
        }
        info!("no cached token; logging in");
        self.refresh().await
    }

    /// Log in again and overwrite the cached token.
    pub async fn refresh(&self) -> Result<String, DomainError> {
        let (username, password) = match (&self.credentials.username, &self.credentials.password) {
            (Some(u), Some(p)) if !u.is_empty() && !p.is_empty() => (u, p),
            _ => {
                return Err(DomainError::Config(
                    "username and password are required to log in (MAGISTER_USERNAME, MAGISTER_PASSWORD)"
                        .into(),
                ));
            }
        };
        info!(username = %username, "refreshing session");
        let token = self
            .auth
            .login(&self.credentials.school_url, username, password)
            .await?;
        self.store.save(&token).await?;
        info!("token refreshed");
        Ok(token)
    }

    /// Run `op` with a token set on `gateway`; on Unauthorized, log in again and retry once.
    pub async fn with_fresh_token<T, F, Fut>(
        &self,
        gateway: &dyn MagisterGateway,
        op: F,
    ) -> Result<T, DomainError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, DomainError>>,
    {
        let token = self.current_token().await?;
        gateway.set_token(&token).await;
        match op().await {
            Err(e) if e.is_unauthorized() => {
                info!("token expired; logging in again");
                let token = self.refresh().await?;
                gateway.set_token(&token).await;
                op().await
            }
            other => other,
        }
    }
}
