//! Implements MagisterGateway over the Magister REST API (reqwest).
//!
//! One client per tenant. The bearer token sits behind a lock so the watcher can swap it after a
//! refresh without rebuilding the client; the person id is resolved once via `/api/account`.

use crate::adapters::connect_timeout;
use crate::domain::{
    AccountInfo, Appointment, Assignment, DomainError, Grade, Message, MessageFolder,
    OutgoingMail, StudyGuide, StudyGuideItem,
};
use crate::ports::MagisterGateway;
use crate::shared::config::DEFAULT_HTTP_TIMEOUT_SECS;
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::time::Duration;
use tokio::sync::{OnceCell, RwLock};
use tracing::debug;

/// Magister API client bound to one school and one token.
pub struct MagisterClient {
    client: Client,
    base_url: String,
    /// Full header value, always `Bearer <token>`.
    authorization: RwLock<String>,
    person_id: OnceCell<i64>,
}

impl MagisterClient {
    /// Create a client for `base_url` (e.g. "https://school.magister.net").
    /// `token` may be given with or without the `Bearer ` prefix.
    pub fn new(base_url: &str, token: &str) -> Result<Self, DomainError> {
        Self::with_timeout(base_url, token, Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS))
    }

    /// Like [`MagisterClient::new`], with an explicit per-request timeout.
    pub fn with_timeout(
        base_url: &str,
        token: &str,
        timeout: Duration,
    ) -> Result<Self, DomainError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("magister-watch/", env!("CARGO_PKG_VERSION"))),
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .connect_timeout(connect_timeout(timeout))
            .build()
            .map_err(|e| DomainError::Http(format!("build client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            authorization: RwLock::new(bearer(token)),
            person_id: OnceCell::new(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn authorized(&self, req: RequestBuilder) -> RequestBuilder {
        let auth = self.authorization.read().await;
        req.header(AUTHORIZATION, auth.as_str())
    }

    async fn send(&self, req: RequestBuilder) -> Result<reqwest::Response, DomainError> {
        self.authorized(req)
            .await
            .send()
            .await
            .map_err(|e| DomainError::Http(e.to_string()))
    }

    /// GET and decode JSON; any non-2xx becomes Unauthorized or Api.
    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value, DomainError> {
        debug!(path, "GET");
        let res = self.send(self.client.get(self.url(path)).query(query)).await?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(DomainError::from_status(status.as_u16(), &body));
        }
        res.json()
            .await
            .map_err(|e| DomainError::Decode(format!("{}: {}", path, e)))
    }

    async fn person_id(&self) -> Result<i64, DomainError> {
        self.person_id
            .get_or_try_init(|| async {
                let account = self.get_account().await?;
                debug!(person_id = account.person.id, "resolved person id");
                Ok::<_, DomainError>(account.person.id)
            })
            .await
            .copied()
    }
}

fn bearer(token: &str) -> String {
    let token = token.trim();
    if token.starts_with("Bearer ") {
        token.to_string()
    } else {
        format!("Bearer {}", token)
    }
}

fn paging(limit: u32) -> [(&'static str, String); 2] {
    [("top", limit.to_string()), ("skip", "0".to_string())]
}

/// Decode `body[key]` as a list. A missing key is an error only when `required`.
fn decode_items<T: DeserializeOwned>(
    body: Value,
    key: &str,
    required: bool,
) -> Result<Vec<T>, DomainError> {
    let items = match body {
        Value::Object(mut map) => map.remove(key),
        _ => None,
    };
    match items {
        Some(v) => serde_json::from_value(v)
            .map_err(|e| DomainError::Decode(format!("{}: {}", key, e))),
        None if required => Err(DomainError::Decode(format!("missing '{}' in response", key))),
        None => Ok(Vec::new()),
    }
}

#[async_trait]
impl MagisterGateway for MagisterClient {
    async fn set_token(&self, token: &str) {
        *self.authorization.write().await = bearer(token);
    }

    async fn get_account(&self) -> Result<AccountInfo, DomainError> {
        let raw = self.get_account_raw().await?;
        serde_json::from_value(raw).map_err(|e| DomainError::Decode(format!("account: {}", e)))
    }

    async fn get_account_raw(&self) -> Result<Value, DomainError> {
        self.get_json("/api/account", &[]).await
    }

    async fn get_grades(&self, limit: u32) -> Result<Vec<Grade>, DomainError> {
        let pid = self.person_id().await?;
        let body = self
            .get_json(&format!("/api/personen/{}/cijfers/laatste", pid), &paging(limit))
            .await?;
        decode_items(body, "items", false)
    }

    async fn get_schedule(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Appointment>, DomainError> {
        let pid = self.person_id().await?;
        let query = [
            ("van", start.format("%Y-%m-%d").to_string()),
            ("tot", end.format("%Y-%m-%d").to_string()),
        ];
        let body = self
            .get_json(&format!("/api/personen/{}/afspraken", pid), &query)
            .await?;
        decode_items(body, "Items", false)
    }

    async fn get_folders(&self) -> Result<Vec<MessageFolder>, DomainError> {
        let body = self.get_json("/api/berichten/mappen", &[]).await?;
        decode_items(body, "items", true)
    }

    async fn get_messages(&self, folder_id: i64, limit: u32) -> Result<Vec<Message>, DomainError> {
        let body = self
            .get_json(
                &format!("/api/berichten/mappen/{}/berichten", folder_id),
                &paging(limit),
            )
            .await?;
        decode_items(body, "items", true)
    }

    async fn send_mail(&self, mail: &OutgoingMail) -> Result<bool, DomainError> {
        let payload = json!({
            "onderwerp": mail.subject,
            "inhoud": mail.body,
            "ontvangers": [{"id": mail.recipient_id, "type": "persoon"}],
            "prioriteit": 0,
            "bevestigingGevraagd": false
        });
        let res = self
            .send(self.client.post(self.url("/api/berichten")).json(&payload))
            .await?;
        let status = res.status();
        debug!(status = status.as_u16(), "send mail response");
        Ok(matches!(
            status,
            StatusCode::OK | StatusCode::CREATED | StatusCode::NO_CONTENT
        ))
    }

    async fn get_study_guides(&self) -> Result<Vec<StudyGuide>, DomainError> {
        let pid = self.person_id().await?;
        let body = self
            .get_json(&format!("/api/leerlingen/{}/studiewijzers", pid), &[])
            .await?;
        decode_items(body, "Items", true)
    }

    async fn get_study_guide_items(
        &self,
        guide_id: i64,
    ) -> Result<Vec<StudyGuideItem>, DomainError> {
        let pid = self.person_id().await?;
        let path = format!("/api/leerlingen/{}/studiewijzers/{}/onderdelen", pid, guide_id);
        let res = self.send(self.client.get(self.url(&path))).await?;
        let status = res.status();
        if status == StatusCode::NO_CONTENT || status == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(DomainError::from_status(status.as_u16(), &body));
        }
        match res.json::<Value>().await {
            Ok(body) => decode_items(body, "Items", false),
            Err(e) => {
                debug!(guide_id, error = %e, "unreadable study guide items body");
                Ok(Vec::new())
            }
        }
    }

    async fn get_assignments(&self, open_only: bool) -> Result<Vec<Assignment>, DomainError> {
        let pid = self.person_id().await?;
        let body = self
            .get_json(&format!("/api/personen/{}/opdrachten", pid), &paging(50))
            .await?;
        let all: Vec<Assignment> = decode_items(body, "Items", true)?;
        if open_only {
            Ok(all.into_iter().filter(Assignment::is_open).collect())
        } else {
            Ok(all)
        }
    }
}
