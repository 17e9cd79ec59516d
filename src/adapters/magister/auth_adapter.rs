//! Implements AuthPort with the accounts.magister.net challenge flow over plain HTTP.
//!
//! Flow: open the login session -> scrape the account bundle for the authCode -> answer the tenant,
//! username and password challenges -> hit `/connect/authorize` and read the token from the
//! redirect. Cookies (session + XSRF) are shared by both clients through one jar.

use crate::adapters::connect_timeout;
use crate::adapters::magister::authcode::extract_authcode;
use crate::adapters::magister::oauth::{authorize_params, extract_access_token, school_subdomain};
use crate::domain::DomainError;
use crate::ports::AuthPort;
use crate::shared::config::DEFAULT_HTTP_TIMEOUT_SECS;
use async_trait::async_trait;
use regex::Regex;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::redirect::Policy;
use reqwest::{Client, header::LOCATION};
use serde_json::{Map, Value, json};
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

const XSRF_COOKIE: &str = "XSRF-TOKEN";

static SCRIPT_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script\b([^>]*)>").expect("script tag regex"));
static SRC_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\bsrc\s*=\s*["']([^"']+)["']"#).expect("src attribute regex")
});
static DEFER_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bdefer\b").expect("defer attribute regex"));

/// HTTP login against the Magister identity provider.
pub struct HttpAuthAdapter {
    accounts_url: Url,
    timeout: Duration,
}

impl HttpAuthAdapter {
    /// `accounts_url` is normally `https://accounts.magister.net`.
    pub fn new(accounts_url: &str) -> Result<Self, DomainError> {
        Self::with_timeout(accounts_url, Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS))
    }

    /// Every request of a login attempt is bounded by `timeout`.
    pub fn with_timeout(accounts_url: &str, timeout: Duration) -> Result<Self, DomainError> {
        let accounts_url = Url::parse(accounts_url)
            .map_err(|e| DomainError::Config(format!("invalid accounts URL: {}", e)))?;
        Ok(Self {
            accounts_url,
            timeout,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, DomainError> {
        self.accounts_url
            .join(path)
            .map_err(|e| DomainError::Auth(format!("bad endpoint '{}': {}", path, e)))
    }
}

/// One login attempt: clients, cookie jar and the accumulated challenge payload.
struct LoginSession {
    jar: Arc<Jar>,
    client: Client,
    no_redirect: Client,
    payload: Map<String, Value>,
}

impl LoginSession {
    fn new(timeout: Duration) -> Result<Self, DomainError> {
        let jar = Arc::new(Jar::default());
        let build = |policy: Policy| {
            Client::builder()
                .cookie_provider(Arc::clone(&jar))
                .redirect(policy)
                .timeout(timeout)
                .connect_timeout(connect_timeout(timeout))
                .build()
                .map_err(|e| DomainError::Http(format!("build client: {}", e)))
        };
        Ok(Self {
            client: build(Policy::default())?,
            no_redirect: build(Policy::none())?,
            jar,
            payload: Map::new(),
        })
    }

    fn xsrf_token(&self, url: &Url) -> Option<String> {
        let header = self.jar.cookies(url)?;
        let raw = header.to_str().ok()?;
        raw.split(';').find_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            (name == XSRF_COOKIE).then(|| value.to_string())
        })
    }

    /// POST the accumulated payload to a challenge endpoint.
    async fn challenge(&self, url: Url, name: &str) -> Result<reqwest::Response, DomainError> {
        let mut req = self.client.post(url.clone()).json(&self.payload);
        if let Some(token) = self.xsrf_token(&url) {
            req = req.header("X-XSRF-TOKEN", token);
        }
        let res = req
            .send()
            .await
            .map_err(|e| DomainError::Http(format!("{} challenge: {}", name, e)))?;
        debug!(challenge = name, status = res.status().as_u16(), "challenge answered");
        Ok(res)
    }
}

/// Script src to download: prefer a deferred script, else one that looks like the app bundle.
fn find_bundle_src(html: &str) -> Option<String> {
    let tags: Vec<&str> = SCRIPT_TAG
        .captures_iter(html)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect();
    let src_of = |attrs: &str| SRC_ATTR.captures(attrs).map(|c| c[1].to_string());

    tags.iter()
        .filter(|attrs| DEFER_ATTR.is_match(attrs))
        .find_map(|attrs| src_of(attrs))
        .or_else(|| {
            tags.iter()
                .filter_map(|attrs| src_of(attrs))
                .find(|src| src.contains("main") || src.contains("account"))
        })
}

fn query_value(url: &Url, key: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

#[async_trait]
impl AuthPort for HttpAuthAdapter {
    async fn login(
        &self,
        school_url: &str,
        username: &str,
        password: &str,
    ) -> Result<String, DomainError> {
        let subdomain = school_subdomain(school_url)?;
        let mut session = LoginSession::new(self.timeout)?;
        info!(school = %subdomain, "starting Magister login");

        // 1. Login session
        let res = session
            .client
            .get(self.accounts_url.clone())
            .send()
            .await
            .map_err(|e| DomainError::Http(format!("open login page: {}", e)))?;
        let landing = res.url().clone();
        let html = res
            .text()
            .await
            .map_err(|e| DomainError::Http(format!("read login page: {}", e)))?;
        let session_id = query_value(&landing, "sessionId")
            .ok_or_else(|| DomainError::Auth("no sessionId on login page URL".into()))?;
        let return_url = query_value(&landing, "returnUrl")
            .ok_or_else(|| DomainError::Auth("no returnUrl on login page URL".into()))?;

        // 2. authCode from the account bundle
        let src = find_bundle_src(&html)
            .ok_or_else(|| DomainError::Auth("account script not found on login page".into()))?;
        let js_url = landing
            .join(&src)
            .map_err(|e| DomainError::Auth(format!("bad script src '{}': {}", src, e)))?;
        debug!(url = %js_url, "downloading account bundle");
        let js = session
            .client
            .get(js_url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| DomainError::Http(format!("download account bundle: {}", e)))?
            .text()
            .await
            .map_err(|e| DomainError::Http(format!("read account bundle: {}", e)))?;
        let auth_code = extract_authcode(&js)?;

        session.payload.insert("authCode".into(), json!(auth_code));
        session.payload.insert("sessionId".into(), json!(session_id));
        session.payload.insert("returnUrl".into(), json!(return_url));

        // 3. Tenant
        let mut search = self.endpoint("challenges/tenant/search")?;
        search
            .query_pairs_mut()
            .append_pair("sessionId", &session_id)
            .append_pair("key", &subdomain);
        let tenants: Vec<Value> = session
            .client
            .get(search)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| DomainError::Http(format!("tenant search: {}", e)))?
            .json()
            .await
            .map_err(|e| DomainError::Decode(format!("tenant search: {}", e)))?;
        let tenant_id = tenants
            .first()
            .and_then(|t| t.get("id"))
            .cloned()
            .ok_or_else(|| DomainError::Auth(format!("school '{}' not found", subdomain)))?;
        session.payload.insert("tenant".into(), tenant_id);
        let res = session
            .challenge(self.endpoint("challenges/tenant")?, "tenant")
            .await?;
        if !res.status().is_success() {
            return Err(DomainError::Auth(format!(
                "tenant challenge rejected ({})",
                res.status()
            )));
        }

        // 4. Username
        session.payload.insert("username".into(), json!(username));
        let res = session
            .challenge(self.endpoint("challenges/username")?, "username")
            .await?;
        if !res.status().is_success() {
            return Err(DomainError::Auth(format!(
                "username challenge rejected ({})",
                res.status()
            )));
        }

        // 5. Password
        session.payload.insert("password".into(), json!(password));
        session
            .payload
            .insert("userWantsToPairSoftToken".into(), json!(false));
        let res = session
            .challenge(self.endpoint("challenges/password")?, "password")
            .await?;
        if !res.status().is_success() {
            return Err(DomainError::Auth(
                "incorrect credentials or Magister rejected them".into(),
            ));
        }

        // 6. Token from the authorize redirect
        let res = session
            .no_redirect
            .get(self.endpoint("connect/authorize")?)
            .query(&authorize_params(&subdomain))
            .send()
            .await
            .map_err(|e| DomainError::Http(format!("authorize: {}", e)))?;
        let location = res
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                DomainError::Auth(format!("authorize did not redirect ({})", res.status()))
            })?;
        let location = self
            .accounts_url
            .join(location)
            .map(String::from)
            .unwrap_or_else(|_| location.to_string());
        let token = extract_access_token(&location)
            .ok_or_else(|| DomainError::Auth("access token not found in redirect".into()))?;

        info!(school = %subdomain, "access token captured");
        Ok(token)
    }
}
