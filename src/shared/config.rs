//! Application configuration. Credentials, endpoints, paths, intervals.

use serde::Deserialize;

/// Default identity provider for all Magister tenants.
pub const DEFAULT_ACCOUNTS_URL: &str = "https://accounts.magister.net";

/// Per-request timeout for every HTTP client unless MAGISTER_HTTP_TIMEOUT_SECS overrides it.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 20;

/// Webhook placeholder shipped in example configs. Treated as "not configured".
pub const WEBHOOK_PLACEHOLDER: &str = "YOUR_ID";

#[derive(Debug, Deserialize, Default, Clone)]
pub struct AppConfig {
    /// Tenant URL (`https://<school>.magister.net`) or bare school name.
    /// Read from MAGISTER_SCHOOL_URL.
    #[serde(default)]
    pub school_url: Option<String>,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    /// Cached access token path. Read from MAGISTER_TOKEN_FILE.
    #[serde(default)]
    pub token_file: Option<String>,

    /// Discord webhook for alerts. Read from MAGISTER_DISCORD_WEBHOOK.
    #[serde(default)]
    pub discord_webhook: Option<String>,

    /// Watcher cycle sleep in seconds (default 60). Read from MAGISTER_CHECK_INTERVAL_SECS.
    #[serde(default)]
    pub check_interval_secs: Option<u64>,

    #[serde(default)]
    pub dump_dir: Option<String>,

    /// Watcher seen-ids state. Read from MAGISTER_STATE_FILE.
    #[serde(default)]
    pub state_file: Option<String>,

    /// Identity provider base URL. Only overridden for testing.
    #[serde(default)]
    pub accounts_url: Option<String>,

    /// Per-request HTTP timeout in seconds (default 20). Read from MAGISTER_HTTP_TIMEOUT_SECS.
    #[serde(default)]
    pub http_timeout_secs: Option<u64>,
}

impl AppConfig {
    /// Any malformed value fails the whole load; callers must not fall back to defaults.
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenv::dotenv().ok();
        let mut cfg = Self::from_sources(std::env::var("MAGISTER_CONFIG").ok(), None)?;
        // CHECK_INTERVAL is accepted unprefixed too, so older .env files keep working
        if cfg.check_interval_secs.is_none() {
            if let Ok(s) = std::env::var("CHECK_INTERVAL") {
                if let Ok(n) = s.parse::<u64>() {
                    cfg.check_interval_secs = Some(n);
                }
            }
        }
        Ok(cfg)
    }

    /// Optional config file, then `MAGISTER_*` variables from `env` (the process
    /// environment when None).
    fn from_sources(
        file: Option<String>,
        env: Option<Vec<(String, String)>>,
    ) -> Result<Self, config::ConfigError> {
        let mut c = config::Config::builder();
        if let Some(path) = file {
            c = c.add_source(config::File::with_name(&path));
        }
        let vars = env.map(|pairs| pairs.into_iter().collect());
        c = c.add_source(config::Environment::with_prefix("MAGISTER").source(vars));
        c.build()?.try_deserialize()
    }

    /// School URL as `https://<school>.magister.net`, or None if unset.
    pub fn school_url(&self) -> Option<String> {
        self.school_url
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(normalize_school_url)
    }

    pub fn token_file_or_default(&self) -> String {
        self.token_file
            .clone()
            .unwrap_or_else(|| "access_token.txt".to_string())
    }

    pub fn check_interval_secs_or_default(&self) -> u64 {
        self.check_interval_secs.unwrap_or(60)
    }

    pub fn http_timeout_secs_or_default(&self) -> u64 {
        self.http_timeout_secs.filter(|s| *s > 0).unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS)
    }

    pub fn dump_dir_or_default(&self) -> String {
        self.dump_dir
            .clone()
            .unwrap_or_else(|| "magister_dump".to_string())
    }

    pub fn state_file_or_default(&self) -> String {
        self.state_file
            .clone()
            .unwrap_or_else(|| "watch_state.json".to_string())
    }

    pub fn accounts_url_or_default(&self) -> String {
        self.accounts_url
            .clone()
            .unwrap_or_else(|| DEFAULT_ACCOUNTS_URL.to_string())
    }

    /// Webhook URL when set and not the placeholder.
    pub fn discord_webhook(&self) -> Option<String> {
        self.discord_webhook
            .clone()
            .filter(|w| !w.trim().is_empty() && !w.contains(WEBHOOK_PLACEHOLDER))
    }

    /// True if username and password are both present.
    pub fn has_credentials(&self) -> bool {
        self.username.as_deref().is_some_and(|s| !s.is_empty())
            && self.password.as_deref().is_some_and(|s| !s.is_empty())
    }
}

/// `school` -> `https://school.magister.net`; full URLs lose their trailing slash.
pub fn normalize_school_url(raw: &str) -> String {
    let raw = raw.trim().trim_end_matches('/');
    if raw.starts_with("http://") || raw.starts_with("https://") {
        raw.to_string()
    } else if raw.contains('.') {
        format!("https://{}", raw)
    } else {
        format!("https://{}.magister.net", raw)
    }
}
