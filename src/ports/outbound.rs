//! Outbound ports. Application calls into infrastructure.
//!
//! Implemented by adapters.

use crate::domain::{
    AccountInfo, Appointment, Assignment, DomainError, Grade, Message, MessageFolder,
    OutgoingMail, StudyGuide, StudyGuideItem, WatchState,
};
use chrono::NaiveDate;

/// Magister REST API gateway for one tenant and one logged-in account.
#[async_trait::async_trait]
pub trait MagisterGateway: Send + Sync {
    /// Replace the bearer token (after a refresh). Cached person id is kept.
    async fn set_token(&self, token: &str);

    async fn get_account(&self) -> Result<AccountInfo, DomainError>;

    /// Untyped `/api/account` body, for dumps.
    async fn get_account_raw(&self) -> Result<serde_json::Value, DomainError>;

    /// Latest grades, newest first.
    async fn get_grades(&self, limit: u32) -> Result<Vec<Grade>, DomainError>;

    /// Appointments with `start <= date <= end` (inclusive calendar days).
    async fn get_schedule(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Appointment>, DomainError>;

    async fn get_folders(&self) -> Result<Vec<MessageFolder>, DomainError>;

    async fn get_messages(&self, folder_id: i64, limit: u32) -> Result<Vec<Message>, DomainError>;

    /// Returns false when Magister rejects the mail (non-2xx); transport failures are errors.
    async fn send_mail(&self, mail: &OutgoingMail) -> Result<bool, DomainError>;

    async fn get_study_guides(&self) -> Result<Vec<StudyGuide>, DomainError>;

    /// Empty when the guide has no items (204/404 or an unreadable body).
    async fn get_study_guide_items(&self, guide_id: i64)
    -> Result<Vec<StudyGuideItem>, DomainError>;

    async fn get_assignments(&self, open_only: bool) -> Result<Vec<Assignment>, DomainError>;
}

/// Obtains a fresh access token from credentials.
#[async_trait::async_trait]
pub trait AuthPort: Send + Sync {
    async fn login(
        &self,
        school_url: &str,
        username: &str,
        password: &str,
    ) -> Result<String, DomainError>;
}

/// Persists the access token between runs.
#[async_trait::async_trait]
pub trait TokenStore: Send + Sync {
    /// Stored token, or None when nothing (or only whitespace) is stored.
    async fn load(&self) -> Result<Option<String>, DomainError>;

    async fn save(&self, token: &str) -> Result<(), DomainError>;
}

/// Delivers alert text to the user.
#[async_trait::async_trait]
pub trait NotifierPort: Send + Sync {
    async fn notify(&self, text: &str) -> Result<(), DomainError>;
}

/// Watcher state storage.
#[async_trait::async_trait]
pub trait StatePort: Send + Sync {
    /// Returns the default (uninitialized) state when nothing is stored.
    async fn load(&self) -> Result<WatchState, DomainError>;

    async fn save(&self, state: &WatchState) -> Result<(), DomainError>;
}

/// Writes dump files.
#[async_trait::async_trait]
pub trait DumpPort: Send + Sync {
    /// Write `value` as pretty JSON to `<dump dir>/<file_name>`. Returns the written path.
    async fn save_json(
        &self,
        file_name: &str,
        value: &serde_json::Value,
    ) -> Result<std::path::PathBuf, DomainError>;
}
