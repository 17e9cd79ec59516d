//! In-memory port implementations for use case tests.

use crate::domain::{
    AccountInfo, Appointment, Assignment, DomainError, Grade, Message, MessageFolder,
    OutgoingMail, Person, StudyGuide, StudyGuideItem, Subject, WatchState,
};
use crate::ports::{AuthPort, DumpPort, MagisterGateway, NotifierPort, StatePort, TokenStore};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::json;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

pub fn at(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, h, m, 0).unwrap()
}

pub fn grade(id: i64, subject: &str) -> Grade {
    Grade {
        id,
        description: "toets".into(),
        date_input: at(10, 0),
        subject: Subject {
            code: "xx".into(),
            description: subject.into(),
        },
        value: "7,0".into(),
        is_sufficient: true,
    }
}

pub fn message(id: i64, sender: &str) -> Message {
    Message {
        id,
        subject: format!("bericht {}", id),
        sent_at: at(12, 0),
        is_read: false,
        sender: json!({"naam": sender}),
    }
}

pub fn appointment(id: i64, location: &str) -> Appointment {
    Appointment {
        id,
        start: at(8, 30),
        end: at(9, 20),
        description: Some(format!("les {}", id)),
        location: Some(location.into()),
        content: None,
        completed: false,
    }
}

pub fn inbox(unread: u32) -> MessageFolder {
    MessageFolder {
        id: 1,
        name: "Postvak IN".into(),
        unread_count: unread,
    }
}

/// Scriptable gateway. When `accept_only_token` is set, any other token gets a 401.
pub struct FakeGateway {
    pub token: Mutex<String>,
    pub accepted: Mutex<Option<String>>,
    pub grades: Mutex<Vec<Grade>>,
    pub folders: Mutex<Vec<MessageFolder>>,
    pub messages: Mutex<Vec<Message>>,
    pub appointments: Mutex<Vec<Appointment>>,
    pub assignments: Mutex<Vec<Assignment>>,
    pub study_guides: Mutex<Vec<StudyGuide>>,
    pub study_guide_items: Mutex<HashMap<i64, Vec<StudyGuideItem>>>,
    pub folders_error: Mutex<Option<u16>>,
    pub sent_mail: Mutex<Vec<OutgoingMail>>,
    pub schedule_ranges: Mutex<Vec<(NaiveDate, NaiveDate)>>,
    /// When set, `get_grades` never completes.
    pub stalled: AtomicBool,
}

impl Default for FakeGateway {
    fn default() -> Self {
        Self {
            token: Mutex::new(String::new()),
            accepted: Mutex::new(None),
            grades: Mutex::new(Vec::new()),
            folders: Mutex::new(vec![inbox(0)]),
            messages: Mutex::new(Vec::new()),
            appointments: Mutex::new(Vec::new()),
            assignments: Mutex::new(Vec::new()),
            study_guides: Mutex::new(Vec::new()),
            study_guide_items: Mutex::new(HashMap::new()),
            folders_error: Mutex::new(None),
            sent_mail: Mutex::new(Vec::new()),
            schedule_ranges: Mutex::new(Vec::new()),
            stalled: AtomicBool::new(false),
        }
    }
}

impl FakeGateway {
    pub fn accept_only_token(&self, token: &str) {
        *self.accepted.lock().unwrap() = Some(token.to_string());
    }

    pub fn stall_grades(&self) {
        self.stalled.store(true, Ordering::SeqCst);
    }

    pub fn current_token(&self) -> String {
        self.token.lock().unwrap().clone()
    }

    fn check(&self) -> Result<(), DomainError> {
        match &*self.accepted.lock().unwrap() {
            Some(t) if *t != *self.token.lock().unwrap() => Err(DomainError::Unauthorized(401)),
            _ => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl MagisterGateway for FakeGateway {
    async fn set_token(&self, token: &str) {
        *self.token.lock().unwrap() = token.to_string();
    }

    async fn get_account(&self) -> Result<AccountInfo, DomainError> {
        self.check()?;
        Ok(AccountInfo {
            person: Person {
                id: 1234,
                first_name: "Sanne".into(),
                last_name: "Bakker".into(),
            },
        })
    }

    async fn get_account_raw(&self) -> Result<serde_json::Value, DomainError> {
        let account = self.get_account().await?;
        Ok(serde_json::to_value(account).unwrap())
    }

    async fn get_grades(&self, limit: u32) -> Result<Vec<Grade>, DomainError> {
        if self.stalled.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        self.check()?;
        Ok(self
            .grades
            .lock()
            .unwrap()
            .iter()
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn get_schedule(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Appointment>, DomainError> {
        self.check()?;
        self.schedule_ranges.lock().unwrap().push((start, end));
        Ok(self.appointments.lock().unwrap().clone())
    }

    async fn get_folders(&self) -> Result<Vec<MessageFolder>, DomainError> {
        self.check()?;
        if let Some(status) = *self.folders_error.lock().unwrap() {
            return Err(DomainError::from_status(status, "boom"));
        }
        Ok(self.folders.lock().unwrap().clone())
    }

    async fn get_messages(&self, _folder_id: i64, limit: u32) -> Result<Vec<Message>, DomainError> {
        self.check()?;
        Ok(self
            .messages
            .lock()
            .unwrap()
            .iter()
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn send_mail(&self, mail: &OutgoingMail) -> Result<bool, DomainError> {
        self.check()?;
        self.sent_mail.lock().unwrap().push(mail.clone());
        Ok(true)
    }

    async fn get_study_guides(&self) -> Result<Vec<StudyGuide>, DomainError> {
        self.check()?;
        Ok(self.study_guides.lock().unwrap().clone())
    }

    async fn get_study_guide_items(
        &self,
        guide_id: i64,
    ) -> Result<Vec<StudyGuideItem>, DomainError> {
        self.check()?;
        Ok(self
            .study_guide_items
            .lock()
            .unwrap()
            .get(&guide_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_assignments(&self, open_only: bool) -> Result<Vec<Assignment>, DomainError> {
        self.check()?;
        let all = self.assignments.lock().unwrap().clone();
        Ok(if open_only {
            all.into_iter().filter(Assignment::is_open).collect()
        } else {
            all
        })
    }
}

/// Login that always yields the same token (or fails when `token` is None).
pub struct FakeAuth {
    token: Option<String>,
    logins: AtomicUsize,
}

impl FakeAuth {
    pub fn new(token: &str) -> Self {
        Self {
            token: Some(token.to_string()),
            logins: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            token: None,
            logins: AtomicUsize::new(0),
        }
    }

    pub fn logins(&self) -> usize {
        self.logins.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl AuthPort for FakeAuth {
    async fn login(&self, _school: &str, _user: &str, _pass: &str) -> Result<String, DomainError> {
        self.logins.fetch_add(1, Ordering::SeqCst);
        self.token
            .clone()
            .ok_or_else(|| DomainError::Auth("login rejected".into()))
    }
}

#[derive(Default)]
pub struct MemoryTokenStore(Mutex<Option<String>>);

impl MemoryTokenStore {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with(token: &str) -> Self {
        Self(Mutex::new(Some(token.to_string())))
    }
}

#[async_trait::async_trait]
impl TokenStore for MemoryTokenStore {
    async fn load(&self) -> Result<Option<String>, DomainError> {
        Ok(self.0.lock().unwrap().clone())
    }

    async fn save(&self, token: &str) -> Result<(), DomainError> {
        *self.0.lock().unwrap() = Some(token.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<String>>,
    pub fail: bool,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl NotifierPort for RecordingNotifier {
    async fn notify(&self, text: &str) -> Result<(), DomainError> {
        self.sent.lock().unwrap().push(text.to_string());
        if self.fail {
            return Err(DomainError::Notify("webhook down".into()));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryState {
    pub stored: Mutex<Option<WatchState>>,
    pub saves: AtomicUsize,
}

#[async_trait::async_trait]
impl StatePort for MemoryState {
    async fn load(&self) -> Result<WatchState, DomainError> {
        Ok(self.stored.lock().unwrap().clone().unwrap_or_default())
    }

    async fn save(&self, state: &WatchState) -> Result<(), DomainError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        *self.stored.lock().unwrap() = Some(state.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryDump {
    pub files: Mutex<HashMap<String, serde_json::Value>>,
    /// Writes of this file name fail.
    pub fail_file: Mutex<Option<String>>,
}

impl MemoryDump {
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.files.lock().unwrap().keys().cloned().collect();
        names.sort();
        names
    }
}

#[async_trait::async_trait]
impl DumpPort for MemoryDump {
    async fn save_json(
        &self,
        file_name: &str,
        value: &serde_json::Value,
    ) -> Result<PathBuf, DomainError> {
        if self.fail_file.lock().unwrap().as_deref() == Some(file_name) {
            return Err(DomainError::Repo(format!("disk full: {}", file_name)));
        }
        self.files
            .lock()
            .unwrap()
            .insert(file_name.to_string(), value.clone());
        Ok(PathBuf::from(file_name))
    }
}
