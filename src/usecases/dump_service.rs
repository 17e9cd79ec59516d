//! Dump use case: export profile, grades, schedule, inbox, assignments and study guides
//! as JSON files.

use crate::domain::{DomainError, StudyGuide, StudyGuideItem, find_inbox};
use crate::ports::{DumpPort, MagisterGateway};
use crate::usecases::auth_service::AuthService;
use chrono::{Days, Local};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

const GRADE_LIMIT: u32 = 50;
const MESSAGE_LIMIT: u32 = 20;
const SCHEDULE_DAYS: u64 = 7;

/// A study guide with its sections, as written to `study_guides.json`.
#[derive(Debug, Serialize)]
struct StudyGuideDump {
    #[serde(flatten)]
    guide: StudyGuide,
    #[serde(rename = "Onderdelen")]
    items: Vec<StudyGuideItemDump>,
}

#[derive(Debug, Serialize)]
struct StudyGuideItemDump {
    #[serde(flatten)]
    item: StudyGuideItem,
    #[serde(rename = "Url")]
    url: Option<String>,
}

pub struct DumpService {
    gateway: Arc<dyn MagisterGateway>,
    auth: Arc<AuthService>,
    dump: Arc<dyn DumpPort>,
}

/// Files written by one dump.
#[derive(Debug, Default)]
pub struct DumpReport {
    pub written: Vec<PathBuf>,
    pub inbox_found: bool,
}

impl DumpService {
    pub fn new(
        gateway: Arc<dyn MagisterGateway>,
        auth: Arc<AuthService>,
        dump: Arc<dyn DumpPort>,
    ) -> Self {
        Self {
            gateway,
            auth,
            dump,
        }
    }

    /// Dump everything; an expired token is refreshed once and the dump retried.
    pub async fn run(&self) -> Result<DumpReport, DomainError> {
        self.auth
            .with_fresh_token(self.gateway.as_ref(), || self.dump_once())
            .await
    }

    async fn dump_once(&self) -> Result<DumpReport, DomainError> {
        let mut report = DumpReport::default();

        info!("fetching profile");
        let profile = self.gateway.get_account_raw().await?;
        self.save(&mut report, "profile.json", &profile).await;

        info!("fetching grades");
        let grades = self.gateway.get_grades(GRADE_LIMIT).await?;
        self.save(&mut report, "grades.json", &grades).await;

        info!("fetching schedule");
        let today = Local::now().date_naive();
        let end = today
            .checked_add_days(Days::new(SCHEDULE_DAYS))
            .unwrap_or(today);
        let schedule = self.gateway.get_schedule(today, end).await?;
        info!(
            appointments = schedule.len(),
            homework = schedule.iter().filter(|a| a.has_homework()).count(),
            "schedule fetched"
        );
        self.save(&mut report, "schedule.json", &schedule).await;

        info!("fetching messages");
        let folders = self.gateway.get_folders().await?;
        match find_inbox(&folders) {
            Some(inbox) => {
                report.inbox_found = true;
                let messages = self.gateway.get_messages(inbox.id, MESSAGE_LIMIT).await?;
                self.save(&mut report, "messages.json", &messages).await;
            }
            None => warn!("no inbox folder found; skipping messages"),
        }

        info!("fetching assignments");
        let assignments = self.gateway.get_assignments(false).await?;
        self.save(&mut report, "assignments.json", &assignments).await;

        info!("fetching study guides");
        let mut guides = Vec::new();
        for guide in self.gateway.get_study_guides().await? {
            let items = self
                .gateway
                .get_study_guide_items(guide.id)
                .await?
                .into_iter()
                .map(|item| StudyGuideItemDump {
                    url: item.url().map(str::to_string),
                    item,
                })
                .collect();
            guides.push(StudyGuideDump { guide, items });
        }
        self.save(&mut report, "study_guides.json", &guides).await;

        info!(files = report.written.len(), "dump complete");
        Ok(report)
    }

    /// A failed file write is logged; the dump goes on.
    async fn save<T: Serialize + ?Sized>(&self, report: &mut DumpReport, name: &str, data: &T) {
        let value = match serde_json::to_value(data) {
            Ok(v) => v,
            Err(e) => {
                warn!(file = name, error = %e, "failed to serialize dump data");
                return;
            }
        };
        match self.dump.save_json(name, &value).await {
            Ok(path) => report.written.push(path),
            Err(e) => warn!(file = name, error = %e, "failed to save dump file"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Assignment, StudyGuide, StudyGuideItem};
    use crate::usecases::auth_service::Credentials;
    use crate::usecases::test_support::{
        FakeAuth, FakeGateway, MemoryDump, MemoryTokenStore, at, grade, message,
    };

    fn setup(token: &str) -> (Arc<FakeGateway>, Arc<FakeAuth>, Arc<MemoryDump>, DumpService) {
        let gateway = Arc::new(FakeGateway::default());
        let auth = Arc::new(FakeAuth::new("fresh"));
        let dump = Arc::new(MemoryDump::default());
        let auth_service = Arc::new(AuthService::new(
            Arc::clone(&auth) as _,
            Arc::new(MemoryTokenStore::with(token)),
            Credentials {
                school_url: "https://lyceum.magister.net".into(),
                username: Some("sanne".into()),
                password: Some("pw".into()),
            },
        ));
        let svc =
            DumpService::new(Arc::clone(&gateway) as _, auth_service, Arc::clone(&dump) as _);
        (gateway, auth, dump, svc)
    }

    #[tokio::test]
    async fn writes_all_datasets() {
        let (gateway, _auth, dump, svc) = setup("tok");
        gateway.grades.lock().unwrap().push(grade(1, "Frans"));
        gateway.messages.lock().unwrap().push(message(2, "Mentor"));
        gateway.assignments.lock().unwrap().push(Assignment {
            id: 4,
            title: "Werkstuk".into(),
            deadline: at(23, 0),
            closed: false,
            graded: false,
            status: None,
        });

        let report = svc.run().await.unwrap();
        assert!(report.inbox_found);
        assert_eq!(report.written.len(), 6);
        assert_eq!(
            dump.names(),
            vec![
                "assignments.json",
                "grades.json",
                "messages.json",
                "profile.json",
                "schedule.json",
                "study_guides.json"
            ]
        );
        let files = dump.files.lock().unwrap();
        assert_eq!(files["grades.json"][0]["vak"]["omschrijving"], "Frans");
        assert_eq!(files["profile.json"]["Persoon"]["Id"], 1234);
    }

    #[tokio::test]
    async fn schedule_spans_a_week() {
        let (gateway, _auth, _dump, svc) = setup("tok");
        svc.run().await.unwrap();
        let (start, end) = gateway.schedule_ranges.lock().unwrap()[0];
        assert_eq!((end - start).num_days(), 7);
    }

    #[tokio::test]
    async fn missing_inbox_skips_messages_file() {
        let (gateway, _auth, dump, svc) = setup("tok");
        gateway.folders.lock().unwrap().clear();
        let report = svc.run().await.unwrap();
        assert!(!report.inbox_found);
        assert!(!dump.names().contains(&"messages.json".to_string()));
    }

    #[tokio::test]
    async fn expired_token_retried_once() {
        let (gateway, auth, dump, svc) = setup("stale");
        gateway.accept_only_token("fresh");
        svc.run().await.unwrap();
        assert_eq!(auth.logins(), 1);
        assert_eq!(dump.names().len(), 6);
    }

    #[tokio::test]
    async fn other_errors_are_returned() {
        let (gateway, auth, _dump, svc) = setup("tok");
        *gateway.folders_error.lock().unwrap() = Some(503);
        let err = svc.run().await.unwrap_err();
        assert!(matches!(err, DomainError::Api { status: 503, .. }));
        assert_eq!(auth.logins(), 0);
    }

    #[tokio::test]
    async fn failed_write_does_not_stop_the_dump() {
        let (_gateway, _auth, dump, svc) = setup("tok");
        *dump.fail_file.lock().unwrap() = Some("grades.json".into());
        let report = svc.run().await.unwrap();
        assert_eq!(report.written.len(), 5);
        let names = dump.names();
        assert!(!names.contains(&"grades.json".to_string()));
        assert!(names.contains(&"study_guides.json".to_string()));
    }

    #[tokio::test]
    async fn study_guides_include_their_sections() {
        let (gateway, _auth, dump, svc) = setup("tok");
        gateway.study_guides.lock().unwrap().push(StudyGuide {
            id: 3,
            title: "Geschiedenis P2".into(),
        });
        gateway.study_guide_items.lock().unwrap().insert(
            3,
            vec![StudyGuideItem {
                id: 30,
                title: "Hoofdstuk 4".into(),
                resource_type: "Bron".into(),
                links: vec![serde_json::json!({"Rel": "Content", "Href": "/api/content/30"})],
            }],
        );

        svc.run().await.unwrap();
        let files = dump.files.lock().unwrap();
        let guide = &files["study_guides.json"][0];
        assert_eq!(guide["Titel"], "Geschiedenis P2");
        assert_eq!(guide["Onderdelen"][0]["Titel"], "Hoofdstuk 4");
        assert_eq!(guide["Onderdelen"][0]["Url"], "/api/content/30");
    }
}
