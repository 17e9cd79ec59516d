//! Change detection between polling cycles.
//!
//! Pure functions over `WatchState`: no IO, so the watcher's alert rules are testable in isolation.
//! The first cycle only records a baseline; alerts start once `initialized` is set.

use crate::domain::{Appointment, Grade, Message};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// What the watcher remembers between cycles (persisted by StatePort).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WatchState {
    #[serde(default)]
    pub seen_grade_ids: HashSet<i64>,
    #[serde(default)]
    pub seen_message_ids: HashSet<i64>,
    /// appointment id -> fingerprint, for the current schedule window only.
    #[serde(default)]
    pub schedule_hashes: HashMap<i64, String>,
    #[serde(default)]
    pub initialized: bool,
}

/// A single notification. Carries no grade values or message bodies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Alert {
    NewGrade { subject: String },
    NewMessage { sender: String },
    ScheduleChanged { description: String },
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Alert::NewGrade { subject } => {
                write!(f, "📊 **New Grade** posted for **{}**.", subject)
            }
            Alert::NewMessage { sender } => {
                write!(f, "📧 **New Message** received from **{}**.", sender)
            }
            Alert::ScheduleChanged { description } => {
                write!(f, "📅 **Schedule Update**: '{}' has been modified.", description)
            }
        }
    }
}

/// SHA-256 over the fields whose change should trigger a schedule alert.
pub fn appointment_fingerprint(appt: &Appointment) -> String {
    let data = format!(
        "{}-{}-{}-{}-{}-{}",
        appt.id,
        appt.start.to_rfc3339(),
        appt.end.to_rfc3339(),
        appt.location.as_deref().unwrap_or(""),
        appt.description.as_deref().unwrap_or(""),
        appt.completed
    );
    hex::encode(Sha256::digest(data.as_bytes()))
}

/// Alerts for unseen grade ids (only once initialized). Records every current id as seen.
pub fn diff_grades(state: &mut WatchState, grades: &[Grade]) -> Vec<Alert> {
    let alerts = if state.initialized {
        grades
            .iter()
            .filter(|g| !state.seen_grade_ids.contains(&g.id))
            .map(|g| Alert::NewGrade {
                subject: g.subject.description.clone(),
            })
            .collect()
    } else {
        Vec::new()
    };
    state.seen_grade_ids.extend(grades.iter().map(|g| g.id));
    alerts
}

/// Alerts for unseen message ids (only once initialized). Records every current id as seen.
pub fn diff_messages(state: &mut WatchState, messages: &[Message]) -> Vec<Alert> {
    let alerts = if state.initialized {
        messages
            .iter()
            .filter(|m| !state.seen_message_ids.contains(&m.id))
            .map(|m| Alert::NewMessage {
                sender: m.sender_name().to_string(),
            })
            .collect()
    } else {
        Vec::new()
    };
    state.seen_message_ids.extend(messages.iter().map(|m| m.id));
    alerts
}

/// Alerts for known appointments whose fingerprint changed.
/// New or vanished appointments are silent.
/// Replaces the stored hashes with the current window.
pub fn diff_schedule(state: &mut WatchState, appointments: &[Appointment]) -> Vec<Alert> {
    let mut alerts = Vec::new();
    let mut current = HashMap::with_capacity(appointments.len());

    for appt in appointments {
        let h = appointment_fingerprint(appt);
        if state.initialized {
            if let Some(prev) = state.schedule_hashes.get(&appt.id) {
                if *prev != h {
                    alerts.push(Alert::ScheduleChanged {
                        description: appt.description.clone().unwrap_or_default(),
                    });
                }
            }
        }
        current.insert(appt.id, h);
    }

    state.schedule_hashes = current;
    alerts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Subject;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn grade(id: i64, subject: &str) -> Grade {
        Grade {
            id,
            description: "toets".into(),
            date_input: Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap(),
            subject: Subject {
                code: subject[..2].into(),
                description: subject.into(),
            },
            value: "8,0".into(),
            is_sufficient: true,
        }
    }

    fn message(id: i64, sender: &str) -> Message {
        Message {
            id,
            subject: "onderwerp".into(),
            sent_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
            is_read: false,
            sender: json!({"naam": sender}),
        }
    }

    fn appt(id: i64, location: &str) -> Appointment {
        Appointment {
            id,
            start: Utc.with_ymd_and_hms(2024, 3, 1, 8, 30, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2024, 3, 1, 9, 20, 0).unwrap(),
            description: Some(format!("les {}", id)),
            location: Some(location.into()),
            content: None,
            completed: false,
        }
    }

    #[test]
    fn first_cycle_is_silent_baseline() {
        let mut state = WatchState::default();
        assert!(diff_grades(&mut state, &[grade(1, "wiskunde")]).is_empty());
        assert!(diff_messages(&mut state, &[message(7, "Jansen")]).is_empty());
        assert!(diff_schedule(&mut state, &[appt(3, "A1")]).is_empty());
        assert!(state.seen_grade_ids.contains(&1));
        assert!(state.seen_message_ids.contains(&7));
        assert_eq!(state.schedule_hashes.len(), 1);
    }

    #[test]
    fn new_grades_alert_once() {
        let mut state = WatchState::default();
        diff_grades(&mut state, &[grade(1, "wiskunde")]);
        state.initialized = true;

        let grades = [grade(1, "wiskunde"), grade(2, "engels")];
        let alerts = diff_grades(&mut state, &grades);
        assert_eq!(
            alerts,
            vec![Alert::NewGrade {
                subject: "engels".into()
            }]
        );
        assert!(diff_grades(&mut state, &grades).is_empty());
    }

    #[test]
    fn seen_ids_survive_items_leaving_the_window() {
        let mut state = WatchState {
            initialized: true,
            ..Default::default()
        };
        diff_messages(&mut state, &[message(1, "a")]);
        diff_messages(&mut state, &[message(2, "b")]);
        assert!(diff_messages(&mut state, &[message(1, "a")]).is_empty());
    }

    #[test]
    fn schedule_change_detected_and_new_items_silent() {
        let mut state = WatchState::default();
        diff_schedule(&mut state, &[appt(1, "A1")]);
        state.initialized = true;

        let alerts = diff_schedule(&mut state, &[appt(1, "B2"), appt(2, "C3")]);
        assert_eq!(
            alerts,
            vec![Alert::ScheduleChanged {
                description: "les 1".into()
            }]
        );
        assert_eq!(state.schedule_hashes.len(), 2);

        // Vanished appointment is dropped from the map without an alert.
        assert!(diff_schedule(&mut state, &[appt(2, "C3")]).is_empty());
        assert_eq!(state.schedule_hashes.len(), 1);
    }

    #[test]
    fn fingerprint_tracks_completed_flag() {
        let a = appt(1, "A1");
        let mut b = a.clone();
        assert_eq!(appointment_fingerprint(&a), appointment_fingerprint(&b));
        b.completed = true;
        assert_ne!(appointment_fingerprint(&a), appointment_fingerprint(&b));
        assert_eq!(appointment_fingerprint(&a).len(), 64);
    }

    #[test]
    fn missing_optionals_fingerprint_as_empty() {
        let mut bare = appt(1, "");
        bare.location = None;
        bare.description = None;
        let mut blank = appt(1, "");
        blank.description = Some(String::new());
        assert_eq!(appointment_fingerprint(&bare), appointment_fingerprint(&blank));
        // Homework text is not part of the fingerprint.
        blank.content = Some("lees blz. 12".into());
        assert_eq!(appointment_fingerprint(&bare), appointment_fingerprint(&blank));
    }

    #[test]
    fn alert_texts() {
        assert_eq!(
            Alert::NewGrade {
                subject: "biologie".into()
            }
            .to_string(),
            "📊 **New Grade** posted for **biologie**."
        );
        assert_eq!(
            Alert::NewMessage {
                sender: "Mevr. de Vries".into()
            }
            .to_string(),
            "📧 **New Message** received from **Mevr. de Vries**."
        );
        assert_eq!(
            Alert::ScheduleChanged {
                description: "gym".into()
            }
            .to_string(),
            "📅 **Schedule Update**: 'gym' has been modified."
        );
    }
}
