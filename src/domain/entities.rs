//! Domain entities. Pure data structures for the core business.
//!
//! Field names follow the Magister REST API (Dutch) via serde renames, so the
//! same structs decode API responses and serialize back out for dumps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A person record as returned inside `/api/account`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    #[serde(rename = "Id")]
    pub id: i64,
    #[serde(rename = "Roepnaam")]
    pub first_name: String,
    #[serde(rename = "Achternaam")]
    pub last_name: String,
}

/// Account info. Only the person is used (for the person id in API paths).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountInfo {
    #[serde(rename = "Persoon")]
    pub person: Person,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    pub code: String,
    #[serde(rename = "omschrijving")]
    pub description: String,
}

/// A grade column entry from the "latest grades" endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grade {
    #[serde(rename = "kolomId")]
    pub id: i64,
    #[serde(rename = "omschrijving")]
    pub description: String,
    #[serde(rename = "ingevoerdOp", with = "magister_datetime")]
    pub date_input: DateTime<Utc>,
    #[serde(rename = "vak")]
    pub subject: Subject,
    /// Kept as text: values like "7,5" or "V" are common.
    #[serde(rename = "waarde")]
    pub value: String,
    #[serde(rename = "isVoldoende")]
    pub is_sufficient: bool,
}

impl Grade {
    pub fn is_pass(&self) -> bool {
        self.is_sufficient
    }
}

/// A calendar appointment (lesson, test, activity).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    #[serde(rename = "Id")]
    pub id: i64,
    #[serde(rename = "Start", with = "magister_datetime")]
    pub start: DateTime<Utc>,
    #[serde(rename = "Einde", with = "magister_datetime")]
    pub end: DateTime<Utc>,
    #[serde(rename = "Omschrijving", default)]
    pub description: Option<String>,
    #[serde(rename = "Lokatie", default)]
    pub location: Option<String>,
    /// Homework / lesson content (HTML).
    #[serde(rename = "Inhoud", default)]
    pub content: Option<String>,
    #[serde(rename = "Afgerond")]
    pub completed: bool,
}

impl Appointment {
    pub fn has_homework(&self) -> bool {
        self.content.as_deref().is_some_and(|c| !c.is_empty())
    }
}

/// Display name of the inbox folder.
pub const INBOX_FOLDER_NAME: &str = "Postvak IN";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageFolder {
    pub id: i64,
    #[serde(rename = "naam")]
    pub name: String,
    #[serde(rename = "aantalOngelezen", default)]
    pub unread_count: u32,
}

/// First folder whose name contains "Postvak IN".
pub fn find_inbox(folders: &[MessageFolder]) -> Option<&MessageFolder> {
    folders.iter().find(|f| f.name.contains(INBOX_FOLDER_NAME))
}

/// A message header from a folder listing. Body is not fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    #[serde(rename = "onderwerp")]
    pub subject: String,
    #[serde(rename = "verzondenOp", with = "magister_datetime")]
    pub sent_at: DateTime<Utc>,
    #[serde(rename = "isGelezen")]
    pub is_read: bool,
    /// Free-form sender object; only `naam` is interpreted.
    #[serde(rename = "afzender", default)]
    pub sender: serde_json::Value,
}

impl Message {
    pub fn sender_name(&self) -> &str {
        self.sender
            .get("naam")
            .and_then(|v| v.as_str())
            .unwrap_or("Unknown")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyGuide {
    #[serde(rename = "Id")]
    pub id: i64,
    #[serde(rename = "Titel")]
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyGuideItem {
    #[serde(rename = "Id")]
    pub id: i64,
    #[serde(rename = "Titel")]
    pub title: String,
    #[serde(rename = "OnderdeelType", default = "unknown_resource_type")]
    pub resource_type: String,
    #[serde(rename = "Links", default)]
    pub links: Vec<serde_json::Value>,
}

fn unknown_resource_type() -> String {
    "Unknown".to_string()
}

impl StudyGuideItem {
    /// Href of the first link with `Rel == "Content"`.
    pub fn url(&self) -> Option<&str> {
        self.links
            .iter()
            .find(|l| l.get("Rel").and_then(|r| r.as_str()) == Some("Content"))
            .and_then(|l| l.get("Href"))
            .and_then(|h| h.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    #[serde(rename = "Id")]
    pub id: i64,
    #[serde(rename = "Titel")]
    pub title: String,
    #[serde(rename = "InleverenVoor", with = "magister_datetime")]
    pub deadline: DateTime<Utc>,
    #[serde(rename = "Afgesloten")]
    pub closed: bool,
    #[serde(rename = "Beoordeeld", default)]
    pub graded: bool,
    #[serde(rename = "Status", default)]
    pub status: Option<i32>,
}

impl Assignment {
    /// Status codes below 3 are still open; without a status fall back to `closed`.
    pub fn is_open(&self) -> bool {
        match self.status {
            Some(s) => s < 3,
            None => !self.closed,
        }
    }
}

/// Mail to send through `/api/berichten`.
#[derive(Debug, Clone)]
pub struct OutgoingMail {
    pub recipient_id: i64,
    pub subject: String,
    pub body: String,
}

/// Magister timestamps come with or without an offset (and with 7 fractional digits).
/// Naive values are taken as UTC.
pub mod magister_datetime {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn parse(s: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|n| n.and_utc())
    }

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&dt.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid datetime: {}", raw)))
    }
}
