//! Content models
//!
//! Rust structs mirroring the rows stored by the gateway.
//! All models use serde for the wire format shared by both gateway backends.

use crate::catalog::{FileType, Grade};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// An uploaded study document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub grade: Grade,
    pub subject: String,
    /// Name of the file as chosen by the uploader
    pub file_name: String,
    /// Public URL of the stored object
    pub file_url: String,
    pub file_type: FileType,
    pub uploaded_by: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Insert payload for a material; id and upload time are assigned by the gateway
#[derive(Debug, Clone, Serialize)]
pub struct NewMaterial {
    pub grade: Grade,
    pub subject: String,
    pub file_name: String,
    pub file_url: String,
    pub file_type: FileType,
    pub uploaded_by: String,
}

/// A school-wide announcement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Announcement {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub title: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewAnnouncement {
    pub title: String,
    pub message: String,
}

/// A dated event on a grade's calendar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub grade: Grade,
    pub event_title: String,
    pub event_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewCalendarEvent {
    pub grade: Grade,
    pub event_title: String,
    pub event_date: NaiveDate,
}

/// The calendar image currently shown for a grade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarImage {
    pub grade: Grade,
    /// Object path inside the calendar bucket
    pub path: String,
    pub url: String,
}

/// Accept ids sent either as strings (uuid) or integers (bigint serial)
fn deserialize_id<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Number(n) => n.to_string(),
    })
}
