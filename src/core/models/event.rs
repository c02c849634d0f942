use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::core::models::common::nullable;
use crate::core::models::event_attendee::{AttendeeEntry, EventAttendee};
use crate::core::models::question::Question;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Event {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
    pub location: String,
    pub organizations: Vec<i32>,
    pub questions: Vec<i32>,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

/// A nested question reference: either an existing question or the fields of
/// one to find or create.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum QuestionSpec {
    Existing { id: i32 },
    New { text: String, organization: Option<i32> },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Create {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub organizations: Vec<i32>,
    #[serde(default)]
    pub attendees: Vec<AttendeeEntry>,
    #[serde(default)]
    pub questions: Vec<QuestionSpec>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Update {
    pub name: Option<String>,
    pub description: Option<String>,
    pub date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "nullable")]
    pub time: Option<Option<NaiveTime>>,
    pub location: Option<String>,
    pub organizations: Option<Vec<i32>>,
    pub questions: Option<Vec<QuestionSpec>>,
}

#[derive(Debug, Clone)]
pub struct Insert {
    pub name: String,
    pub description: String,
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
    pub location: String,
}

#[derive(Debug, Clone)]
pub struct ScalarUpdate {
    pub name: String,
    pub description: String,
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
    pub location: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Query {
    #[serde(rename = "organization")]
    pub organization_id_eq: Option<i32>,
    #[serde(rename = "date")]
    pub date_eq: Option<NaiveDate>,
}

/// An event together with its resolved nested references.
#[derive(Debug, Clone, Serialize)]
pub struct EventDetail {
    #[serde(flatten)]
    pub event: Event,
    pub attendees: Vec<EventAttendee>,
    pub question_details: Vec<Question>,
}
