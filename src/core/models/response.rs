use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Response {
    pub id: i32,
    pub text: String,
    #[sqlx(rename = "event_attendee_id")]
    pub event_attendee: i32,
    #[sqlx(rename = "question_id")]
    pub question: i32,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Create {
    pub text: String,
    pub event_attendee: i32,
    pub question: i32,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Update {
    pub text: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Insert {
    pub text: String,
    pub event_attendee_id: i32,
    pub question_id: i32,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Query {
    #[serde(rename = "event_attendee")]
    pub event_attendee_id_eq: Option<i32>,
    #[serde(rename = "question")]
    pub question_id_eq: Option<i32>,
}
