use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Question {
    pub id: i32,
    pub text: String,
    #[sqlx(rename = "organization_id")]
    pub organization: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Create {
    pub text: String,
    pub organization: Option<i32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Update {
    pub text: Option<String>,
    pub organization: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct Insert {
    pub text: String,
    pub organization_id: Option<i32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Query {
    #[serde(rename = "organization")]
    pub organization_id_eq: Option<i32>,
    #[serde(rename = "text")]
    pub text_eq: Option<String>,
    #[serde(rename = "event")]
    pub event_id_eq: Option<i32>,
}
