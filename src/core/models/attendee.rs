use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Participant {
    pub id: i32,
    pub unique_id: String,
    pub emoji: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub organizations: Vec<i32>,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ParticipantCreate {
    pub unique_id: Option<String>,
    pub emoji: Option<String>,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub organizations: Vec<i32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ParticipantUpdate {
    pub emoji: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub organizations: Option<Vec<i32>>,
}

#[derive(Debug, Clone)]
pub struct ParticipantInsert {
    pub unique_id: String,
    pub emoji: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub organizations: Vec<i32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ParticipantQuery {
    #[serde(rename = "unique_id")]
    pub unique_id_eq: Option<String>,
    #[serde(rename = "organization")]
    pub organization_id_eq: Option<i32>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Facilitator {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub organization_role: String,
    #[sqlx(rename = "organization_id")]
    pub organization: i32,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FacilitatorCreate {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub organization_role: String,
    pub organization: i32,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct FacilitatorUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub organization_role: Option<String>,
    pub organization: Option<i32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct FacilitatorQuery {
    #[serde(rename = "organization")]
    pub organization_id_eq: Option<i32>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CustomAttendeeType {
    pub id: i32,
    pub type_name: String,
    pub organization_role: String,
    #[sqlx(rename = "organization_id")]
    pub organization: i32,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CustomAttendeeTypeCreate {
    pub type_name: String,
    #[serde(default)]
    pub organization_role: String,
    pub organization: i32,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CustomAttendeeTypeUpdate {
    pub type_name: Option<String>,
    pub organization_role: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CustomAttendeeTypeQuery {
    #[serde(rename = "organization")]
    pub organization_id_eq: Option<i32>,
    #[serde(rename = "type_name")]
    pub type_name_eq: Option<String>,
}

/// Fields a client may supply to identify or introduce a participant.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ParticipantSpec {
    pub id: Option<i32>,
    pub unique_id: Option<String>,
    pub emoji: Option<String>,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct FacilitatorSpec {
    pub id: Option<i32>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[serde(default)]
    pub organization_role: String,
    pub organization: Option<i32>,
}

/// A find-or-create request for one attendee identity.
#[derive(Debug, Clone)]
pub enum AttendeeSpec {
    Participant(ParticipantSpec),
    Facilitator(FacilitatorSpec),
    Other { id: Option<i32>, type_name: Option<String>, organization: Option<i32> },
}
