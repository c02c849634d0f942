use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Organization {
    pub id: i32,
    pub name: String,
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Create {
    pub name: String,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Update {
    pub name: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Insert {
    pub name: String,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Query {
    #[serde(rename = "name")]
    pub name_eq: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Coordinator {
    pub id: i32,
    #[sqlx(rename = "organization_id")]
    pub organization: i32,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub organization_role: String,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

pub const DEFAULT_COORDINATOR_ROLE: &str = "Coordinator";

#[derive(Debug, Clone, Deserialize)]
pub struct CoordinatorCreate {
    pub organization: i32,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub email: Option<String>,
    pub organization_role: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CoordinatorUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub organization_role: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CoordinatorQuery {
    #[serde(rename = "organization")]
    pub organization_id_eq: Option<i32>,
}
