use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Number,
    Date,
    Choice,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Number => "number",
            FieldType::Date => "date",
            FieldType::Choice => "choice",
        }
    }

    pub fn parse(s: &str) -> Result<Self, Error> {
        match s {
            "text" => Ok(FieldType::Text),
            "number" => Ok(FieldType::Number),
            "date" => Ok(FieldType::Date),
            "choice" => Ok(FieldType::Choice),
            other => Err(Error::BusinessError(format!("unknown field type '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DemographicCategory {
    pub id: i32,
    pub organization: i32,
    pub name: String,
    pub field_type: FieldType,
    pub choices: Vec<String>,
    pub required: bool,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

impl DemographicCategory {
    /// Checks a submitted value against the category's field type.
    pub fn validate(&self, value: &str) -> Result<(), Error> {
        let value = value.trim();
        if value.is_empty() {
            if self.required {
                return Err(Error::BusinessError(format!("a value for '{}' is required", self.name)));
            }
            return Ok(());
        }
        match self.field_type {
            FieldType::Text => Ok(()),
            FieldType::Number => value
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(|_| ())
                .ok_or_else(|| Error::BusinessError(format!("'{}' expects a number, got '{}'", self.name, value))),
            FieldType::Date => NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .map(|_| ())
                .map_err(|_| Error::BusinessError(format!("'{}' expects a date formatted YYYY-MM-DD, got '{}'", self.name, value))),
            FieldType::Choice => {
                if self.choices.iter().any(|c| c == value) {
                    Ok(())
                } else {
                    Err(Error::BusinessError(format!("'{}' is not one of the choices of '{}'", value, self.name)))
                }
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryCreate {
    pub organization: i32,
    pub name: String,
    pub field_type: FieldType,
    #[serde(default)]
    pub choices: Vec<String>,
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CategoryUpdate {
    pub name: Option<String>,
    pub choices: Option<Vec<String>>,
    pub required: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CategoryQuery {
    #[serde(rename = "organization")]
    pub organization_id_eq: Option<i32>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct EventDemographic {
    pub id: i32,
    #[sqlx(rename = "event_id")]
    pub event: i32,
    #[sqlx(rename = "category_id")]
    pub category: i32,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventDemographicCreate {
    pub event: i32,
    pub category: i32,
}

/// Event demographics only link records; nothing on them is editable.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct EventDemographicUpdate {}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct EventDemographicQuery {
    #[serde(rename = "event")]
    pub event_id_eq: Option<i32>,
    #[serde(rename = "category")]
    pub category_id_eq: Option<i32>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Demographic {
    pub id: i32,
    #[sqlx(rename = "event_demographic_id")]
    pub event_demographic: i32,
    #[sqlx(rename = "event_attendee_id")]
    pub event_attendee: i32,
    pub value: String,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DemographicCreate {
    pub event_demographic: i32,
    pub event_attendee: i32,
    pub value: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct DemographicUpdate {
    pub value: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct DemographicQuery {
    #[serde(rename = "event_demographic")]
    pub event_demographic_id_eq: Option<i32>,
    #[serde(rename = "event_attendee")]
    pub event_attendee_id_eq: Option<i32>,
}
