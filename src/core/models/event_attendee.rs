use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::models::attendee::{AttendeeSpec, FacilitatorSpec, ParticipantSpec};
use crate::core::models::common::IdOrName;
use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendeeType {
    Participant,
    Facilitator,
    Other,
}

impl AttendeeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendeeType::Participant => "participant",
            AttendeeType::Facilitator => "facilitator",
            AttendeeType::Other => "other",
        }
    }
}

/// The registered identity. The variant is the discriminator, so the type
/// and the referenced record cannot disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "attendee_type", rename_all = "lowercase")]
pub enum AttendeeRef {
    Participant { participant: i32 },
    Facilitator { facilitator: i32 },
    Other { custom_attendee_type: i32 },
}

impl AttendeeRef {
    pub fn attendee_type(&self) -> AttendeeType {
        match self {
            AttendeeRef::Participant { .. } => AttendeeType::Participant,
            AttendeeRef::Facilitator { .. } => AttendeeType::Facilitator,
            AttendeeRef::Other { .. } => AttendeeType::Other,
        }
    }

    /// (participant_id, facilitator_id, custom_attendee_type_id) column values.
    pub fn columns(&self) -> (Option<i32>, Option<i32>, Option<i32>) {
        match *self {
            AttendeeRef::Participant { participant } => (Some(participant), None, None),
            AttendeeRef::Facilitator { facilitator } => (None, Some(facilitator), None),
            AttendeeRef::Other { custom_attendee_type } => (None, None, Some(custom_attendee_type)),
        }
    }

    pub fn from_columns(attendee_type: &str, participant: Option<i32>, facilitator: Option<i32>, custom_attendee_type: Option<i32>) -> Result<Self, Error> {
        match (attendee_type, participant, facilitator, custom_attendee_type) {
            ("participant", Some(participant), None, None) => Ok(AttendeeRef::Participant { participant }),
            ("facilitator", None, Some(facilitator), None) => Ok(AttendeeRef::Facilitator { facilitator }),
            ("other", None, None, Some(custom_attendee_type)) => Ok(AttendeeRef::Other { custom_attendee_type }),
            _ => Err(Error::DiscriminatorMismatch(format!("stored attendee_type '{}' does not match its reference columns", attendee_type))),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            AttendeeRef::Participant { participant } => format!("participant {}", participant),
            AttendeeRef::Facilitator { facilitator } => format!("facilitator {}", facilitator),
            AttendeeRef::Other { custom_attendee_type } => format!("custom attendee type {}", custom_attendee_type),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    #[default]
    Attended,
    Absent,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Attended => "attended",
            AttendanceStatus::Absent => "absent",
        }
    }

    pub fn parse(s: &str) -> Result<Self, Error> {
        match s {
            "attended" => Ok(AttendanceStatus::Attended),
            "absent" => Ok(AttendanceStatus::Absent),
            other => Err(Error::BusinessError(format!("unknown attendance status '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EventAttendee {
    pub id: i32,
    pub event: i32,
    #[serde(flatten)]
    pub attendee: AttendeeRef,
    pub organizations: Vec<i32>,
    pub registration_time: DateTime<Utc>,
    pub attendance_status: AttendanceStatus,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Insert {
    pub event_id: i32,
    pub attendee: AttendeeRef,
    pub organizations: Vec<i32>,
    pub attendance_status: AttendanceStatus,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Update {
    pub attendance_status: Option<AttendanceStatus>,
    pub organizations: Option<Vec<i32>>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Query {
    #[serde(rename = "event")]
    pub event_id_eq: Option<i32>,
    #[serde(rename = "participant")]
    pub participant_id_eq: Option<i32>,
    #[serde(rename = "facilitator")]
    pub facilitator_id_eq: Option<i32>,
    #[serde(rename = "custom_attendee_type")]
    pub custom_attendee_type_id_eq: Option<i32>,
}

/// Wire shape of a registration: a discriminator plus one reference field per
/// attendee kind.
#[derive(Debug, Clone, Deserialize)]
pub struct RegistrationPayload {
    pub event: i32,
    pub organizations: Option<Vec<i32>>,
    pub attendee_type: AttendeeType,
    pub participant: Option<IdOrName>,
    pub facilitator: Option<i32>,
    pub custom_attendee_type: Option<IdOrName>,
}

#[derive(Debug, Clone)]
pub struct Registration {
    pub event_id: i32,
    pub attendee: AttendeeSpec,
    pub organizations: Option<Vec<i32>>,
}

impl TryFrom<RegistrationPayload> for Registration {
    type Error = Error;

    fn try_from(payload: RegistrationPayload) -> Result<Self, Self::Error> {
        let attendee_type = payload.attendee_type;
        let mismatch = |field: &str| Error::DiscriminatorMismatch(format!("attendee_type '{}' does not allow the '{}' field", attendee_type.as_str(), field));
        let missing = |field: &str| Error::DiscriminatorMismatch(format!("attendee_type '{}' requires the '{}' field", attendee_type.as_str(), field));
        let attendee = match attendee_type {
            AttendeeType::Participant => {
                if payload.facilitator.is_some() {
                    return Err(mismatch("facilitator"));
                }
                if payload.custom_attendee_type.is_some() {
                    return Err(mismatch("custom_attendee_type"));
                }
                match payload.participant.ok_or_else(|| missing("participant"))? {
                    IdOrName::Id(id) => AttendeeSpec::Participant(ParticipantSpec { id: Some(id), ..default::default() }),
                    IdOrName::Name(unique_id) => AttendeeSpec::Participant(ParticipantSpec {
                        unique_id: Some(unique_id),
                        ..default::default()
                    }),
                }
            }
            AttendeeType::Facilitator => {
                if payload.participant.is_some() {
                    return Err(mismatch("participant"));
                }
                if payload.custom_attendee_type.is_some() {
                    return Err(mismatch("custom_attendee_type"));
                }
                let id = payload.facilitator.ok_or_else(|| missing("facilitator"))?;
                AttendeeSpec::Facilitator(FacilitatorSpec { id: Some(id), ..default::default() })
            }
            AttendeeType::Other => {
                if payload.participant.is_some() {
                    return Err(mismatch("participant"));
                }
                if payload.facilitator.is_some() {
                    return Err(mismatch("facilitator"));
                }
                match payload.custom_attendee_type.ok_or_else(|| missing("custom_attendee_type"))? {
                    IdOrName::Id(id) => AttendeeSpec::Other {
                        id: Some(id),
                        type_name: None,
                        organization: None,
                    },
                    IdOrName::Name(type_name) => AttendeeSpec::Other {
                        id: None,
                        type_name: Some(type_name),
                        organization: None,
                    },
                }
            }
        };
        Ok(Registration {
            event_id: payload.event,
            attendee,
            organizations: payload.organizations,
        })
    }
}

/// Nested attendee entry of an event payload.
#[derive(Debug, Clone, Deserialize)]
pub struct AttendeeEntry {
    pub attendee_type: AttendeeType,
    pub id: Option<i32>,
    pub unique_id: Option<String>,
    pub emoji: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub organization_role: Option<String>,
    pub organization: Option<i32>,
    pub custom_attendee_type: Option<IdOrName>,
}

impl TryFrom<AttendeeEntry> for AttendeeSpec {
    type Error = Error;

    fn try_from(entry: AttendeeEntry) -> Result<Self, Self::Error> {
        let attendee_type = entry.attendee_type;
        let mismatch = |field: &str| Error::DiscriminatorMismatch(format!("attendee_type '{}' does not allow the '{}' field", attendee_type.as_str(), field));
        match attendee_type {
            AttendeeType::Participant => {
                if entry.custom_attendee_type.is_some() {
                    return Err(mismatch("custom_attendee_type"));
                }
                Ok(AttendeeSpec::Participant(ParticipantSpec {
                    id: entry.id,
                    unique_id: entry.unique_id,
                    emoji: entry.emoji,
                    first_name: entry.first_name.unwrap_or_default(),
                    last_name: entry.last_name.unwrap_or_default(),
                }))
            }
            AttendeeType::Facilitator => {
                if entry.custom_attendee_type.is_some() {
                    return Err(mismatch("custom_attendee_type"));
                }
                if entry.unique_id.is_some() {
                    return Err(mismatch("unique_id"));
                }
                Ok(AttendeeSpec::Facilitator(FacilitatorSpec {
                    id: entry.id,
                    first_name: entry.first_name,
                    last_name: entry.last_name,
                    organization_role: entry.organization_role.unwrap_or_default(),
                    organization: entry.organization,
                }))
            }
            AttendeeType::Other => {
                if entry.unique_id.is_some() {
                    return Err(mismatch("unique_id"));
                }
                let (id, type_name) = match (entry.id, entry.custom_attendee_type) {
                    (_, Some(IdOrName::Id(id))) => (Some(id), None),
                    (id, Some(IdOrName::Name(name))) => (id, Some(name)),
                    (Some(id), None) => (Some(id), None),
                    (None, None) => {
                        return Err(Error::DiscriminatorMismatch("attendee_type 'other' requires the 'custom_attendee_type' field".into()));
                    }
                };
                Ok(AttendeeSpec::Other {
                    id,
                    type_name,
                    organization: entry.organization,
                })
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatchRequest {
    #[serde(default)]
    pub atomic: bool,
    pub items: Vec<RegistrationPayload>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Outcome {
    Created { event_attendee: EventAttendee, attendee_created: bool },
    Failed { kind: &'static str, message: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchItem {
    pub index: usize,
    #[serde(flatten)]
    pub outcome: Outcome,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct BatchReport {
    pub created: usize,
    pub failed: usize,
    pub results: Vec<BatchItem>,
}

impl BatchReport {
    pub fn push_created(&mut self, index: usize, event_attendee: EventAttendee, attendee_created: bool) {
        self.created += 1;
        self.results.push(BatchItem {
            index,
            outcome: Outcome::Created { event_attendee, attendee_created },
        });
    }

    pub fn push_failed(&mut self, index: usize, err: &Error) {
        self.failed += 1;
        self.results.push(BatchItem {
            index,
            outcome: Outcome::Failed {
                kind: err.kind(),
                message: err.to_string(),
            },
        });
    }
}
