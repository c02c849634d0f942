//! In-process store used by the test-suite and by `STORE=memory`.
//!
//! Every store holds the lock on the whole table set, so transactions are
//! serialized. A transactional store keeps a snapshot taken when it was
//! opened and puts it back unless it is committed.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::core::models::{
    attendee::{
        CustomAttendeeType, CustomAttendeeTypeCreate, CustomAttendeeTypeQuery, CustomAttendeeTypeUpdate, Facilitator, FacilitatorCreate, FacilitatorQuery, FacilitatorUpdate, Participant,
        ParticipantInsert, ParticipantQuery, ParticipantUpdate,
    },
    common::Pagination,
    demographic::{
        CategoryCreate, CategoryQuery, CategoryUpdate, Demographic, DemographicCategory, DemographicCreate, DemographicQuery, EventDemographic, EventDemographicCreate,
        EventDemographicQuery,
    },
    event::{Event, Insert as EventInsert, Query as EventQuery, ScalarUpdate as EventScalarUpdate},
    event_attendee::{AttendanceStatus, AttendeeRef, EventAttendee, Insert as EventAttendeeInsert, Query as EventAttendeeQuery},
    organization::{
        Coordinator, CoordinatorCreate, CoordinatorQuery, CoordinatorUpdate, Insert as OrganizationInsert, Organization, Query as OrganizationQuery, Update as OrganizationUpdate,
        DEFAULT_COORDINATOR_ROLE,
    },
    question::{Insert as QuestionInsert, Query as QuestionQuery, Question, Update as QuestionUpdate},
    response::{Insert as ResponseInsert, Query as ResponseQuery, Response},
};
use crate::core::ports::repository::{
    Common, CoordinatorCommon, CustomAttendeeTypeCommon, DemographicCategoryCommon, DemographicCommon, EventAttendeeCommon, EventCommon, EventDemographicCommon, FacilitatorCommon,
    Manager, OrganizationCommon, ParticipantCommon, QuestionCommon, ResponseCommon, Store, TxStore,
};
use crate::error::Error;

#[derive(Debug, Clone, Default)]
struct Tables {
    next_id: i32,
    organizations: BTreeMap<i32, Organization>,
    coordinators: BTreeMap<i32, Coordinator>,
    participants: BTreeMap<i32, Participant>,
    facilitators: BTreeMap<i32, Facilitator>,
    custom_attendee_types: BTreeMap<i32, CustomAttendeeType>,
    events: BTreeMap<i32, Event>,
    event_attendees: BTreeMap<i32, EventAttendee>,
    questions: BTreeMap<i32, Question>,
    responses: BTreeMap<i32, Response>,
    demographic_categories: BTreeMap<i32, DemographicCategory>,
    event_demographics: BTreeMap<i32, EventDemographic>,
    demographics: BTreeMap<i32, Demographic>,
}

impl Tables {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }
}

fn page<'a, T>(items: impl Iterator<Item = &'a T>, pagination: Option<Pagination>) -> Vec<T>
where
    T: Clone + 'a,
{
    let items = items.cloned();
    match pagination {
        Some(pagination) => pagination.window(items),
        None => items.collect(),
    }
}

fn fetch<T: Clone>(table: &BTreeMap<i32, T>, entity: &'static str, id: i32) -> Result<T, Error> {
    table.get(&id).cloned().ok_or_else(|| Error::not_found(entity, id))
}

fn fetch_mut<'a, T>(table: &'a mut BTreeMap<i32, T>, entity: &'static str, id: i32) -> Result<&'a mut T, Error> {
    table.get_mut(&id).ok_or_else(|| Error::not_found(entity, id))
}

fn count<T>(items: impl Iterator<Item = T>) -> i64 {
    items.count() as i64
}

#[derive(Debug, Clone, Default)]
pub struct MemoryManager {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryManager {
    pub fn new() -> Self {
        Self::default()
    }
}

pub struct MemoryStore {
    tables: OwnedMutexGuard<Tables>,
    snapshot: Option<Tables>,
}

impl Drop for MemoryStore {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            *self.tables = snapshot;
        }
    }
}

impl Manager for MemoryManager {
    type Store = MemoryStore;
    type Tx = MemoryStore;

    async fn db(&self) -> Result<Self::Store, Error> {
        let tables = self.tables.clone().lock_owned().await;
        Ok(MemoryStore { tables, snapshot: None })
    }

    async fn tx(&self) -> Result<Self::Tx, Error> {
        let tables = self.tables.clone().lock_owned().await;
        let snapshot = Some(tables.clone());
        Ok(MemoryStore { tables, snapshot })
    }
}

impl Common for MemoryStore {}
impl Store for MemoryStore {}

impl TxStore for MemoryStore {
    async fn commit(mut self) -> Result<(), Error> {
        self.snapshot = None;
        Ok(())
    }

    async fn rollback(self) -> Result<(), Error> {
        Ok(())
    }
}

impl OrganizationCommon for MemoryStore {
    async fn insert(&mut self, data: OrganizationInsert) -> Result<i32, Error> {
        let id = self.tables.next_id();
        let now = Utc::now();
        self.tables.organizations.insert(
            id,
            Organization {
                id,
                name: data.name,
                location: data.location,
                created_at: now,
                last_modified: now,
            },
        );
        Ok(id)
    }

    async fn update(&mut self, id: i32, data: OrganizationUpdate) -> Result<(), Error> {
        let organization = fetch_mut(&mut self.tables.organizations, "Organization", id)?;
        if let Some(name) = data.name {
            organization.name = name;
        }
        if let Some(location) = data.location {
            organization.location = Some(location);
        }
        organization.last_modified = Utc::now();
        Ok(())
    }

    async fn get(&mut self, id: i32) -> Result<Organization, Error> {
        fetch(&self.tables.organizations, "Organization", id)
    }

    async fn query(&mut self, query: &OrganizationQuery, pagination: Option<Pagination>) -> Result<Vec<Organization>, Error> {
        let items = self.tables.organizations.values().filter(|o| query.name_eq.as_ref().map_or(true, |name| &o.name == name));
        Ok(page(items, pagination))
    }

    async fn count(&mut self, query: &OrganizationQuery) -> Result<i64, Error> {
        Ok(OrganizationCommon::query(self, query, None).await?.len() as i64)
    }

    async fn delete(&mut self, id: i32) -> Result<(), Error> {
        let tables = &mut *self.tables;
        tables.organizations.remove(&id);
        tables.coordinators.retain(|_, c| c.organization != id);
        for participant in tables.participants.values_mut() {
            participant.organizations.retain(|o| *o != id);
        }
        Ok(())
    }

    async fn existing(&mut self, ids: &[i32]) -> Result<Vec<i32>, Error> {
        Ok(ids.iter().copied().filter(|id| self.tables.organizations.contains_key(id)).collect())
    }

    async fn count_dependents(&mut self, id: i32) -> Result<i64, Error> {
        let tables = &*self.tables;
        Ok(count(tables.events.values().filter(|e| e.organizations.contains(&id)))
            + count(tables.facilitators.values().filter(|f| f.organization == id))
            + count(tables.custom_attendee_types.values().filter(|c| c.organization == id))
            + count(tables.questions.values().filter(|q| q.organization == Some(id)))
            + count(tables.demographic_categories.values().filter(|c| c.organization == id)))
    }
}

impl CoordinatorCommon for MemoryStore {
    async fn insert(&mut self, data: CoordinatorCreate) -> Result<i32, Error> {
        let id = self.tables.next_id();
        let now = Utc::now();
        self.tables.coordinators.insert(
            id,
            Coordinator {
                id,
                organization: data.organization,
                first_name: data.first_name,
                last_name: data.last_name,
                email: data.email,
                organization_role: data.organization_role.unwrap_or_else(|| DEFAULT_COORDINATOR_ROLE.into()),
                created_at: now,
                last_modified: now,
            },
        );
        Ok(id)
    }

    async fn update(&mut self, id: i32, data: CoordinatorUpdate) -> Result<(), Error> {
        let coordinator = fetch_mut(&mut self.tables.coordinators, "Coordinator", id)?;
        if let Some(first_name) = data.first_name {
            coordinator.first_name = first_name;
        }
        if let Some(last_name) = data.last_name {
            coordinator.last_name = last_name;
        }
        if let Some(email) = data.email {
            coordinator.email = Some(email);
        }
        if let Some(organization_role) = data.organization_role {
            coordinator.organization_role = organization_role;
        }
        coordinator.last_modified = Utc::now();
        Ok(())
    }

    async fn get(&mut self, id: i32) -> Result<Coordinator, Error> {
        fetch(&self.tables.coordinators, "Coordinator", id)
    }

    async fn query(&mut self, query: &CoordinatorQuery, pagination: Option<Pagination>) -> Result<Vec<Coordinator>, Error> {
        let items = self.tables.coordinators.values().filter(|c| query.organization_id_eq.map_or(true, |o| c.organization == o));
        Ok(page(items, pagination))
    }

    async fn count(&mut self, query: &CoordinatorQuery) -> Result<i64, Error> {
        Ok(CoordinatorCommon::query(self, query, None).await?.len() as i64)
    }

    async fn delete(&mut self, id: i32) -> Result<(), Error> {
        self.tables.coordinators.remove(&id);
        Ok(())
    }
}

impl ParticipantCommon for MemoryStore {
    async fn insert(&mut self, data: ParticipantInsert) -> Result<Option<i32>, Error> {
        if self.tables.participants.values().any(|p| p.unique_id == data.unique_id) {
            return Ok(None);
        }
        let id = self.tables.next_id();
        let now = Utc::now();
        self.tables.participants.insert(
            id,
            Participant {
                id,
                unique_id: data.unique_id,
                emoji: data.emoji,
                first_name: data.first_name,
                last_name: data.last_name,
                organizations: data.organizations,
                created_at: now,
                last_modified: now,
            },
        );
        Ok(Some(id))
    }

    async fn update(&mut self, id: i32, data: ParticipantUpdate) -> Result<(), Error> {
        let participant = fetch_mut(&mut self.tables.participants, "Participant", id)?;
        if let Some(emoji) = data.emoji {
            participant.emoji = Some(emoji);
        }
        if let Some(first_name) = data.first_name {
            participant.first_name = first_name;
        }
        if let Some(last_name) = data.last_name {
            participant.last_name = last_name;
        }
        if let Some(organizations) = data.organizations {
            participant.organizations = organizations;
        }
        participant.last_modified = Utc::now();
        Ok(())
    }

    async fn get(&mut self, id: i32) -> Result<Participant, Error> {
        fetch(&self.tables.participants, "Participant", id)
    }

    async fn get_by_unique_id(&mut self, unique_id: &str) -> Result<Option<Participant>, Error> {
        Ok(self.tables.participants.values().find(|p| p.unique_id == unique_id).cloned())
    }

    async fn query(&mut self, query: &ParticipantQuery, pagination: Option<Pagination>) -> Result<Vec<Participant>, Error> {
        let items = self.tables.participants.values().filter(|p| {
            query.unique_id_eq.as_ref().map_or(true, |u| &p.unique_id == u) && query.organization_id_eq.map_or(true, |o| p.organizations.contains(&o))
        });
        Ok(page(items, pagination))
    }

    async fn count(&mut self, query: &ParticipantQuery) -> Result<i64, Error> {
        Ok(ParticipantCommon::query(self, query, None).await?.len() as i64)
    }

    async fn delete(&mut self, id: i32) -> Result<(), Error> {
        self.tables.participants.remove(&id);
        Ok(())
    }

    async fn count_registrations(&mut self, id: i32) -> Result<i64, Error> {
        Ok(count(self.tables.event_attendees.values().filter(|ea| ea.attendee == AttendeeRef::Participant { participant: id })))
    }
}

impl FacilitatorCommon for MemoryStore {
    async fn insert(&mut self, data: FacilitatorCreate) -> Result<i32, Error> {
        let id = self.tables.next_id();
        let now = Utc::now();
        self.tables.facilitators.insert(
            id,
            Facilitator {
                id,
                first_name: data.first_name,
                last_name: data.last_name,
                organization_role: data.organization_role,
                organization: data.organization,
                created_at: now,
                last_modified: now,
            },
        );
        Ok(id)
    }

    async fn update(&mut self, id: i32, data: FacilitatorUpdate) -> Result<(), Error> {
        let facilitator = fetch_mut(&mut self.tables.facilitators, "Facilitator", id)?;
        if let Some(first_name) = data.first_name {
            facilitator.first_name = first_name;
        }
        if let Some(last_name) = data.last_name {
            facilitator.last_name = last_name;
        }
        if let Some(organization_role) = data.organization_role {
            facilitator.organization_role = organization_role;
        }
        if let Some(organization) = data.organization {
            facilitator.organization = organization;
        }
        facilitator.last_modified = Utc::now();
        Ok(())
    }

    async fn get(&mut self, id: i32) -> Result<Facilitator, Error> {
        fetch(&self.tables.facilitators, "Facilitator", id)
    }

    async fn query(&mut self, query: &FacilitatorQuery, pagination: Option<Pagination>) -> Result<Vec<Facilitator>, Error> {
        let items = self.tables.facilitators.values().filter(|f| query.organization_id_eq.map_or(true, |o| f.organization == o));
        Ok(page(items, pagination))
    }

    async fn count(&mut self, query: &FacilitatorQuery) -> Result<i64, Error> {
        Ok(FacilitatorCommon::query(self, query, None).await?.len() as i64)
    }

    async fn delete(&mut self, id: i32) -> Result<(), Error> {
        self.tables.facilitators.remove(&id);
        Ok(())
    }

    async fn count_registrations(&mut self, id: i32) -> Result<i64, Error> {
        Ok(count(self.tables.event_attendees.values().filter(|ea| ea.attendee == AttendeeRef::Facilitator { facilitator: id })))
    }
}

impl CustomAttendeeTypeCommon for MemoryStore {
    async fn insert(&mut self, data: CustomAttendeeTypeCreate) -> Result<Option<i32>, Error> {
        if self
            .tables
            .custom_attendee_types
            .values()
            .any(|c| c.organization == data.organization && c.type_name == data.type_name)
        {
            return Ok(None);
        }
        let id = self.tables.next_id();
        let now = Utc::now();
        self.tables.custom_attendee_types.insert(
            id,
            CustomAttendeeType {
                id,
                type_name: data.type_name,
                organization_role: data.organization_role,
                organization: data.organization,
                created_at: now,
                last_modified: now,
            },
        );
        Ok(Some(id))
    }

    async fn update(&mut self, id: i32, data: CustomAttendeeTypeUpdate) -> Result<(), Error> {
        let custom = fetch_mut(&mut self.tables.custom_attendee_types, "CustomAttendeeType", id)?;
        if let Some(type_name) = data.type_name {
            custom.type_name = type_name;
        }
        if let Some(organization_role) = data.organization_role {
            custom.organization_role = organization_role;
        }
        custom.last_modified = Utc::now();
        Ok(())
    }

    async fn get(&mut self, id: i32) -> Result<CustomAttendeeType, Error> {
        fetch(&self.tables.custom_attendee_types, "CustomAttendeeType", id)
    }

    async fn get_by_name(&mut self, organization_id: i32, type_name: &str) -> Result<Option<CustomAttendeeType>, Error> {
        Ok(self
            .tables
            .custom_attendee_types
            .values()
            .find(|c| c.organization == organization_id && c.type_name == type_name)
            .cloned())
    }

    async fn query(&mut self, query: &CustomAttendeeTypeQuery, pagination: Option<Pagination>) -> Result<Vec<CustomAttendeeType>, Error> {
        let items = self.tables.custom_attendee_types.values().filter(|c| {
            query.organization_id_eq.map_or(true, |o| c.organization == o) && query.type_name_eq.as_ref().map_or(true, |n| &c.type_name == n)
        });
        Ok(page(items, pagination))
    }

    async fn count(&mut self, query: &CustomAttendeeTypeQuery) -> Result<i64, Error> {
        Ok(CustomAttendeeTypeCommon::query(self, query, None).await?.len() as i64)
    }

    async fn delete(&mut self, id: i32) -> Result<(), Error> {
        self.tables.custom_attendee_types.remove(&id);
        Ok(())
    }

    async fn count_registrations(&mut self, id: i32) -> Result<i64, Error> {
        Ok(count(
            self.tables.event_attendees.values().filter(|ea| ea.attendee == AttendeeRef::Other { custom_attendee_type: id }),
        ))
    }
}

impl EventCommon for MemoryStore {
    async fn insert(&mut self, data: EventInsert) -> Result<i32, Error> {
        let id = self.tables.next_id();
        let now = Utc::now();
        self.tables.events.insert(
            id,
            Event {
                id,
                name: data.name,
                description: data.description,
                date: data.date,
                time: data.time,
                location: data.location,
                organizations: Vec::new(),
                questions: Vec::new(),
                created_at: now,
                last_modified: now,
            },
        );
        Ok(id)
    }

    async fn update(&mut self, id: i32, data: EventScalarUpdate) -> Result<(), Error> {
        let event = fetch_mut(&mut self.tables.events, "Event", id)?;
        event.name = data.name;
        event.description = data.description;
        event.date = data.date;
        event.time = data.time;
        event.location = data.location;
        event.last_modified = Utc::now();
        Ok(())
    }

    async fn get(&mut self, id: i32) -> Result<Event, Error> {
        fetch(&self.tables.events, "Event", id)
    }

    async fn get_for_update(&mut self, id: i32) -> Result<Event, Error> {
        fetch(&self.tables.events, "Event", id)
    }

    async fn set_organizations(&mut self, id: i32, organization_ids: &[i32]) -> Result<(), Error> {
        let event = fetch_mut(&mut self.tables.events, "Event", id)?;
        event.organizations = organization_ids.to_vec();
        event.organizations.sort_unstable();
        Ok(())
    }

    async fn set_questions(&mut self, id: i32, question_ids: &[i32]) -> Result<(), Error> {
        let event = fetch_mut(&mut self.tables.events, "Event", id)?;
        event.questions = question_ids.to_vec();
        event.questions.sort_unstable();
        Ok(())
    }

    async fn query(&mut self, query: &EventQuery, pagination: Option<Pagination>) -> Result<Vec<Event>, Error> {
        let items = self
            .tables
            .events
            .values()
            .filter(|e| query.organization_id_eq.map_or(true, |o| e.organizations.contains(&o)) && query.date_eq.map_or(true, |d| e.date == d));
        Ok(page(items, pagination))
    }

    async fn count(&mut self, query: &EventQuery) -> Result<i64, Error> {
        Ok(EventCommon::query(self, query, None).await?.len() as i64)
    }

    async fn delete(&mut self, id: i32) -> Result<(), Error> {
        self.tables.events.remove(&id);
        self.tables.event_demographics.retain(|_, ed| ed.event != id);
        Ok(())
    }

    async fn count_registrations(&mut self, id: i32) -> Result<i64, Error> {
        Ok(count(self.tables.event_attendees.values().filter(|ea| ea.event == id)))
    }
}

impl EventAttendeeCommon for MemoryStore {
    async fn insert(&mut self, data: EventAttendeeInsert) -> Result<Option<i32>, Error> {
        if EventAttendeeCommon::exists(self, data.event_id, &data.attendee).await? {
            return Ok(None);
        }
        let id = self.tables.next_id();
        let now = Utc::now();
        let mut organizations = data.organizations;
        organizations.sort_unstable();
        self.tables.event_attendees.insert(
            id,
            EventAttendee {
                id,
                event: data.event_id,
                attendee: data.attendee,
                organizations,
                registration_time: now,
                attendance_status: data.attendance_status,
                created_at: now,
                last_modified: now,
            },
        );
        Ok(Some(id))
    }

    async fn update(&mut self, id: i32, attendance_status: AttendanceStatus, organization_ids: &[i32]) -> Result<(), Error> {
        let event_attendee = fetch_mut(&mut self.tables.event_attendees, "EventAttendee", id)?;
        event_attendee.attendance_status = attendance_status;
        event_attendee.organizations = organization_ids.to_vec();
        event_attendee.organizations.sort_unstable();
        event_attendee.last_modified = Utc::now();
        Ok(())
    }

    async fn get(&mut self, id: i32) -> Result<EventAttendee, Error> {
        fetch(&self.tables.event_attendees, "EventAttendee", id)
    }

    async fn exists(&mut self, event_id: i32, attendee: &AttendeeRef) -> Result<bool, Error> {
        Ok(self.tables.event_attendees.values().any(|ea| ea.event == event_id && ea.attendee == *attendee))
    }

    async fn query(&mut self, query: &EventAttendeeQuery, pagination: Option<Pagination>) -> Result<Vec<EventAttendee>, Error> {
        let items = self.tables.event_attendees.values().filter(|ea| {
            let (participant, facilitator, custom_attendee_type) = ea.attendee.columns();
            query.event_id_eq.map_or(true, |e| ea.event == e)
                && query.participant_id_eq.map_or(true, |p| participant == Some(p))
                && query.facilitator_id_eq.map_or(true, |f| facilitator == Some(f))
                && query.custom_attendee_type_id_eq.map_or(true, |c| custom_attendee_type == Some(c))
        });
        Ok(page(items, pagination))
    }

    async fn count(&mut self, query: &EventAttendeeQuery) -> Result<i64, Error> {
        Ok(EventAttendeeCommon::query(self, query, None).await?.len() as i64)
    }

    async fn delete(&mut self, id: i32) -> Result<(), Error> {
        self.tables.event_attendees.remove(&id);
        Ok(())
    }

    async fn count_dependents(&mut self, id: i32) -> Result<i64, Error> {
        Ok(count(self.tables.responses.values().filter(|r| r.event_attendee == id)) + count(self.tables.demographics.values().filter(|d| d.event_attendee == id)))
    }

    async fn count_scoped_to(&mut self, event_id: i32, organization_id: i32) -> Result<i64, Error> {
        Ok(count(
            self.tables
                .event_attendees
                .values()
                .filter(|ea| ea.event == event_id && ea.organizations.contains(&organization_id)),
        ))
    }
}

impl QuestionCommon for MemoryStore {
    async fn insert(&mut self, data: QuestionInsert) -> Result<i32, Error> {
        let id = self.tables.next_id();
        let now = Utc::now();
        self.tables.questions.insert(
            id,
            Question {
                id,
                text: data.text,
                organization: data.organization_id,
                created_at: now,
                last_modified: now,
            },
        );
        Ok(id)
    }

    async fn update(&mut self, id: i32, data: QuestionUpdate) -> Result<(), Error> {
        let question = fetch_mut(&mut self.tables.questions, "Question", id)?;
        if let Some(text) = data.text {
            question.text = text;
        }
        if let Some(organization) = data.organization {
            question.organization = Some(organization);
        }
        question.last_modified = Utc::now();
        Ok(())
    }

    async fn get(&mut self, id: i32) -> Result<Question, Error> {
        fetch(&self.tables.questions, "Question", id)
    }

    async fn find(&mut self, text: &str, organization_id: Option<i32>) -> Result<Option<Question>, Error> {
        Ok(self.tables.questions.values().find(|q| q.text == text && q.organization == organization_id).cloned())
    }

    async fn query(&mut self, query: &QuestionQuery, pagination: Option<Pagination>) -> Result<Vec<Question>, Error> {
        let asked = query.event_id_eq.map(|e| self.tables.events.get(&e).map(|e| e.questions.clone()).unwrap_or_default());
        let items = self.tables.questions.values().filter(|q| {
            query.organization_id_eq.map_or(true, |o| q.organization == Some(o))
                && query.text_eq.as_ref().map_or(true, |t| &q.text == t)
                && asked.as_ref().map_or(true, |asked| asked.contains(&q.id))
        });
        Ok(page(items, pagination))
    }

    async fn count(&mut self, query: &QuestionQuery) -> Result<i64, Error> {
        Ok(QuestionCommon::query(self, query, None).await?.len() as i64)
    }

    async fn delete(&mut self, id: i32) -> Result<(), Error> {
        self.tables.questions.remove(&id);
        for event in self.tables.events.values_mut() {
            event.questions.retain(|q| *q != id);
        }
        Ok(())
    }

    async fn count_responses(&mut self, id: i32) -> Result<i64, Error> {
        Ok(count(self.tables.responses.values().filter(|r| r.question == id)))
    }
}

impl ResponseCommon for MemoryStore {
    async fn insert(&mut self, data: ResponseInsert) -> Result<i32, Error> {
        let id = self.tables.next_id();
        let now = Utc::now();
        self.tables.responses.insert(
            id,
            Response {
                id,
                text: data.text,
                event_attendee: data.event_attendee_id,
                question: data.question_id,
                created_at: now,
                last_modified: now,
            },
        );
        Ok(id)
    }

    async fn update(&mut self, id: i32, text: String) -> Result<(), Error> {
        let response = fetch_mut(&mut self.tables.responses, "Response", id)?;
        response.text = text;
        response.last_modified = Utc::now();
        Ok(())
    }

    async fn get(&mut self, id: i32) -> Result<Response, Error> {
        fetch(&self.tables.responses, "Response", id)
    }

    async fn query(&mut self, query: &ResponseQuery, pagination: Option<Pagination>) -> Result<Vec<Response>, Error> {
        let items = self
            .tables
            .responses
            .values()
            .filter(|r| query.event_attendee_id_eq.map_or(true, |e| r.event_attendee == e) && query.question_id_eq.map_or(true, |q| r.question == q));
        Ok(page(items, pagination))
    }

    async fn count(&mut self, query: &ResponseQuery) -> Result<i64, Error> {
        Ok(ResponseCommon::query(self, query, None).await?.len() as i64)
    }

    async fn delete(&mut self, id: i32) -> Result<(), Error> {
        self.tables.responses.remove(&id);
        Ok(())
    }
}

impl DemographicCategoryCommon for MemoryStore {
    async fn insert(&mut self, data: CategoryCreate) -> Result<i32, Error> {
        let id = self.tables.next_id();
        let now = Utc::now();
        self.tables.demographic_categories.insert(
            id,
            DemographicCategory {
                id,
                organization: data.organization,
                name: data.name,
                field_type: data.field_type,
                choices: data.choices,
                required: data.required,
                created_at: now,
                last_modified: now,
            },
        );
        Ok(id)
    }

    async fn update(&mut self, id: i32, data: CategoryUpdate) -> Result<(), Error> {
        let category = fetch_mut(&mut self.tables.demographic_categories, "DemographicCategory", id)?;
        if let Some(name) = data.name {
            category.name = name;
        }
        if let Some(choices) = data.choices {
            category.choices = choices;
        }
        if let Some(required) = data.required {
            category.required = required;
        }
        category.last_modified = Utc::now();
        Ok(())
    }

    async fn get(&mut self, id: i32) -> Result<DemographicCategory, Error> {
        fetch(&self.tables.demographic_categories, "DemographicCategory", id)
    }

    async fn query(&mut self, query: &CategoryQuery, pagination: Option<Pagination>) -> Result<Vec<DemographicCategory>, Error> {
        let items = self
            .tables
            .demographic_categories
            .values()
            .filter(|c| query.organization_id_eq.map_or(true, |o| c.organization == o));
        Ok(page(items, pagination))
    }

    async fn count(&mut self, query: &CategoryQuery) -> Result<i64, Error> {
        Ok(DemographicCategoryCommon::query(self, query, None).await?.len() as i64)
    }

    async fn delete(&mut self, id: i32) -> Result<(), Error> {
        self.tables.demographic_categories.remove(&id);
        Ok(())
    }

    async fn count_links(&mut self, id: i32) -> Result<i64, Error> {
        Ok(count(self.tables.event_demographics.values().filter(|ed| ed.category == id)))
    }
}

impl EventDemographicCommon for MemoryStore {
    async fn insert(&mut self, data: EventDemographicCreate) -> Result<i32, Error> {
        if self.tables.event_demographics.values().any(|ed| ed.event == data.event && ed.category == data.category) {
            return Err(Error::UniqueViolation("event_demographics_event_category_key".into()));
        }
        let id = self.tables.next_id();
        let now = Utc::now();
        self.tables.event_demographics.insert(
            id,
            EventDemographic {
                id,
                event: data.event,
                category: data.category,
                created_at: now,
                last_modified: now,
            },
        );
        Ok(id)
    }

    async fn get(&mut self, id: i32) -> Result<EventDemographic, Error> {
        fetch(&self.tables.event_demographics, "EventDemographic", id)
    }

    async fn query(&mut self, query: &EventDemographicQuery, pagination: Option<Pagination>) -> Result<Vec<EventDemographic>, Error> {
        let items = self
            .tables
            .event_demographics
            .values()
            .filter(|ed| query.event_id_eq.map_or(true, |e| ed.event == e) && query.category_id_eq.map_or(true, |c| ed.category == c));
        Ok(page(items, pagination))
    }

    async fn count(&mut self, query: &EventDemographicQuery) -> Result<i64, Error> {
        Ok(EventDemographicCommon::query(self, query, None).await?.len() as i64)
    }

    async fn delete(&mut self, id: i32) -> Result<(), Error> {
        self.tables.event_demographics.remove(&id);
        Ok(())
    }

    async fn count_values(&mut self, id: i32) -> Result<i64, Error> {
        Ok(count(self.tables.demographics.values().filter(|d| d.event_demographic == id)))
    }
}

impl DemographicCommon for MemoryStore {
    async fn insert(&mut self, data: DemographicCreate) -> Result<i32, Error> {
        if self
            .tables
            .demographics
            .values()
            .any(|d| d.event_demographic == data.event_demographic && d.event_attendee == data.event_attendee)
        {
            return Err(Error::UniqueViolation("demographics_event_demographic_attendee_key".into()));
        }
        let id = self.tables.next_id();
        let now = Utc::now();
        self.tables.demographics.insert(
            id,
            Demographic {
                id,
                event_demographic: data.event_demographic,
                event_attendee: data.event_attendee,
                value: data.value,
                created_at: now,
                last_modified: now,
            },
        );
        Ok(id)
    }

    async fn update(&mut self, id: i32, value: String) -> Result<(), Error> {
        let demographic = fetch_mut(&mut self.tables.demographics, "Demographics", id)?;
        demographic.value = value;
        demographic.last_modified = Utc::now();
        Ok(())
    }

    async fn get(&mut self, id: i32) -> Result<Demographic, Error> {
        fetch(&self.tables.demographics, "Demographics", id)
    }

    async fn query(&mut self, query: &DemographicQuery, pagination: Option<Pagination>) -> Result<Vec<Demographic>, Error> {
        let items = self.tables.demographics.values().filter(|d| {
            query.event_demographic_id_eq.map_or(true, |e| d.event_demographic == e) && query.event_attendee_id_eq.map_or(true, |a| d.event_attendee == a)
        });
        Ok(page(items, pagination))
    }

    async fn count(&mut self, query: &DemographicQuery) -> Result<i64, Error> {
        Ok(DemographicCommon::query(self, query, None).await?.len() as i64)
    }

    async fn delete(&mut self, id: i32) -> Result<(), Error> {
        self.tables.demographics.remove(&id);
        Ok(())
    }
}
