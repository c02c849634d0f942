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
    organization::{Coordinator, CoordinatorCreate, CoordinatorQuery, CoordinatorUpdate, Insert as OrganizationInsert, Organization, Query as OrganizationQuery, Update as OrganizationUpdate},
    question::{Insert as QuestionInsert, Query as QuestionQuery, Question, Update as QuestionUpdate},
    response::{Insert as ResponseInsert, Query as ResponseQuery, Response},
};
use crate::error::Error;

pub trait OrganizationCommon {
    async fn insert(&mut self, data: OrganizationInsert) -> Result<i32, Error>;
    async fn update(&mut self, id: i32, data: OrganizationUpdate) -> Result<(), Error>;
    async fn get(&mut self, id: i32) -> Result<Organization, Error>;
    async fn query(&mut self, query: &OrganizationQuery, pagination: Option<Pagination>) -> Result<Vec<Organization>, Error>;
    async fn count(&mut self, query: &OrganizationQuery) -> Result<i64, Error>;
    async fn delete(&mut self, id: i32) -> Result<(), Error>;
    /// Returns the subset of `ids` that exist.
    async fn existing(&mut self, ids: &[i32]) -> Result<Vec<i32>, Error>;
    /// Events, facilitators, custom attendee types, questions and demographic categories owned by or scoped to the organization.
    async fn count_dependents(&mut self, id: i32) -> Result<i64, Error>;
}

pub trait CoordinatorCommon {
    async fn insert(&mut self, data: CoordinatorCreate) -> Result<i32, Error>;
    async fn update(&mut self, id: i32, data: CoordinatorUpdate) -> Result<(), Error>;
    async fn get(&mut self, id: i32) -> Result<Coordinator, Error>;
    async fn query(&mut self, query: &CoordinatorQuery, pagination: Option<Pagination>) -> Result<Vec<Coordinator>, Error>;
    async fn count(&mut self, query: &CoordinatorQuery) -> Result<i64, Error>;
    async fn delete(&mut self, id: i32) -> Result<(), Error>;
}

pub trait ParticipantCommon {
    /// Returns `None` when the unique id is already taken.
    async fn insert(&mut self, data: ParticipantInsert) -> Result<Option<i32>, Error>;
    async fn update(&mut self, id: i32, data: ParticipantUpdate) -> Result<(), Error>;
    async fn get(&mut self, id: i32) -> Result<Participant, Error>;
    async fn get_by_unique_id(&mut self, unique_id: &str) -> Result<Option<Participant>, Error>;
    async fn query(&mut self, query: &ParticipantQuery, pagination: Option<Pagination>) -> Result<Vec<Participant>, Error>;
    async fn count(&mut self, query: &ParticipantQuery) -> Result<i64, Error>;
    async fn delete(&mut self, id: i32) -> Result<(), Error>;
    async fn count_registrations(&mut self, id: i32) -> Result<i64, Error>;
}

pub trait FacilitatorCommon {
    async fn insert(&mut self, data: FacilitatorCreate) -> Result<i32, Error>;
    async fn update(&mut self, id: i32, data: FacilitatorUpdate) -> Result<(), Error>;
    async fn get(&mut self, id: i32) -> Result<Facilitator, Error>;
    async fn query(&mut self, query: &FacilitatorQuery, pagination: Option<Pagination>) -> Result<Vec<Facilitator>, Error>;
    async fn count(&mut self, query: &FacilitatorQuery) -> Result<i64, Error>;
    async fn delete(&mut self, id: i32) -> Result<(), Error>;
    async fn count_registrations(&mut self, id: i32) -> Result<i64, Error>;
}

pub trait CustomAttendeeTypeCommon {
    /// Returns `None` when the organization already has a type with that name.
    async fn insert(&mut self, data: CustomAttendeeTypeCreate) -> Result<Option<i32>, Error>;
    async fn update(&mut self, id: i32, data: CustomAttendeeTypeUpdate) -> Result<(), Error>;
    async fn get(&mut self, id: i32) -> Result<CustomAttendeeType, Error>;
    async fn get_by_name(&mut self, organization_id: i32, type_name: &str) -> Result<Option<CustomAttendeeType>, Error>;
    async fn query(&mut self, query: &CustomAttendeeTypeQuery, pagination: Option<Pagination>) -> Result<Vec<CustomAttendeeType>, Error>;
    async fn count(&mut self, query: &CustomAttendeeTypeQuery) -> Result<i64, Error>;
    async fn delete(&mut self, id: i32) -> Result<(), Error>;
    async fn count_registrations(&mut self, id: i32) -> Result<i64, Error>;
}

pub trait EventCommon {
    async fn insert(&mut self, data: EventInsert) -> Result<i32, Error>;
    async fn update(&mut self, id: i32, data: EventScalarUpdate) -> Result<(), Error>;
    async fn get(&mut self, id: i32) -> Result<Event, Error>;
    /// Like `get`, but holds the event row until the transaction ends.
    async fn get_for_update(&mut self, id: i32) -> Result<Event, Error>;
    async fn set_organizations(&mut self, id: i32, organization_ids: &[i32]) -> Result<(), Error>;
    async fn set_questions(&mut self, id: i32, question_ids: &[i32]) -> Result<(), Error>;
    async fn query(&mut self, query: &EventQuery, pagination: Option<Pagination>) -> Result<Vec<Event>, Error>;
    async fn count(&mut self, query: &EventQuery) -> Result<i64, Error>;
    async fn delete(&mut self, id: i32) -> Result<(), Error>;
    async fn count_registrations(&mut self, id: i32) -> Result<i64, Error>;
}

pub trait EventAttendeeCommon {
    /// Returns `None` when the (event, attendee) pair is already registered.
    async fn insert(&mut self, data: EventAttendeeInsert) -> Result<Option<i32>, Error>;
    async fn update(&mut self, id: i32, attendance_status: AttendanceStatus, organization_ids: &[i32]) -> Result<(), Error>;
    async fn get(&mut self, id: i32) -> Result<EventAttendee, Error>;
    async fn exists(&mut self, event_id: i32, attendee: &AttendeeRef) -> Result<bool, Error>;
    async fn query(&mut self, query: &EventAttendeeQuery, pagination: Option<Pagination>) -> Result<Vec<EventAttendee>, Error>;
    async fn count(&mut self, query: &EventAttendeeQuery) -> Result<i64, Error>;
    async fn delete(&mut self, id: i32) -> Result<(), Error>;
    /// Responses and demographic values recorded for the registration.
    async fn count_dependents(&mut self, id: i32) -> Result<i64, Error>;
    /// Registrations of the event scoped to the organization.
    async fn count_scoped_to(&mut self, event_id: i32, organization_id: i32) -> Result<i64, Error>;
}

pub trait QuestionCommon {
    async fn insert(&mut self, data: QuestionInsert) -> Result<i32, Error>;
    async fn update(&mut self, id: i32, data: QuestionUpdate) -> Result<(), Error>;
    async fn get(&mut self, id: i32) -> Result<Question, Error>;
    async fn find(&mut self, text: &str, organization_id: Option<i32>) -> Result<Option<Question>, Error>;
    async fn query(&mut self, query: &QuestionQuery, pagination: Option<Pagination>) -> Result<Vec<Question>, Error>;
    async fn count(&mut self, query: &QuestionQuery) -> Result<i64, Error>;
    async fn delete(&mut self, id: i32) -> Result<(), Error>;
    async fn count_responses(&mut self, id: i32) -> Result<i64, Error>;
}

pub trait ResponseCommon {
    async fn insert(&mut self, data: ResponseInsert) -> Result<i32, Error>;
    async fn update(&mut self, id: i32, text: String) -> Result<(), Error>;
    async fn get(&mut self, id: i32) -> Result<Response, Error>;
    async fn query(&mut self, query: &ResponseQuery, pagination: Option<Pagination>) -> Result<Vec<Response>, Error>;
    async fn count(&mut self, query: &ResponseQuery) -> Result<i64, Error>;
    async fn delete(&mut self, id: i32) -> Result<(), Error>;
}

pub trait DemographicCategoryCommon {
    async fn insert(&mut self, data: CategoryCreate) -> Result<i32, Error>;
    async fn update(&mut self, id: i32, data: CategoryUpdate) -> Result<(), Error>;
    async fn get(&mut self, id: i32) -> Result<DemographicCategory, Error>;
    async fn query(&mut self, query: &CategoryQuery, pagination: Option<Pagination>) -> Result<Vec<DemographicCategory>, Error>;
    async fn count(&mut self, query: &CategoryQuery) -> Result<i64, Error>;
    async fn delete(&mut self, id: i32) -> Result<(), Error>;
    async fn count_links(&mut self, id: i32) -> Result<i64, Error>;
}

pub trait EventDemographicCommon {
    async fn insert(&mut self, data: EventDemographicCreate) -> Result<i32, Error>;
    async fn get(&mut self, id: i32) -> Result<EventDemographic, Error>;
    async fn query(&mut self, query: &EventDemographicQuery, pagination: Option<Pagination>) -> Result<Vec<EventDemographic>, Error>;
    async fn count(&mut self, query: &EventDemographicQuery) -> Result<i64, Error>;
    async fn delete(&mut self, id: i32) -> Result<(), Error>;
    async fn count_values(&mut self, id: i32) -> Result<i64, Error>;
}

pub trait DemographicCommon {
    async fn insert(&mut self, data: DemographicCreate) -> Result<i32, Error>;
    async fn update(&mut self, id: i32, value: String) -> Result<(), Error>;
    async fn get(&mut self, id: i32) -> Result<Demographic, Error>;
    async fn query(&mut self, query: &DemographicQuery, pagination: Option<Pagination>) -> Result<Vec<Demographic>, Error>;
    async fn count(&mut self, query: &DemographicQuery) -> Result<i64, Error>;
    async fn delete(&mut self, id: i32) -> Result<(), Error>;
}

pub trait Common:
    OrganizationCommon
    + CoordinatorCommon
    + ParticipantCommon
    + FacilitatorCommon
    + CustomAttendeeTypeCommon
    + EventCommon
    + EventAttendeeCommon
    + QuestionCommon
    + ResponseCommon
    + DemographicCategoryCommon
    + EventDemographicCommon
    + DemographicCommon
{
}

pub trait Store: Common {}

pub trait TxStore: Store {
    async fn commit(self) -> Result<(), Error>;
    async fn rollback(self) -> Result<(), Error>;
}

pub trait Manager: 'static {
    type Store: Store;
    type Tx: TxStore;

    async fn db(&self) -> Result<Self::Store, Error>;
    async fn tx(&self) -> Result<Self::Tx, Error>;
}
