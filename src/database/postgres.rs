use std::ops::DerefMut;

use chrono::{DateTime, Utc};
use sqlx::pool::PoolConnection;
use sqlx::postgres::PgConnection;
use sqlx::{query, query_as, query_scalar, FromRow, PgPool, Postgres, QueryBuilder, Transaction};

use crate::core::models::{
    attendee::{
        CustomAttendeeType, CustomAttendeeTypeCreate, CustomAttendeeTypeQuery, CustomAttendeeTypeUpdate, Facilitator, FacilitatorCreate, FacilitatorQuery, FacilitatorUpdate, Participant,
        ParticipantInsert, ParticipantQuery, ParticipantUpdate,
    },
    common::Pagination,
    demographic::{
        CategoryCreate, CategoryQuery, CategoryUpdate, Demographic, DemographicCategory, DemographicCreate, DemographicQuery, EventDemographic, EventDemographicCreate,
        EventDemographicQuery, FieldType,
    },
    event::{Event, Insert as EventInsert, Query as EventQuery, ScalarUpdate as EventScalarUpdate},
    event_attendee::{AttendanceStatus, AttendeeRef, EventAttendee, Insert as EventAttendeeInsert, Query as EventAttendeeQuery},
    organization::{Coordinator, CoordinatorCreate, CoordinatorQuery, CoordinatorUpdate, Insert as OrganizationInsert, Organization, Query as OrganizationQuery, Update as OrganizationUpdate},
    question::{Insert as QuestionInsert, Query as QuestionQuery, Question, Update as QuestionUpdate},
    response::{Insert as ResponseInsert, Query as ResponseQuery, Response},
};
use crate::core::ports::repository::{
    Common, CoordinatorCommon, CustomAttendeeTypeCommon, DemographicCategoryCommon, DemographicCommon, EventAttendeeCommon, EventCommon, EventDemographicCommon, FacilitatorCommon,
    Manager, OrganizationCommon, ParticipantCommon, QuestionCommon, ResponseCommon, Store, TxStore,
};
use crate::error::Error;

macro_rules! participant_select {
    () => {
        "SELECT p.*, ARRAY(SELECT organization_id FROM participant_organizations WHERE participant_id = p.id ORDER BY organization_id) AS organizations FROM participants AS p"
    };
}

macro_rules! event_select {
    () => {
        "SELECT e.*,
            ARRAY(SELECT organization_id FROM event_organizations WHERE event_id = e.id ORDER BY organization_id) AS organizations,
            ARRAY(SELECT question_id FROM event_questions WHERE event_id = e.id ORDER BY question_id) AS questions
        FROM events AS e"
    };
}

macro_rules! event_attendee_select {
    () => {
        "SELECT ea.*, ARRAY(SELECT organization_id FROM event_attendee_organizations WHERE event_attendee_id = ea.id ORDER BY organization_id) AS organizations
        FROM event_attendees AS ea"
    };
}

fn paginate(stmt: &mut QueryBuilder<'_, Postgres>, pagination: Option<Pagination>) {
    stmt.push(" ORDER BY id");
    if let Some(pagination) = pagination {
        stmt.push(" LIMIT ").push_bind(pagination.limit());
        stmt.push(" OFFSET ").push_bind(pagination.offset());
    }
}

#[derive(Debug, FromRow)]
struct EventAttendeeRow {
    id: i32,
    event_id: i32,
    attendee_type: String,
    participant_id: Option<i32>,
    facilitator_id: Option<i32>,
    custom_attendee_type_id: Option<i32>,
    organizations: Vec<i32>,
    registration_time: DateTime<Utc>,
    attendance_status: String,
    created_at: DateTime<Utc>,
    last_modified: DateTime<Utc>,
}

impl TryFrom<EventAttendeeRow> for EventAttendee {
    type Error = Error;

    fn try_from(row: EventAttendeeRow) -> Result<Self, Self::Error> {
        Ok(EventAttendee {
            id: row.id,
            event: row.event_id,
            attendee: AttendeeRef::from_columns(&row.attendee_type, row.participant_id, row.facilitator_id, row.custom_attendee_type_id)?,
            organizations: row.organizations,
            registration_time: row.registration_time,
            attendance_status: AttendanceStatus::parse(&row.attendance_status)?,
            created_at: row.created_at,
            last_modified: row.last_modified,
        })
    }
}

#[derive(Debug, FromRow)]
struct CategoryRow {
    id: i32,
    organization_id: i32,
    name: String,
    field_type: String,
    choices: Vec<String>,
    required: bool,
    created_at: DateTime<Utc>,
    last_modified: DateTime<Utc>,
}

impl TryFrom<CategoryRow> for DemographicCategory {
    type Error = Error;

    fn try_from(row: CategoryRow) -> Result<Self, Self::Error> {
        Ok(DemographicCategory {
            id: row.id,
            organization: row.organization_id,
            name: row.name,
            field_type: FieldType::parse(&row.field_type)?,
            choices: row.choices,
            required: row.required,
            created_at: row.created_at,
            last_modified: row.last_modified,
        })
    }
}

pub struct PgSqlx<E>
where
    E: DerefMut<Target = PgConnection>,
{
    executor: E,
}

impl<E> PgSqlx<E>
where
    E: DerefMut<Target = PgConnection>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }
}

fn push_organization_filter(stmt: &mut QueryBuilder<'_, Postgres>, query: &OrganizationQuery) {
    if let Some(name) = &query.name_eq {
        stmt.push(" AND name = ").push_bind(name.clone());
    }
}

impl<E> OrganizationCommon for PgSqlx<E>
where
    E: DerefMut<Target = PgConnection>,
{
    async fn insert(&mut self, data: OrganizationInsert) -> Result<i32, Error> {
        let id = query_scalar("INSERT INTO organizations (name, location) VALUES ($1, $2) RETURNING id")
            .bind(data.name)
            .bind(data.location)
            .fetch_one(&mut *self.executor)
            .await?;
        Ok(id)
    }

    async fn update(&mut self, id: i32, data: OrganizationUpdate) -> Result<(), Error> {
        query("UPDATE organizations SET name = COALESCE($1, name), location = COALESCE($2, location), last_modified = now() WHERE id = $3")
            .bind(data.name)
            .bind(data.location)
            .bind(id)
            .execute(&mut *self.executor)
            .await?;
        Ok(())
    }

    async fn get(&mut self, id: i32) -> Result<Organization, Error> {
        query_as("SELECT * FROM organizations WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.executor)
            .await?
            .ok_or_else(|| Error::not_found("Organization", id))
    }

    async fn query(&mut self, query: &OrganizationQuery, pagination: Option<Pagination>) -> Result<Vec<Organization>, Error> {
        let mut stmt = QueryBuilder::new("SELECT * FROM organizations WHERE 1 = 1");
        push_organization_filter(&mut stmt, query);
        paginate(&mut stmt, pagination);
        let list = stmt.build_query_as().fetch_all(&mut *self.executor).await?;
        Ok(list)
    }

    async fn count(&mut self, query: &OrganizationQuery) -> Result<i64, Error> {
        let mut stmt = QueryBuilder::new("SELECT COUNT(*) FROM organizations WHERE 1 = 1");
        push_organization_filter(&mut stmt, query);
        let (n,) = stmt.build_query_as().fetch_one(&mut *self.executor).await?;
        Ok(n)
    }

    async fn delete(&mut self, id: i32) -> Result<(), Error> {
        query("DELETE FROM organizations WHERE id = $1").bind(id).execute(&mut *self.executor).await?;
        Ok(())
    }

    async fn existing(&mut self, ids: &[i32]) -> Result<Vec<i32>, Error> {
        let existing = query_scalar("SELECT id FROM organizations WHERE id = ANY($1)").bind(ids).fetch_all(&mut *self.executor).await?;
        Ok(existing)
    }

    async fn count_dependents(&mut self, id: i32) -> Result<i64, Error> {
        let n = query_scalar(
            "
        SELECT (SELECT COUNT(*) FROM event_organizations WHERE organization_id = $1)
            + (SELECT COUNT(*) FROM facilitators WHERE organization_id = $1)
            + (SELECT COUNT(*) FROM custom_attendee_types WHERE organization_id = $1)
            + (SELECT COUNT(*) FROM questions WHERE organization_id = $1)
            + (SELECT COUNT(*) FROM demographic_categories WHERE organization_id = $1)",
        )
        .bind(id)
        .fetch_one(&mut *self.executor)
        .await?;
        Ok(n)
    }
}

impl<E> CoordinatorCommon for PgSqlx<E>
where
    E: DerefMut<Target = PgConnection>,
{
    async fn insert(&mut self, data: CoordinatorCreate) -> Result<i32, Error> {
        let id = query_scalar(
            "INSERT INTO coordinators (organization_id, first_name, last_name, email, organization_role) VALUES ($1, $2, $3, $4, COALESCE($5, 'Coordinator')) RETURNING id",
        )
        .bind(data.organization)
        .bind(data.first_name)
        .bind(data.last_name)
        .bind(data.email)
        .bind(data.organization_role)
        .fetch_one(&mut *self.executor)
        .await?;
        Ok(id)
    }

    async fn update(&mut self, id: i32, data: CoordinatorUpdate) -> Result<(), Error> {
        query(
            "
        UPDATE coordinators SET
            first_name = COALESCE($1, first_name),
            last_name = COALESCE($2, last_name),
            email = COALESCE($3, email),
            organization_role = COALESCE($4, organization_role),
            last_modified = now()
        WHERE id = $5",
        )
        .bind(data.first_name)
        .bind(data.last_name)
        .bind(data.email)
        .bind(data.organization_role)
        .bind(id)
        .execute(&mut *self.executor)
        .await?;
        Ok(())
    }

    async fn get(&mut self, id: i32) -> Result<Coordinator, Error> {
        query_as("SELECT * FROM coordinators WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.executor)
            .await?
            .ok_or_else(|| Error::not_found("Coordinator", id))
    }

    async fn query(&mut self, query: &CoordinatorQuery, pagination: Option<Pagination>) -> Result<Vec<Coordinator>, Error> {
        let mut stmt = QueryBuilder::new("SELECT * FROM coordinators WHERE 1 = 1");
        if let Some(organization_id) = query.organization_id_eq {
            stmt.push(" AND organization_id = ").push_bind(organization_id);
        }
        paginate(&mut stmt, pagination);
        let list = stmt.build_query_as().fetch_all(&mut *self.executor).await?;
        Ok(list)
    }

    async fn count(&mut self, query: &CoordinatorQuery) -> Result<i64, Error> {
        let mut stmt = QueryBuilder::new("SELECT COUNT(*) FROM coordinators WHERE 1 = 1");
        if let Some(organization_id) = query.organization_id_eq {
            stmt.push(" AND organization_id = ").push_bind(organization_id);
        }
        let (n,) = stmt.build_query_as().fetch_one(&mut *self.executor).await?;
        Ok(n)
    }

    async fn delete(&mut self, id: i32) -> Result<(), Error> {
        query("DELETE FROM coordinators WHERE id = $1").bind(id).execute(&mut *self.executor).await?;
        Ok(())
    }
}

fn push_participant_filter(stmt: &mut QueryBuilder<'_, Postgres>, query: &ParticipantQuery) {
    if let Some(unique_id) = &query.unique_id_eq {
        stmt.push(" AND p.unique_id = ").push_bind(unique_id.clone());
    }
    if let Some(organization_id) = query.organization_id_eq {
        stmt.push(" AND p.id IN (SELECT participant_id FROM participant_organizations WHERE organization_id = ")
            .push_bind(organization_id)
            .push(")");
    }
}

impl<E> PgSqlx<E>
where
    E: DerefMut<Target = PgConnection>,
{
    async fn set_participant_organizations(&mut self, id: i32, organization_ids: &[i32]) -> Result<(), Error> {
        query("DELETE FROM participant_organizations WHERE participant_id = $1").bind(id).execute(&mut *self.executor).await?;
        query("INSERT INTO participant_organizations (participant_id, organization_id) SELECT $1, UNNEST($2::int[])")
            .bind(id)
            .bind(organization_ids)
            .execute(&mut *self.executor)
            .await?;
        Ok(())
    }
}

impl<E> ParticipantCommon for PgSqlx<E>
where
    E: DerefMut<Target = PgConnection>,
{
    async fn insert(&mut self, data: ParticipantInsert) -> Result<Option<i32>, Error> {
        let id: Option<i32> =
            query_scalar("INSERT INTO participants (unique_id, emoji, first_name, last_name) VALUES ($1, $2, $3, $4) ON CONFLICT (unique_id) DO NOTHING RETURNING id")
                .bind(data.unique_id)
                .bind(data.emoji)
                .bind(data.first_name)
                .bind(data.last_name)
                .fetch_optional(&mut *self.executor)
                .await?;
        if let Some(id) = id {
            self.set_participant_organizations(id, &data.organizations).await?;
        }
        Ok(id)
    }

    async fn update(&mut self, id: i32, data: ParticipantUpdate) -> Result<(), Error> {
        query(
            "
        UPDATE participants SET
            emoji = COALESCE($1, emoji),
            first_name = COALESCE($2, first_name),
            last_name = COALESCE($3, last_name),
            last_modified = now()
        WHERE id = $4",
        )
        .bind(data.emoji)
        .bind(data.first_name)
        .bind(data.last_name)
        .bind(id)
        .execute(&mut *self.executor)
        .await?;
        if let Some(organizations) = data.organizations {
            self.set_participant_organizations(id, &organizations).await?;
        }
        Ok(())
    }

    async fn get(&mut self, id: i32) -> Result<Participant, Error> {
        query_as(concat!(participant_select!(), " WHERE p.id = $1"))
            .bind(id)
            .fetch_optional(&mut *self.executor)
            .await?
            .ok_or_else(|| Error::not_found("Participant", id))
    }

    async fn get_by_unique_id(&mut self, unique_id: &str) -> Result<Option<Participant>, Error> {
        let participant = query_as(concat!(participant_select!(), " WHERE p.unique_id = $1"))
            .bind(unique_id)
            .fetch_optional(&mut *self.executor)
            .await?;
        Ok(participant)
    }

    async fn query(&mut self, query: &ParticipantQuery, pagination: Option<Pagination>) -> Result<Vec<Participant>, Error> {
        let mut stmt = QueryBuilder::new(concat!(participant_select!(), " WHERE 1 = 1"));
        push_participant_filter(&mut stmt, query);
        paginate(&mut stmt, pagination);
        let list = stmt.build_query_as().fetch_all(&mut *self.executor).await?;
        Ok(list)
    }

    async fn count(&mut self, query: &ParticipantQuery) -> Result<i64, Error> {
        let mut stmt = QueryBuilder::new("SELECT COUNT(*) FROM participants AS p WHERE 1 = 1");
        push_participant_filter(&mut stmt, query);
        let (n,) = stmt.build_query_as().fetch_one(&mut *self.executor).await?;
        Ok(n)
    }

    async fn delete(&mut self, id: i32) -> Result<(), Error> {
        query("DELETE FROM participants WHERE id = $1").bind(id).execute(&mut *self.executor).await?;
        Ok(())
    }

    async fn count_registrations(&mut self, id: i32) -> Result<i64, Error> {
        let n = query_scalar("SELECT COUNT(*) FROM event_attendees WHERE participant_id = $1")
            .bind(id)
            .fetch_one(&mut *self.executor)
            .await?;
        Ok(n)
    }
}

impl<E> FacilitatorCommon for PgSqlx<E>
where
    E: DerefMut<Target = PgConnection>,
{
    async fn insert(&mut self, data: FacilitatorCreate) -> Result<i32, Error> {
        let id = query_scalar("INSERT INTO facilitators (first_name, last_name, organization_role, organization_id) VALUES ($1, $2, $3, $4) RETURNING id")
            .bind(data.first_name)
            .bind(data.last_name)
            .bind(data.organization_role)
            .bind(data.organization)
            .fetch_one(&mut *self.executor)
            .await?;
        Ok(id)
    }

    async fn update(&mut self, id: i32, data: FacilitatorUpdate) -> Result<(), Error> {
        query(
            "
        UPDATE facilitators SET
            first_name = COALESCE($1, first_name),
            last_name = COALESCE($2, last_name),
            organization_role = COALESCE($3, organization_role),
            organization_id = COALESCE($4, organization_id),
            last_modified = now()
        WHERE id = $5",
        )
        .bind(data.first_name)
        .bind(data.last_name)
        .bind(data.organization_role)
        .bind(data.organization)
        .bind(id)
        .execute(&mut *self.executor)
        .await?;
        Ok(())
    }

    async fn get(&mut self, id: i32) -> Result<Facilitator, Error> {
        query_as("SELECT * FROM facilitators WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.executor)
            .await?
            .ok_or_else(|| Error::not_found("Facilitator", id))
    }

    async fn query(&mut self, query: &FacilitatorQuery, pagination: Option<Pagination>) -> Result<Vec<Facilitator>, Error> {
        let mut stmt = QueryBuilder::new("SELECT * FROM facilitators WHERE 1 = 1");
        if let Some(organization_id) = query.organization_id_eq {
            stmt.push(" AND organization_id = ").push_bind(organization_id);
        }
        paginate(&mut stmt, pagination);
        let list = stmt.build_query_as().fetch_all(&mut *self.executor).await?;
        Ok(list)
    }

    async fn count(&mut self, query: &FacilitatorQuery) -> Result<i64, Error> {
        let mut stmt = QueryBuilder::new("SELECT COUNT(*) FROM facilitators WHERE 1 = 1");
        if let Some(organization_id) = query.organization_id_eq {
            stmt.push(" AND organization_id = ").push_bind(organization_id);
        }
        let (n,) = stmt.build_query_as().fetch_one(&mut *self.executor).await?;
        Ok(n)
    }

    async fn delete(&mut self, id: i32) -> Result<(), Error> {
        query("DELETE FROM facilitators WHERE id = $1").bind(id).execute(&mut *self.executor).await?;
        Ok(())
    }

    async fn count_registrations(&mut self, id: i32) -> Result<i64, Error> {
        let n = query_scalar("SELECT COUNT(*) FROM event_attendees WHERE facilitator_id = $1")
            .bind(id)
            .fetch_one(&mut *self.executor)
            .await?;
        Ok(n)
    }
}

fn push_custom_type_filter(stmt: &mut QueryBuilder<'_, Postgres>, query: &CustomAttendeeTypeQuery) {
    if let Some(organization_id) = query.organization_id_eq {
        stmt.push(" AND organization_id = ").push_bind(organization_id);
    }
    if let Some(type_name) = &query.type_name_eq {
        stmt.push(" AND type_name = ").push_bind(type_name.clone());
    }
}

impl<E> CustomAttendeeTypeCommon for PgSqlx<E>
where
    E: DerefMut<Target = PgConnection>,
{
    async fn insert(&mut self, data: CustomAttendeeTypeCreate) -> Result<Option<i32>, Error> {
        let id = query_scalar(
            "INSERT INTO custom_attendee_types (type_name, organization_role, organization_id) VALUES ($1, $2, $3) ON CONFLICT (organization_id, type_name) DO NOTHING RETURNING id",
        )
        .bind(data.type_name)
        .bind(data.organization_role)
        .bind(data.organization)
        .fetch_optional(&mut *self.executor)
        .await?;
        Ok(id)
    }

    async fn update(&mut self, id: i32, data: CustomAttendeeTypeUpdate) -> Result<(), Error> {
        query("UPDATE custom_attendee_types SET type_name = COALESCE($1, type_name), organization_role = COALESCE($2, organization_role), last_modified = now() WHERE id = $3")
            .bind(data.type_name)
            .bind(data.organization_role)
            .bind(id)
            .execute(&mut *self.executor)
            .await?;
        Ok(())
    }

    async fn get(&mut self, id: i32) -> Result<CustomAttendeeType, Error> {
        query_as("SELECT * FROM custom_attendee_types WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.executor)
            .await?
            .ok_or_else(|| Error::not_found("CustomAttendeeType", id))
    }

    async fn get_by_name(&mut self, organization_id: i32, type_name: &str) -> Result<Option<CustomAttendeeType>, Error> {
        let custom = query_as("SELECT * FROM custom_attendee_types WHERE organization_id = $1 AND type_name = $2")
            .bind(organization_id)
            .bind(type_name)
            .fetch_optional(&mut *self.executor)
            .await?;
        Ok(custom)
    }

    async fn query(&mut self, query: &CustomAttendeeTypeQuery, pagination: Option<Pagination>) -> Result<Vec<CustomAttendeeType>, Error> {
        let mut stmt = QueryBuilder::new("SELECT * FROM custom_attendee_types WHERE 1 = 1");
        push_custom_type_filter(&mut stmt, query);
        paginate(&mut stmt, pagination);
        let list = stmt.build_query_as().fetch_all(&mut *self.executor).await?;
        Ok(list)
    }

    async fn count(&mut self, query: &CustomAttendeeTypeQuery) -> Result<i64, Error> {
        let mut stmt = QueryBuilder::new("SELECT COUNT(*) FROM custom_attendee_types WHERE 1 = 1");
        push_custom_type_filter(&mut stmt, query);
        let (n,) = stmt.build_query_as().fetch_one(&mut *self.executor).await?;
        Ok(n)
    }

    async fn delete(&mut self, id: i32) -> Result<(), Error> {
        query("DELETE FROM custom_attendee_types WHERE id = $1").bind(id).execute(&mut *self.executor).await?;
        Ok(())
    }

    async fn count_registrations(&mut self, id: i32) -> Result<i64, Error> {
        let n = query_scalar("SELECT COUNT(*) FROM event_attendees WHERE custom_attendee_type_id = $1")
            .bind(id)
            .fetch_one(&mut *self.executor)
            .await?;
        Ok(n)
    }
}

fn push_event_filter(stmt: &mut QueryBuilder<'_, Postgres>, query: &EventQuery) {
    if let Some(organization_id) = query.organization_id_eq {
        stmt.push(" AND e.id IN (SELECT event_id FROM event_organizations WHERE organization_id = ")
            .push_bind(organization_id)
            .push(")");
    }
    if let Some(date) = query.date_eq {
        stmt.push(" AND e.date = ").push_bind(date);
    }
}

impl<E> EventCommon for PgSqlx<E>
where
    E: DerefMut<Target = PgConnection>,
{
    async fn insert(&mut self, data: EventInsert) -> Result<i32, Error> {
        let id = query_scalar("INSERT INTO events (name, description, date, time, location) VALUES ($1, $2, $3, $4, $5) RETURNING id")
            .bind(data.name)
            .bind(data.description)
            .bind(data.date)
            .bind(data.time)
            .bind(data.location)
            .fetch_one(&mut *self.executor)
            .await?;
        Ok(id)
    }

    async fn update(&mut self, id: i32, data: EventScalarUpdate) -> Result<(), Error> {
        query("UPDATE events SET name = $1, description = $2, date = $3, time = $4, location = $5, last_modified = now() WHERE id = $6")
            .bind(data.name)
            .bind(data.description)
            .bind(data.date)
            .bind(data.time)
            .bind(data.location)
            .bind(id)
            .execute(&mut *self.executor)
            .await?;
        Ok(())
    }

    async fn get(&mut self, id: i32) -> Result<Event, Error> {
        query_as(concat!(event_select!(), " WHERE e.id = $1"))
            .bind(id)
            .fetch_optional(&mut *self.executor)
            .await?
            .ok_or_else(|| Error::not_found("Event", id))
    }

    async fn get_for_update(&mut self, id: i32) -> Result<Event, Error> {
        let locked: Option<i32> = query_scalar("SELECT id FROM events WHERE id = $1 FOR UPDATE").bind(id).fetch_optional(&mut *self.executor).await?;
        if locked.is_none() {
            return Err(Error::not_found("Event", id));
        }
        EventCommon::get(self, id).await
    }

    async fn set_organizations(&mut self, id: i32, organization_ids: &[i32]) -> Result<(), Error> {
        query("DELETE FROM event_organizations WHERE event_id = $1").bind(id).execute(&mut *self.executor).await?;
        query("INSERT INTO event_organizations (event_id, organization_id) SELECT $1, UNNEST($2::int[])")
            .bind(id)
            .bind(organization_ids)
            .execute(&mut *self.executor)
            .await?;
        Ok(())
    }

    async fn set_questions(&mut self, id: i32, question_ids: &[i32]) -> Result<(), Error> {
        query("DELETE FROM event_questions WHERE event_id = $1").bind(id).execute(&mut *self.executor).await?;
        query("INSERT INTO event_questions (event_id, question_id) SELECT $1, UNNEST($2::int[])")
            .bind(id)
            .bind(question_ids)
            .execute(&mut *self.executor)
            .await?;
        Ok(())
    }

    async fn query(&mut self, query: &EventQuery, pagination: Option<Pagination>) -> Result<Vec<Event>, Error> {
        let mut stmt = QueryBuilder::new(concat!(event_select!(), " WHERE 1 = 1"));
        push_event_filter(&mut stmt, query);
        paginate(&mut stmt, pagination);
        let list = stmt.build_query_as().fetch_all(&mut *self.executor).await?;
        Ok(list)
    }

    async fn count(&mut self, query: &EventQuery) -> Result<i64, Error> {
        let mut stmt = QueryBuilder::new("SELECT COUNT(*) FROM events AS e WHERE 1 = 1");
        push_event_filter(&mut stmt, query);
        let (n,) = stmt.build_query_as().fetch_one(&mut *self.executor).await?;
        Ok(n)
    }

    async fn delete(&mut self, id: i32) -> Result<(), Error> {
        query("DELETE FROM events WHERE id = $1").bind(id).execute(&mut *self.executor).await?;
        Ok(())
    }

    async fn count_registrations(&mut self, id: i32) -> Result<i64, Error> {
        let n = query_scalar("SELECT COUNT(*) FROM event_attendees WHERE event_id = $1")
            .bind(id)
            .fetch_one(&mut *self.executor)
            .await?;
        Ok(n)
    }
}

fn push_event_attendee_filter(stmt: &mut QueryBuilder<'_, Postgres>, query: &EventAttendeeQuery) {
    if let Some(event_id) = query.event_id_eq {
        stmt.push(" AND ea.event_id = ").push_bind(event_id);
    }
    if let Some(participant_id) = query.participant_id_eq {
        stmt.push(" AND ea.participant_id = ").push_bind(participant_id);
    }
    if let Some(facilitator_id) = query.facilitator_id_eq {
        stmt.push(" AND ea.facilitator_id = ").push_bind(facilitator_id);
    }
    if let Some(custom_attendee_type_id) = query.custom_attendee_type_id_eq {
        stmt.push(" AND ea.custom_attendee_type_id = ").push_bind(custom_attendee_type_id);
    }
}

impl<E> PgSqlx<E>
where
    E: DerefMut<Target = PgConnection>,
{
    async fn set_event_attendee_organizations(&mut self, id: i32, organization_ids: &[i32]) -> Result<(), Error> {
        query("DELETE FROM event_attendee_organizations WHERE event_attendee_id = $1").bind(id).execute(&mut *self.executor).await?;
        query("INSERT INTO event_attendee_organizations (event_attendee_id, organization_id) SELECT $1, UNNEST($2::int[])")
            .bind(id)
            .bind(organization_ids)
            .execute(&mut *self.executor)
            .await?;
        Ok(())
    }
}

impl<E> EventAttendeeCommon for PgSqlx<E>
where
    E: DerefMut<Target = PgConnection>,
{
    async fn insert(&mut self, data: EventAttendeeInsert) -> Result<Option<i32>, Error> {
        let (participant_id, facilitator_id, custom_attendee_type_id) = data.attendee.columns();
        let id: Option<i32> = query_scalar(
            "
        INSERT INTO event_attendees (event_id, attendee_type, participant_id, facilitator_id, custom_attendee_type_id, attendance_status)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT DO NOTHING
        RETURNING id",
        )
        .bind(data.event_id)
        .bind(data.attendee.attendee_type().as_str())
        .bind(participant_id)
        .bind(facilitator_id)
        .bind(custom_attendee_type_id)
        .bind(data.attendance_status.as_str())
        .fetch_optional(&mut *self.executor)
        .await?;
        if let Some(id) = id {
            self.set_event_attendee_organizations(id, &data.organizations).await?;
        }
        Ok(id)
    }

    async fn update(&mut self, id: i32, attendance_status: AttendanceStatus, organization_ids: &[i32]) -> Result<(), Error> {
        query("UPDATE event_attendees SET attendance_status = $1, last_modified = now() WHERE id = $2")
            .bind(attendance_status.as_str())
            .bind(id)
            .execute(&mut *self.executor)
            .await?;
        self.set_event_attendee_organizations(id, organization_ids).await
    }

    async fn get(&mut self, id: i32) -> Result<EventAttendee, Error> {
        let row: EventAttendeeRow = query_as(concat!(event_attendee_select!(), " WHERE ea.id = $1"))
            .bind(id)
            .fetch_optional(&mut *self.executor)
            .await?
            .ok_or_else(|| Error::not_found("EventAttendee", id))?;
        row.try_into()
    }

    async fn exists(&mut self, event_id: i32, attendee: &AttendeeRef) -> Result<bool, Error> {
        let (participant_id, facilitator_id, custom_attendee_type_id) = attendee.columns();
        let exists = query_scalar(
            "
        SELECT EXISTS(
            SELECT 1 FROM event_attendees
            WHERE event_id = $1
                AND participant_id IS NOT DISTINCT FROM $2
                AND facilitator_id IS NOT DISTINCT FROM $3
                AND custom_attendee_type_id IS NOT DISTINCT FROM $4)",
        )
        .bind(event_id)
        .bind(participant_id)
        .bind(facilitator_id)
        .bind(custom_attendee_type_id)
        .fetch_one(&mut *self.executor)
        .await?;
        Ok(exists)
    }

    async fn query(&mut self, query: &EventAttendeeQuery, pagination: Option<Pagination>) -> Result<Vec<EventAttendee>, Error> {
        let mut stmt = QueryBuilder::new(concat!(event_attendee_select!(), " WHERE 1 = 1"));
        push_event_attendee_filter(&mut stmt, query);
        paginate(&mut stmt, pagination);
        let rows: Vec<EventAttendeeRow> = stmt.build_query_as().fetch_all(&mut *self.executor).await?;
        rows.into_iter().map(EventAttendee::try_from).collect()
    }

    async fn count(&mut self, query: &EventAttendeeQuery) -> Result<i64, Error> {
        let mut stmt = QueryBuilder::new("SELECT COUNT(*) FROM event_attendees AS ea WHERE 1 = 1");
        push_event_attendee_filter(&mut stmt, query);
        let (n,) = stmt.build_query_as().fetch_one(&mut *self.executor).await?;
        Ok(n)
    }

    async fn delete(&mut self, id: i32) -> Result<(), Error> {
        query("DELETE FROM event_attendees WHERE id = $1").bind(id).execute(&mut *self.executor).await?;
        Ok(())
    }

    async fn count_dependents(&mut self, id: i32) -> Result<i64, Error> {
        let n = query_scalar(
            "SELECT (SELECT COUNT(*) FROM responses WHERE event_attendee_id = $1) + (SELECT COUNT(*) FROM demographics WHERE event_attendee_id = $1)",
        )
        .bind(id)
        .fetch_one(&mut *self.executor)
        .await?;
        Ok(n)
    }

    async fn count_scoped_to(&mut self, event_id: i32, organization_id: i32) -> Result<i64, Error> {
        let n = query_scalar(
            "
        SELECT COUNT(*)
        FROM event_attendee_organizations AS eao
        JOIN event_attendees AS ea ON ea.id = eao.event_attendee_id
        WHERE ea.event_id = $1 AND eao.organization_id = $2",
        )
        .bind(event_id)
        .bind(organization_id)
        .fetch_one(&mut *self.executor)
        .await?;
        Ok(n)
    }
}

fn push_question_filter(stmt: &mut QueryBuilder<'_, Postgres>, query: &QuestionQuery) {
    if let Some(organization_id) = query.organization_id_eq {
        stmt.push(" AND organization_id = ").push_bind(organization_id);
    }
    if let Some(text) = &query.text_eq {
        stmt.push(" AND text = ").push_bind(text.clone());
    }
    if let Some(event_id) = query.event_id_eq {
        stmt.push(" AND id IN (SELECT question_id FROM event_questions WHERE event_id = ").push_bind(event_id).push(")");
    }
}

impl<E> QuestionCommon for PgSqlx<E>
where
    E: DerefMut<Target = PgConnection>,
{
    async fn insert(&mut self, data: QuestionInsert) -> Result<i32, Error> {
        let id = query_scalar("INSERT INTO questions (text, organization_id) VALUES ($1, $2) RETURNING id")
            .bind(data.text)
            .bind(data.organization_id)
            .fetch_one(&mut *self.executor)
            .await?;
        Ok(id)
    }

    async fn update(&mut self, id: i32, data: QuestionUpdate) -> Result<(), Error> {
        query("UPDATE questions SET text = COALESCE($1, text), organization_id = COALESCE($2, organization_id), last_modified = now() WHERE id = $3")
            .bind(data.text)
            .bind(data.organization)
            .bind(id)
            .execute(&mut *self.executor)
            .await?;
        Ok(())
    }

    async fn get(&mut self, id: i32) -> Result<Question, Error> {
        query_as("SELECT * FROM questions WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.executor)
            .await?
            .ok_or_else(|| Error::not_found("Question", id))
    }

    async fn find(&mut self, text: &str, organization_id: Option<i32>) -> Result<Option<Question>, Error> {
        let question = query_as("SELECT * FROM questions WHERE text = $1 AND organization_id IS NOT DISTINCT FROM $2 ORDER BY id LIMIT 1")
            .bind(text)
            .bind(organization_id)
            .fetch_optional(&mut *self.executor)
            .await?;
        Ok(question)
    }

    async fn query(&mut self, query: &QuestionQuery, pagination: Option<Pagination>) -> Result<Vec<Question>, Error> {
        let mut stmt = QueryBuilder::new("SELECT * FROM questions WHERE 1 = 1");
        push_question_filter(&mut stmt, query);
        paginate(&mut stmt, pagination);
        let list = stmt.build_query_as().fetch_all(&mut *self.executor).await?;
        Ok(list)
    }

    async fn count(&mut self, query: &QuestionQuery) -> Result<i64, Error> {
        let mut stmt = QueryBuilder::new("SELECT COUNT(*) FROM questions WHERE 1 = 1");
        push_question_filter(&mut stmt, query);
        let (n,) = stmt.build_query_as().fetch_one(&mut *self.executor).await?;
        Ok(n)
    }

    async fn delete(&mut self, id: i32) -> Result<(), Error> {
        query("DELETE FROM questions WHERE id = $1").bind(id).execute(&mut *self.executor).await?;
        Ok(())
    }

    async fn count_responses(&mut self, id: i32) -> Result<i64, Error> {
        let n = query_scalar("SELECT COUNT(*) FROM responses WHERE question_id = $1")
            .bind(id)
            .fetch_one(&mut *self.executor)
            .await?;
        Ok(n)
    }
}

fn push_response_filter(stmt: &mut QueryBuilder<'_, Postgres>, query: &ResponseQuery) {
    if let Some(event_attendee_id) = query.event_attendee_id_eq {
        stmt.push(" AND event_attendee_id = ").push_bind(event_attendee_id);
    }
    if let Some(question_id) = query.question_id_eq {
        stmt.push(" AND question_id = ").push_bind(question_id);
    }
}

impl<E> ResponseCommon for PgSqlx<E>
where
    E: DerefMut<Target = PgConnection>,
{
    async fn insert(&mut self, data: ResponseInsert) -> Result<i32, Error> {
        let id = query_scalar("INSERT INTO responses (text, event_attendee_id, question_id) VALUES ($1, $2, $3) RETURNING id")
            .bind(data.text)
            .bind(data.event_attendee_id)
            .bind(data.question_id)
            .fetch_one(&mut *self.executor)
            .await?;
        Ok(id)
    }

    async fn update(&mut self, id: i32, text: String) -> Result<(), Error> {
        query("UPDATE responses SET text = $1, last_modified = now() WHERE id = $2")
            .bind(text)
            .bind(id)
            .execute(&mut *self.executor)
            .await?;
        Ok(())
    }

    async fn get(&mut self, id: i32) -> Result<Response, Error> {
        query_as("SELECT * FROM responses WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.executor)
            .await?
            .ok_or_else(|| Error::not_found("Response", id))
    }

    async fn query(&mut self, query: &ResponseQuery, pagination: Option<Pagination>) -> Result<Vec<Response>, Error> {
        let mut stmt = QueryBuilder::new("SELECT * FROM responses WHERE 1 = 1");
        push_response_filter(&mut stmt, query);
        paginate(&mut stmt, pagination);
        let list = stmt.build_query_as().fetch_all(&mut *self.executor).await?;
        Ok(list)
    }

    async fn count(&mut self, query: &ResponseQuery) -> Result<i64, Error> {
        let mut stmt = QueryBuilder::new("SELECT COUNT(*) FROM responses WHERE 1 = 1");
        push_response_filter(&mut stmt, query);
        let (n,) = stmt.build_query_as().fetch_one(&mut *self.executor).await?;
        Ok(n)
    }

    async fn delete(&mut self, id: i32) -> Result<(), Error> {
        query("DELETE FROM responses WHERE id = $1").bind(id).execute(&mut *self.executor).await?;
        Ok(())
    }
}

impl<E> DemographicCategoryCommon for PgSqlx<E>
where
    E: DerefMut<Target = PgConnection>,
{
    async fn insert(&mut self, data: CategoryCreate) -> Result<i32, Error> {
        let id = query_scalar("INSERT INTO demographic_categories (organization_id, name, field_type, choices, required) VALUES ($1, $2, $3, $4, $5) RETURNING id")
            .bind(data.organization)
            .bind(data.name)
            .bind(data.field_type.as_str())
            .bind(data.choices)
            .bind(data.required)
            .fetch_one(&mut *self.executor)
            .await?;
        Ok(id)
    }

    async fn update(&mut self, id: i32, data: CategoryUpdate) -> Result<(), Error> {
        query("UPDATE demographic_categories SET name = COALESCE($1, name), choices = COALESCE($2, choices), required = COALESCE($3, required), last_modified = now() WHERE id = $4")
            .bind(data.name)
            .bind(data.choices)
            .bind(data.required)
            .bind(id)
            .execute(&mut *self.executor)
            .await?;
        Ok(())
    }

    async fn get(&mut self, id: i32) -> Result<DemographicCategory, Error> {
        let row: CategoryRow = query_as("SELECT * FROM demographic_categories WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.executor)
            .await?
            .ok_or_else(|| Error::not_found("DemographicCategory", id))?;
        row.try_into()
    }

    async fn query(&mut self, query: &CategoryQuery, pagination: Option<Pagination>) -> Result<Vec<DemographicCategory>, Error> {
        let mut stmt = QueryBuilder::new("SELECT * FROM demographic_categories WHERE 1 = 1");
        if let Some(organization_id) = query.organization_id_eq {
            stmt.push(" AND organization_id = ").push_bind(organization_id);
        }
        paginate(&mut stmt, pagination);
        let rows: Vec<CategoryRow> = stmt.build_query_as().fetch_all(&mut *self.executor).await?;
        rows.into_iter().map(DemographicCategory::try_from).collect()
    }

    async fn count(&mut self, query: &CategoryQuery) -> Result<i64, Error> {
        let mut stmt = QueryBuilder::new("SELECT COUNT(*) FROM demographic_categories WHERE 1 = 1");
        if let Some(organization_id) = query.organization_id_eq {
            stmt.push(" AND organization_id = ").push_bind(organization_id);
        }
        let (n,) = stmt.build_query_as().fetch_one(&mut *self.executor).await?;
        Ok(n)
    }

    async fn delete(&mut self, id: i32) -> Result<(), Error> {
        query("DELETE FROM demographic_categories WHERE id = $1").bind(id).execute(&mut *self.executor).await?;
        Ok(())
    }

    async fn count_links(&mut self, id: i32) -> Result<i64, Error> {
        let n = query_scalar("SELECT COUNT(*) FROM event_demographics WHERE category_id = $1")
            .bind(id)
            .fetch_one(&mut *self.executor)
            .await?;
        Ok(n)
    }
}

fn push_event_demographic_filter(stmt: &mut QueryBuilder<'_, Postgres>, query: &EventDemographicQuery) {
    if let Some(event_id) = query.event_id_eq {
        stmt.push(" AND event_id = ").push_bind(event_id);
    }
    if let Some(category_id) = query.category_id_eq {
        stmt.push(" AND category_id = ").push_bind(category_id);
    }
}

impl<E> EventDemographicCommon for PgSqlx<E>
where
    E: DerefMut<Target = PgConnection>,
{
    async fn insert(&mut self, data: EventDemographicCreate) -> Result<i32, Error> {
        let id = query_scalar("INSERT INTO event_demographics (event_id, category_id) VALUES ($1, $2) RETURNING id")
            .bind(data.event)
            .bind(data.category)
            .fetch_one(&mut *self.executor)
            .await?;
        Ok(id)
    }

    async fn get(&mut self, id: i32) -> Result<EventDemographic, Error> {
        query_as("SELECT * FROM event_demographics WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.executor)
            .await?
            .ok_or_else(|| Error::not_found("EventDemographic", id))
    }

    async fn query(&mut self, query: &EventDemographicQuery, pagination: Option<Pagination>) -> Result<Vec<EventDemographic>, Error> {
        let mut stmt = QueryBuilder::new("SELECT * FROM event_demographics WHERE 1 = 1");
        push_event_demographic_filter(&mut stmt, query);
        paginate(&mut stmt, pagination);
        let list = stmt.build_query_as().fetch_all(&mut *self.executor).await?;
        Ok(list)
    }

    async fn count(&mut self, query: &EventDemographicQuery) -> Result<i64, Error> {
        let mut stmt = QueryBuilder::new("SELECT COUNT(*) FROM event_demographics WHERE 1 = 1");
        push_event_demographic_filter(&mut stmt, query);
        let (n,) = stmt.build_query_as().fetch_one(&mut *self.executor).await?;
        Ok(n)
    }

    async fn delete(&mut self, id: i32) -> Result<(), Error> {
        query("DELETE FROM event_demographics WHERE id = $1").bind(id).execute(&mut *self.executor).await?;
        Ok(())
    }

    async fn count_values(&mut self, id: i32) -> Result<i64, Error> {
        let n = query_scalar("SELECT COUNT(*) FROM demographics WHERE event_demographic_id = $1")
            .bind(id)
            .fetch_one(&mut *self.executor)
            .await?;
        Ok(n)
    }
}

fn push_demographic_filter(stmt: &mut QueryBuilder<'_, Postgres>, query: &DemographicQuery) {
    if let Some(event_demographic_id) = query.event_demographic_id_eq {
        stmt.push(" AND event_demographic_id = ").push_bind(event_demographic_id);
    }
    if let Some(event_attendee_id) = query.event_attendee_id_eq {
        stmt.push(" AND event_attendee_id = ").push_bind(event_attendee_id);
    }
}

impl<E> DemographicCommon for PgSqlx<E>
where
    E: DerefMut<Target = PgConnection>,
{
    async fn insert(&mut self, data: DemographicCreate) -> Result<i32, Error> {
        let id = query_scalar("INSERT INTO demographics (event_demographic_id, event_attendee_id, value) VALUES ($1, $2, $3) RETURNING id")
            .bind(data.event_demographic)
            .bind(data.event_attendee)
            .bind(data.value)
            .fetch_one(&mut *self.executor)
            .await?;
        Ok(id)
    }

    async fn update(&mut self, id: i32, value: String) -> Result<(), Error> {
        query("UPDATE demographics SET value = $1, last_modified = now() WHERE id = $2")
            .bind(value)
            .bind(id)
            .execute(&mut *self.executor)
            .await?;
        Ok(())
    }

    async fn get(&mut self, id: i32) -> Result<Demographic, Error> {
        query_as("SELECT * FROM demographics WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.executor)
            .await?
            .ok_or_else(|| Error::not_found("Demographics", id))
    }

    async fn query(&mut self, query: &DemographicQuery, pagination: Option<Pagination>) -> Result<Vec<Demographic>, Error> {
        let mut stmt = QueryBuilder::new("SELECT * FROM demographics WHERE 1 = 1");
        push_demographic_filter(&mut stmt, query);
        paginate(&mut stmt, pagination);
        let list = stmt.build_query_as().fetch_all(&mut *self.executor).await?;
        Ok(list)
    }

    async fn count(&mut self, query: &DemographicQuery) -> Result<i64, Error> {
        let mut stmt = QueryBuilder::new("SELECT COUNT(*) FROM demographics WHERE 1 = 1");
        push_demographic_filter(&mut stmt, query);
        let (n,) = stmt.build_query_as().fetch_one(&mut *self.executor).await?;
        Ok(n)
    }

    async fn delete(&mut self, id: i32) -> Result<(), Error> {
        query("DELETE FROM demographics WHERE id = $1").bind(id).execute(&mut *self.executor).await?;
        Ok(())
    }
}

impl Common for PgSqlx<PoolConnection<Postgres>> {}
impl Common for PgSqlx<Transaction<'static, Postgres>> {}
impl Store for PgSqlx<PoolConnection<Postgres>> {}
impl Store for PgSqlx<Transaction<'static, Postgres>> {}

impl TxStore for PgSqlx<Transaction<'static, Postgres>> {
    async fn commit(self) -> Result<(), Error> {
        self.executor.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<(), Error> {
        self.executor.rollback().await?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct PgSqlxManager {
    pool: PgPool,
}

impl PgSqlxManager {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl Manager for PgSqlxManager {
    type Store = PgSqlx<PoolConnection<Postgres>>;
    type Tx = PgSqlx<Transaction<'static, Postgres>>;

    async fn db(&self) -> Result<Self::Store, Error> {
        let conn = self.pool.acquire().await?;
        Ok(PgSqlx::new(conn))
    }

    async fn tx(&self) -> Result<Self::Tx, Error> {
        let tx = self.pool.begin().await?;
        Ok(PgSqlx::new(tx))
    }
}
