use log::{info, warn};
use uuid::Uuid;

use crate::core::models::{
    attendee::{
        AttendeeSpec, CustomAttendeeType, CustomAttendeeTypeCreate, CustomAttendeeTypeQuery, CustomAttendeeTypeUpdate, Facilitator, FacilitatorCreate, FacilitatorQuery,
        FacilitatorSpec, FacilitatorUpdate, Participant, ParticipantCreate, ParticipantInsert, ParticipantQuery, ParticipantSpec, ParticipantUpdate,
    },
    common::Pagination,
    event_attendee::AttendeeRef,
};
use crate::core::ports::repository::{CustomAttendeeTypeCommon, FacilitatorCommon, ParticipantCommon, Store};
use crate::core::resource::Resource;
use crate::core::services::organization::require_organizations;
use crate::error::Error;

const MAX_UNIQUE_ID_ATTEMPTS: usize = 3;

pub fn generate_unique_id() -> String {
    Uuid::new_v4().to_string()
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_owned()).filter(|v| !v.is_empty())
}

async fn insert_with_generated_id<S>(store: &mut S, mut data: ParticipantInsert) -> Result<i32, Error>
where
    S: Store,
{
    for _ in 0..MAX_UNIQUE_ID_ATTEMPTS {
        data.unique_id = generate_unique_id();
        if let Some(id) = ParticipantCommon::insert(store, data.clone()).await? {
            return Ok(id);
        }
    }
    Err(Error::ServerError("failed to generate a free participant unique_id".into()))
}

pub async fn create_participant<S>(store: &mut S, data: ParticipantCreate) -> Result<Participant, Error>
where
    S: Store,
{
    let organizations = require_organizations(store, &data.organizations).await?;
    let insert = ParticipantInsert {
        unique_id: String::new(),
        emoji: non_empty(data.emoji),
        first_name: data.first_name,
        last_name: data.last_name,
        organizations,
    };
    let id = match non_empty(data.unique_id) {
        Some(unique_id) => ParticipantCommon::insert(store, ParticipantInsert { unique_id: unique_id.clone(), ..insert })
            .await?
            .ok_or_else(|| Error::UniqueViolation(format!("participant unique_id '{}' is already taken", unique_id)))?,
        None => insert_with_generated_id(store, insert).await?,
    };
    ParticipantCommon::get(store, id).await
}

/// Finds a participant by id or unique_id, creating one when the unique_id is
/// unknown or absent. New participants join `organizations`.
pub async fn resolve_participant<S>(store: &mut S, spec: ParticipantSpec, organizations: &[i32]) -> Result<(Participant, bool), Error>
where
    S: Store,
{
    if let Some(id) = spec.id {
        return Ok((ParticipantCommon::get(store, id).await?, false));
    }
    let insert = ParticipantInsert {
        unique_id: String::new(),
        emoji: non_empty(spec.emoji),
        first_name: spec.first_name,
        last_name: spec.last_name,
        organizations: organizations.to_vec(),
    };
    let Some(unique_id) = non_empty(spec.unique_id) else {
        let id = insert_with_generated_id(store, insert).await?;
        let participant = ParticipantCommon::get(store, id).await?;
        info!("created participant {} with generated unique_id", participant.id);
        return Ok((participant, true));
    };
    if let Some(participant) = ParticipantCommon::get_by_unique_id(store, &unique_id).await? {
        return Ok((participant, false));
    }
    match ParticipantCommon::insert(store, ParticipantInsert { unique_id: unique_id.clone(), ..insert }).await? {
        Some(id) => {
            info!("created participant {} for unique_id '{}'", id, unique_id);
            Ok((ParticipantCommon::get(store, id).await?, true))
        }
        None => {
            // lost the race to a concurrent creation, the winner's row is authoritative
            warn!("participant unique_id '{}' was created concurrently, using the existing record", unique_id);
            let participant = ParticipantCommon::get_by_unique_id(store, &unique_id)
                .await?
                .ok_or_else(|| Error::not_found("Participant", &unique_id))?;
            Ok((participant, false))
        }
    }
}

pub async fn create_facilitator<S>(store: &mut S, data: FacilitatorCreate) -> Result<Facilitator, Error>
where
    S: Store,
{
    require_organizations(store, &[data.organization]).await?;
    let id = FacilitatorCommon::insert(store, data).await?;
    FacilitatorCommon::get(store, id).await
}

pub async fn resolve_facilitator<S>(store: &mut S, spec: FacilitatorSpec, organizations: &[i32]) -> Result<(Facilitator, bool), Error>
where
    S: Store,
{
    if let Some(id) = spec.id {
        return Ok((FacilitatorCommon::get(store, id).await?, false));
    }
    let (Some(first_name), Some(last_name)) = (non_empty(spec.first_name), non_empty(spec.last_name)) else {
        return Err(Error::BusinessError("a facilitator needs either an id or a first and last name".into()));
    };
    let organization = match (spec.organization, organizations) {
        (Some(organization), _) => organization,
        (None, [only]) => *only,
        (None, _) => return Err(Error::BusinessError("a new facilitator needs an organization".into())),
    };
    let facilitator = create_facilitator(
        store,
        FacilitatorCreate {
            first_name,
            last_name,
            organization_role: spec.organization_role,
            organization,
        },
    )
    .await?;
    Ok((facilitator, true))
}

/// Looks a custom attendee type up by name within the organization, creating it when absent.
pub async fn get_or_create_custom_type<S>(store: &mut S, organization_id: i32, type_name: &str) -> Result<(CustomAttendeeType, bool), Error>
where
    S: Store,
{
    let type_name = type_name.trim();
    if type_name.is_empty() {
        return Err(Error::BusinessError("custom attendee type name must not be empty".into()));
    }
    require_organizations(store, &[organization_id]).await?;
    if let Some(existing) = CustomAttendeeTypeCommon::get_by_name(store, organization_id, type_name).await? {
        return Ok((existing, false));
    }
    let inserted = CustomAttendeeTypeCommon::insert(
        store,
        CustomAttendeeTypeCreate {
            type_name: type_name.to_owned(),
            organization_role: String::new(),
            organization: organization_id,
        },
    )
    .await?;
    match inserted {
        Some(id) => {
            info!("provisioned custom attendee type '{}' for organization {}", type_name, organization_id);
            Ok((CustomAttendeeTypeCommon::get(store, id).await?, true))
        }
        None => {
            let existing = CustomAttendeeTypeCommon::get_by_name(store, organization_id, type_name)
                .await?
                .ok_or_else(|| Error::not_found("CustomAttendeeType", type_name))?;
            Ok((existing, false))
        }
    }
}

/// Resolves an [`AttendeeSpec`] to a stored identity.
///
/// `organizations` scopes anything that has to be created: new participants
/// join all of them, while new facilitators and custom types need exactly one
/// unless the request names its own organization.
pub async fn resolve_attendee<S>(store: &mut S, spec: AttendeeSpec, organizations: &[i32]) -> Result<(AttendeeRef, bool), Error>
where
    S: Store,
{
    match spec {
        AttendeeSpec::Participant(spec) => {
            let (participant, created) = resolve_participant(store, spec, organizations).await?;
            Ok((AttendeeRef::Participant { participant: participant.id }, created))
        }
        AttendeeSpec::Facilitator(spec) => {
            let (facilitator, created) = resolve_facilitator(store, spec, organizations).await?;
            Ok((AttendeeRef::Facilitator { facilitator: facilitator.id }, created))
        }
        AttendeeSpec::Other { id: Some(id), .. } => {
            let custom = CustomAttendeeTypeCommon::get(store, id).await?;
            Ok((AttendeeRef::Other { custom_attendee_type: custom.id }, false))
        }
        AttendeeSpec::Other {
            id: None,
            type_name: Some(type_name),
            organization,
        } => {
            let organization = match (organization, organizations) {
                (Some(organization), _) => organization,
                (None, [only]) => *only,
                (None, _) => {
                    return Err(Error::BusinessError(format!(
                        "custom attendee type '{}' is ambiguous without a single organization to scope it to",
                        type_name
                    )))
                }
            };
            let (custom, created) = get_or_create_custom_type(store, organization, &type_name).await?;
            Ok((AttendeeRef::Other { custom_attendee_type: custom.id }, created))
        }
        AttendeeSpec::Other { id: None, type_name: None, .. } => Err(Error::DiscriminatorMismatch("attendee_type 'other' requires the 'custom_attendee_type' field".into())),
    }
}

/// Organizations the attendee itself belongs to.
pub async fn attendee_organizations<S>(store: &mut S, attendee: &AttendeeRef) -> Result<Vec<i32>, Error>
where
    S: Store,
{
    match *attendee {
        AttendeeRef::Participant { participant } => Ok(ParticipantCommon::get(store, participant).await?.organizations),
        AttendeeRef::Facilitator { facilitator } => Ok(vec![FacilitatorCommon::get(store, facilitator).await?.organization]),
        AttendeeRef::Other { custom_attendee_type } => Ok(vec![CustomAttendeeTypeCommon::get(store, custom_attendee_type).await?.organization]),
    }
}

fn protect(entity: &'static str, id: i32, dependents: i64) -> Result<(), Error> {
    if dependents > 0 {
        warn!("refused to delete {} {} with {} registrations", entity, id, dependents);
        return Err(Error::ReferentialProtect { entity, id, dependents });
    }
    Ok(())
}

impl Resource for Participant {
    const NAME: &'static str = "Participant";
    const FIELDS: &'static [&'static str] = &["id", "unique_id", "emoji", "first_name", "last_name", "organizations", "created_at", "last_modified"];

    type Filter = ParticipantQuery;
    type Create = ParticipantCreate;
    type Update = ParticipantUpdate;
    type Created = Participant;

    async fn list<S: Store>(store: &mut S, filter: Self::Filter, pagination: Pagination) -> Result<(Vec<Self>, i64), Error> {
        let total = ParticipantCommon::count(store, &filter).await?;
        let list = ParticipantCommon::query(store, &filter, Some(pagination)).await?;
        Ok((list, total))
    }

    async fn retrieve<S: Store>(store: &mut S, id: i32) -> Result<Self, Error> {
        ParticipantCommon::get(store, id).await
    }

    async fn create<S: Store>(store: &mut S, data: Self::Create) -> Result<Self::Created, Error> {
        create_participant(store, data).await
    }

    async fn update<S: Store>(store: &mut S, id: i32, mut data: Self::Update) -> Result<Self, Error> {
        ParticipantCommon::get(store, id).await?;
        if let Some(organizations) = data.organizations.take() {
            data.organizations = Some(require_organizations(store, &organizations).await?);
        }
        ParticipantCommon::update(store, id, data).await?;
        ParticipantCommon::get(store, id).await
    }

    async fn delete<S: Store>(store: &mut S, id: i32) -> Result<(), Error> {
        ParticipantCommon::get(store, id).await?;
        protect("Participant", id, ParticipantCommon::count_registrations(store, id).await?)?;
        ParticipantCommon::delete(store, id).await
    }
}

impl Resource for Facilitator {
    const NAME: &'static str = "Facilitator";
    const FIELDS: &'static [&'static str] = &["id", "first_name", "last_name", "organization_role", "organization", "created_at", "last_modified"];

    type Filter = FacilitatorQuery;
    type Create = FacilitatorCreate;
    type Update = FacilitatorUpdate;
    type Created = Facilitator;

    async fn list<S: Store>(store: &mut S, filter: Self::Filter, pagination: Pagination) -> Result<(Vec<Self>, i64), Error> {
        let total = FacilitatorCommon::count(store, &filter).await?;
        let list = FacilitatorCommon::query(store, &filter, Some(pagination)).await?;
        Ok((list, total))
    }

    async fn retrieve<S: Store>(store: &mut S, id: i32) -> Result<Self, Error> {
        FacilitatorCommon::get(store, id).await
    }

    async fn create<S: Store>(store: &mut S, data: Self::Create) -> Result<Self::Created, Error> {
        create_facilitator(store, data).await
    }

    async fn update<S: Store>(store: &mut S, id: i32, data: Self::Update) -> Result<Self, Error> {
        let current = FacilitatorCommon::get(store, id).await?;
        if let Some(organization) = data.organization.filter(|o| *o != current.organization) {
            require_organizations(store, &[organization]).await?;
            let registrations = FacilitatorCommon::count_registrations(store, id).await?;
            if registrations > 0 {
                return Err(Error::BusinessError(format!(
                    "facilitator {} has {} registrations and cannot move to another organization",
                    id, registrations
                )));
            }
        }
        FacilitatorCommon::update(store, id, data).await?;
        FacilitatorCommon::get(store, id).await
    }

    async fn delete<S: Store>(store: &mut S, id: i32) -> Result<(), Error> {
        FacilitatorCommon::get(store, id).await?;
        protect("Facilitator", id, FacilitatorCommon::count_registrations(store, id).await?)?;
        FacilitatorCommon::delete(store, id).await
    }
}

impl Resource for CustomAttendeeType {
    const NAME: &'static str = "CustomAttendeeType";
    const FIELDS: &'static [&'static str] = &["id", "type_name", "organization_role", "organization", "created_at", "last_modified"];

    type Filter = CustomAttendeeTypeQuery;
    type Create = CustomAttendeeTypeCreate;
    type Update = CustomAttendeeTypeUpdate;
    type Created = CustomAttendeeType;

    async fn list<S: Store>(store: &mut S, filter: Self::Filter, pagination: Pagination) -> Result<(Vec<Self>, i64), Error> {
        let total = CustomAttendeeTypeCommon::count(store, &filter).await?;
        let list = CustomAttendeeTypeCommon::query(store, &filter, Some(pagination)).await?;
        Ok((list, total))
    }

    async fn retrieve<S: Store>(store: &mut S, id: i32) -> Result<Self, Error> {
        CustomAttendeeTypeCommon::get(store, id).await
    }

    async fn create<S: Store>(store: &mut S, mut data: Self::Create) -> Result<Self::Created, Error> {
        data.type_name = data.type_name.trim().to_owned();
        if data.type_name.is_empty() {
            return Err(Error::BusinessError("custom attendee type name must not be empty".into()));
        }
        require_organizations(store, &[data.organization]).await?;
        let (organization, type_name) = (data.organization, data.type_name.clone());
        let id = CustomAttendeeTypeCommon::insert(store, data)
            .await?
            .ok_or_else(|| Error::UniqueViolation(format!("organization {} already has a custom attendee type named '{}'", organization, type_name)))?;
        CustomAttendeeTypeCommon::get(store, id).await
    }

    async fn update<S: Store>(store: &mut S, id: i32, mut data: Self::Update) -> Result<Self, Error> {
        let current = CustomAttendeeTypeCommon::get(store, id).await?;
        if let Some(type_name) = data.type_name.take() {
            let type_name = type_name.trim().to_owned();
            if type_name.is_empty() {
                return Err(Error::BusinessError("custom attendee type name must not be empty".into()));
            }
            if let Some(other) = CustomAttendeeTypeCommon::get_by_name(store, current.organization, &type_name).await? {
                if other.id != id {
                    return Err(Error::UniqueViolation(format!(
                        "organization {} already has a custom attendee type named '{}'",
                        current.organization, type_name
                    )));
                }
            }
            data.type_name = Some(type_name);
        }
        CustomAttendeeTypeCommon::update(store, id, data).await?;
        CustomAttendeeTypeCommon::get(store, id).await
    }

    async fn delete<S: Store>(store: &mut S, id: i32) -> Result<(), Error> {
        CustomAttendeeTypeCommon::get(store, id).await?;
        protect("CustomAttendeeType", id, CustomAttendeeTypeCommon::count_registrations(store, id).await?)?;
        CustomAttendeeTypeCommon::delete(store, id).await
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::core::models::organization::Create as OrganizationCreate;
    use crate::core::ports::repository::Manager;
    use crate::core::models::event::Create as EventCreate;
    use crate::core::ports::repository::EventAttendeeCommon;
    use crate::core::services::{event::create_event, organization::create_organization, registration::register};
    use crate::database::memory::MemoryManager;

    async fn organization(store: &mut impl Store, name: &str) -> i32 {
        create_organization(store, OrganizationCreate { name: name.into(), location: None }).await.unwrap().id
    }

    #[test]
    fn test_generated_unique_ids_differ() {
        let (a, b) = (generate_unique_id(), generate_unique_id());
        assert!(!a.is_empty());
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_participant_unique_id_is_generated_and_kept_unique() {
        let manager = MemoryManager::new();
        let mut db = manager.db().await.unwrap();
        let north = organization(&mut db, "North").await;
        let generated = create_participant(
            &mut db,
            ParticipantCreate {
                first_name: "Grace".into(),
                unique_id: Some("   ".into()),
                organizations: vec![north],
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert!(!generated.unique_id.trim().is_empty());

        let err = create_participant(
            &mut db,
            ParticipantCreate {
                unique_id: Some(generated.unique_id.clone()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::UniqueViolation(_)));

        let err = create_participant(
            &mut db,
            ParticipantCreate {
                organizations: vec![north + 100],
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::NotFound { entity: "Organization", .. }), "{:?}", err);
    }

    #[tokio::test]
    async fn test_resolve_participant_by_unique_id() {
        let manager = MemoryManager::new();
        let mut db = manager.db().await.unwrap();
        let north = organization(&mut db, "North").await;
        let spec = ParticipantSpec {
            unique_id: Some("p-1".into()),
            first_name: "Grace".into(),
            ..Default::default()
        };
        let (first, created) = resolve_participant(&mut db, spec.clone(), &[north]).await.unwrap();
        assert!(created);
        assert_eq!(first.organizations, vec![north]);
        let (second, created) = resolve_participant(&mut db, spec, &[]).await.unwrap();
        assert!(!created);
        assert_eq!(first.id, second.id);
        assert_eq!(ParticipantCommon::count(&mut db, &ParticipantQuery::default()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_custom_type_names_are_unique_per_organization() {
        let manager = MemoryManager::new();
        let mut db = manager.db().await.unwrap();
        let north = organization(&mut db, "North").await;
        let south = organization(&mut db, "South").await;
        let create = |organization| CustomAttendeeTypeCreate {
            type_name: " Volunteer ".into(),
            organization_role: String::new(),
            organization,
        };
        let volunteer = CustomAttendeeType::create(&mut db, create(north)).await.unwrap();
        assert_eq!(volunteer.type_name, "Volunteer");
        CustomAttendeeType::create(&mut db, create(south)).await.unwrap();
        let err = CustomAttendeeType::create(&mut db, create(north)).await.unwrap_err();
        assert!(matches!(err, Error::UniqueViolation(_)));

        let (found, created) = get_or_create_custom_type(&mut db, north, "Volunteer").await.unwrap();
        assert!(!created);
        assert_eq!(found.id, volunteer.id);
    }

    #[tokio::test]
    async fn test_facilitator_needs_a_scope() {
        let manager = MemoryManager::new();
        let mut db = manager.db().await.unwrap();
        let north = organization(&mut db, "North").await;
        let south = organization(&mut db, "South").await;
        let spec = FacilitatorSpec {
            first_name: Some("Ada".into()),
            last_name: Some("Byron".into()),
            ..Default::default()
        };
        let err = resolve_facilitator(&mut db, spec.clone(), &[north, south]).await.unwrap_err();
        assert!(matches!(err, Error::BusinessError(_)));
        let (facilitator, created) = resolve_facilitator(&mut db, spec, &[south]).await.unwrap();
        assert!(created);
        assert_eq!(facilitator.organization, south);
    }

    #[tokio::test]
    async fn test_registered_attendees_cannot_be_deleted() {
        let manager = MemoryManager::new();
        let mut db = manager.db().await.unwrap();
        let north = organization(&mut db, "North").await;
        let event = create_event(
            &mut db,
            EventCreate {
                name: "Kickoff".into(),
                description: String::new(),
                date: chrono::NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
                time: None,
                location: String::new(),
                organizations: vec![north],
                attendees: vec![],
                questions: vec![],
            },
        )
        .await
        .unwrap()
        .event
        .id;
        let participant = create_participant(
            &mut db,
            ParticipantCreate {
                organizations: vec![north],
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let facilitator = create_facilitator(
            &mut db,
            FacilitatorCreate {
                first_name: "Ada".into(),
                last_name: "Byron".into(),
                organization_role: String::new(),
                organization: north,
            },
        )
        .await
        .unwrap();
        let (custom, _) = get_or_create_custom_type(&mut db, north, "Volunteer").await.unwrap();

        let attendees = [
            AttendeeRef::Participant { participant: participant.id },
            AttendeeRef::Facilitator { facilitator: facilitator.id },
            AttendeeRef::Other { custom_attendee_type: custom.id },
        ];
        let mut registrations = Vec::new();
        for attendee in attendees {
            registrations.push(register(&mut db, event, attendee, None).await.unwrap().id);
        }

        let err = Participant::delete(&mut db, participant.id).await.unwrap_err();
        assert!(matches!(err, Error::ReferentialProtect { entity: "Participant", dependents: 1, .. }), "{:?}", err);
        let err = Facilitator::delete(&mut db, facilitator.id).await.unwrap_err();
        assert!(matches!(err, Error::ReferentialProtect { entity: "Facilitator", dependents: 1, .. }), "{:?}", err);
        let err = CustomAttendeeType::delete(&mut db, custom.id).await.unwrap_err();
        assert!(matches!(err, Error::ReferentialProtect { entity: "CustomAttendeeType", dependents: 1, .. }), "{:?}", err);

        assert_eq!(Participant::retrieve(&mut db, participant.id).await.unwrap().id, participant.id);
        assert_eq!(Facilitator::retrieve(&mut db, facilitator.id).await.unwrap().id, facilitator.id);
        assert_eq!(CustomAttendeeType::retrieve(&mut db, custom.id).await.unwrap().id, custom.id);
        for (id, attendee) in registrations.into_iter().zip(attendees) {
            assert_eq!(EventAttendeeCommon::get(&mut db, id).await.unwrap().attendee, attendee);
        }
    }
}
