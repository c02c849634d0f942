use log::{info, warn};

use crate::core::models::{
    attendee::ParticipantSpec,
    common::Pagination,
    event_attendee::{AttendanceStatus, AttendeeRef, BatchReport, BatchRequest, EventAttendee, Insert, Query, Registration, RegistrationPayload, Update},
};
use crate::core::ports::repository::{EventAttendeeCommon, EventCommon, Manager, Store, TxStore};
use crate::core::resource::{Operation, Resource};
use crate::core::services::attendee::{attendee_organizations, resolve_attendee, resolve_participant};
use crate::core::services::organization::require_organizations;
use crate::error::Error;

/// Registers an already resolved attendee for an event.
///
/// The event row is locked first, so concurrent registrations for the same
/// event are checked one after another.
pub async fn register<S>(store: &mut S, event_id: i32, attendee: AttendeeRef, organizations: Option<Vec<i32>>) -> Result<EventAttendee, Error>
where
    S: Store,
{
    let event = EventCommon::get_for_update(store, event_id).await?;
    if event.organizations.is_empty() {
        return Err(Error::OrganizationMismatch(format!("event {} has no organizations and cannot accept attendees", event_id)));
    }
    let own = attendee_organizations(store, &attendee).await?;
    let shared: Vec<i32> = own.iter().copied().filter(|o| event.organizations.contains(o)).collect();
    if shared.is_empty() {
        return Err(Error::OrganizationMismatch(format!(
            "{} belongs to organizations {:?}, none of which run event {}",
            attendee.describe(),
            own,
            event_id
        )));
    }
    let organizations = match organizations {
        Some(explicit) => {
            let explicit = require_organizations(store, &explicit).await?;
            if let Some(outside) = explicit.iter().find(|o| !event.organizations.contains(o)) {
                return Err(Error::OrganizationMismatch(format!("organization {} does not run event {}", outside, event_id)));
            }
            if explicit.is_empty() {
                shared
            } else {
                explicit
            }
        }
        None => shared,
    };
    let duplicate = || Error::DuplicateRegistration(format!("{} is already registered for event {}", attendee.describe(), event_id));
    if EventAttendeeCommon::exists(store, event_id, &attendee).await? {
        return Err(duplicate());
    }
    let id = EventAttendeeCommon::insert(
        store,
        Insert {
            event_id,
            attendee,
            organizations,
            attendance_status: AttendanceStatus::default(),
        },
    )
    .await?
    .ok_or_else(duplicate)?;
    info!("registered {} for event {} as event attendee {}", attendee.describe(), event_id, id);
    EventAttendeeCommon::get(store, id).await
}

/// Resolves the attendee (creating it where allowed) and registers it.
pub async fn register_spec<S>(store: &mut S, registration: Registration) -> Result<(EventAttendee, bool), Error>
where
    S: Store,
{
    let scope = match &registration.organizations {
        Some(explicit) if !explicit.is_empty() => explicit.clone(),
        _ => EventCommon::get(store, registration.event_id).await?.organizations,
    };
    let (attendee, created) = resolve_attendee(store, registration.attendee, &scope).await?;
    let event_attendee = register(store, registration.event_id, attendee, registration.organizations).await?;
    Ok((event_attendee, created))
}

pub async fn register_payload<S>(store: &mut S, payload: RegistrationPayload) -> Result<(EventAttendee, bool), Error>
where
    S: Store,
{
    register_spec(store, Registration::try_from(payload)?).await
}

/// Runs each item through the single registration path.
///
/// Without `atomic` every item gets its own transaction and failures are
/// reported next to the successes. With `atomic` the first failure rolls the
/// whole batch back.
pub async fn register_batch<M>(manager: &M, request: BatchRequest) -> Result<BatchReport, Error>
where
    M: Manager,
{
    let mut report = BatchReport::default();
    if request.atomic {
        let mut tx = manager.tx().await?;
        for (index, payload) in request.items.into_iter().enumerate() {
            match register_payload(&mut tx, payload).await {
                Ok((event_attendee, created)) => report.push_created(index, event_attendee, created),
                Err(err) => {
                    tx.rollback().await?;
                    warn!("atomic batch registration aborted at item {}: {}", index, err);
                    return Err(Error::BatchAborted { index, source: Box::new(err) });
                }
            }
        }
        tx.commit().await?;
        return Ok(report);
    }
    for (index, payload) in request.items.into_iter().enumerate() {
        let mut tx = manager.tx().await?;
        match register_payload(&mut tx, payload).await {
            Ok((event_attendee, created)) => {
                tx.commit().await?;
                report.push_created(index, event_attendee, created);
            }
            Err(err) => {
                tx.rollback().await?;
                report.push_failed(index, &err);
            }
        }
    }
    info!("batch registration finished: {} created, {} failed", report.created, report.failed);
    Ok(report)
}

/// Finds or creates each participant and registers it for the event, item by item.
pub async fn add_participants<M>(manager: &M, event_id: i32, entries: Vec<ParticipantSpec>) -> Result<BatchReport, Error>
where
    M: Manager,
{
    let organizations = {
        let mut db = manager.db().await?;
        EventCommon::get(&mut db, event_id).await?.organizations
    };
    let mut report = BatchReport::default();
    for (index, spec) in entries.into_iter().enumerate() {
        let mut tx = manager.tx().await?;
        let outcome = async {
            let (participant, created) = resolve_participant(&mut tx, spec, &organizations).await?;
            let event_attendee = register(&mut tx, event_id, AttendeeRef::Participant { participant: participant.id }, None).await?;
            Ok::<_, Error>((event_attendee, created))
        }
        .await;
        match outcome {
            Ok((event_attendee, created)) => {
                tx.commit().await?;
                report.push_created(index, event_attendee, created);
            }
            Err(err) => {
                tx.rollback().await?;
                report.push_failed(index, &err);
            }
        }
    }
    Ok(report)
}

impl Resource for EventAttendee {
    const NAME: &'static str = "EventAttendee";
    const FIELDS: &'static [&'static str] = &[
        "id",
        "event",
        "attendee_type",
        "participant",
        "facilitator",
        "custom_attendee_type",
        "organizations",
        "registration_time",
        "attendance_status",
        "created_at",
        "last_modified",
    ];
    const OVERRIDES: &'static [Operation] = &[Operation::Create, Operation::Update];

    type Filter = Query;
    type Create = RegistrationPayload;
    type Update = Update;
    type Created = EventAttendee;

    async fn list<S: Store>(store: &mut S, filter: Self::Filter, pagination: Pagination) -> Result<(Vec<Self>, i64), Error> {
        let total = EventAttendeeCommon::count(store, &filter).await?;
        let list = EventAttendeeCommon::query(store, &filter, Some(pagination)).await?;
        Ok((list, total))
    }

    async fn retrieve<S: Store>(store: &mut S, id: i32) -> Result<Self, Error> {
        EventAttendeeCommon::get(store, id).await
    }

    async fn create<S: Store>(store: &mut S, data: Self::Create) -> Result<Self::Created, Error> {
        let (event_attendee, _) = register_payload(store, data).await?;
        Ok(event_attendee)
    }

    /// Only the attendance status and the organization subset can change.
    async fn update<S: Store>(store: &mut S, id: i32, data: Self::Update) -> Result<Self, Error> {
        let current = EventAttendeeCommon::get(store, id).await?;
        let organizations = match data.organizations {
            Some(organizations) => {
                let organizations = require_organizations(store, &organizations).await?;
                if organizations.is_empty() {
                    return Err(Error::BusinessError("an event attendee needs at least one organization".into()));
                }
                let event = EventCommon::get(store, current.event).await?;
                if let Some(outside) = organizations.iter().find(|o| !event.organizations.contains(o)) {
                    return Err(Error::OrganizationMismatch(format!("organization {} does not run event {}", outside, event.id)));
                }
                organizations
            }
            None => current.organizations,
        };
        let status = data.attendance_status.unwrap_or(current.attendance_status);
        EventAttendeeCommon::update(store, id, status, &organizations).await?;
        EventAttendeeCommon::get(store, id).await
    }

    async fn delete<S: Store>(store: &mut S, id: i32) -> Result<(), Error> {
        EventAttendeeCommon::get(store, id).await?;
        let dependents = EventAttendeeCommon::count_dependents(store, id).await?;
        if dependents > 0 {
            warn!("refused to delete event attendee {} with {} responses or demographic values", id, dependents);
            return Err(Error::ReferentialProtect {
                entity: "EventAttendee",
                id,
                dependents,
            });
        }
        EventAttendeeCommon::delete(store, id).await
    }
}

#[cfg(test)]
mod test {
    use chrono::NaiveDate;

    use super::*;
    use crate::core::models::{
        attendee::{CustomAttendeeTypeQuery, FacilitatorCreate, ParticipantQuery},
        common::IdOrName,
        event::Create as EventCreate,
        event_attendee::AttendeeType,
        organization::Create as OrganizationCreate,
    };
    use crate::core::ports::repository::{CustomAttendeeTypeCommon, ParticipantCommon};
    use crate::core::services::{attendee::create_facilitator, event::create_event, organization::create_organization};
    use crate::database::memory::MemoryManager;

    struct Fixture {
        manager: MemoryManager,
        north: i32,
        south: i32,
        event: i32,
    }

    async fn fixture() -> Fixture {
        let manager = MemoryManager::new();
        let mut db = manager.db().await.unwrap();
        let north = create_organization(&mut db, OrganizationCreate { name: "North".into(), location: None }).await.unwrap().id;
        let south = create_organization(&mut db, OrganizationCreate { name: "South".into(), location: None }).await.unwrap().id;
        let event = create_event(
            &mut db,
            EventCreate {
                name: "Kickoff".into(),
                description: String::new(),
                date: NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
                time: None,
                location: "Hall A".into(),
                organizations: vec![north],
                attendees: vec![],
                questions: vec![],
            },
        )
        .await
        .unwrap()
        .event
        .id;
        drop(db);
        Fixture { manager, north, south, event }
    }

    fn participant(event: i32, unique_id: &str) -> RegistrationPayload {
        RegistrationPayload {
            event,
            organizations: None,
            attendee_type: AttendeeType::Participant,
            participant: Some(IdOrName::Name(unique_id.into())),
            facilitator: None,
            custom_attendee_type: None,
        }
    }

    async fn registrations(manager: &MemoryManager, event: i32) -> i64 {
        let mut db = manager.db().await.unwrap();
        EventAttendeeCommon::count(
            &mut db,
            &Query {
                event_id_eq: Some(event),
                ..Default::default()
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_duplicate_registration_is_rejected() {
        let f = fixture().await;
        let mut db = f.manager.db().await.unwrap();
        let (first, created) = register_payload(&mut db, participant(f.event, "p-1")).await.unwrap();
        assert!(created);
        assert_eq!(first.attendance_status, AttendanceStatus::Attended);
        assert_eq!(first.organizations, vec![f.north]);
        let err = register_payload(&mut db, participant(f.event, "p-1")).await.unwrap_err();
        assert!(matches!(err, Error::DuplicateRegistration(_)), "{:?}", err);
        drop(db);
        assert_eq!(registrations(&f.manager, f.event).await, 1);
    }

    #[tokio::test]
    async fn test_facilitator_from_foreign_organization_is_rejected() {
        let f = fixture().await;
        let mut tx = f.manager.tx().await.unwrap();
        let facilitator = create_facilitator(
            &mut tx,
            FacilitatorCreate {
                first_name: "Ada".into(),
                last_name: "Byron".into(),
                organization_role: "Lead".into(),
                organization: f.south,
            },
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();

        let mut tx = f.manager.tx().await.unwrap();
        let payload = RegistrationPayload {
            event: f.event,
            organizations: None,
            attendee_type: AttendeeType::Facilitator,
            participant: None,
            facilitator: Some(facilitator.id),
            custom_attendee_type: None,
        };
        let err = register_payload(&mut tx, payload).await.unwrap_err();
        assert!(matches!(err, Error::OrganizationMismatch(_)), "{:?}", err);
        tx.rollback().await.unwrap();
        assert_eq!(registrations(&f.manager, f.event).await, 0);
    }

    #[tokio::test]
    async fn test_discriminator_must_match_reference() {
        let f = fixture().await;
        let mut db = f.manager.db().await.unwrap();
        let mut payload = participant(f.event, "p-1");
        payload.facilitator = Some(1);
        let err = register_payload(&mut db, payload).await.unwrap_err();
        assert!(matches!(err, Error::DiscriminatorMismatch(_)));

        let mut payload = participant(f.event, "p-1");
        payload.attendee_type = AttendeeType::Other;
        let err = register_payload(&mut db, payload).await.unwrap_err();
        assert!(matches!(err, Error::DiscriminatorMismatch(_)));
    }

    #[tokio::test]
    async fn test_explicit_organizations_must_run_the_event() {
        let f = fixture().await;
        let mut db = f.manager.db().await.unwrap();
        let mut payload = participant(f.event, "p-1");
        payload.organizations = Some(vec![f.south]);
        let err = register_payload(&mut db, payload).await.unwrap_err();
        assert!(matches!(err, Error::OrganizationMismatch(_)));
    }

    #[tokio::test]
    async fn test_batch_reports_partial_success() {
        let f = fixture().await;
        let request = BatchRequest {
            atomic: false,
            items: vec![participant(f.event, "p-1"), participant(f.event, "p-2"), participant(f.event, "p-3"), participant(f.event, "p-1")],
        };
        let report = register_batch(&f.manager, request).await.unwrap();
        assert_eq!(report.created, 3);
        assert_eq!(report.failed, 1);
        assert_eq!(report.results[3].index, 3);
        assert!(matches!(report.results[3].outcome, crate::core::models::event_attendee::Outcome::Failed { kind: "DuplicateRegistration", .. }));
        assert_eq!(registrations(&f.manager, f.event).await, 3);
    }

    #[tokio::test]
    async fn test_atomic_batch_rolls_everything_back() {
        let f = fixture().await;
        let request = BatchRequest {
            atomic: true,
            items: vec![participant(f.event, "p-1"), participant(f.event, "p-2"), participant(f.event, "p-1")],
        };
        let err = register_batch(&f.manager, request).await.unwrap_err();
        match err {
            Error::BatchAborted { index, source } => {
                assert_eq!(index, 2);
                assert!(matches!(*source, Error::DuplicateRegistration(_)));
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert_eq!(registrations(&f.manager, f.event).await, 0);
        let mut db = f.manager.db().await.unwrap();
        assert_eq!(ParticipantCommon::count(&mut db, &ParticipantQuery::default()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_custom_type_is_provisioned_by_name() {
        let f = fixture().await;
        let mut db = f.manager.db().await.unwrap();
        let payload = RegistrationPayload {
            event: f.event,
            organizations: None,
            attendee_type: AttendeeType::Other,
            participant: None,
            facilitator: None,
            custom_attendee_type: Some(IdOrName::Name("Volunteer".into())),
        };
        let (event_attendee, created) = register_payload(&mut db, payload.clone()).await.unwrap();
        assert!(created);
        let types = CustomAttendeeTypeCommon::query(&mut db, &CustomAttendeeTypeQuery::default(), None).await.unwrap();
        assert_eq!(types.len(), 1);
        assert_eq!(types[0].organization, f.north);
        assert_eq!(event_attendee.attendee, AttendeeRef::Other { custom_attendee_type: types[0].id });

        let err = register_payload(&mut db, payload).await.unwrap_err();
        assert!(matches!(err, Error::DuplicateRegistration(_)));
        assert_eq!(CustomAttendeeTypeCommon::count(&mut db, &CustomAttendeeTypeQuery::default()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_add_participants_reuses_known_unique_ids() {
        let f = fixture().await;
        let entries = vec![
            ParticipantSpec {
                unique_id: Some("p-1".into()),
                first_name: "Grace".into(),
                ..Default::default()
            },
            ParticipantSpec {
                first_name: "Alan".into(),
                ..Default::default()
            },
            ParticipantSpec {
                unique_id: Some("p-1".into()),
                ..Default::default()
            },
        ];
        let report = add_participants(&f.manager, f.event, entries).await.unwrap();
        assert_eq!((report.created, report.failed), (2, 1));
        let err = add_participants(&f.manager, f.event + 1000, vec![]).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { entity: "Event", .. }));
    }

    #[tokio::test]
    async fn test_event_attendee_update_keeps_the_pair() {
        let f = fixture().await;
        let mut db = f.manager.db().await.unwrap();
        let (event_attendee, _) = register_payload(&mut db, participant(f.event, "p-1")).await.unwrap();
        let updated = EventAttendee::update(
            &mut db,
            event_attendee.id,
            Update {
                attendance_status: Some(AttendanceStatus::Absent),
                organizations: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.attendance_status, AttendanceStatus::Absent);
        assert_eq!(updated.attendee, event_attendee.attendee);

        let err = EventAttendee::update(
            &mut db,
            event_attendee.id,
            Update {
                attendance_status: None,
                organizations: Some(vec![f.south]),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::OrganizationMismatch(_)));
    }
}
