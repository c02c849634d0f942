use itertools::Itertools;
use log::{info, warn};

use crate::core::models::{
    attendee::AttendeeSpec,
    common::Pagination,
    event::{Create, Event, EventDetail, Insert, Query, QuestionSpec, ScalarUpdate, Update},
    event_attendee::Query as EventAttendeeQuery,
    question::{Insert as QuestionInsert, Query as QuestionQuery},
};
use crate::core::ports::repository::{EventAttendeeCommon, EventCommon, QuestionCommon, Store};
use crate::core::resource::{Operation, Resource};
use crate::core::services::attendee::resolve_attendee;
use crate::core::services::organization::require_organizations;
use crate::core::services::registration::register;
use crate::error::Error;

/// Turns nested question references into question ids, reusing a question
/// with the same text and organization before creating a new one.
pub async fn resolve_questions<S>(store: &mut S, specs: Vec<QuestionSpec>) -> Result<Vec<i32>, Error>
where
    S: Store,
{
    let mut ids = Vec::with_capacity(specs.len());
    for spec in specs {
        let id = match spec {
            QuestionSpec::Existing { id } => QuestionCommon::get(store, id).await?.id,
            QuestionSpec::New { text, organization } => {
                let text = text.trim().to_owned();
                if text.is_empty() {
                    return Err(Error::BusinessError("question text must not be empty".into()));
                }
                if let Some(organization) = organization {
                    require_organizations(store, &[organization]).await?;
                }
                match QuestionCommon::find(store, &text, organization).await? {
                    Some(existing) => existing.id,
                    None => {
                        let id = QuestionCommon::insert(store, QuestionInsert { text, organization_id: organization }).await?;
                        info!("created question {} from a nested event payload", id);
                        id
                    }
                }
            }
        };
        ids.push(id);
    }
    Ok(ids.into_iter().unique().collect())
}

pub async fn event_detail<S>(store: &mut S, id: i32) -> Result<EventDetail, Error>
where
    S: Store,
{
    let event = EventCommon::get(store, id).await?;
    let attendees = EventAttendeeCommon::query(
        store,
        &EventAttendeeQuery {
            event_id_eq: Some(id),
            ..Default::default()
        },
        None,
    )
    .await?;
    let question_details = QuestionCommon::query(
        store,
        &QuestionQuery {
            event_id_eq: Some(id),
            ..Default::default()
        },
        None,
    )
    .await?;
    Ok(EventDetail {
        event,
        attendees,
        question_details,
    })
}

/// Creates the event with its organizations, questions and attendees.
///
/// Everything happens on the given store, so a failing nested attendee leaves
/// nothing behind once the caller rolls back.
pub async fn create_event<S>(store: &mut S, data: Create) -> Result<EventDetail, Error>
where
    S: Store,
{
    if data.name.trim().is_empty() {
        return Err(Error::BusinessError("event name must not be empty".into()));
    }
    let organizations = require_organizations(store, &data.organizations).await?;
    let id = EventCommon::insert(
        store,
        Insert {
            name: data.name,
            description: data.description,
            date: data.date,
            time: data.time,
            location: data.location,
        },
    )
    .await?;
    EventCommon::set_organizations(store, id, &organizations).await?;
    let questions = resolve_questions(store, data.questions).await?;
    EventCommon::set_questions(store, id, &questions).await?;
    for entry in data.attendees {
        let spec = AttendeeSpec::try_from(entry)?;
        let (attendee, _) = resolve_attendee(store, spec, &organizations).await?;
        register(store, id, attendee, None).await?;
    }
    info!("created event {} with {} organizations and {} questions", id, organizations.len(), questions.len());
    event_detail(store, id).await
}

pub async fn update_event<S>(store: &mut S, id: i32, data: Update) -> Result<Event, Error>
where
    S: Store,
{
    let current = EventCommon::get_for_update(store, id).await?;
    if let Some(organizations) = data.organizations {
        let organizations = require_organizations(store, &organizations).await?;
        for removed in current.organizations.iter().filter(|o| !organizations.contains(o)) {
            let dependents = EventAttendeeCommon::count_scoped_to(store, id, *removed).await?;
            if dependents > 0 {
                warn!("refused to detach organization {} from event {} with {} scoped registrations", removed, id, dependents);
                return Err(Error::ReferentialProtect {
                    entity: "Event",
                    id,
                    dependents,
                });
            }
        }
        EventCommon::set_organizations(store, id, &organizations).await?;
    }
    if let Some(questions) = data.questions {
        let questions = resolve_questions(store, questions).await?;
        EventCommon::set_questions(store, id, &questions).await?;
    }
    let name = data.name.unwrap_or(current.name);
    if name.trim().is_empty() {
        return Err(Error::BusinessError("event name must not be empty".into()));
    }
    EventCommon::update(
        store,
        id,
        ScalarUpdate {
            name,
            description: data.description.unwrap_or(current.description),
            date: data.date.unwrap_or(current.date),
            time: data.time.unwrap_or(current.time),
            location: data.location.unwrap_or(current.location),
        },
    )
    .await?;
    EventCommon::get(store, id).await
}

pub async fn delete_event<S>(store: &mut S, id: i32) -> Result<(), Error>
where
    S: Store,
{
    EventCommon::get(store, id).await?;
    let dependents = EventCommon::count_registrations(store, id).await?;
    if dependents > 0 {
        warn!("refused to delete event {} with {} registrations", id, dependents);
        return Err(Error::ReferentialProtect { entity: "Event", id, dependents });
    }
    EventCommon::delete(store, id).await
}

impl Resource for Event {
    const NAME: &'static str = "Event";
    const FIELDS: &'static [&'static str] = &["id", "name", "description", "date", "time", "location", "organizations", "questions", "created_at", "last_modified"];
    const OVERRIDES: &'static [Operation] = &[Operation::Create, Operation::Update];

    type Filter = Query;
    type Create = Create;
    type Update = Update;
    type Created = EventDetail;

    async fn list<S: Store>(store: &mut S, filter: Self::Filter, pagination: Pagination) -> Result<(Vec<Self>, i64), Error> {
        let total = EventCommon::count(store, &filter).await?;
        let list = EventCommon::query(store, &filter, Some(pagination)).await?;
        Ok((list, total))
    }

    async fn retrieve<S: Store>(store: &mut S, id: i32) -> Result<Self, Error> {
        EventCommon::get(store, id).await
    }

    async fn create<S: Store>(store: &mut S, data: Self::Create) -> Result<Self::Created, Error> {
        create_event(store, data).await
    }

    async fn update<S: Store>(store: &mut S, id: i32, data: Self::Update) -> Result<Self, Error> {
        update_event(store, id, data).await
    }

    async fn delete<S: Store>(store: &mut S, id: i32) -> Result<(), Error> {
        delete_event(store, id).await
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;
    use crate::core::models::organization::Create as OrganizationCreate;
    use crate::core::ports::repository::{Manager, TxStore};
    use crate::core::services::organization::create_organization;
    use crate::database::memory::MemoryManager;

    async fn organizations(manager: &MemoryManager) -> (i32, i32) {
        let mut db = manager.db().await.unwrap();
        let north = create_organization(&mut db, OrganizationCreate { name: "North".into(), location: None }).await.unwrap().id;
        let south = create_organization(&mut db, OrganizationCreate { name: "South".into(), location: None }).await.unwrap().id;
        (north, south)
    }

    fn payload(value: serde_json::Value) -> Create {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn test_nested_question_is_created_once() {
        let manager = MemoryManager::new();
        let (north, _) = organizations(&manager).await;
        let mut db = manager.db().await.unwrap();
        let question = json!({"text": "How did it go?", "organization": north});
        let first = create_event(
            &mut db,
            payload(json!({"name": "Kickoff", "date": "2026-10-19", "organizations": [north], "questions": [question.clone(), question.clone()]})),
        )
        .await
        .unwrap();
        assert_eq!(first.event.questions.len(), 1);
        assert_eq!(first.question_details[0].text, "How did it go?");

        let second = create_event(&mut db, payload(json!({"name": "Retro", "date": "2026-10-20", "organizations": [north], "questions": [question]}))).await.unwrap();
        assert_eq!(second.event.questions, first.event.questions);
        assert_eq!(QuestionCommon::count(&mut db, &QuestionQuery::default()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_nested_attendees_are_registered() {
        let manager = MemoryManager::new();
        let (north, _) = organizations(&manager).await;
        let mut db = manager.db().await.unwrap();
        let detail = create_event(
            &mut db,
            payload(json!({
                "name": "Kickoff",
                "date": "2026-10-19",
                "organizations": [north],
                "attendees": [
                    {"attendee_type": "participant", "unique_id": "p-1", "first_name": "Grace"},
                    {"attendee_type": "facilitator", "first_name": "Ada", "last_name": "Byron"},
                    {"attendee_type": "other", "custom_attendee_type": "Volunteer"}
                ]
            })),
        )
        .await
        .unwrap();
        assert_eq!(detail.attendees.len(), 3);
        assert!(detail.attendees.iter().all(|a| a.organizations == vec![north]));
    }

    #[tokio::test]
    async fn test_failing_nested_attendee_leaves_nothing() {
        let manager = MemoryManager::new();
        let (north, south) = organizations(&manager).await;
        let mut tx = manager.tx().await.unwrap();
        let err = create_event(
            &mut tx,
            payload(json!({
                "name": "Kickoff",
                "date": "2026-10-19",
                "organizations": [north],
                "attendees": [{"attendee_type": "facilitator", "first_name": "Ada", "last_name": "Byron", "organization": south}]
            })),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::OrganizationMismatch(_)), "{:?}", err);
        tx.rollback().await.unwrap();
        let mut db = manager.db().await.unwrap();
        assert_eq!(EventCommon::count(&mut db, &Query::default()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_event_with_registrations_is_protected() {
        let manager = MemoryManager::new();
        let (north, south) = organizations(&manager).await;
        let mut db = manager.db().await.unwrap();
        let detail = create_event(
            &mut db,
            payload(json!({
                "name": "Kickoff",
                "date": "2026-10-19",
                "organizations": [north, south],
                "attendees": [{"attendee_type": "other", "custom_attendee_type": "Guest", "organization": south}]
            })),
        )
        .await
        .unwrap();
        let id = detail.event.id;

        let err = delete_event(&mut db, id).await.unwrap_err();
        assert!(matches!(err, Error::ReferentialProtect { dependents: 1, .. }), "{:?}", err);
        assert_eq!(EventCommon::get(&mut db, id).await.unwrap().id, id);

        let err = update_event(
            &mut db,
            id,
            Update {
                organizations: Some(vec![north]),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::ReferentialProtect { .. }));

        let updated = update_event(
            &mut db,
            id,
            Update {
                name: Some("Kickoff 2".into()),
                organizations: Some(vec![south]),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.name, "Kickoff 2");
        assert_eq!(updated.organizations, vec![south]);
    }

    #[tokio::test]
    async fn test_empty_event_name_is_rejected() {
        let manager = MemoryManager::new();
        let (north, _) = organizations(&manager).await;
        let mut db = manager.db().await.unwrap();
        let err = create_event(&mut db, payload(json!({"name": "  ", "date": "2026-10-19", "organizations": [north]}))).await.unwrap_err();
        assert!(matches!(err, Error::BusinessError(_)));
    }

    #[tokio::test]
    async fn test_time_is_kept_unless_cleared_with_null() {
        let manager = MemoryManager::new();
        let (north, _) = organizations(&manager).await;
        let mut db = manager.db().await.unwrap();
        let id = create_event(&mut db, payload(json!({"name": "Kickoff", "date": "2026-10-19", "time": "18:30:00", "organizations": [north]})))
            .await
            .unwrap()
            .event
            .id;

        let update: Update = serde_json::from_value(json!({"location": "Hall B"})).unwrap();
        let event = update_event(&mut db, id, update).await.unwrap();
        assert_eq!(event.time.map(|t| t.to_string()), Some("18:30:00".to_owned()));

        let update: Update = serde_json::from_value(json!({"time": null})).unwrap();
        let event = update_event(&mut db, id, update).await.unwrap();
        assert_eq!(event.time, None);
        assert_eq!(event.location, "Hall B");
    }
}
