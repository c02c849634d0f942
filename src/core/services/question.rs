use log::warn;

use crate::core::models::{
    common::Pagination,
    question::{Create, Insert, Query, Question, Update},
    response::{Create as ResponseCreate, Insert as ResponseInsert, Query as ResponseQuery, Response, Update as ResponseUpdate},
};
use crate::core::ports::repository::{EventAttendeeCommon, EventCommon, QuestionCommon, ResponseCommon, Store};
use crate::core::resource::Resource;
use crate::core::services::organization::require_organizations;
use crate::error::Error;

fn question_text(text: String) -> Result<String, Error> {
    let text = text.trim().to_owned();
    if text.is_empty() {
        return Err(Error::BusinessError("question text must not be empty".into()));
    }
    Ok(text)
}

impl Resource for Question {
    const NAME: &'static str = "Question";
    const FIELDS: &'static [&'static str] = &["id", "text", "organization", "created_at", "last_modified"];

    type Filter = Query;
    type Create = Create;
    type Update = Update;
    type Created = Question;

    async fn list<S: Store>(store: &mut S, filter: Self::Filter, pagination: Pagination) -> Result<(Vec<Self>, i64), Error> {
        let total = QuestionCommon::count(store, &filter).await?;
        let list = QuestionCommon::query(store, &filter, Some(pagination)).await?;
        Ok((list, total))
    }

    async fn retrieve<S: Store>(store: &mut S, id: i32) -> Result<Self, Error> {
        QuestionCommon::get(store, id).await
    }

    async fn create<S: Store>(store: &mut S, data: Self::Create) -> Result<Self::Created, Error> {
        let text = question_text(data.text)?;
        if let Some(organization) = data.organization {
            require_organizations(store, &[organization]).await?;
        }
        let id = QuestionCommon::insert(
            store,
            Insert {
                text,
                organization_id: data.organization,
            },
        )
        .await?;
        QuestionCommon::get(store, id).await
    }

    async fn update<S: Store>(store: &mut S, id: i32, mut data: Self::Update) -> Result<Self, Error> {
        QuestionCommon::get(store, id).await?;
        if let Some(text) = data.text.take() {
            data.text = Some(question_text(text)?);
        }
        if let Some(organization) = data.organization {
            require_organizations(store, &[organization]).await?;
        }
        QuestionCommon::update(store, id, data).await?;
        QuestionCommon::get(store, id).await
    }

    async fn delete<S: Store>(store: &mut S, id: i32) -> Result<(), Error> {
        QuestionCommon::get(store, id).await?;
        let dependents = QuestionCommon::count_responses(store, id).await?;
        if dependents > 0 {
            warn!("refused to delete question {} with {} responses", id, dependents);
            return Err(Error::ReferentialProtect {
                entity: "Question",
                id,
                dependents,
            });
        }
        QuestionCommon::delete(store, id).await
    }
}

/// Records an answer; the question has to be one the attendee's event asks.
pub async fn create_response<S>(store: &mut S, data: ResponseCreate) -> Result<Response, Error>
where
    S: Store,
{
    let event_attendee = EventAttendeeCommon::get(store, data.event_attendee).await?;
    let question = QuestionCommon::get(store, data.question).await?;
    let event = EventCommon::get(store, event_attendee.event).await?;
    if !event.questions.contains(&question.id) {
        return Err(Error::BusinessError(format!("question {} is not asked at event {}", question.id, event.id)));
    }
    let id = ResponseCommon::insert(
        store,
        ResponseInsert {
            text: data.text,
            event_attendee_id: event_attendee.id,
            question_id: question.id,
        },
    )
    .await?;
    ResponseCommon::get(store, id).await
}

impl Resource for Response {
    const NAME: &'static str = "Response";
    const FIELDS: &'static [&'static str] = &["id", "text", "event_attendee", "question", "created_at", "last_modified"];

    type Filter = ResponseQuery;
    type Create = ResponseCreate;
    type Update = ResponseUpdate;
    type Created = Response;

    async fn list<S: Store>(store: &mut S, filter: Self::Filter, pagination: Pagination) -> Result<(Vec<Self>, i64), Error> {
        let total = ResponseCommon::count(store, &filter).await?;
        let list = ResponseCommon::query(store, &filter, Some(pagination)).await?;
        Ok((list, total))
    }

    async fn retrieve<S: Store>(store: &mut S, id: i32) -> Result<Self, Error> {
        ResponseCommon::get(store, id).await
    }

    async fn create<S: Store>(store: &mut S, data: Self::Create) -> Result<Self::Created, Error> {
        create_response(store, data).await
    }

    async fn update<S: Store>(store: &mut S, id: i32, data: Self::Update) -> Result<Self, Error> {
        let current = ResponseCommon::get(store, id).await?;
        if let Some(text) = data.text {
            ResponseCommon::update(store, current.id, text).await?;
        }
        ResponseCommon::get(store, id).await
    }

    async fn delete<S: Store>(store: &mut S, id: i32) -> Result<(), Error> {
        ResponseCommon::get(store, id).await?;
        ResponseCommon::delete(store, id).await
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;
    use crate::core::models::organization::Create as OrganizationCreate;
    use crate::core::ports::repository::Manager;
    use crate::core::services::{event::create_event, organization::create_organization};
    use crate::database::memory::MemoryManager;

    #[tokio::test]
    async fn test_responses_only_to_questions_the_event_asks() {
        let manager = MemoryManager::new();
        let mut db = manager.db().await.unwrap();
        let north = create_organization(&mut db, OrganizationCreate { name: "North".into(), location: None }).await.unwrap().id;
        let unrelated = Question::create(&mut db, Create { text: "Unrelated?".into(), organization: None }).await.unwrap();
        let detail = create_event(
            &mut db,
            serde_json::from_value(json!({
                "name": "Kickoff",
                "date": "2026-10-19",
                "organizations": [north],
                "questions": [{"text": "How did it go?", "organization": north}],
                "attendees": [{"attendee_type": "participant", "unique_id": "p-1"}]
            }))
            .unwrap(),
        )
        .await
        .unwrap();
        let event_attendee = detail.attendees[0].id;
        let asked = detail.event.questions[0];

        let response = create_response(&mut db, ResponseCreate { text: "Great".into(), event_attendee, question: asked }).await.unwrap();
        assert_eq!(response.question, asked);

        let err = create_response(&mut db, ResponseCreate { text: "Hm".into(), event_attendee, question: unrelated.id }).await.unwrap_err();
        assert!(matches!(err, Error::BusinessError(_)));

        let err = Question::delete(&mut db, asked).await.unwrap_err();
        assert!(matches!(err, Error::ReferentialProtect { entity: "Question", .. }));
        Question::delete(&mut db, unrelated.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_blank_question_text_is_rejected() {
        let manager = MemoryManager::new();
        let mut db = manager.db().await.unwrap();
        let err = Question::create(&mut db, Create { text: " ".into(), organization: None }).await.unwrap_err();
        assert!(matches!(err, Error::BusinessError(_)));
    }
}
