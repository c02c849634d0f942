use log::warn;

use crate::core::models::{
    common::Pagination,
    demographic::{
        CategoryCreate, CategoryQuery, CategoryUpdate, Demographic, DemographicCategory, DemographicCreate, DemographicQuery, DemographicUpdate, EventDemographic,
        EventDemographicCreate, EventDemographicQuery, EventDemographicUpdate, FieldType,
    },
};
use crate::core::ports::repository::{DemographicCategoryCommon, DemographicCommon, EventAttendeeCommon, EventCommon, EventDemographicCommon, Store};
use crate::core::resource::{Operation, Resource};
use crate::core::services::organization::require_organizations;
use crate::error::Error;

fn check_choices(name: &str, field_type: FieldType, choices: &[String]) -> Result<(), Error> {
    match (field_type, choices.is_empty()) {
        (FieldType::Choice, true) => Err(Error::BusinessError(format!("choice category '{}' needs at least one choice", name))),
        (FieldType::Choice, false) | (_, true) => Ok(()),
        (_, false) => Err(Error::BusinessError(format!("only choice categories take choices, '{}' is {}", name, field_type.as_str()))),
    }
}

impl Resource for DemographicCategory {
    const NAME: &'static str = "DemographicCategory";
    const FIELDS: &'static [&'static str] = &["id", "organization", "name", "field_type", "choices", "required", "created_at", "last_modified"];

    type Filter = CategoryQuery;
    type Create = CategoryCreate;
    type Update = CategoryUpdate;
    type Created = DemographicCategory;

    async fn list<S: Store>(store: &mut S, filter: Self::Filter, pagination: Pagination) -> Result<(Vec<Self>, i64), Error> {
        let total = DemographicCategoryCommon::count(store, &filter).await?;
        let list = DemographicCategoryCommon::query(store, &filter, Some(pagination)).await?;
        Ok((list, total))
    }

    async fn retrieve<S: Store>(store: &mut S, id: i32) -> Result<Self, Error> {
        DemographicCategoryCommon::get(store, id).await
    }

    async fn create<S: Store>(store: &mut S, data: Self::Create) -> Result<Self::Created, Error> {
        if data.name.trim().is_empty() {
            return Err(Error::BusinessError("demographic category name must not be empty".into()));
        }
        check_choices(&data.name, data.field_type, &data.choices)?;
        require_organizations(store, &[data.organization]).await?;
        let id = DemographicCategoryCommon::insert(store, data).await?;
        DemographicCategoryCommon::get(store, id).await
    }

    async fn update<S: Store>(store: &mut S, id: i32, data: Self::Update) -> Result<Self, Error> {
        let current = DemographicCategoryCommon::get(store, id).await?;
        let name = data.name.as_deref().unwrap_or(&current.name);
        if name.trim().is_empty() {
            return Err(Error::BusinessError("demographic category name must not be empty".into()));
        }
        check_choices(name, current.field_type, data.choices.as_deref().unwrap_or(&current.choices))?;
        DemographicCategoryCommon::update(store, id, data).await?;
        DemographicCategoryCommon::get(store, id).await
    }

    async fn delete<S: Store>(store: &mut S, id: i32) -> Result<(), Error> {
        DemographicCategoryCommon::get(store, id).await?;
        let dependents = DemographicCategoryCommon::count_links(store, id).await?;
        if dependents > 0 {
            warn!("refused to delete demographic category {} linked to {} events", id, dependents);
            return Err(Error::ReferentialProtect {
                entity: "DemographicCategory",
                id,
                dependents,
            });
        }
        DemographicCategoryCommon::delete(store, id).await
    }
}

impl Resource for EventDemographic {
    const NAME: &'static str = "EventDemographic";
    const FIELDS: &'static [&'static str] = &["id", "event", "category", "created_at", "last_modified"];
    const OPERATIONS: &'static [Operation] = &[Operation::List, Operation::Retrieve, Operation::Create, Operation::Delete];

    type Filter = EventDemographicQuery;
    type Create = EventDemographicCreate;
    type Update = EventDemographicUpdate;
    type Created = EventDemographic;

    async fn list<S: Store>(store: &mut S, filter: Self::Filter, pagination: Pagination) -> Result<(Vec<Self>, i64), Error> {
        let total = EventDemographicCommon::count(store, &filter).await?;
        let list = EventDemographicCommon::query(store, &filter, Some(pagination)).await?;
        Ok((list, total))
    }

    async fn retrieve<S: Store>(store: &mut S, id: i32) -> Result<Self, Error> {
        EventDemographicCommon::get(store, id).await
    }

    /// The category has to belong to one of the organizations running the event.
    async fn create<S: Store>(store: &mut S, data: Self::Create) -> Result<Self::Created, Error> {
        let event = EventCommon::get(store, data.event).await?;
        let category = DemographicCategoryCommon::get(store, data.category).await?;
        if !event.organizations.contains(&category.organization) {
            return Err(Error::OrganizationMismatch(format!(
                "demographic category {} belongs to organization {}, which does not run event {}",
                category.id, category.organization, event.id
            )));
        }
        let id = EventDemographicCommon::insert(store, data).await?;
        EventDemographicCommon::get(store, id).await
    }

    /// The (event, category) pair is fixed; delete the link and create a new one instead.
    async fn update<S: Store>(store: &mut S, id: i32, _: Self::Update) -> Result<Self, Error> {
        EventDemographicCommon::get(store, id).await?;
        Err(Error::BusinessError(format!("event demographic {} cannot be changed, delete it and link the category again", id)))
    }

    async fn delete<S: Store>(store: &mut S, id: i32) -> Result<(), Error> {
        EventDemographicCommon::get(store, id).await?;
        let dependents = EventDemographicCommon::count_values(store, id).await?;
        if dependents > 0 {
            warn!("refused to delete event demographic {} with {} recorded values", id, dependents);
            return Err(Error::ReferentialProtect {
                entity: "EventDemographic",
                id,
                dependents,
            });
        }
        EventDemographicCommon::delete(store, id).await
    }
}

async fn category_of<S>(store: &mut S, event_demographic_id: i32) -> Result<(EventDemographic, DemographicCategory), Error>
where
    S: Store,
{
    let event_demographic = EventDemographicCommon::get(store, event_demographic_id).await?;
    let category = DemographicCategoryCommon::get(store, event_demographic.category).await?;
    Ok((event_demographic, category))
}

impl Resource for Demographic {
    const NAME: &'static str = "Demographics";
    const FIELDS: &'static [&'static str] = &["id", "event_demographic", "event_attendee", "value", "created_at", "last_modified"];

    type Filter = DemographicQuery;
    type Create = DemographicCreate;
    type Update = DemographicUpdate;
    type Created = Demographic;

    async fn list<S: Store>(store: &mut S, filter: Self::Filter, pagination: Pagination) -> Result<(Vec<Self>, i64), Error> {
        let total = DemographicCommon::count(store, &filter).await?;
        let list = DemographicCommon::query(store, &filter, Some(pagination)).await?;
        Ok((list, total))
    }

    async fn retrieve<S: Store>(store: &mut S, id: i32) -> Result<Self, Error> {
        DemographicCommon::get(store, id).await
    }

    async fn create<S: Store>(store: &mut S, data: Self::Create) -> Result<Self::Created, Error> {
        let (event_demographic, category) = category_of(store, data.event_demographic).await?;
        let event_attendee = EventAttendeeCommon::get(store, data.event_attendee).await?;
        if event_attendee.event != event_demographic.event {
            return Err(Error::BusinessError(format!(
                "event attendee {} is registered for event {}, not event {}",
                event_attendee.id, event_attendee.event, event_demographic.event
            )));
        }
        category.validate(&data.value)?;
        let id = DemographicCommon::insert(store, data).await?;
        DemographicCommon::get(store, id).await
    }

    async fn update<S: Store>(store: &mut S, id: i32, data: Self::Update) -> Result<Self, Error> {
        let current = DemographicCommon::get(store, id).await?;
        if let Some(value) = data.value {
            let (_, category) = category_of(store, current.event_demographic).await?;
            category.validate(&value)?;
            DemographicCommon::update(store, id, value).await?;
        }
        DemographicCommon::get(store, id).await
    }

    async fn delete<S: Store>(store: &mut S, id: i32) -> Result<(), Error> {
        DemographicCommon::get(store, id).await?;
        DemographicCommon::delete(store, id).await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::core::models::organization::Create as OrganizationCreate;
    use crate::core::ports::repository::Manager;
    use crate::core::services::{event::create_event, organization::create_organization};
    use crate::database::memory::MemoryManager;

    fn category(field_type: FieldType, choices: &[&str]) -> DemographicCategory {
        DemographicCategory {
            id: 1,
            organization: 1,
            name: "Age group".into(),
            field_type,
            choices: choices.iter().map(|c| c.to_string()).collect(),
            required: false,
            created_at: chrono::Utc::now(),
            last_modified: chrono::Utc::now(),
        }
    }

    #[test]
    fn values_follow_the_field_type() {
        assert!(category(FieldType::Number, &[]).validate("42.5").is_ok());
        assert!(category(FieldType::Number, &[]).validate("forty").is_err());
        assert!(category(FieldType::Date, &[]).validate("2026-10-19").is_ok());
        assert!(category(FieldType::Date, &[]).validate("19/10/2026").is_err());
        assert!(category(FieldType::Choice, &["18-25", "26-40"]).validate("26-40").is_ok());
        assert!(category(FieldType::Choice, &["18-25", "26-40"]).validate("99").is_err());
        assert!(category(FieldType::Text, &[]).validate("").is_ok());
        let mut required = category(FieldType::Text, &[]);
        required.required = true;
        assert!(required.validate("  ").is_err());
    }

    #[test]
    fn only_choice_categories_take_choices() {
        assert!(check_choices("a", FieldType::Choice, &[]).is_err());
        assert!(check_choices("a", FieldType::Text, &["x".into()]).is_err());
        assert!(check_choices("a", FieldType::Choice, &["x".into()]).is_ok());
    }

    #[tokio::test]
    async fn demographics_are_scoped_to_the_event() {
        let manager = MemoryManager::new();
        let mut db = manager.db().await.unwrap();
        let north = create_organization(&mut db, OrganizationCreate { name: "North".into(), location: None }).await.unwrap().id;
        let south = create_organization(&mut db, OrganizationCreate { name: "South".into(), location: None }).await.unwrap().id;
        let event = create_event(
            &mut db,
            serde_json::from_value(json!({
                "name": "Kickoff",
                "date": "2026-10-19",
                "organizations": [north],
                "attendees": [{"attendee_type": "participant", "unique_id": "p-1"}]
            }))
            .unwrap(),
        )
        .await
        .unwrap();
        let age = DemographicCategory::create(
            &mut db,
            CategoryCreate {
                organization: north,
                name: "Age group".into(),
                field_type: FieldType::Choice,
                choices: vec!["18-25".into(), "26-40".into()],
                required: true,
            },
        )
        .await
        .unwrap();
        let foreign = DemographicCategory::create(
            &mut db,
            CategoryCreate {
                organization: south,
                name: "Shoe size".into(),
                field_type: FieldType::Number,
                choices: vec![],
                required: false,
            },
        )
        .await
        .unwrap();

        let err = EventDemographic::create(&mut db, EventDemographicCreate { event: event.event.id, category: foreign.id }).await.unwrap_err();
        assert!(matches!(err, Error::OrganizationMismatch(_)));
        let link = EventDemographic::create(&mut db, EventDemographicCreate { event: event.event.id, category: age.id }).await.unwrap();
        let err = EventDemographic::create(&mut db, EventDemographicCreate { event: event.event.id, category: age.id }).await.unwrap_err();
        assert!(matches!(err, Error::UniqueViolation(_)));

        let event_attendee = event.attendees[0].id;
        let err = Demographic::create(
            &mut db,
            DemographicCreate {
                event_demographic: link.id,
                event_attendee,
                value: "99".into(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::BusinessError(_)));
        let value = Demographic::create(
            &mut db,
            DemographicCreate {
                event_demographic: link.id,
                event_attendee,
                value: "18-25".into(),
            },
        )
        .await
        .unwrap();
        let updated = Demographic::update(&mut db, value.id, DemographicUpdate { value: Some("26-40".into()) }).await.unwrap();
        assert_eq!(updated.value, "26-40");

        let err = DemographicCategory::delete(&mut db, age.id).await.unwrap_err();
        assert!(matches!(err, Error::ReferentialProtect { .. }));
        let err = EventDemographic::update(&mut db, link.id, EventDemographicUpdate {}).await.unwrap_err();
        assert!(matches!(err, Error::BusinessError(_)));
        let err = EventDemographic::delete(&mut db, link.id).await.unwrap_err();
        assert!(matches!(err, Error::ReferentialProtect { dependents: 1, .. }));
    }
}
