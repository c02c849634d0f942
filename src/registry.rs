use actix_web::web::{self, ServiceConfig};
use serde::Serialize;

use crate::core::models::{
    attendee::{CustomAttendeeType, Facilitator, Participant},
    demographic::{Demographic, DemographicCategory, EventDemographic},
    event::Event,
    event_attendee::EventAttendee,
    organization::{Coordinator, Organization},
    question::Question,
    response::Response,
};
use crate::core::ports::repository::Manager;
use crate::core::resource::{Operation, Resource};
use crate::handlers::crud;

/// One exposed entity: where it lives and what it supports.
#[derive(Clone, Serialize)]
pub struct Entry {
    pub name: &'static str,
    pub path: String,
    pub fields: &'static [&'static str],
    pub operations: &'static [Operation],
    pub overrides: &'static [Operation],
    #[serde(skip)]
    mount: fn(&mut ServiceConfig, &str),
}

fn mount<R, M>(cfg: &mut ServiceConfig, path: &str)
where
    R: Resource,
    M: Manager,
{
    let supports = |op: Operation| R::OPERATIONS.contains(&op);
    let mut collection = web::resource(format!("{}/", path));
    if supports(Operation::List) {
        collection = collection.route(web::get().to(crud::list::<R, M>));
    }
    if supports(Operation::Create) {
        collection = collection.route(web::post().to(crud::create::<R, M>));
    }
    let mut item = web::resource(format!("{}/{{id}}/", path));
    if supports(Operation::Retrieve) {
        item = item.route(web::get().to(crud::retrieve::<R, M>));
    }
    if supports(Operation::Update) {
        item = item.route(web::put().to(crud::update::<R, M>)).route(web::patch().to(crud::update::<R, M>));
    }
    if supports(Operation::Delete) {
        item = item.route(web::delete().to(crud::delete::<R, M>));
    }
    cfg.service(collection).service(item);
}

/// The statically declared table of entities served under `/api`.
#[derive(Clone, Default)]
pub struct Registry {
    entries: Vec<Entry>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entity at `/<lower-cased name>/`.
    pub fn register<R, M>(mut self) -> Self
    where
        R: Resource,
        M: Manager,
    {
        self.entries.push(Entry {
            name: R::NAME,
            path: format!("/{}", R::NAME.to_lowercase()),
            fields: R::FIELDS,
            operations: R::OPERATIONS,
            overrides: R::OVERRIDES,
            mount: mount::<R, M>,
        });
        self
    }

    pub fn standard<M>() -> Self
    where
        M: Manager,
    {
        Registry::new()
            .register::<Organization, M>()
            .register::<Coordinator, M>()
            .register::<Participant, M>()
            .register::<Facilitator, M>()
            .register::<CustomAttendeeType, M>()
            .register::<Event, M>()
            .register::<EventAttendee, M>()
            .register::<Question, M>()
            .register::<Response, M>()
            .register::<DemographicCategory, M>()
            .register::<EventDemographic, M>()
            .register::<Demographic, M>()
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.name.eq_ignore_ascii_case(name))
    }

    pub fn configure(&self, cfg: &mut ServiceConfig) {
        for entry in &self.entries {
            (entry.mount)(cfg, &entry.path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::MemoryManager;

    #[test]
    fn paths_are_lower_cased_entity_names() {
        let registry = Registry::standard::<MemoryManager>();
        let paths: Vec<&str> = registry.entries().iter().map(|e| e.path.as_str()).collect();
        assert!(paths.contains(&"/organization"));
        assert!(paths.contains(&"/eventattendee"));
        assert!(paths.contains(&"/customattendeetype"));
        assert_eq!(paths.len(), 12);
    }

    #[test]
    fn composite_entities_override_create_and_update() {
        let registry = Registry::standard::<MemoryManager>();
        for name in ["Event", "EventAttendee"] {
            let entry = registry.get(name).unwrap();
            assert_eq!(entry.overrides, &[Operation::Create, Operation::Update]);
        }
        assert!(registry.get("Organization").unwrap().overrides.is_empty());
        assert!(registry.get("Nope").is_none());
    }

    #[test]
    fn event_demographics_are_not_updatable() {
        let registry = Registry::standard::<MemoryManager>();
        let operations = registry.get("EventDemographic").unwrap().operations;
        assert!(!operations.contains(&Operation::Update));
        assert!(operations.contains(&Operation::Delete));
        assert!(registry.get("Event").unwrap().operations.contains(&Operation::Update));
    }
}
