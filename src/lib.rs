pub mod config;
pub mod core;
pub mod database;
pub mod error;
pub mod handlers;
pub mod registry;
pub mod request;
pub mod response;

use actix_web::web::{self, JsonConfig, QueryConfig, ServiceConfig};

use crate::core::models::{event::Event, event_attendee::EventAttendee};
use crate::core::ports::repository::Manager;
use crate::error::Error;
use crate::registry::Registry;

/// Mounts the whole API under `/api`: the registry index, every registered
/// entity and the composite endpoints.
pub fn configure<M>(registry: &Registry, cfg: &mut ServiceConfig)
where
    M: Manager,
{
    cfg.app_data(JsonConfig::default().error_handler(|err, _| Error::BusinessError(err.to_string()).into()))
        .app_data(QueryConfig::default().error_handler(|err, _| Error::BusinessError(err.to_string()).into()))
        .service(
            web::scope("/api")
                .route("/", web::get().to(handlers::index))
                .route("/events/", web::post().to(handlers::crud::create::<Event, M>))
                .route("/event-attendees/", web::post().to(handlers::crud::create::<EventAttendee, M>))
                .route("/event-attendees/batch/", web::post().to(handlers::event_attendee::batch::<M>))
                .route("/event/{id}/detail/", web::get().to(handlers::event::detail::<M>))
                .route("/event/{id}/participants/", web::post().to(handlers::event::add_participants::<M>))
                .configure(|cfg| registry.configure(cfg)),
        );
}
