pub mod crud;
pub mod event;
pub mod event_attendee;

use actix_web::web::{Data, Json};

use crate::registry::{Entry, Registry};

/// Lists every exposed entity with its path, fields and operations.
pub async fn index(registry: Data<Registry>) -> Json<Vec<Entry>> {
    Json(registry.entries().to_vec())
}
