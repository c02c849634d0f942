use actix_web::web::{Data, Json, Path};

use crate::core::models::{attendee::ParticipantSpec, event::EventDetail, event_attendee::BatchReport};
use crate::core::ports::repository::Manager;
use crate::core::services::{event, registration};
use crate::error::Error;

pub async fn detail<M>(manager: Data<M>, event_id: Path<i32>) -> Result<Json<EventDetail>, Error>
where
    M: Manager,
{
    let mut db = manager.db().await?;
    let detail = event::event_detail(&mut db, event_id.into_inner()).await?;
    Ok(Json(detail))
}

pub async fn add_participants<M>(manager: Data<M>, event_id: Path<i32>, Json(entries): Json<Vec<ParticipantSpec>>) -> Result<Json<BatchReport>, Error>
where
    M: Manager,
{
    let report = registration::add_participants(manager.get_ref(), event_id.into_inner(), entries).await?;
    Ok(Json(report))
}
