use actix_web::web::{Data, Json};

use crate::core::models::event_attendee::{BatchReport, BatchRequest};
use crate::core::ports::repository::Manager;
use crate::core::services::registration;
use crate::error::Error;

pub async fn batch<M>(manager: Data<M>, Json(request): Json<BatchRequest>) -> Result<Json<BatchReport>, Error>
where
    M: Manager,
{
    let report = registration::register_batch(manager.get_ref(), request).await?;
    Ok(Json(report))
}
