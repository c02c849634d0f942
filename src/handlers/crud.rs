use actix_web::web::{Data, Json, Path, Query};
use actix_web::HttpResponse;

use crate::core::ports::repository::{Manager, TxStore};
use crate::core::resource::Resource;
use crate::error::Error;
use crate::request::Pagination;
use crate::response::{DeleteResponse, List};

pub async fn list<R, M>(manager: Data<M>, Query(pagination): Query<Pagination>, Query(filter): Query<R::Filter>) -> Result<Json<List<R>>, Error>
where
    R: Resource,
    M: Manager,
{
    let mut db = manager.db().await?;
    let (list, total) = R::list(&mut db, filter, pagination.into()).await?;
    Ok(Json(List::new(list, total)))
}

pub async fn retrieve<R, M>(manager: Data<M>, id: Path<i32>) -> Result<Json<R>, Error>
where
    R: Resource,
    M: Manager,
{
    let mut db = manager.db().await?;
    let item = R::retrieve(&mut db, id.into_inner()).await?;
    Ok(Json(item))
}

pub async fn create<R, M>(manager: Data<M>, Json(data): Json<R::Create>) -> Result<HttpResponse, Error>
where
    R: Resource,
    M: Manager,
{
    let mut tx = manager.tx().await?;
    let created = R::create(&mut tx, data).await?;
    tx.commit().await?;
    Ok(HttpResponse::Created().json(created))
}

/// Serves both PUT and PATCH; absent fields keep their current value.
pub async fn update<R, M>(manager: Data<M>, id: Path<i32>, Json(data): Json<R::Update>) -> Result<Json<R>, Error>
where
    R: Resource,
    M: Manager,
{
    let mut tx = manager.tx().await?;
    let updated = R::update(&mut tx, id.into_inner(), data).await?;
    tx.commit().await?;
    Ok(Json(updated))
}

pub async fn delete<R, M>(manager: Data<M>, id: Path<i32>) -> Result<Json<DeleteResponse>, Error>
where
    R: Resource,
    M: Manager,
{
    let id = id.into_inner();
    let mut tx = manager.tx().await?;
    R::delete(&mut tx, id).await?;
    tx.commit().await?;
    Ok(Json(DeleteResponse { deleted: id }))
}
