use itertools::Itertools;
use log::warn;

use crate::core::models::{
    common::Pagination,
    organization::{
        Coordinator, CoordinatorCreate, CoordinatorQuery, CoordinatorUpdate, Create as OrganizationCreate, Insert as OrganizationInsert, Organization, Query as OrganizationQuery,
        Update as OrganizationUpdate, DEFAULT_COORDINATOR_ROLE,
    },
};
use crate::core::ports::repository::{CoordinatorCommon, OrganizationCommon, Store};
use crate::core::resource::Resource;
use crate::error::Error;

/// Deduplicates `ids` and fails with `NotFound` on the first one that does not exist.
pub async fn require_organizations<S>(store: &mut S, ids: &[i32]) -> Result<Vec<i32>, Error>
where
    S: Store,
{
    let ids: Vec<i32> = ids.iter().copied().unique().collect();
    if ids.is_empty() {
        return Ok(ids);
    }
    let existing = OrganizationCommon::existing(store, &ids).await?;
    if let Some(missing) = ids.iter().find(|id| !existing.contains(id)) {
        return Err(Error::not_found("Organization", missing));
    }
    Ok(ids)
}

pub async fn create_organization<S>(store: &mut S, data: OrganizationCreate) -> Result<Organization, Error>
where
    S: Store,
{
    if data.name.trim().is_empty() {
        return Err(Error::BusinessError("organization name must not be empty".into()));
    }
    let id = OrganizationCommon::insert(
        store,
        OrganizationInsert {
            name: data.name,
            location: data.location,
        },
    )
    .await?;
    OrganizationCommon::get(store, id).await
}

pub async fn delete_organization<S>(store: &mut S, id: i32) -> Result<(), Error>
where
    S: Store,
{
    OrganizationCommon::get(store, id).await?;
    let dependents = OrganizationCommon::count_dependents(store, id).await?;
    if dependents > 0 {
        warn!("refused to delete organization {} with {} dependents", id, dependents);
        return Err(Error::ReferentialProtect {
            entity: "Organization",
            id,
            dependents,
        });
    }
    OrganizationCommon::delete(store, id).await
}

impl Resource for Organization {
    const NAME: &'static str = "Organization";
    const FIELDS: &'static [&'static str] = &["id", "name", "location", "created_at", "last_modified"];

    type Filter = OrganizationQuery;
    type Create = OrganizationCreate;
    type Update = OrganizationUpdate;
    type Created = Organization;

    async fn list<S: Store>(store: &mut S, filter: Self::Filter, pagination: Pagination) -> Result<(Vec<Self>, i64), Error> {
        let total = OrganizationCommon::count(store, &filter).await?;
        let list = OrganizationCommon::query(store, &filter, Some(pagination)).await?;
        Ok((list, total))
    }

    async fn retrieve<S: Store>(store: &mut S, id: i32) -> Result<Self, Error> {
        OrganizationCommon::get(store, id).await
    }

    async fn create<S: Store>(store: &mut S, data: Self::Create) -> Result<Self::Created, Error> {
        create_organization(store, data).await
    }

    async fn update<S: Store>(store: &mut S, id: i32, data: Self::Update) -> Result<Self, Error> {
        OrganizationCommon::get(store, id).await?;
        OrganizationCommon::update(store, id, data).await?;
        OrganizationCommon::get(store, id).await
    }

    async fn delete<S: Store>(store: &mut S, id: i32) -> Result<(), Error> {
        delete_organization(store, id).await
    }
}

impl Resource for Coordinator {
    const NAME: &'static str = "Coordinator";
    const FIELDS: &'static [&'static str] = &["id", "organization", "first_name", "last_name", "email", "organization_role", "created_at", "last_modified"];

    type Filter = CoordinatorQuery;
    type Create = CoordinatorCreate;
    type Update = CoordinatorUpdate;
    type Created = Coordinator;

    async fn list<S: Store>(store: &mut S, filter: Self::Filter, pagination: Pagination) -> Result<(Vec<Self>, i64), Error> {
        let total = CoordinatorCommon::count(store, &filter).await?;
        let list = CoordinatorCommon::query(store, &filter, Some(pagination)).await?;
        Ok((list, total))
    }

    async fn retrieve<S: Store>(store: &mut S, id: i32) -> Result<Self, Error> {
        CoordinatorCommon::get(store, id).await
    }

    async fn create<S: Store>(store: &mut S, mut data: Self::Create) -> Result<Self::Created, Error> {
        require_organizations(store, &[data.organization]).await?;
        if data.organization_role.as_deref().map_or(true, |r| r.trim().is_empty()) {
            data.organization_role = Some(DEFAULT_COORDINATOR_ROLE.into());
        }
        let id = CoordinatorCommon::insert(store, data).await?;
        CoordinatorCommon::get(store, id).await
    }

    async fn update<S: Store>(store: &mut S, id: i32, data: Self::Update) -> Result<Self, Error> {
        CoordinatorCommon::get(store, id).await?;
        CoordinatorCommon::update(store, id, data).await?;
        CoordinatorCommon::get(store, id).await
    }

    async fn delete<S: Store>(store: &mut S, id: i32) -> Result<(), Error> {
        CoordinatorCommon::get(store, id).await?;
        CoordinatorCommon::delete(store, id).await
    }
}
