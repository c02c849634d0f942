use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::core::models::common::Pagination;
use crate::core::ports::repository::Store;
use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    List,
    Retrieve,
    Create,
    Update,
    Delete,
}

pub const STANDARD_OPERATIONS: &[Operation] = &[Operation::List, Operation::Retrieve, Operation::Create, Operation::Update, Operation::Delete];

/// An entity exposed through the five standard CRUD operations.
///
/// `create` and `update` receive whatever store the caller opened; the HTTP
/// layer always hands them a transaction. Entities whose create or update does
/// more than write a single row list those operations in `OVERRIDES`.
pub trait Resource: Serialize + Sized + 'static {
    const NAME: &'static str;
    const FIELDS: &'static [&'static str];
    const OPERATIONS: &'static [Operation] = STANDARD_OPERATIONS;
    const OVERRIDES: &'static [Operation] = &[];

    type Filter: DeserializeOwned + Default;
    type Create: DeserializeOwned;
    type Update: DeserializeOwned;
    type Created: Serialize;

    async fn list<S: Store>(store: &mut S, filter: Self::Filter, pagination: Pagination) -> Result<(Vec<Self>, i64), Error>;
    async fn retrieve<S: Store>(store: &mut S, id: i32) -> Result<Self, Error>;
    async fn create<S: Store>(store: &mut S, data: Self::Create) -> Result<Self::Created, Error>;
    async fn update<S: Store>(store: &mut S, id: i32, data: Self::Update) -> Result<Self, Error>;
    async fn delete<S: Store>(store: &mut S, id: i32) -> Result<(), Error>;
}
