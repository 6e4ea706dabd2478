//! Database record models matching table schemas.
//!
//! Every persisted record implements [`Entity`], which carries what the generic repositories
//! and search adapters need to know about it: table and index names, the non-id columns in
//! insertion order, and how to bind those columns onto a query.
//!
//! # Design Principles
//!
//! - **Schema Mapping**: Each model struct matches a database table schema
//! - **SQLx Integration**: Models derive `sqlx::FromRow` for query results
//! - **Separation**: Database models are distinct from API models to allow
//!   independent evolution of storage and API representations
//! - **Identity**: Equality and hashing use the surrogate id only. A record without an id is
//!   equal only to itself, never to a copy or to another unsaved record.
//!
//! # Conversion to API Models
//!
//! Database models implement `From` conversions to and from their API models:
//!
//! ```ignore
//! use cwcrm::db::models::waivers::Waiver;
//! use cwcrm::api::models::waivers::WaiverDto;
//!
//! let waiver = Waiver::new().name("Standard");
//! let dto: WaiverDto = waiver.into();
//! ```

use crate::types::EntityId;
use serde::{Serialize, de::DeserializeOwned};
use sqlx::{
    FromRow, Postgres,
    postgres::{PgArguments, PgRow},
    query::QueryAs,
};
use std::fmt::Debug;

pub mod priorities;
pub mod waivers;

/// A record persisted in the relational store and mirrored into the search index.
pub trait Entity:
    Clone + Debug + Send + Sync + Unpin + Serialize + DeserializeOwned + for<'r> FromRow<'r, PgRow> + 'static
{
    /// Human readable name, used in logs and error messages ("Waiver")
    const NAME: &'static str;

    /// Plural form of [`Entity::NAME`], for logs ("Waivers")
    const PLURAL: &'static str;

    /// Key used in client alert messages and error payloads ("waiver")
    const KEY: &'static str;

    /// Relational table holding the records ("waiver")
    const TABLE: &'static str;

    /// Search index holding the documents, before any configured prefix is applied
    const INDEX: &'static str;

    /// Non-id columns, in the order [`Entity::bind_columns`] binds them
    const COLUMNS: &'static [&'static str];

    /// The surrogate id, `None` until the record is first persisted
    fn id(&self) -> Option<EntityId>;

    /// Assign the surrogate id. Only repositories call this.
    fn set_id(&mut self, id: EntityId);

    /// Bind every column of [`Entity::COLUMNS`] onto `query`, in order
    fn bind_columns<'q, O>(&'q self, query: QueryAs<'q, Postgres, O, PgArguments>) -> QueryAs<'q, Postgres, O, PgArguments>;
}
