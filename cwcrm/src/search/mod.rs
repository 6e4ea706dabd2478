//! Search index layer.
//!
//! Every entity is mirrored into a text-search index so the REST search endpoint can run free-text
//! query-string queries against it. The index is a secondary copy of the relational store:
//! services write to it after the relational commit and never read entities back from it except
//! for `search`.
//!
//! - [`SearchRepository`]: the indexing port, generic over the entity type
//! - [`ElasticsearchSearchRepository`]: Elasticsearch over its REST API
//! - [`InMemorySearchRepository`]: documents held in process, queried with [`query::QueryString`]

pub mod elasticsearch;
pub mod in_memory;
pub mod query;

pub use elasticsearch::ElasticsearchSearchRepository;
pub use in_memory::InMemorySearchRepository;

use crate::db::models::Entity;
use crate::types::EntityId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SearchError {
    /// The query string could not be parsed, or the engine rejected it
    #[error("Invalid search query: {0}")]
    InvalidQuery(String),

    #[error("Cannot index {entity} without an id")]
    MissingId { entity: &'static str },

    #[error("Search engine request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Search engine returned {status}: {body}")]
    Status { status: reqwest::StatusCode, body: String },

    #[error("Failed to convert search document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid search engine URL: {0}")]
    Url(#[from] url::ParseError),
}

pub type Result<T> = std::result::Result<T, SearchError>;

/// Indexing port for a single entity type.
#[async_trait::async_trait]
pub trait SearchRepository<E: Entity>: Send + Sync {
    /// Index (or re-index) an entity under its id. The entity must already have an id.
    async fn save(&self, entity: &E) -> Result<E>;

    /// Remove the document for `id`. Removing an absent document is not an error.
    async fn delete_by_id(&self, id: EntityId) -> Result<()>;

    /// Run a query-string query, best match first.
    async fn search(&self, query: &str) -> Result<Vec<E>>;

    /// Create the backing index when it doesn't exist yet.
    async fn ensure_index(&self) -> Result<()>;
}
