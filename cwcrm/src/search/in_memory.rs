//! In-process search index.
//!
//! Documents are the JSON form of each entity, keyed by id. Queries are parsed with
//! [`QueryString`] and results ordered by relevance, then by ascending id.

use super::{Result, SearchError, SearchRepository, query::QueryString};
use crate::db::models::Entity;
use crate::types::EntityId;
use parking_lot::RwLock;
use serde_json::Value;
use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::instrument;

pub struct InMemorySearchRepository<E> {
    documents: Arc<RwLock<BTreeMap<EntityId, Value>>>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> InMemorySearchRepository<E> {
    pub fn new() -> Self {
        Self {
            documents: Arc::new(RwLock::new(BTreeMap::new())),
            _entity: PhantomData,
        }
    }

    /// Number of indexed documents
    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }
}

impl<E: Entity> Default for InMemorySearchRepository<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for InMemorySearchRepository<E> {
    fn clone(&self) -> Self {
        Self {
            documents: Arc::clone(&self.documents),
            _entity: PhantomData,
        }
    }
}

#[async_trait::async_trait]
impl<E: Entity> SearchRepository<E> for InMemorySearchRepository<E> {
    #[instrument(skip(self, entity), fields(entity = E::NAME, id = ?entity.id()), err)]
    async fn save(&self, entity: &E) -> Result<E> {
        let id = entity.id().ok_or(SearchError::MissingId { entity: E::NAME })?;
        let document = serde_json::to_value(entity)?;
        self.documents.write().insert(id, document);
        Ok(entity.clone())
    }

    #[instrument(skip(self), fields(entity = E::NAME), err)]
    async fn delete_by_id(&self, id: EntityId) -> Result<()> {
        self.documents.write().remove(&id);
        Ok(())
    }

    #[instrument(skip(self), fields(entity = E::NAME), err)]
    async fn search(&self, query: &str) -> Result<Vec<E>> {
        let query = QueryString::parse(query)?;

        let mut hits: Vec<(u32, EntityId, Value)> = self
            .documents
            .read()
            .iter()
            .filter_map(|(id, document)| query.score(document).map(|score| (score, *id, document.clone())))
            .collect();
        hits.sort_by_key(|(score, id, _)| (Reverse(*score), *id));

        hits.into_iter()
            .map(|(_, _, document)| serde_json::from_value(document).map_err(SearchError::from))
            .collect()
    }

    async fn ensure_index(&self) -> Result<()> {
        Ok(())
    }
}
