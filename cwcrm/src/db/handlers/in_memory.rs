//! In-memory repository implementation.
//!
//! Stores entities in an ordered map guarded by a lock, with ids handed out from an atomic
//! counter that mirrors the PostgreSQL `sequence_generator` (first id is 1000). It's suitable for
//! development and tests. Everything is lost on restart.

use crate::db::{errors::Result, handlers::repository::Repository, models::Entity};
use crate::types::EntityId;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use tracing::instrument;

/// First id handed out, same as the PostgreSQL sequence
pub const SEQUENCE_START: EntityId = 1000;

#[derive(Clone)]
pub struct InMemoryRepository<E> {
    rows: Arc<RwLock<BTreeMap<EntityId, E>>>,
    sequence: Arc<AtomicI64>,
}

impl<E: Entity> InMemoryRepository<E> {
    pub fn new() -> Self {
        Self {
            rows: Arc::new(RwLock::new(BTreeMap::new())),
            sequence: Arc::new(AtomicI64::new(SEQUENCE_START)),
        }
    }

    fn next_id(&self) -> EntityId {
        self.sequence.fetch_add(1, Ordering::SeqCst)
    }
}

impl<E: Entity> Default for InMemoryRepository<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl<E: Entity> Repository<E> for InMemoryRepository<E> {
    #[instrument(skip(self, entity), fields(entity = E::NAME, id = ?entity.id()), err)]
    async fn save(&self, entity: &E) -> Result<E> {
        let mut rows = self.rows.write();

        let mut saved = entity.clone();
        match entity.id() {
            Some(id) if rows.contains_key(&id) => {}
            _ => saved.set_id(self.next_id()),
        }

        if let Some(id) = saved.id() {
            rows.insert(id, saved.clone());
        }
        Ok(saved)
    }

    #[instrument(skip(self), fields(entity = E::NAME), err)]
    async fn find_all(&self) -> Result<Vec<E>> {
        Ok(self.rows.read().values().cloned().collect())
    }

    #[instrument(skip(self), fields(entity = E::NAME), err)]
    async fn find_by_id(&self, id: EntityId) -> Result<Option<E>> {
        Ok(self.rows.read().get(&id).cloned())
    }

    #[instrument(skip(self), fields(entity = E::NAME), err)]
    async fn delete_by_id(&self, id: EntityId) -> Result<bool> {
        Ok(self.rows.write().remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{priorities::Priority, waivers::Waiver};

    #[tokio::test]
    async fn test_save_assigns_ids_from_sequence() {
        let repo = InMemoryRepository::<Waiver>::new();

        let first = repo.save(&Waiver::new().name("Standard")).await.unwrap();
        let second = repo.save(&Waiver::new().name("Elderly")).await.unwrap();

        assert_eq!(first.id, Some(SEQUENCE_START));
        assert_eq!(second.id, Some(SEQUENCE_START + 1));
    }

    #[tokio::test]
    async fn test_save_existing_id_updates_row() {
        let repo = InMemoryRepository::<Waiver>::new();

        let mut saved = repo.save(&Waiver::new().name("Standard")).await.unwrap();
        saved.set_name("Premium");
        let updated = repo.save(&saved).await.unwrap();

        assert_eq!(updated.id, saved.id);
        let all = repo.find_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name, "Premium");
    }

    #[tokio::test]
    async fn test_save_unknown_id_gets_fresh_id() {
        let repo = InMemoryRepository::<Priority>::new();

        let mut detached = Priority::new().name("High");
        detached.set_id(5);
        let saved = repo.save(&detached).await.unwrap();

        assert_eq!(saved.id, Some(SEQUENCE_START));
        assert!(repo.find_by_id(5).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_all_in_id_order_and_delete() {
        let repo = InMemoryRepository::<Priority>::new();
        let high = repo.save(&Priority::new().name("High")).await.unwrap();
        let medium = repo.save(&Priority::new().name("Medium")).await.unwrap();
        let low = repo.save(&Priority::new().name("Low")).await.unwrap();

        let names: Vec<_> = repo.find_all().await.unwrap().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["High", "Medium", "Low"]);

        assert!(repo.delete_by_id(medium.id.unwrap()).await.unwrap());
        assert!(!repo.delete_by_id(medium.id.unwrap()).await.unwrap());
        assert!(!repo.delete_by_id(99).await.unwrap());

        assert_eq!(repo.find_all().await.unwrap(), vec![high, low]);
    }
}
