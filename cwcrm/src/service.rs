//! Entity services: the operations exposed to the REST layer.
//!
//! An [`EntityService`] pairs the relational [`Repository`] of one entity type with its
//! [`SearchRepository`] and converts between the entity and its DTO at the boundary. Every write
//! goes to the relational store first and is mirrored into the search index once the relational
//! transaction has committed. The two writes are not atomic: when the index write fails the row
//! stays committed, the failure is logged and returned, and [`EntityService::reindex`] brings the
//! index back in line.
//!
//! Lookups by id can be served from an optional read cache, refreshed on save and invalidated on
//! delete. Listing and searching always go to the stores. A lookup that raced a write drops the
//! entry it just cached, so a stale row never outlives the write that replaced it.

use crate::api::models::{priorities::PriorityDto, waivers::WaiverDto};
use crate::config::CacheConfig;
use crate::db::handlers::Repository;
use crate::db::models::{Entity, priorities::Priority, waivers::Waiver};
use crate::errors::Result;
use crate::search::SearchRepository;
use crate::types::EntityId;
use moka::future::Cache;
use std::fmt::Debug;
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, error, info, instrument};

pub type WaiverService = EntityService<Waiver, WaiverDto>;
pub type PriorityService = EntityService<Priority, PriorityDto>;

pub struct EntityService<E, D> {
    repository: Arc<dyn Repository<E>>,
    search: Arc<dyn SearchRepository<E>>,
    cache: Option<Cache<EntityId, E>>,
    /// Bumped by every save and delete before the cache is touched
    write_epoch: AtomicU64,
    _dto: PhantomData<fn() -> D>,
}

impl<E, D> EntityService<E, D>
where
    E: Entity + From<D>,
    D: From<E> + Debug + Send + Sync + 'static,
{
    pub fn new(repository: Arc<dyn Repository<E>>, search: Arc<dyn SearchRepository<E>>) -> Self {
        Self {
            repository,
            search,
            cache: None,
            write_epoch: AtomicU64::new(0),
            _dto: PhantomData,
        }
    }

    /// Serve `find_one` from a bounded read cache when `config.enabled` is set
    pub fn with_cache(mut self, config: &CacheConfig) -> Self {
        self.cache = config.enabled.then(|| {
            Cache::builder()
                .max_capacity(config.max_capacity)
                .time_to_live(config.time_to_live)
                .build()
        });
        self
    }

    /// Save a dto: insert when it has no id, update otherwise.
    ///
    /// Returns the persisted dto, carrying the assigned id on first save.
    #[instrument(skip(self, dto), fields(entity = E::NAME), err)]
    pub async fn save(&self, dto: D) -> Result<D> {
        debug!("Request to save {} : {:?}", E::NAME, dto);

        let entity = E::from(dto);
        let saved = self.repository.save(&entity).await?;

        if let (Some(cache), Some(id)) = (&self.cache, saved.id()) {
            self.write_epoch.fetch_add(1, Ordering::SeqCst);
            cache.insert(id, saved.clone()).await;
        }

        if let Err(e) = self.search.save(&saved).await {
            error!(id = ?saved.id(), "Saved {} but failed to index it: {}", E::NAME, e);
            return Err(e.into());
        }

        Ok(D::from(saved))
    }

    /// Get every entity, in the relational store's order
    #[instrument(skip(self), fields(entity = E::NAME), err)]
    pub async fn find_all(&self) -> Result<Vec<D>> {
        debug!("Request to get all {}", E::PLURAL);

        let entities = self.repository.find_all().await?;
        Ok(entities.into_iter().map(D::from).collect())
    }

    /// Get one entity by id. A missing entity is `None`, not an error.
    #[instrument(skip(self), fields(entity = E::NAME), err)]
    pub async fn find_one(&self, id: EntityId) -> Result<Option<D>> {
        debug!("Request to get {} : {}", E::NAME, id);

        if let Some(cache) = &self.cache {
            if let Some(cached) = cache.get(&id).await {
                debug!("Cache hit for {} {}", E::NAME, id);
                return Ok(Some(D::from(cached)));
            }
        }

        let epoch = self.write_epoch.load(Ordering::SeqCst);
        let found = self.repository.find_by_id(id).await?;
        if let (Some(cache), Some(entity)) = (&self.cache, &found) {
            cache.insert(id, entity.clone()).await;
            // A write landed while the row was in flight; it may be older than the write
            if self.write_epoch.load(Ordering::SeqCst) != epoch {
                debug!("{} {} written during lookup, not caching", E::NAME, id);
                cache.invalidate(&id).await;
            }
        }

        Ok(found.map(D::from))
    }

    /// Delete by id from the relational store, then from the index. Unknown ids are a no-op.
    #[instrument(skip(self), fields(entity = E::NAME), err)]
    pub async fn delete(&self, id: EntityId) -> Result<()> {
        debug!("Request to delete {} : {}", E::NAME, id);

        let removed = self.repository.delete_by_id(id).await?;
        if !removed {
            debug!("{} {} did not exist", E::NAME, id);
        }

        if let Some(cache) = &self.cache {
            self.write_epoch.fetch_add(1, Ordering::SeqCst);
            cache.invalidate(&id).await;
        }

        if let Err(e) = self.search.delete_by_id(id).await {
            error!(id, "Deleted {} but failed to remove it from the index: {}", E::NAME, e);
            return Err(e.into());
        }

        Ok(())
    }

    /// Run a query-string query against the search index, best match first
    #[instrument(skip(self), fields(entity = E::NAME), err)]
    pub async fn search(&self, query: &str) -> Result<Vec<D>> {
        debug!("Request to search {} for query {}", E::PLURAL, query);

        let hits = self.search.search(query).await?;
        Ok(hits.into_iter().map(D::from).collect())
    }

    /// Create the search index if it's missing
    pub async fn ensure_index(&self) -> Result<()> {
        self.search.ensure_index().await?;
        Ok(())
    }

    /// Write every relational row into the search index. Returns the number of documents written.
    #[instrument(skip(self), fields(entity = E::NAME), err)]
    pub async fn reindex(&self) -> Result<usize> {
        let entities = self.repository.find_all().await?;
        for entity in &entities {
            self.search.save(entity).await?;
        }

        info!("Reindexed {} {}", entities.len(), E::PLURAL);
        Ok(entities.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::handlers::InMemoryRepository;
    use crate::errors::Error;
    use crate::search::{InMemorySearchRepository, SearchError};
    use std::time::Duration;

    struct Fixture<E: Entity, D> {
        service: EntityService<E, D>,
        repository: Arc<InMemoryRepository<E>>,
        search: Arc<InMemorySearchRepository<E>>,
    }

    fn fixture<E, D>(cache: Option<&CacheConfig>) -> Fixture<E, D>
    where
        E: Entity + From<D>,
        D: From<E> + Debug + Send + Sync + 'static,
    {
        let repository = Arc::new(InMemoryRepository::<E>::new());
        let search = Arc::new(InMemorySearchRepository::<E>::new());
        let mut service = EntityService::new(repository.clone(), search.clone());
        if let Some(config) = cache {
            service = service.with_cache(config);
        }
        Fixture {
            service,
            repository,
            search,
        }
    }

    fn waiver(name: &str) -> WaiverDto {
        WaiverDto {
            id: None,
            name: name.to_string(),
        }
    }

    /// Index that rejects every write
    struct UnavailableIndex;

    #[async_trait::async_trait]
    impl<E: Entity> SearchRepository<E> for UnavailableIndex {
        async fn save(&self, _entity: &E) -> crate::search::Result<E> {
            Err(SearchError::Status {
                status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
                body: "cluster unavailable".to_string(),
            })
        }

        async fn delete_by_id(&self, _id: EntityId) -> crate::search::Result<()> {
            Err(SearchError::Status {
                status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
                body: "cluster unavailable".to_string(),
            })
        }

        async fn search(&self, _query: &str) -> crate::search::Result<Vec<E>> {
            Ok(Vec::new())
        }

        async fn ensure_index(&self) -> crate::search::Result<()> {
            Ok(())
        }
    }

    #[test_log::test(tokio::test)]
    async fn test_save_find_search_delete_scenario() {
        let f = fixture::<Waiver, WaiverDto>(None);

        let saved = f.service.save(waiver("Standard")).await.unwrap();
        let id = saved.id.expect("id should be assigned");
        assert_eq!(saved.name, "Standard");

        assert_eq!(f.service.find_one(id).await.unwrap(), Some(saved.clone()));
        assert!(f.service.search("Standard").await.unwrap().contains(&saved));

        f.service.delete(id).await.unwrap();
        assert_eq!(f.service.find_one(id).await.unwrap(), None);
        assert!(!f.service.search("Standard").await.unwrap().contains(&saved));
    }

    #[test_log::test(tokio::test)]
    async fn test_save_updates_existing_row_and_document() {
        let f = fixture::<Priority, PriorityDto>(None);

        let mut saved = f.service.save(PriorityDto { id: None, name: "High".to_string() }).await.unwrap();
        saved.name = "Urgent".to_string();
        let updated = f.service.save(saved.clone()).await.unwrap();

        assert_eq!(updated, saved);
        assert_eq!(f.service.find_all().await.unwrap(), vec![updated.clone()]);
        assert!(f.service.search("high").await.unwrap().is_empty());
        assert_eq!(f.service.search("urgent").await.unwrap(), vec![updated]);
    }

    #[test_log::test(tokio::test)]
    async fn test_find_all_returns_every_saved_entity() {
        let f = fixture::<Waiver, WaiverDto>(None);

        let a = f.service.save(waiver("Standard")).await.unwrap();
        let b = f.service.save(waiver("Elderly")).await.unwrap();
        let c = f.service.save(waiver("Student")).await.unwrap();

        assert_eq!(f.service.find_all().await.unwrap(), vec![a, b, c]);
    }

    #[test_log::test(tokio::test)]
    async fn test_delete_unknown_id_is_noop() {
        let f = fixture::<Waiver, WaiverDto>(None);
        f.service.delete(424242).await.unwrap();
        assert!(f.service.find_all().await.unwrap().is_empty());
    }

    #[test_log::test(tokio::test)]
    async fn test_invalid_query_is_reported() {
        let f = fixture::<Waiver, WaiverDto>(None);
        let err = f.service.search("name:(standard").await.unwrap_err();
        assert!(matches!(err, Error::Search(SearchError::InvalidQuery(_))));
    }

    #[test_log::test(tokio::test)]
    async fn test_index_failure_propagates_but_row_is_committed() {
        let repository = Arc::new(InMemoryRepository::<Waiver>::new());
        let service = WaiverService::new(repository.clone(), Arc::new(UnavailableIndex));

        let err = service.save(waiver("Standard")).await.unwrap_err();
        assert!(matches!(err, Error::Search(SearchError::Status { .. })));

        let rows = repository.find_all().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "Standard");

        let id = rows[0].id.unwrap();
        assert!(service.delete(id).await.is_err());
        assert!(repository.find_by_id(id).await.unwrap().is_none());
    }

    #[test_log::test(tokio::test)]
    async fn test_reindex_repairs_missing_documents() {
        let f = fixture::<Waiver, WaiverDto>(None);

        // Rows written behind the service's back never reached the index
        f.repository.save(&Waiver::new().name("Standard")).await.unwrap();
        f.repository.save(&Waiver::new().name("Premium")).await.unwrap();
        assert!(f.service.search("standard").await.unwrap().is_empty());

        assert_eq!(f.service.reindex().await.unwrap(), 2);
        assert_eq!(f.search.len(), 2);
        assert_eq!(f.service.search("standard").await.unwrap().len(), 1);
    }

    #[test_log::test(tokio::test)]
    async fn test_cache_serves_lookups_until_written() {
        let config = CacheConfig {
            enabled: true,
            max_capacity: 100,
            time_to_live: Duration::from_secs(60),
        };
        let f = fixture::<Waiver, WaiverDto>(Some(&config));

        let saved = f.service.save(waiver("Standard")).await.unwrap();
        let id = saved.id.unwrap();

        // Change the row directly; the cached copy still answers
        let mut changed = Waiver::from(saved.clone());
        changed.set_name("Changed");
        f.repository.save(&changed).await.unwrap();
        assert_eq!(f.service.find_one(id).await.unwrap().unwrap().name, "Standard");

        // A save through the service refreshes the entry
        let renamed = f.service.save(WaiverDto { id: Some(id), name: "Premium".to_string() }).await.unwrap();
        assert_eq!(f.service.find_one(id).await.unwrap(), Some(renamed));

        // A delete invalidates it
        f.service.delete(id).await.unwrap();
        assert_eq!(f.service.find_one(id).await.unwrap(), None);
    }

    /// Repository whose lookups stall between reading the row and returning it
    struct StallingRepository {
        inner: InMemoryRepository<Waiver>,
        read_done: tokio::sync::Notify,
        release: tokio::sync::Notify,
    }

    #[async_trait::async_trait]
    impl Repository<Waiver> for StallingRepository {
        async fn save(&self, entity: &Waiver) -> crate::db::errors::Result<Waiver> {
            self.inner.save(entity).await
        }

        async fn find_all(&self) -> crate::db::errors::Result<Vec<Waiver>> {
            self.inner.find_all().await
        }

        async fn find_by_id(&self, id: EntityId) -> crate::db::errors::Result<Option<Waiver>> {
            let found = self.inner.find_by_id(id).await?;
            self.read_done.notify_one();
            self.release.notified().await;
            Ok(found)
        }

        async fn delete_by_id(&self, id: EntityId) -> crate::db::errors::Result<bool> {
            self.inner.delete_by_id(id).await
        }
    }

    #[test_log::test(tokio::test)]
    async fn test_lookup_racing_delete_leaves_no_stale_entry() {
        let repository = Arc::new(StallingRepository {
            inner: InMemoryRepository::new(),
            read_done: tokio::sync::Notify::new(),
            release: tokio::sync::Notify::new(),
        });
        let saved = repository.inner.save(&Waiver::new().name("Standard")).await.unwrap();
        let id = saved.id.unwrap();

        let service = Arc::new(
            WaiverService::new(repository.clone(), Arc::new(InMemorySearchRepository::<Waiver>::new()))
                .with_cache(&CacheConfig::default()),
        );

        // The lookup reads the row, then the delete completes before it caches it
        let lookup = tokio::spawn({
            let service = service.clone();
            async move { service.find_one(id).await }
        });
        repository.read_done.notified().await;
        service.delete(id).await.unwrap();
        repository.release.notify_one();

        let stale = lookup.await.unwrap().unwrap();
        assert_eq!(stale.map(|w| w.name), Some("Standard".to_string()));

        // The next lookup goes back to the store instead of a resurrected entry
        repository.release.notify_one();
        assert_eq!(service.find_one(id).await.unwrap(), None);
    }

    #[test_log::test(tokio::test)]
    async fn test_disabled_cache_reads_through() {
        let config = CacheConfig {
            enabled: false,
            ..CacheConfig::default()
        };
        let f = fixture::<Waiver, WaiverDto>(Some(&config));

        let saved = f.service.save(waiver("Standard")).await.unwrap();
        let mut changed = Waiver::from(saved.clone());
        changed.set_name("Changed");
        f.repository.save(&changed).await.unwrap();

        assert_eq!(f.service.find_one(saved.id.unwrap()).await.unwrap().unwrap().name, "Changed");
    }
}
