//! Base repository trait for database operations.

/// Contains the Repository trait.
///
/// A repository is the data access layer for one relational table. It provides methods for
/// saving, reading and deleting entities of a single type.
///
/// The trait is generic over the entity type, so one implementation (e.g. the PostgreSQL one)
/// serves every entity that implements [`Entity`].
use crate::db::{errors::Result, models::Entity};
use crate::types::EntityId;

/// Base repository trait providing common database operations
#[async_trait::async_trait]
pub trait Repository<E: Entity>: Send + Sync {
    /// Insert the entity when it has no id, otherwise update the row with that id.
    ///
    /// Returns the persisted entity, which always carries an id. An id that matches no row is
    /// treated like a missing one: a new row is inserted under a freshly generated id.
    async fn save(&self, entity: &E) -> Result<E>;

    /// Get every entity, in ascending id order
    async fn find_all(&self) -> Result<Vec<E>>;

    /// Get an entity by ID
    async fn find_by_id(&self, id: EntityId) -> Result<Option<E>>;

    /// Delete an entity by ID. Deleting an id that does not exist is not an error; the return
    /// value tells whether a row was removed.
    async fn delete_by_id(&self, id: EntityId) -> Result<bool>;
}
