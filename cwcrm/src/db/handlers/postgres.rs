//! PostgreSQL repository shared by every entity.
//!
//! The SQL is assembled from [`Entity::TABLE`] and [`Entity::COLUMNS`], so each entity only has
//! to describe its columns. Ids come from the `sequence_generator` sequence created by the initial
//! migration. Writes run inside their own transaction; reads go straight to the pool.

use crate::db::{errors::Result, handlers::repository::Repository, models::Entity};
use crate::types::EntityId;
use sqlx::{PgConnection, PgPool};
use std::marker::PhantomData;
use tracing::instrument;

pub struct PostgresRepository<E> {
    pool: PgPool,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> PostgresRepository<E> {
    /// Create a new repository instance on top of a connection pool
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            _entity: PhantomData,
        }
    }

    /// `id, col1, col2, ...`
    fn select_list() -> String {
        std::iter::once("id").chain(E::COLUMNS.iter().copied()).collect::<Vec<_>>().join(", ")
    }

    async fn insert(conn: &mut PgConnection, entity: &E) -> Result<E> {
        let placeholders = (1..=E::COLUMNS.len()).map(|i| format!("${i}")).collect::<Vec<_>>().join(", ");
        let sql = format!(
            "INSERT INTO {table} (id, {columns}) VALUES (nextval('sequence_generator'), {placeholders}) RETURNING {select}",
            table = E::TABLE,
            columns = E::COLUMNS.join(", "),
            select = Self::select_list(),
        );

        let inserted = entity.bind_columns(sqlx::query_as::<_, E>(&sql)).fetch_one(&mut *conn).await?;
        Ok(inserted)
    }

    async fn update(conn: &mut PgConnection, id: EntityId, entity: &E) -> Result<Option<E>> {
        // $1 is the id, columns start at $2
        let assignments = E::COLUMNS
            .iter()
            .enumerate()
            .map(|(i, column)| format!("{column} = ${}", i + 2))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE {table} SET {assignments} WHERE id = $1 RETURNING {select}",
            table = E::TABLE,
            select = Self::select_list(),
        );

        let updated = entity
            .bind_columns(sqlx::query_as::<_, E>(&sql).bind(id))
            .fetch_optional(&mut *conn)
            .await?;
        Ok(updated)
    }
}

#[async_trait::async_trait]
impl<E: Entity> Repository<E> for PostgresRepository<E> {
    #[instrument(skip(self, entity), fields(entity = E::NAME, id = ?entity.id()), err)]
    async fn save(&self, entity: &E) -> Result<E> {
        let mut tx = self.pool.begin().await?;

        let saved = match entity.id() {
            Some(id) => match Self::update(&mut tx, id, entity).await? {
                Some(updated) => updated,
                None => Self::insert(&mut tx, entity).await?,
            },
            None => Self::insert(&mut tx, entity).await?,
        };

        tx.commit().await?;
        Ok(saved)
    }

    #[instrument(skip(self), fields(entity = E::NAME), err)]
    async fn find_all(&self) -> Result<Vec<E>> {
        let sql = format!("SELECT {} FROM {} ORDER BY id", Self::select_list(), E::TABLE);
        let entities = sqlx::query_as::<_, E>(&sql).fetch_all(&self.pool).await?;

        Ok(entities)
    }

    #[instrument(skip(self), fields(entity = E::NAME), err)]
    async fn find_by_id(&self, id: EntityId) -> Result<Option<E>> {
        let sql = format!("SELECT {} FROM {} WHERE id = $1", Self::select_list(), E::TABLE);
        let entity = sqlx::query_as::<_, E>(&sql).bind(id).fetch_optional(&self.pool).await?;

        Ok(entity)
    }

    #[instrument(skip(self), fields(entity = E::NAME), err)]
    async fn delete_by_id(&self, id: EntityId) -> Result<bool> {
        let sql = format!("DELETE FROM {} WHERE id = $1", E::TABLE);

        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(&sql).bind(id).execute(&mut *tx).await?;
        tx.commit().await?;

        Ok(result.rows_affected() > 0)
    }
}
