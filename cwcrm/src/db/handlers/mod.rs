//! Repository implementations for database access.
//!
//! Repositories implement the generic [`Repository`] trait once per storage backend rather
//! than once per entity:
//!
//! - [`PostgresRepository`]: SQLx over a PostgreSQL pool, SQL derived from the entity's columns
//! - [`InMemoryRepository`]: ordered map with an id sequence, for development and tests
//!
//! # Common Pattern
//!
//! ```ignore
//! use cwcrm::db::handlers::{PostgresRepository, Repository};
//! use cwcrm::db::models::waivers::Waiver;
//!
//! async fn example(pool: sqlx::PgPool) -> Result<(), Box<dyn std::error::Error>> {
//!     let repo = PostgresRepository::<Waiver>::new(pool);
//!
//!     let saved = repo.save(&Waiver::new().name("Standard")).await?;
//!     let found = repo.find_by_id(saved.id.unwrap()).await?;
//!     assert!(found.is_some());
//!     Ok(())
//! }
//! ```

pub mod in_memory;
pub mod postgres;
pub mod repository;

pub use in_memory::InMemoryRepository;
pub use postgres::PostgresRepository;
pub use repository::Repository;
