//! HTTP request handlers for all API endpoints.
//!
//! Every entity exposes the same CRUD and search surface, so the handlers are written once,
//! generically, in [`entities`] and mounted per entity by [`entities::entity_router`].
//! Each handler is responsible for:
//! - Request validation and deserialization
//! - Business logic execution via the entity's [`crate::service::EntityService`]
//! - Response serialization, including alert headers on writes

pub mod entities;
