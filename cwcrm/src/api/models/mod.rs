//! API request and response data models.
//!
//! This module contains the data structures used for HTTP request deserialization
//! and response serialization. These models define the public API contract.
//!
//! # Design Principles
//!
//! - **Separation of Concerns**: API models (DTOs) are distinct from database models,
//!   allowing independent evolution of API and storage representations
//! - **Mapping**: Each DTO converts to and from its database model with `From`, field for field
//! - **OpenAPI**: All models are annotated with `utoipa` for automatic API docs
//!
//! # Example
//!
//! ```ignore
//! use cwcrm::api::models::waivers::WaiverDto;
//! use cwcrm::db::models::waivers::Waiver;
//!
//! let dto = WaiverDto { id: None, name: "Standard".to_string() };
//! let waiver = Waiver::from(dto);
//! ```

use crate::types::EntityId;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::fmt::Debug;
use utoipa::IntoParams;

pub mod priorities;
pub mod waivers;

/// A transfer object exchanged over the REST API
pub trait Dto: Debug + Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// `None` for a dto that was never persisted
    fn id(&self) -> Option<EntityId>;
}

/// Query parameters for the search endpoints
#[derive(Debug, Deserialize, IntoParams)]
pub struct SearchQuery {
    /// Query-string query, e.g. `name:stand*` or `standard OR premium`
    pub query: String,
}
