//! API request/response models for priorities.

use super::Dto;
use crate::db::models::priorities::Priority;
use crate::types::EntityId;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A priority as exchanged with clients.
///
/// `id` is absent when creating and required when updating.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PriorityDto {
    /// Identifier assigned on first save
    #[serde(default)]
    #[schema(example = 1000)]
    pub id: Option<EntityId>,
    #[schema(example = "High")]
    pub name: String,
}

impl Dto for PriorityDto {
    fn id(&self) -> Option<EntityId> {
        self.id
    }
}

impl From<Priority> for PriorityDto {
    fn from(priority: Priority) -> Self {
        Self {
            id: priority.id,
            name: priority.name,
        }
    }
}

impl From<PriorityDto> for Priority {
    fn from(dto: PriorityDto) -> Self {
        Self {
            id: dto.id,
            name: dto.name,
        }
    }
}
