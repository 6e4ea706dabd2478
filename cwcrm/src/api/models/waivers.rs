//! API request/response models for waivers.

use super::Dto;
use crate::db::models::waivers::Waiver;
use crate::types::EntityId;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A waiver as exchanged with clients.
///
/// `id` is absent when creating and required when updating.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct WaiverDto {
    /// Identifier assigned on first save
    #[serde(default)]
    #[schema(example = 1000)]
    pub id: Option<EntityId>,
    #[schema(example = "Standard")]
    pub name: String,
}

impl Dto for WaiverDto {
    fn id(&self) -> Option<EntityId> {
        self.id
    }
}

impl From<Waiver> for WaiverDto {
    fn from(waiver: Waiver) -> Self {
        Self {
            id: waiver.id,
            name: waiver.name,
        }
    }
}

impl From<WaiverDto> for Waiver {
    fn from(dto: WaiverDto) -> Self {
        Self {
            id: dto.id,
            name: dto.name,
        }
    }
}
