//! OpenAPI documentation for the REST API.
//!
//! The entity handlers are generic over the entity type, so `utoipa` cannot derive a path from
//! them directly. The functions below exist solely to generate documentation for the concrete
//! waiver and priority routes mounted by [`crate::api::handlers::entities::entity_router`].

use crate::api::models::{SearchQuery, priorities::PriorityDto, waivers::WaiverDto};
use crate::errors::AlertBody;
use crate::types::EntityId;
use utoipa::OpenApi;

// ============================================================================
// Waivers
// ============================================================================

/// Create a waiver.
#[utoipa::path(
    post,
    path = "/api/waivers",
    tag = "waivers",
    request_body = WaiverDto,
    responses(
        (status = 201, description = "Waiver created. The `location` header points at the new resource.", body = WaiverDto),
        (status = 400, description = "The body already carries an id (`idexists`).", body = AlertBody),
    )
)]
#[allow(dead_code)]
fn create_waiver() {}

/// Update an existing waiver.
#[utoipa::path(
    put,
    path = "/api/waivers",
    tag = "waivers",
    request_body = WaiverDto,
    responses(
        (status = 200, description = "Waiver updated", body = WaiverDto),
        (status = 400, description = "The body carries no id (`idnull`).", body = AlertBody),
    )
)]
#[allow(dead_code)]
fn update_waiver() {}

/// List all waivers, ordered by id.
#[utoipa::path(
    get,
    path = "/api/waivers",
    tag = "waivers",
    responses((status = 200, description = "All waivers", body = [WaiverDto]))
)]
#[allow(dead_code)]
fn list_waivers() {}

/// Get a waiver by id.
#[utoipa::path(
    get,
    path = "/api/waivers/{id}",
    tag = "waivers",
    params(("id" = EntityId, Path, description = "Waiver id")),
    responses(
        (status = 200, description = "The waiver", body = WaiverDto),
        (status = 404, description = "No waiver with this id"),
    )
)]
#[allow(dead_code)]
fn get_waiver() {}

/// Delete a waiver. Deleting an unknown id succeeds.
#[utoipa::path(
    delete,
    path = "/api/waivers/{id}",
    tag = "waivers",
    params(("id" = EntityId, Path, description = "Waiver id")),
    responses((status = 200, description = "Waiver deleted"))
)]
#[allow(dead_code)]
fn delete_waiver() {}

/// Search waivers with a query string, e.g. `name:standard OR elderly`.
#[utoipa::path(
    get,
    path = "/api/_search/waivers",
    tag = "waivers",
    params(SearchQuery),
    responses(
        (status = 200, description = "Matching waivers, best match first", body = [WaiverDto]),
        (status = 400, description = "The query could not be parsed"),
    )
)]
#[allow(dead_code)]
fn search_waivers() {}

// ============================================================================
// Priorities
// ============================================================================

/// Create a priority.
#[utoipa::path(
    post,
    path = "/api/priorities",
    tag = "priorities",
    request_body = PriorityDto,
    responses(
        (status = 201, description = "Priority created. The `location` header points at the new resource.", body = PriorityDto),
        (status = 400, description = "The body already carries an id (`idexists`).", body = AlertBody),
    )
)]
#[allow(dead_code)]
fn create_priority() {}

/// Update an existing priority.
#[utoipa::path(
    put,
    path = "/api/priorities",
    tag = "priorities",
    request_body = PriorityDto,
    responses(
        (status = 200, description = "Priority updated", body = PriorityDto),
        (status = 400, description = "The body carries no id (`idnull`).", body = AlertBody),
    )
)]
#[allow(dead_code)]
fn update_priority() {}

/// List all priorities, ordered by id.
#[utoipa::path(
    get,
    path = "/api/priorities",
    tag = "priorities",
    responses((status = 200, description = "All priorities", body = [PriorityDto]))
)]
#[allow(dead_code)]
fn list_priorities() {}

/// Get a priority by id.
#[utoipa::path(
    get,
    path = "/api/priorities/{id}",
    tag = "priorities",
    params(("id" = EntityId, Path, description = "Priority id")),
    responses(
        (status = 200, description = "The priority", body = PriorityDto),
        (status = 404, description = "No priority with this id"),
    )
)]
#[allow(dead_code)]
fn get_priority() {}

/// Delete a priority. Deleting an unknown id succeeds.
#[utoipa::path(
    delete,
    path = "/api/priorities/{id}",
    tag = "priorities",
    params(("id" = EntityId, Path, description = "Priority id")),
    responses((status = 200, description = "Priority deleted"))
)]
#[allow(dead_code)]
fn delete_priority() {}

/// Search priorities with a query string.
#[utoipa::path(
    get,
    path = "/api/_search/priorities",
    tag = "priorities",
    params(SearchQuery),
    responses(
        (status = 200, description = "Matching priorities, best match first", body = [PriorityDto]),
        (status = 400, description = "The query could not be parsed"),
    )
)]
#[allow(dead_code)]
fn search_priorities() {}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "cwcrm API",
        description = "CRUD and search for CRM reference data. Writes answer with `x-cwcrmapp-alert` and `x-cwcrmapp-params` headers."
    ),
    paths(
        create_waiver,
        update_waiver,
        list_waivers,
        get_waiver,
        delete_waiver,
        search_waivers,
        create_priority,
        update_priority,
        list_priorities,
        get_priority,
        delete_priority,
        search_priorities,
    ),
    components(schemas(WaiverDto, PriorityDto, AlertBody)),
    tags(
        (name = "waivers", description = "Fee waivers"),
        (name = "priorities", description = "Priority levels"),
    )
)]
pub struct ApiDoc;
