//! CRUD and search handlers shared by every entity.
//!
//! Each entity gets the same routes, mounted by [`entity_router`] under its collection name:
//!
//! - `POST /api/{collection}`: create (the body must not carry an id)
//! - `PUT /api/{collection}`: update (the body must carry an id)
//! - `GET /api/{collection}`: list
//! - `GET /api/{collection}/{id}`: get one
//! - `DELETE /api/{collection}/{id}`: delete
//! - `GET /api/_search/{collection}?query=`: query-string search
//!
//! Writes answer with alert headers (see [`crate::api::headers`]).

use crate::api::headers;
use crate::api::models::{Dto, SearchQuery};
use crate::db::models::Entity;
use crate::errors::{Error, Result};
use crate::service::EntityService;
use crate::types::{EntityId, Operation};
use axum::{
    Json, Router,
    extract::{OriginalUri, Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    routing::get,
};
use std::sync::Arc;

type ServiceState<E, D> = State<Arc<EntityService<E, D>>>;

fn assigned_id<E: Entity, D: Dto>(dto: &D) -> Result<EntityId> {
    dto.id().ok_or_else(|| Error::Internal {
        operation: format!("assign an id to {}", E::NAME),
    })
}

#[tracing::instrument(skip_all, fields(entity = E::NAME))]
pub async fn create<E, D>(
    State(service): ServiceState<E, D>,
    OriginalUri(uri): OriginalUri,
    Json(dto): Json<D>,
) -> Result<(StatusCode, HeaderMap, Json<D>)>
where
    E: Entity + From<D>,
    D: Dto + From<E>,
{
    if dto.id().is_some() {
        return Err(Error::bad_request_alert(
            format!("A new {} cannot already have an ID", E::KEY),
            E::KEY,
            "idexists",
        ));
    }

    let saved = service.save(dto).await?;
    let id = assigned_id::<E, D>(&saved)?;

    let mut response_headers = headers::entity_alert(Operation::Create, E::KEY, id);
    let location = format!("{}/{id}", uri.path().trim_end_matches('/'));
    if let Ok(location) = HeaderValue::from_str(&location) {
        response_headers.insert(header::LOCATION, location);
    }

    Ok((StatusCode::CREATED, response_headers, Json(saved)))
}

#[tracing::instrument(skip_all, fields(entity = E::NAME))]
pub async fn update<E, D>(State(service): ServiceState<E, D>, Json(dto): Json<D>) -> Result<(HeaderMap, Json<D>)>
where
    E: Entity + From<D>,
    D: Dto + From<E>,
{
    if dto.id().is_none() {
        return Err(Error::bad_request_alert("Invalid id", E::KEY, "idnull"));
    }

    let saved = service.save(dto).await?;
    let id = assigned_id::<E, D>(&saved)?;

    Ok((headers::entity_alert(Operation::Update, E::KEY, id), Json(saved)))
}

#[tracing::instrument(skip_all, fields(entity = E::NAME))]
pub async fn list<E, D>(State(service): ServiceState<E, D>) -> Result<Json<Vec<D>>>
where
    E: Entity + From<D>,
    D: Dto + From<E>,
{
    Ok(Json(service.find_all().await?))
}

#[tracing::instrument(skip_all, fields(entity = E::NAME))]
pub async fn get_one<E, D>(State(service): ServiceState<E, D>, Path(id): Path<EntityId>) -> Result<Json<D>>
where
    E: Entity + From<D>,
    D: Dto + From<E>,
{
    service.find_one(id).await?.map(Json).ok_or_else(|| Error::NotFound {
        resource: E::NAME.to_string(),
        id: id.to_string(),
    })
}

#[tracing::instrument(skip_all, fields(entity = E::NAME))]
pub async fn delete<E, D>(State(service): ServiceState<E, D>, Path(id): Path<EntityId>) -> Result<(StatusCode, HeaderMap)>
where
    E: Entity + From<D>,
    D: Dto + From<E>,
{
    service.delete(id).await?;
    Ok((StatusCode::OK, headers::entity_alert(Operation::Delete, E::KEY, id)))
}

#[tracing::instrument(skip_all, fields(entity = E::NAME))]
pub async fn search<E, D>(State(service): ServiceState<E, D>, Query(params): Query<SearchQuery>) -> Result<Json<Vec<D>>>
where
    E: Entity + From<D>,
    D: Dto + From<E>,
{
    Ok(Json(service.search(&params.query).await?))
}

/// Routes for one entity collection, e.g. `entity_router("waivers", waivers)`
pub fn entity_router<E, D>(collection: &str, service: Arc<EntityService<E, D>>) -> Router
where
    E: Entity + From<D>,
    D: Dto + From<E>,
{
    Router::new()
        .route(
            &format!("/api/{collection}"),
            get(list::<E, D>).post(create::<E, D>).put(update::<E, D>),
        )
        .route(&format!("/api/{collection}/{{id}}"), get(get_one::<E, D>).delete(delete::<E, D>))
        .route(&format!("/api/_search/{collection}"), get(search::<E, D>))
        .with_state(service)
}
