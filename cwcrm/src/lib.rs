//! # cwcrm: CRM reference data service
//!
//! `cwcrm` serves the reference data of a CRM (fee waivers, priority levels) over a REST API.
//! Every record lives in a relational store and is mirrored into a full-text search index, so
//! clients can both address records by id and find them with query-string searches.
//!
//! ## Architecture
//!
//! The HTTP layer is built on [Axum](https://github.com/tokio-rs/axum). PostgreSQL holds the
//! records, either an external server or an embedded instance (with the `embedded-db` feature);
//! for development and tests everything can also run in process memory. Search goes to
//! Elasticsearch, or to an in-process index.
//!
//! ### Request Flow
//!
//! A request to `/api/waivers` reaches a generic handler in [`api::handlers::entities`], which
//! validates the body and calls the waiver [`service::EntityService`]. The service converts the
//! DTO to an entity, writes it through the relational [`db::handlers::Repository`], and once the
//! row is committed mirrors it into the [`search::SearchRepository`]. Writes answer with alert
//! headers (`x-cwcrmapp-alert`, `x-cwcrmapp-params`) a client can show to the user.
//!
//! ### Core Components
//!
//! The **API layer** ([`api`]) exposes the same six routes for every entity: create, update,
//! list, get, delete and search.
//!
//! The **service layer** ([`service`]) pairs each entity's repository with its search index and
//! owns the write ordering between the two.
//!
//! The **database layer** ([`db`]) uses the repository pattern. A single generic repository per
//! backend serves every entity; the entity describes its table and columns.
//!
//! The **search layer** ([`search`]) translates query strings for Elasticsearch, or evaluates them
//! itself for the in-process index.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use cwcrm::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = cwcrm::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     cwcrm::telemetry::init_telemetry(config.enable_otel_export)?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     })
//!     .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Database Setup
//!
//! Migrations run automatically on startup. To run them by hand:
//!
//! ```no_run
//! # use sqlx::PgPool;
//! # async fn example(pool: PgPool) -> Result<(), sqlx::migrate::MigrateError> {
//! cwcrm::migrator().run(&pool).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration
//!
//! See the [`config`] module for configuration options.

pub mod api;
pub mod config;
pub mod db;
pub mod errors;
mod openapi;
pub mod search;
pub mod service;
pub mod telemetry;
pub mod types;

#[cfg(test)]
pub mod test_utils;

use crate::api::handlers::entities::entity_router;
use crate::api::models::Dto;
use crate::config::{CorsOrigin, DatabaseConfig, PoolSettings, SearchBackend};
use crate::db::handlers::{InMemoryRepository, PostgresRepository, Repository};
use crate::db::models::Entity;
use crate::openapi::ApiDoc;
use crate::search::{ElasticsearchSearchRepository, InMemorySearchRepository, SearchRepository};
use crate::service::{EntityService, PriorityService, WaiverService};
use anyhow::Context;
use axum::http::{self, HeaderName, HeaderValue};
use axum::{Json, Router, routing::get};
use bon::Builder;
pub use config::Config;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

pub use types::EntityId;

/// Application state shared by the router and startup tasks.
///
/// # Example
///
/// ```ignore
/// let state = AppState::builder()
///     .config(config)
///     .waivers(Arc::new(waivers))
///     .priorities(Arc::new(priorities))
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub config: Config,
    pub waivers: Arc<WaiverService>,
    pub priorities: Arc<PriorityService>,
}

/// Get the cwcrm database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

fn pool_options(settings: &PoolSettings) -> PgPoolOptions {
    let non_zero = |secs: u64| (secs > 0).then(|| Duration::from_secs(secs));

    PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs))
        .idle_timeout(non_zero(settings.idle_timeout_secs))
        .max_lifetime(non_zero(settings.max_lifetime_secs))
}

/// Setup the relational store and run migrations.
/// Returns: (embedded_db, pool), where the pool is `None` for the in-memory store
#[instrument(skip_all)]
async fn setup_database(config: &Config) -> anyhow::Result<(Option<db::embedded::EmbeddedDatabase>, Option<PgPool>)> {
    let (embedded_db, database_url) = match &config.database {
        DatabaseConfig::Memory => {
            info!("Using in-memory store: data will be lost on shutdown");
            return Ok((None, None));
        }
        DatabaseConfig::Embedded { data_dir, persistent, .. } => {
            info!("Starting with embedded database (persistent: {})", persistent);
            #[cfg(feature = "embedded-db")]
            {
                let embedded_db = db::embedded::EmbeddedDatabase::start(data_dir.clone(), *persistent).await?;
                let url = embedded_db.connection_string().to_string();
                (Some(embedded_db), url)
            }
            #[cfg(not(feature = "embedded-db"))]
            {
                let _ = data_dir;
                anyhow::bail!(
                    "Embedded database is configured but the feature is not enabled. \
                     Rebuild with --features embedded-db to use embedded database."
                );
            }
        }
        DatabaseConfig::External { url, .. } => {
            info!("Using external database");
            (None::<db::embedded::EmbeddedDatabase>, url.clone())
        }
    };

    let settings = config.database.pool_settings().cloned().unwrap_or_default();
    let pool = pool_options(&settings)
        .connect(&database_url)
        .await
        .context("Failed to connect to the database")?;
    migrator().run(&pool).await.context("Failed to run database migrations")?;

    Ok((embedded_db, Some(pool)))
}

/// Wire one entity's service to the configured stores
fn entity_service<E, D>(config: &Config, pool: Option<&PgPool>) -> anyhow::Result<EntityService<E, D>>
where
    E: Entity + From<D>,
    D: Dto + From<E>,
{
    let repository: Arc<dyn Repository<E>> = match pool {
        Some(pool) => Arc::new(PostgresRepository::<E>::new(pool.clone())),
        None => Arc::new(InMemoryRepository::<E>::new()),
    };

    let search: Arc<dyn SearchRepository<E>> = match &config.search.backend {
        SearchBackend::Elasticsearch(elasticsearch) => Arc::new(
            ElasticsearchSearchRepository::<E>::new(elasticsearch)
                .with_context(|| format!("Failed to create the {} search client", E::NAME))?,
        ),
        SearchBackend::Memory => Arc::new(InMemorySearchRepository::<E>::new()),
    };

    Ok(EntityService::new(repository, search).with_cache(&config.cache))
}

/// Create missing search indices, then rebuild them from the database if configured to
async fn prepare_search<E, D>(service: &EntityService<E, D>, reindex: bool) -> anyhow::Result<()>
where
    E: Entity + From<D>,
    D: Dto + From<E>,
{
    service
        .ensure_index()
        .await
        .with_context(|| format!("Failed to prepare the {} search index", E::NAME))?;

    if reindex {
        service
            .reindex()
            .await
            .with_context(|| format!("Failed to reindex {}", E::PLURAL))?;
    }

    Ok(())
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let allow_origin = if config.cors.allowed_origins.iter().any(|origin| matches!(origin, CorsOrigin::Wildcard)) {
        AllowOrigin::any()
    } else {
        let mut origins = Vec::new();
        for origin in &config.cors.allowed_origins {
            if let CorsOrigin::Url(url) = origin {
                origins.push(url.origin().ascii_serialization().parse::<HeaderValue>()?);
            }
        }
        AllowOrigin::list(origins)
    };

    let exposed = config
        .cors
        .exposed_headers
        .iter()
        .map(|name| name.parse::<HeaderName>())
        .collect::<Result<Vec<_>, _>>()?;

    let mut cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_credentials(config.cors.allow_credentials)
        .allow_methods([http::Method::GET, http::Method::POST, http::Method::PUT, http::Method::DELETE])
        .allow_headers([http::header::CONTENT_TYPE, http::header::AUTHORIZATION])
        .expose_headers(exposed);

    if let Some(max_age) = config.cors.max_age {
        cors = cors.max_age(Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the main application router with all endpoints and middleware.
///
/// - Entity routes for waivers and priorities
/// - OpenAPI document at `/api/openapi.json` and its rendering at `/api/docs`
/// - CORS configuration
/// - Tracing middleware
#[instrument(skip_all)]
pub fn build_router(state: &AppState) -> anyhow::Result<Router> {
    let router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .route("/api/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .merge(entity_router("waivers", state.waivers.clone()))
        .merge(entity_router("priorities", state.priorities.clone()))
        .merge(Scalar::with_url("/api/docs", ApiDoc::openapi()));

    let router = router.layer(create_cors_layer(&state.config)?).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// The assembled service.
///
/// 1. **Create**: [`Application::new`] connects the stores, runs migrations and prepares the
///    search indices
/// 2. **Serve**: [`Application::serve`] binds to a TCP port and starts handling requests
/// 3. **Shutdown**: When the shutdown signal is received, closes the pool, flushes telemetry and
///    stops the embedded database
pub struct Application {
    router: Router,
    config: Config,
    pool: Option<PgPool>,
    _embedded_db: Option<db::embedded::EmbeddedDatabase>,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting cwcrm with configuration: {:#?}", config);

        let (_embedded_db, pool) = setup_database(&config).await?;

        let waivers: WaiverService = entity_service(&config, pool.as_ref())?;
        let priorities: PriorityService = entity_service(&config, pool.as_ref())?;

        let reindex = config.search.reindex_on_startup;
        prepare_search(&waivers, reindex).await?;
        prepare_search(&priorities, reindex).await?;

        let state = AppState::builder()
            .config(config.clone())
            .waivers(Arc::new(waivers))
            .priorities(Arc::new(priorities))
            .build();

        let router = build_router(&state)?;

        Ok(Self {
            router,
            config,
            pool,
            _embedded_db,
        })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!("cwcrm listening on http://{}, available at http://localhost:{}", bind_addr, self.config.port);

        axum::serve(listener, self.router).with_graceful_shutdown(shutdown).await?;

        if let Some(pool) = self.pool {
            info!("Closing database connections...");
            pool.close().await;
        }

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        if let Some(embedded_db) = self._embedded_db {
            info!("Shutting down embedded database...");
            embedded_db.stop().await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::api::models::waivers::WaiverDto;
    use crate::test_utils::{create_test_app, create_test_config};
    use sqlx::ConnectOptions;

    #[test_log::test(tokio::test)]
    async fn test_healthz() {
        let server = create_test_app().await;

        let response = server.get("/healthz").await;

        response.assert_status_ok();
        response.assert_text("OK");
    }

    #[test_log::test(tokio::test)]
    async fn test_openapi_json_endpoint() {
        let server = create_test_app().await;

        let response = server.get("/api/openapi.json").await;

        response.assert_status_ok();
        let doc: serde_json::Value = response.json();
        assert!(doc["openapi"].as_str().is_some_and(|v| v.starts_with("3.")));
        assert!(doc["paths"]["/api/waivers"].is_object());
        assert!(doc["paths"]["/api/_search/priorities"].is_object());
    }

    #[test_log::test(tokio::test)]
    async fn test_docs_page() {
        let server = create_test_app().await;

        let response = server.get("/api/docs").await;

        response.assert_status_ok();
        let content_type = response.header("content-type");
        assert!(content_type.to_str().unwrap().starts_with("text/html"));
    }

    #[test_log::test(tokio::test)]
    async fn test_cors_exposes_alert_headers() {
        let server = create_test_app().await;

        let response = server
            .post("/api/waivers")
            .add_header("origin", "http://localhost:9000")
            .json(&serde_json::json!({ "name": "Standard" }))
            .await;

        response.assert_status(http::StatusCode::CREATED);
        assert_eq!(response.header("access-control-allow-origin"), "http://localhost:9000");
        let exposed = response.header("access-control-expose-headers");
        let exposed = exposed.to_str().unwrap();
        assert!(exposed.contains("x-cwcrmapp-alert"));
        assert!(exposed.contains("location"));
    }

    #[test]
    fn test_create_cors_layer_rejects_bad_header_names() {
        let mut config = create_test_config();
        config.cors.exposed_headers = vec!["not a header".to_string()];

        assert!(create_cors_layer(&config).is_err());
    }

    #[test]
    fn test_create_cors_layer_accepts_wildcard_without_credentials() {
        let mut config = create_test_config();
        config.cors.allowed_origins = vec![CorsOrigin::Wildcard];
        config.cors.allow_credentials = false;

        assert!(create_cors_layer(&config).is_ok());
    }

    #[test]
    fn test_pool_options_zero_disables_timeouts() {
        let options = pool_options(&PoolSettings {
            max_connections: 3,
            min_connections: 1,
            acquire_timeout_secs: 5,
            idle_timeout_secs: 0,
            max_lifetime_secs: 60,
        });

        assert_eq!(options.get_max_connections(), 3);
        assert_eq!(options.get_min_connections(), 1);
        assert_eq!(options.get_acquire_timeout(), Duration::from_secs(5));
        assert_eq!(options.get_idle_timeout(), None);
        assert_eq!(options.get_max_lifetime(), Some(Duration::from_secs(60)));
    }

    #[sqlx::test]
    #[ignore = "requires a PostgreSQL server reachable through DATABASE_URL"]
    async fn test_application_integration(pool: PgPool) {
        let mut config = create_test_config();
        config.database = DatabaseConfig::External {
            url: pool.connect_options().to_url_lossy().to_string(),
            pool: PoolSettings {
                max_connections: 2,
                ..Default::default()
            },
        };

        let server = Application::new(config).await.expect("Application::new should succeed").into_test_server();

        let created: WaiverDto = server
            .post("/api/waivers")
            .json(&serde_json::json!({ "name": "Standard" }))
            .await
            .json();
        let id = created.id.expect("id should be assigned");
        assert!(id >= 1000);

        let fetched: WaiverDto = server.get(&format!("/api/waivers/{id}")).await.json();
        assert_eq!(fetched, created);
    }

    #[sqlx::test]
    #[ignore = "requires a PostgreSQL server reachable through DATABASE_URL"]
    async fn test_reindex_on_startup_restores_memory_index(pool: PgPool) {
        let mut config = create_test_config();
        config.database = DatabaseConfig::External {
            url: pool.connect_options().to_url_lossy().to_string(),
            pool: PoolSettings::default(),
        };
        config.search.reindex_on_startup = true;

        let first = Application::new(config.clone()).await.unwrap().into_test_server();
        first
            .post("/api/waivers")
            .json(&serde_json::json!({ "name": "Elderly" }))
            .await
            .assert_status(http::StatusCode::CREATED);

        // A fresh process starts with an empty in-memory index
        let second = Application::new(config).await.unwrap().into_test_server();
        let found: Vec<WaiverDto> = second.get("/api/_search/waivers").add_query_param("query", "elderly").await.json();
        assert_eq!(found.len(), 1);
    }
}
