//! Test helpers: a fully wired application backed by in-process stores.

use crate::config::{CacheConfig, Config, DatabaseConfig, SearchBackend, SearchConfig};
use axum_test::TestServer;

/// Configuration for an application that needs no external services
pub fn create_test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        database: DatabaseConfig::Memory,
        search: SearchConfig {
            backend: SearchBackend::Memory,
            reindex_on_startup: false,
        },
        cache: CacheConfig::default(),
        ..Default::default()
    }
}

pub async fn create_test_app() -> TestServer {
    crate::Application::new(create_test_config())
        .await
        .expect("Failed to create application")
        .into_test_server()
}
