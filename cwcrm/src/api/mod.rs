//! API layer for HTTP request handling and data models.
//!
//! This module contains the REST API implementation, organized into:
//!
//! - **[`handlers`]**: Axum route handlers for all API endpoints
//! - **[`models`]**: Request/response data structures (DTOs) for API communication
//! - **[`headers`]**: Alert headers returned alongside writes and rejected requests
//!
//! # API Structure
//!
//! - **Waivers** (`/api/waivers`, `/api/_search/waivers`)
//! - **Priorities** (`/api/priorities`, `/api/_search/priorities`)
//!
//! # OpenAPI Documentation
//!
//! All endpoints are documented with OpenAPI annotations using `utoipa`.
//! API documentation is available at `/api/docs` when the server is running.

pub mod handlers;
pub mod headers;
pub mod models;
