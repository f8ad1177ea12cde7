//! HTTP API routes and handlers.
//!
//! - `health` - Service health checks
//! - `trail` - Recorded points
//! - `status` - Recorder connection state and counters
//! - `error` - API error types
//! - `openapi` - OpenAPI specification generation

use axum::routing::get;
use axum::Router;

use crate::state::SharedState;

pub mod error;
pub mod health;
pub mod openapi;
pub mod status;
pub mod trail;

pub use error::{ApiError, ApiResult, ErrorResponse};
pub use openapi::get_openapi_json;

/// Creates the combined API router with all endpoints.
///
/// # Route Structure
///
/// ```text
/// /health                - Health check
/// /api
/// ├── /trail             - All recorded points
/// ├── /status            - Recorder status
/// └── /openapi.json      - OpenAPI specification
/// ```
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .nest("/health", health::router())
        .nest(
            "/api",
            Router::new()
                .nest("/trail", trail::router())
                .nest("/status", status::router())
                .route("/openapi.json", get(openapi::get_openapi_spec)),
        )
        .with_state(state)
}
