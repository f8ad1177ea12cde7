//! OpenAPI specification generation for the crumbtrail API.

use axum::Json;
use crumbtrail_core::{AccuracyTier, ConnectionState, Coordinate, Point, RecorderStatus};
use utoipa::OpenApi;

use super::error::ErrorResponse;
use super::health::HealthResponse;
use super::status::StatusResponse;
use super::trail::TrailResponse;

/// Serve the OpenAPI specification as JSON at `/api/openapi.json`.
pub async fn get_openapi_spec() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Returns the OpenAPI specification as a pretty-printed string.
///
/// # Errors
///
/// Returns an error if the document cannot be serialized.
pub fn get_openapi_json() -> serde_json::Result<String> {
    ApiDoc::openapi().to_pretty_json()
}

/// Main OpenAPI document structure for crumbtrail.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "crumbtrail API",
        version = "0.1.0",
        description = r#"
# crumbtrail API

crumbtrail records the device position at a fixed cadence and keeps every
fix in a durable, append-only trail.

- **Trail**: all recorded points, oldest first
- **Status**: connection state of the position source and sample counters
"#
    ),
    paths(
        super::health::health_check,
        super::trail::get_trail,
        super::status::get_status
    ),
    components(
        schemas(
            ErrorResponse,
            HealthResponse,
            TrailResponse,
            StatusResponse,
            Point,
            Coordinate,
            ConnectionState,
            AccuracyTier,
            RecorderStatus
        )
    ),
    tags(
        (name = "trail", description = "Recorded positions"),
        (name = "system", description = "Service and recorder health")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_spec_generation() {
        let spec = ApiDoc::openapi();
        assert_eq!(spec.info.title, "crumbtrail API");
        assert!(spec.paths.paths.contains_key("/api/trail"));
        assert!(spec.paths.paths.contains_key("/api/status"));
    }

    #[test]
    fn test_openapi_json_serialization() {
        let json = get_openapi_json().unwrap();
        assert!(json.contains("\"openapi\":"));
        assert!(json.contains("\"crumbtrail API\""));
    }
}
