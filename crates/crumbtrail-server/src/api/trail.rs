//! Trail API endpoints.
//!
//! Read-only: points enter the trail only through the recorder.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use crumbtrail_core::Point;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::error::{ApiResult, ErrorResponse};
use crate::state::SharedState;

/// Creates the trail router.
pub fn router() -> Router<SharedState> {
    Router::new().route("/", get(get_trail))
}

/// The stored trail.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "count": 2,
    "points": [
        {"id": 1, "latitude": 12.34, "longitude": 56.78},
        {"id": 2, "latitude": 12.35, "longitude": 56.79}
    ]
}))]
pub struct TrailResponse {
    /// Number of points.
    #[schema(example = 2, minimum = 0)]
    pub count: usize,

    /// Points in recording order.
    pub points: Vec<Point>,
}

/// Get the full trail.
#[utoipa::path(
    get,
    path = "/api/trail",
    tag = "trail",
    operation_id = "getTrail",
    summary = "Get every recorded point",
    description = "Returns all stored points in ascending id order, which is the \
        order they were recorded in. Ids are never reused.",
    responses(
        (status = 200, description = "Stored trail", body = TrailResponse),
        (status = 500, description = "Trail could not be read", body = ErrorResponse)
    )
)]
pub async fn get_trail(State(state): State<SharedState>) -> ApiResult<Json<TrailResponse>> {
    let points = state.session().trail()?;
    Ok(Json(TrailResponse {
        count: points.len(),
        points,
    }))
}
