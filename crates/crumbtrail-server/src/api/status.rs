//! Recorder status endpoint.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use crumbtrail_core::{AccuracyTier, Coordinate, RecorderStatus};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::state::SharedState;

/// Creates the status router.
pub fn router() -> Router<SharedState> {
    Router::new().route("/", get(get_status))
}

/// Recorder and map status.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StatusResponse {
    /// Connection state and sample counters.
    pub recorder: RecorderStatus,

    /// Subscribed update interval in milliseconds.
    #[schema(example = 20000)]
    pub update_interval_ms: u64,

    /// Subscribed fastest interval in milliseconds.
    #[schema(example = 10000)]
    pub fastest_interval_ms: u64,

    /// Requested accuracy tier.
    pub accuracy: AccuracyTier,

    /// Points drawn on the map, replayed ones included.
    #[schema(example = 42)]
    pub map_points: u64,

    /// Current map center.
    pub map_center: Option<Coordinate>,

    /// When the server started.
    pub started_at_utc: DateTime<Utc>,

    /// Seconds since start.
    #[schema(example = 3600)]
    pub uptime_secs: u64,
}

/// Get recorder status.
#[utoipa::path(
    get,
    path = "/api/status",
    tag = "system",
    operation_id = "getStatus",
    summary = "Get recorder status",
    responses(
        (status = 200, description = "Current status", body = StatusResponse)
    )
)]
pub async fn get_status(State(state): State<SharedState>) -> Json<StatusResponse> {
    let recorder = state.session().recorder();
    let tracking = recorder.tracking();
    let started_at = state.started_at();
    let uptime = Utc::now().signed_duration_since(started_at);

    Json(StatusResponse {
        recorder: recorder.status(),
        update_interval_ms: tracking.update_interval_ms,
        fastest_interval_ms: tracking.fastest_interval_ms,
        accuracy: tracking.accuracy,
        map_points: state.map().displayed(),
        map_center: state.map().center(),
        started_at_utc: started_at,
        uptime_secs: u64::try_from(uptime.num_seconds()).unwrap_or(0),
    })
}
