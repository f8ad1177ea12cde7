//! Headless stand-in for the map surface.
//!
//! Logs every drawn point and keeps just enough state for the status API.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use crumbtrail_core::{Coordinate, TrailRenderer};
use tracing::{debug, info};

/// Renderer that records what a map would show.
#[derive(Debug, Default)]
pub struct LogMap {
    displayed: AtomicU64,
    center: Mutex<Option<Coordinate>>,
}

impl LogMap {
    /// Create an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of points drawn so far, replayed ones included.
    #[must_use]
    pub fn displayed(&self) -> u64 {
        self.displayed.load(Ordering::Relaxed)
    }

    /// Where the view is centered, if it has been moved.
    #[must_use]
    pub fn center(&self) -> Option<Coordinate> {
        *self.center.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TrailRenderer for LogMap {
    fn display_point(&self, latitude: f64, longitude: f64) {
        self.displayed.fetch_add(1, Ordering::Relaxed);
        debug!(latitude, longitude, "Adding point to map");
    }

    fn recenter(&self, latitude: f64, longitude: f64) {
        *self.center.lock().unwrap_or_else(PoisonError::into_inner) =
            Some(Coordinate::new(latitude, longitude));
        info!(latitude, longitude, "Map recentered");
    }
}
