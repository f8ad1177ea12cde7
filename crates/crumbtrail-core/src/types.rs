//! Shared types and OpenAPI schemas.
//!
//! Samples travel through the system as [`Coordinate`]s until the store
//! assigns them an id, at which point they become [`Point`]s.

use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Valid latitude range in degrees.
pub const LATITUDE_RANGE: std::ops::RangeInclusive<f64> = -90.0..=90.0;

/// Valid longitude range in degrees.
pub const LONGITUDE_RANGE: std::ops::RangeInclusive<f64> = -180.0..=180.0;

/// An unsaved position sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Coordinate {
    /// Latitude in degrees.
    #[schema(example = 12.34)]
    pub latitude: f64,

    /// Longitude in degrees.
    #[schema(example = 56.78)]
    pub longitude: f64,
}

impl Coordinate {
    /// Create a coordinate without range checks.
    ///
    /// Use [`Coordinate::try_new`] when the values come from an untrusted producer.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Create a coordinate, rejecting values outside the WGS84 ranges.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidCoordinate`] if either component is out of range or not finite.
    pub fn try_new(latitude: f64, longitude: f64) -> Result<Self, InvalidCoordinate> {
        let coordinate = Self::new(latitude, longitude);
        if coordinate.is_valid() {
            Ok(coordinate)
        } else {
            Err(InvalidCoordinate {
                latitude,
                longitude,
            })
        }
    }

    /// Whether both components are inside their valid ranges.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        LATITUDE_RANGE.contains(&self.latitude) && LONGITUDE_RANGE.contains(&self.longitude)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.latitude, self.longitude)
    }
}

/// A coordinate rejected by [`Coordinate::try_new`].
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
#[error("Coordinate out of range: latitude {latitude}, longitude {longitude}")]
pub struct InvalidCoordinate {
    /// Rejected latitude.
    pub latitude: f64,
    /// Rejected longitude.
    pub longitude: f64,
}

/// A persisted sample in the trail.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": 1,
    "latitude": 12.34,
    "longitude": 56.78
}))]
pub struct Point {
    /// Store-assigned id, strictly increasing in insertion order.
    #[schema(example = 1)]
    pub id: i64,

    /// Latitude in degrees.
    pub latitude: f64,

    /// Longitude in degrees.
    pub longitude: f64,
}

impl Point {
    /// The coordinate part of this point.
    #[must_use]
    pub const fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

/// Connection state of a track recorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// Not connected and not trying to be.
    #[default]
    Disconnected,
    /// A connection request is outstanding.
    Connecting,
    /// Connected; position updates are subscribed.
    Connected,
    /// The source reported an interruption. Transient: a reconnect follows immediately.
    Suspended,
    /// The source reported a non-recoverable failure for this attempt.
    Failed,
}

impl ConnectionState {
    /// Whether a connection attempt is in progress or established.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Connecting | Self::Connected | Self::Suspended)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Suspended => "suspended",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}
