//! Sample acceptance policies.
//!
//! The recorder consults a [`SamplePolicy`] before persisting a fix. The
//! default, [`AcceptAll`], stores every delivered fix; [`MinDistance`]
//! drops fixes that barely moved. Filtering never happens inside the store.

use crate::config::FilterConfig;
use crate::types::Coordinate;

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Decides whether a delivered fix becomes part of the trail.
pub trait SamplePolicy: Send + Sync {
    /// `previous` is the last accepted fix, if any.
    fn accept(&self, previous: Option<Coordinate>, candidate: Coordinate) -> bool;
}

/// Accepts every fix.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl SamplePolicy for AcceptAll {
    fn accept(&self, _previous: Option<Coordinate>, _candidate: Coordinate) -> bool {
        true
    }
}

/// Rejects fixes closer than `meters` to the previous accepted fix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinDistance {
    /// Minimum great-circle distance in meters.
    pub meters: f64,
}

impl SamplePolicy for MinDistance {
    fn accept(&self, previous: Option<Coordinate>, candidate: Coordinate) -> bool {
        previous.map_or(true, |prev| haversine_distance_m(prev, candidate) >= self.meters)
    }
}

/// Build the policy described by `config`.
#[must_use]
pub fn from_config(config: &FilterConfig) -> Box<dyn SamplePolicy> {
    match config.min_distance_m {
        Some(meters) if meters > 0.0 => Box::new(MinDistance { meters }),
        _ => Box::new(AcceptAll),
    }
}

/// Great-circle distance between two coordinates, in meters.
#[must_use]
pub fn haversine_distance_m(a: Coordinate, b: Coordinate) -> f64 {
    let (lat1, lat2) = (a.latitude.to_radians(), b.latitude.to_radians());
    let d_lat = lat2 - lat1;
    let d_lng = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}
