//! Outbound interfaces: the rendering layer and the host.
//!
//! Both are called while the recorder holds its state lock, so
//! implementations must not call back into the recorder synchronously.

use tracing::{error, info, warn};

use crate::error::CrumbtrailError;
use crate::types::ConnectionState;

/// The map surface that draws the trail.
pub trait TrailRenderer: Send + Sync {
    /// Draw one sample.
    fn display_point(&self, latitude: f64, longitude: f64);

    /// Move the view to a sample.
    fn recenter(&self, latitude: f64, longitude: f64);
}

/// Notifications for the host application.
pub trait HostListener: Send + Sync {
    /// The recorder moved between connection states.
    fn state_changed(&self, _from: ConnectionState, _to: ConnectionState) {}

    /// A non-fatal error occurred. The recorder keeps running.
    fn report_error(&self, _error: &CrumbtrailError) {}
}

/// [`HostListener`] that writes everything to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingHost;

impl HostListener for LoggingHost {
    fn state_changed(&self, from: ConnectionState, to: ConnectionState) {
        info!(%from, %to, "Recorder state changed");
    }

    fn report_error(&self, error: &CrumbtrailError) {
        if error.is_recoverable() {
            warn!(code = error.error_code(), %error, "Recoverable recorder error");
        } else {
            error!(code = error.error_code(), %error, "Recorder error");
        }
    }
}
