//! Top-level owner of the store and the recorder.
//!
//! A [`Session`] is built once, eagerly, from a [`Config`]. The host calls
//! [`Session::start`] and [`Session::stop`] from whatever lifecycle it has
//! (foreground/background, service start/stop, signal handlers).

use std::sync::{Arc, Mutex, PoisonError};

use tracing::{info, warn};

use crate::config::Config;
use crate::error::Result;
use crate::policy;
use crate::recorder::{RecorderStatus, TrackRecorder};
use crate::render::{HostListener, TrailRenderer};
use crate::source::PositionSource;
use crate::storage::{PointStore, SqliteStore};
use crate::types::{ConnectionState, Point};

/// Owns the trail store and the recorder feeding it.
pub struct Session {
    store: Arc<dyn PointStore>,
    recorder: TrackRecorder,
    host: Arc<dyn HostListener>,
    replayed: Mutex<bool>,
}

impl Session {
    /// Build a session around an existing store.
    #[must_use]
    pub fn new(
        config: &Config,
        store: Arc<dyn PointStore>,
        source: Arc<dyn PositionSource>,
        renderer: Arc<dyn TrailRenderer>,
        host: Arc<dyn HostListener>,
    ) -> Self {
        let recorder = TrackRecorder::builder(source, Arc::clone(&store), renderer)
            .tracking(config.tracking)
            .recenter(config.display.recenter)
            .policy(policy::from_config(&config.filter))
            .host(Arc::clone(&host))
            .build();

        Self {
            store,
            recorder,
            host,
            replayed: Mutex::new(false),
        }
    }

    /// Open the SQLite trail configured in `config` and build a session on it.
    ///
    /// # Errors
    ///
    /// Returns an error if the database path cannot be resolved or the database cannot be opened.
    pub fn open(
        config: &Config,
        source: Arc<dyn PositionSource>,
        renderer: Arc<dyn TrailRenderer>,
        host: Arc<dyn HostListener>,
    ) -> Result<Self> {
        let path = config.storage.resolved_path()?;
        let store = Arc::new(SqliteStore::open(&path)?);
        Ok(Self::new(config, store, source, renderer, host))
    }

    /// Start recording.
    ///
    /// The first call replays the stored trail to the renderer before the
    /// recorder connects. A replay failure is reported to the host and does
    /// not prevent live recording. Concurrent callers wait until the replay
    /// has finished.
    pub fn start(&self) {
        let mut replayed = self.replayed.lock().unwrap_or_else(PoisonError::into_inner);
        if !*replayed {
            *replayed = true;
            if let Err(e) = self.recorder.replay() {
                warn!(error = %e, "Could not replay stored trail");
                self.host.report_error(&e);
            }
        }
        info!("Starting recorder");
        self.recorder.start();
    }

    /// Stop recording. Safe to call repeatedly.
    pub fn stop(&self) {
        info!("Stopping recorder");
        self.recorder.stop();
    }

    /// The recorder.
    #[must_use]
    pub const fn recorder(&self) -> &TrackRecorder {
        &self.recorder
    }

    /// The trail store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn PointStore> {
        &self.store
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.recorder.state()
    }

    /// Snapshot of recorder state and counters.
    #[must_use]
    pub fn status(&self) -> RecorderStatus {
        self.recorder.status()
    }

    /// The full stored trail.
    ///
    /// # Errors
    ///
    /// Returns an error if the trail cannot be read.
    pub fn trail(&self) -> Result<Vec<Point>> {
        Ok(self.store.get_all()?)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("recorder", &self.recorder)
            .field(
                "replayed",
                &*self.replayed.lock().unwrap_or_else(PoisonError::into_inner),
            )
            .finish_non_exhaustive()
    }
}
