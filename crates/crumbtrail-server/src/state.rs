//! Application state shared across handlers.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use crumbtrail_core::{Config, LoggingHost, Session};

use crate::map::LogMap;
use crate::simulator::SimulatedSource;

/// Shared application state.
pub type SharedState = AppState;

/// Recording session plus what the HTTP layer reports about it.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    session: Session,
    map: Arc<LogMap>,
    started_at: DateTime<Utc>,
}

impl AppState {
    /// Open the configured trail and wire it to a simulated source.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the trail database cannot be opened.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let source = Arc::new(SimulatedSource::new(config.simulator));
        let map = Arc::new(LogMap::new());
        let session = Session::open(config, source, map.clone(), Arc::new(LoggingHost))?;
        Ok(Self::from_parts(session, map))
    }

    /// Wrap an already built session.
    #[must_use]
    pub fn from_parts(session: Session, map: Arc<LogMap>) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                session,
                map,
                started_at: Utc::now(),
            }),
        }
    }

    /// The recording session.
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.inner.session
    }

    /// The map stand-in.
    #[must_use]
    pub fn map(&self) -> &LogMap {
        &self.inner.map
    }

    /// When this state was created.
    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.inner.started_at
    }
}
