//! Simulated position source.
//!
//! Walks a deterministic path away from a configured origin. Connecting
//! succeeds after a short delay and fixes arrive on a tokio interval at the
//! subscribed cadence. The walk resumes where it left off after a
//! reconnect. Built on [`ManualSource`], which takes care of listener
//! bookkeeping and invokes callbacks outside its own lock.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crumbtrail_core::{
    Coordinate, ManualSource, PositionListener, PositionSource, SimulatorConfig, SourceCallbacks,
    TrackingConfig,
};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Shortest tick the simulator will run at.
const MIN_TICK: Duration = Duration::from_millis(1);

#[derive(Default)]
struct Tasks {
    connect: Option<JoinHandle<()>>,
    ticker: Option<JoinHandle<()>>,
}

impl Tasks {
    fn abort_all(&mut self) {
        for task in [self.connect.take(), self.ticker.take()].into_iter().flatten() {
            task.abort();
        }
    }
}

/// A [`PositionSource`] producing a synthetic walk.
pub struct SimulatedSource {
    manual: Arc<ManualSource>,
    config: SimulatorConfig,
    runtime: Handle,
    tasks: Mutex<Tasks>,
    next_step: Arc<AtomicU32>,
}

impl SimulatedSource {
    /// Create a source on the current tokio runtime.
    ///
    /// The origin is reported as the last known position.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    #[must_use]
    pub fn new(config: SimulatorConfig) -> Self {
        let manual = Arc::new(ManualSource::new());
        manual.set_last_known(Some(Coordinate::new(
            config.origin_latitude,
            config.origin_longitude,
        )));
        Self {
            manual,
            config,
            runtime: Handle::current(),
            tasks: Mutex::new(Tasks::default()),
            next_step: Arc::new(AtomicU32::new(1)),
        }
    }

    fn tasks(&self) -> std::sync::MutexGuard<'_, Tasks> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Position `step` fixes away from `origin`: steady northward drift with an east-west sway.
#[must_use]
pub fn walk_position(origin: Coordinate, step_degrees: f64, step: u32) -> Coordinate {
    let n = f64::from(step);
    let latitude = (origin.latitude + step_degrees * n).clamp(-90.0, 90.0);
    let longitude = step_degrees.mul_add((n / 8.0).sin() * 4.0, origin.longitude);
    Coordinate::new(latitude, longitude.clamp(-180.0, 180.0))
}

impl PositionSource for SimulatedSource {
    fn connect(&self, callbacks: SourceCallbacks) {
        self.manual.connect(callbacks);

        let manual = Arc::clone(&self.manual);
        let delay = Duration::from_millis(self.config.connect_delay_ms);
        let task = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            debug!("Simulated source connected");
            manual.complete_connect();
        });

        if let Some(previous) = self.tasks().connect.replace(task) {
            previous.abort();
        }
    }

    fn disconnect(&self) {
        self.tasks().abort_all();
        self.manual.disconnect();
        debug!("Simulated source disconnected");
    }

    fn subscribe(&self, config: &TrackingConfig, listener: PositionListener) {
        self.manual.subscribe(config, listener);

        let manual = Arc::clone(&self.manual);
        let origin = Coordinate::new(self.config.origin_latitude, self.config.origin_longitude);
        let step_degrees = self.config.step_degrees;
        let next_step = Arc::clone(&self.next_step);
        let period = Duration::from_millis(config.update_interval_ms).max(MIN_TICK);
        info!(interval_ms = config.update_interval_ms, "Simulated fixes started");

        let task = self.runtime.spawn(async move {
            let mut interval = tokio::time::interval(period);
            // The first tick completes immediately; the last known position already covers it.
            interval.tick().await;
            loop {
                interval.tick().await;
                let step = next_step.load(Ordering::Relaxed);
                if !manual.push(walk_position(origin, step_degrees, step)) {
                    break;
                }
                next_step.store(step.saturating_add(1), Ordering::Relaxed);
            }
        });

        if let Some(previous) = self.tasks().ticker.replace(task) {
            previous.abort();
        }
    }

    fn unsubscribe(&self, listener: &PositionListener) {
        self.manual.unsubscribe(listener);
        if let Some(ticker) = self.tasks().ticker.take() {
            ticker.abort();
        }
    }

    fn last_known_position(&self) -> Option<Coordinate> {
        self.manual.last_known_position()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::LogMap;
    use crumbtrail_core::{AccuracyTier, Config, ConnectionState, LoggingHost, Session, SqliteStore};

    fn simulated_session(tracking: TrackingConfig) -> Session {
        let mut config = Config::default();
        config.tracking = tracking;
        config.simulator.connect_delay_ms = 10;
        config.simulator.step_degrees = 0.001;
        let source = Arc::new(SimulatedSource::new(config.simulator));
        Session::new(
            &config,
            Arc::new(SqliteStore::in_memory().unwrap()),
            source,
            Arc::new(LogMap::new()),
            Arc::new(LoggingHost),
        )
    }

    fn fast_tracking() -> TrackingConfig {
        TrackingConfig::new(20, 10, AccuracyTier::BalancedPower).unwrap()
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(150)).await;
    }

    #[tokio::test]
    async fn test_session_records_until_stopped() {
        let session = simulated_session(fast_tracking());
        session.start();
        assert_eq!(session.state(), ConnectionState::Connecting);

        settle().await;
        assert_eq!(session.state(), ConnectionState::Connected);
        let recorded = session.trail().unwrap().len();
        assert!(recorded > 1, "expected ticks after connect, got {recorded}");

        session.stop();
        let at_stop = session.trail().unwrap().len();
        settle().await;
        assert_eq!(session.trail().unwrap().len(), at_stop);
        assert_eq!(session.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_walk_resumes_after_restart() {
        let session = simulated_session(fast_tracking());
        session.start();
        settle().await;
        session.stop();
        let before_restart = session.trail().unwrap().len();

        session.start();
        settle().await;
        session.stop();

        let latitudes: Vec<f64> = session.trail().unwrap().iter().map(|p| p.latitude).collect();
        assert!(latitudes.len() > before_restart + 1);
        assert!(
            latitudes.windows(2).all(|w| w[0] <= w[1]),
            "walk jumped back: {latitudes:?}"
        );
    }

    #[tokio::test]
    async fn test_zero_interval_still_ticks() {
        let session = simulated_session(TrackingConfig {
            update_interval_ms: 0,
            fastest_interval_ms: 0,
            accuracy: AccuracyTier::HighAccuracy,
        });
        session.start();
        settle().await;
        session.stop();
        assert!(session.trail().unwrap().len() > 1);
    }

    #[test]
    fn test_walk_starts_at_origin_and_moves_north() {
        let origin = Coordinate::new(10.0, 20.0);
        assert_eq!(walk_position(origin, 0.001, 0), origin);

        let later = walk_position(origin, 0.001, 10);
        assert!(later.latitude > origin.latitude);
        assert!(later.is_valid());
    }

    #[test]
    fn test_walk_stays_in_range_near_pole() {
        let p = walk_position(Coordinate::new(89.99, 179.99), 0.01, 100);
        assert!(p.is_valid());
    }
}
