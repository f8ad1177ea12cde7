//! Track recorder: bridges a [`PositionSource`] to the store and the map.
//!
//! # State machine
//!
//! ```text
//!                start                 on_connected
//! Disconnected ───────▶ Connecting ─────────────────▶ Connected
//!      ▲                  ▲   │                          │
//!      │ stop             │   │ on_connection_failed     │ on_suspended
//!      │                  │   ▼                          ▼
//!      └──────────────── Failed ◀──────────────────── Suspended
//!                  (start retries)  on_connection_failed  │
//!                                                         │ reconnect
//!                         Connecting ◀────────────────────┘
//! ```
//!
//! Every lifecycle callback, every position callback, `start` and `stop` run
//! under one mutex, so events are handled strictly one at a time. Each
//! subscription gets a fresh [`SubscriptionId`]; a position tagged with any
//! other id is dropped. Lifecycle callbacks are tied to their connect attempt
//! the same way. Once `stop` returns, late deliveries from the source cannot
//! reach the store.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};
use utoipa::ToSchema;

use crate::config::{RecenterPolicy, TrackingConfig};
use crate::error::{CrumbtrailError, Result};
use crate::policy::{AcceptAll, SamplePolicy};
use crate::render::{HostListener, LoggingHost, TrailRenderer};
use crate::source::{PositionListener, PositionSource, SourceCallbacks, SubscriptionId};
use crate::storage::PointStore;
use crate::types::{ConnectionState, Coordinate, Point};

/// Point-in-time view of a recorder.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RecorderStatus {
    /// Current connection state.
    pub state: ConnectionState,

    /// Most recent accepted or replayed sample.
    pub last_sample: Option<Coordinate>,

    /// Samples accepted since the recorder was created.
    #[schema(example = 42)]
    pub accepted_samples: u64,

    /// Samples rejected by the sample policy.
    #[schema(example = 0)]
    pub filtered_samples: u64,

    /// Accepted samples that could not be persisted.
    #[schema(example = 0)]
    pub storage_failures: u64,
}

#[derive(Debug, Default)]
struct RecorderState {
    connection: ConnectionState,
    subscription: Option<PositionListener>,
    next_subscription: u64,
    attempt: u64,
    awaiting_first_fix: bool,
    last_sample: Option<Coordinate>,
    accepted_samples: u64,
    filtered_samples: u64,
    storage_failures: u64,
}

/// Records position samples from a source into a trail.
///
/// Cheap to clone; clones share the same recorder.
#[derive(Clone)]
pub struct TrackRecorder {
    inner: Arc<RecorderInner>,
}

pub(crate) struct RecorderInner {
    tracking: TrackingConfig,
    recenter: RecenterPolicy,
    policy: Box<dyn SamplePolicy>,
    source: Arc<dyn PositionSource>,
    store: Arc<dyn PointStore>,
    renderer: Arc<dyn TrailRenderer>,
    host: Arc<dyn HostListener>,
    state: Mutex<RecorderState>,
}

/// Builder for [`TrackRecorder`].
pub struct TrackRecorderBuilder {
    tracking: TrackingConfig,
    recenter: RecenterPolicy,
    policy: Box<dyn SamplePolicy>,
    source: Arc<dyn PositionSource>,
    store: Arc<dyn PointStore>,
    renderer: Arc<dyn TrailRenderer>,
    host: Arc<dyn HostListener>,
}

impl TrackRecorderBuilder {
    /// Update cadence and accuracy.
    #[must_use]
    pub fn tracking(mut self, tracking: TrackingConfig) -> Self {
        self.tracking = tracking;
        self
    }

    /// When to recenter the map.
    #[must_use]
    pub fn recenter(mut self, recenter: RecenterPolicy) -> Self {
        self.recenter = recenter;
        self
    }

    /// Sample acceptance policy.
    #[must_use]
    pub fn policy(mut self, policy: Box<dyn SamplePolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Receiver of state changes and reported errors.
    #[must_use]
    pub fn host(mut self, host: Arc<dyn HostListener>) -> Self {
        self.host = host;
        self
    }

    /// Create the recorder in the `Disconnected` state.
    #[must_use]
    pub fn build(self) -> TrackRecorder {
        TrackRecorder {
            inner: Arc::new(RecorderInner {
                tracking: self.tracking,
                recenter: self.recenter,
                policy: self.policy,
                source: self.source,
                store: self.store,
                renderer: self.renderer,
                host: self.host,
                state: Mutex::new(RecorderState::default()),
            }),
        }
    }
}

impl TrackRecorder {
    /// Start building a recorder with default tracking, recenter and acceptance settings.
    #[must_use]
    pub fn builder(
        source: Arc<dyn PositionSource>,
        store: Arc<dyn PointStore>,
        renderer: Arc<dyn TrailRenderer>,
    ) -> TrackRecorderBuilder {
        TrackRecorderBuilder {
            tracking: TrackingConfig::default(),
            recenter: RecenterPolicy::default(),
            policy: Box::new(AcceptAll),
            source,
            store,
            renderer,
            host: Arc::new(LoggingHost),
        }
    }

    /// Request a connection to the position source.
    ///
    /// No-op while a connection is in progress or established. From
    /// `Failed` this begins a fresh attempt.
    pub fn start(&self) {
        let inner = &self.inner;
        let mut state = inner.lock();
        if state.connection.is_active() {
            debug!(state = %state.connection, "Start ignored, already active");
            return;
        }
        inner.transition(&mut state, ConnectionState::Connecting);
        inner.source.connect(inner.next_attempt(&mut state));
    }

    /// Unsubscribe, disconnect, and return to `Disconnected`.
    ///
    /// Idempotent. When this returns, no further position update is recorded.
    pub fn stop(&self) {
        let inner = &self.inner;
        let mut state = inner.lock();
        if state.connection == ConnectionState::Disconnected {
            trace!("Stop ignored, already disconnected");
            return;
        }
        inner.end_subscription(&mut state);
        if state.connection.is_active() {
            inner.source.disconnect();
        }
        inner.transition(&mut state, ConnectionState::Disconnected);
    }

    /// Forward the whole stored trail to the renderer, oldest first.
    ///
    /// Returns the number of points drawn.
    ///
    /// # Errors
    ///
    /// Returns an error if the trail cannot be read.
    pub fn replay(&self) -> Result<usize> {
        let inner = &self.inner;
        let points = inner.store.get_all()?;
        for point in &points {
            inner.renderer.display_point(point.latitude, point.longitude);
        }

        if let Some(last) = points.last() {
            let mut state = inner.lock();
            state.last_sample.get_or_insert(last.coordinate());
        }
        info!(points = points.len(), "Replayed stored trail");
        Ok(points.len())
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.inner.lock().connection
    }

    /// Most recent accepted or replayed sample.
    #[must_use]
    pub fn last_sample(&self) -> Option<Coordinate> {
        self.inner.lock().last_sample
    }

    /// Snapshot of state and counters.
    #[must_use]
    pub fn status(&self) -> RecorderStatus {
        let state = self.inner.lock();
        RecorderStatus {
            state: state.connection,
            last_sample: state.last_sample,
            accepted_samples: state.accepted_samples,
            filtered_samples: state.filtered_samples,
            storage_failures: state.storage_failures,
        }
    }

    /// The full stored trail.
    ///
    /// # Errors
    ///
    /// Returns an error if the trail cannot be read.
    pub fn trail(&self) -> Result<Vec<Point>> {
        Ok(self.inner.store.get_all()?)
    }

    /// Tracking configuration this recorder subscribes with.
    #[must_use]
    pub fn tracking(&self) -> TrackingConfig {
        self.inner.tracking
    }
}

impl std::fmt::Debug for TrackRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackRecorder")
            .field("tracking", &self.inner.tracking)
            .field("recenter", &self.inner.recenter)
            .field("state", &self.inner.lock().connection)
            .finish_non_exhaustive()
    }
}

impl RecorderInner {
    fn lock(&self) -> MutexGuard<'_, RecorderState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_attempt(self: &Arc<Self>, state: &mut RecorderState) -> SourceCallbacks {
        state.attempt += 1;
        SourceCallbacks {
            attempt: state.attempt,
            recorder: Arc::downgrade(self),
        }
    }

    fn is_stale_attempt(state: &RecorderState, attempt: u64) -> bool {
        if attempt == state.attempt {
            return false;
        }
        debug!(attempt, current = state.attempt, "Ignoring callback from abandoned attempt");
        true
    }

    pub(crate) fn handle_connected(self: &Arc<Self>, attempt: u64) {
        let mut state = self.lock();
        if Self::is_stale_attempt(&state, attempt) {
            return;
        }
        if state.connection != ConnectionState::Connecting {
            debug!(state = %state.connection, "Ignoring unexpected connect");
            return;
        }
        self.transition(&mut state, ConnectionState::Connected);
        state.awaiting_first_fix = true;

        match self.source.last_known_position() {
            Some(last) => {
                debug!(%last, "Using last known position as first sample");
                self.accept_sample(&mut state, last);
            }
            None => debug!("No last known position"),
        }

        if state.subscription.is_none() {
            let id = SubscriptionId(state.next_subscription);
            state.next_subscription += 1;
            let listener = PositionListener {
                id,
                recorder: Arc::downgrade(self),
            };
            debug!(
                subscription = id.get(),
                interval_ms = self.tracking.update_interval_ms,
                fastest_ms = self.tracking.fastest_interval_ms,
                accuracy = ?self.tracking.accuracy,
                "Subscribing to position updates"
            );
            self.source.subscribe(&self.tracking, listener.clone());
            state.subscription = Some(listener);
        }
    }

    pub(crate) fn handle_suspended(self: &Arc<Self>, attempt: u64, reason_code: i32) {
        let mut state = self.lock();
        if Self::is_stale_attempt(&state, attempt) {
            return;
        }
        if !state.connection.is_active() {
            debug!(state = %state.connection, reason_code, "Ignoring suspension");
            return;
        }
        self.end_subscription(&mut state);
        self.transition(&mut state, ConnectionState::Suspended);
        self.host
            .report_error(&CrumbtrailError::ConnectionSuspended { reason_code });

        self.transition(&mut state, ConnectionState::Connecting);
        let callbacks = self.next_attempt(&mut state);
        self.source.connect(callbacks);
    }

    pub(crate) fn handle_connection_failed(&self, attempt: u64, reason_code: i32) {
        let mut state = self.lock();
        if Self::is_stale_attempt(&state, attempt) {
            return;
        }
        if !state.connection.is_active() {
            debug!(state = %state.connection, reason_code, "Ignoring connection failure");
            return;
        }
        self.end_subscription(&mut state);
        self.transition(&mut state, ConnectionState::Failed);
        self.host
            .report_error(&CrumbtrailError::ConnectionFailed { reason_code });
    }

    pub(crate) fn handle_position(&self, id: SubscriptionId, position: Coordinate) {
        let mut state = self.lock();
        let current = state.subscription.as_ref().map(PositionListener::id);
        if state.connection != ConnectionState::Connected || current != Some(id) {
            trace!(
                subscription = id.get(),
                state = %state.connection,
                "Dropping stale position update"
            );
            return;
        }
        self.accept_sample(&mut state, position);
    }

    fn accept_sample(&self, state: &mut RecorderState, position: Coordinate) {
        if !self.policy.accept(state.last_sample, position) {
            state.filtered_samples += 1;
            trace!(%position, "Sample rejected by policy");
            return;
        }

        match self.store.insert(position.latitude, position.longitude) {
            Ok(id) => debug!(id, %position, "Recorded sample"),
            Err(e) => {
                state.storage_failures += 1;
                warn!(%position, error = %e, "Failed to persist sample");
                self.host.report_error(&CrumbtrailError::Storage(e));
            }
        }

        self.renderer
            .display_point(position.latitude, position.longitude);

        let recenter = match self.recenter {
            RecenterPolicy::FirstFix => state.awaiting_first_fix,
            RecenterPolicy::EveryFix => true,
            RecenterPolicy::Never => false,
        };
        if recenter {
            self.renderer.recenter(position.latitude, position.longitude);
        }

        state.awaiting_first_fix = false;
        state.last_sample = Some(position);
        state.accepted_samples += 1;
    }

    fn end_subscription(&self, state: &mut RecorderState) {
        if let Some(listener) = state.subscription.take() {
            debug!(subscription = listener.id().get(), "Unsubscribing");
            self.source.unsubscribe(&listener);
        }
    }

    fn transition(&self, state: &mut RecorderState, next: ConnectionState) {
        let previous = std::mem::replace(&mut state.connection, next);
        if previous != next {
            info!(from = %previous, to = %next, "Connection state changed");
            self.host.state_changed(previous, next);
        }
    }
}
