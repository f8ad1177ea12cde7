//! Position source interface.
//!
//! A [`PositionSource`] is an asynchronous service: connection requests and
//! subscriptions return immediately, and results arrive later through the
//! [`SourceCallbacks`] handed to `connect` and the [`PositionListener`]
//! handed to `subscribe`.
//!
//! Implementations must never invoke a callback from inside one of the trait
//! methods. The recorder calls into the source while holding its state lock.
//!
//! [`ManualSource`] is an in-process source driven by explicit calls, useful
//! for hosts that read fixes from elsewhere and for tests.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use tracing::trace;

use crate::config::TrackingConfig;
use crate::recorder::RecorderInner;
use crate::types::Coordinate;

/// External service supplying connection lifecycle and position events.
pub trait PositionSource: Send + Sync {
    /// Begin connecting. The outcome is reported through `callbacks`.
    fn connect(&self, callbacks: SourceCallbacks);

    /// Tear down the connection.
    fn disconnect(&self);

    /// Start delivering position updates to `listener` at the cadence in `config`.
    fn subscribe(&self, config: &TrackingConfig, listener: PositionListener);

    /// Stop delivering updates to `listener`.
    fn unsubscribe(&self, listener: &PositionListener);

    /// Most recent fix known to the source, if any.
    fn last_known_position(&self) -> Option<Coordinate>;
}

impl<T: PositionSource + ?Sized> PositionSource for Arc<T> {
    fn connect(&self, callbacks: SourceCallbacks) {
        (**self).connect(callbacks);
    }

    fn disconnect(&self) {
        (**self).disconnect();
    }

    fn subscribe(&self, config: &TrackingConfig, listener: PositionListener) {
        (**self).subscribe(config, listener);
    }

    fn unsubscribe(&self, listener: &PositionListener) {
        (**self).unsubscribe(listener);
    }

    fn last_known_position(&self) -> Option<Coordinate> {
        (**self).last_known_position()
    }
}

/// Connection lifecycle callbacks into a recorder.
///
/// Each value belongs to one connect attempt. Once the recorder starts a new
/// attempt, or is dropped, every callback of the old value is a no-op.
#[derive(Clone)]
pub struct SourceCallbacks {
    pub(crate) attempt: u64,
    pub(crate) recorder: Weak<RecorderInner>,
}

impl SourceCallbacks {
    /// The source finished connecting.
    pub fn on_connected(&self) {
        match self.recorder.upgrade() {
            Some(recorder) => recorder.handle_connected(self.attempt),
            None => trace!("Connected callback for dropped recorder"),
        }
    }

    /// The source interrupted the connection.
    pub fn on_suspended(&self, reason_code: i32) {
        match self.recorder.upgrade() {
            Some(recorder) => recorder.handle_suspended(self.attempt, reason_code),
            None => trace!(reason_code, "Suspended callback for dropped recorder"),
        }
    }

    /// The source could not connect.
    pub fn on_connection_failed(&self, reason_code: i32) {
        match self.recorder.upgrade() {
            Some(recorder) => recorder.handle_connection_failed(self.attempt, reason_code),
            None => trace!(reason_code, "Failure callback for dropped recorder"),
        }
    }
}

impl fmt::Debug for SourceCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceCallbacks")
            .field("attempt", &self.attempt)
            .field("alive", &(self.recorder.strong_count() > 0))
            .finish()
    }
}

/// Identifies one subscription. Never reused within a recorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub(crate) u64);

impl SubscriptionId {
    /// Numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Receiver of position updates for one subscription.
///
/// Updates delivered after the subscription ended are dropped by the recorder.
#[derive(Clone)]
pub struct PositionListener {
    pub(crate) id: SubscriptionId,
    pub(crate) recorder: Weak<RecorderInner>,
}

impl PositionListener {
    /// Subscription this listener belongs to.
    #[must_use]
    pub const fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Deliver a position update.
    pub fn on_position_changed(&self, latitude: f64, longitude: f64) {
        match self.recorder.upgrade() {
            Some(recorder) => {
                recorder.handle_position(self.id, Coordinate::new(latitude, longitude));
            }
            None => trace!(subscription = self.id.0, "Position for dropped recorder"),
        }
    }
}

impl PartialEq for PositionListener {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && Weak::ptr_eq(&self.recorder, &other.recorder)
    }
}

impl Eq for PositionListener {}

impl fmt::Debug for PositionListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PositionListener")
            .field("id", &self.id.0)
            .finish_non_exhaustive()
    }
}

/// Calls received by a [`ManualSource`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceCallCounts {
    /// `connect` calls.
    pub connects: usize,
    /// `disconnect` calls.
    pub disconnects: usize,
    /// `subscribe` calls.
    pub subscribes: usize,
    /// `unsubscribe` calls.
    pub unsubscribes: usize,
}

#[derive(Debug, Default)]
struct ManualState {
    callbacks: Option<SourceCallbacks>,
    listener: Option<PositionListener>,
    tracking: Option<TrackingConfig>,
    last_known: Option<Coordinate>,
    calls: SourceCallCounts,
}

/// A [`PositionSource`] driven by explicit method calls.
///
/// Connection outcomes and fixes are injected with [`complete_connect`],
/// [`suspend`], [`fail`] and [`push`]. Every callback is invoked after the
/// internal lock has been released.
///
/// [`complete_connect`]: ManualSource::complete_connect
/// [`suspend`]: ManualSource::suspend
/// [`fail`]: ManualSource::fail
/// [`push`]: ManualSource::push
#[derive(Debug, Default)]
pub struct ManualSource {
    state: Mutex<ManualState>,
}

impl ManualSource {
    /// Create a source with no last-known position.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the position returned by `last_known_position`.
    pub fn set_last_known(&self, position: Option<Coordinate>) {
        self.lock().last_known = position;
    }

    /// Report a successful connect. Returns `false` if nobody asked to connect.
    pub fn complete_connect(&self) -> bool {
        let callbacks = self.lock().callbacks.clone();
        callbacks.map_or(false, |cb| {
            cb.on_connected();
            true
        })
    }

    /// Report a connection interruption.
    pub fn suspend(&self, reason_code: i32) -> bool {
        let callbacks = self.lock().callbacks.clone();
        callbacks.map_or(false, |cb| {
            cb.on_suspended(reason_code);
            true
        })
    }

    /// Report a connection failure.
    pub fn fail(&self, reason_code: i32) -> bool {
        let callbacks = self.lock().callbacks.clone();
        callbacks.map_or(false, |cb| {
            cb.on_connection_failed(reason_code);
            true
        })
    }

    /// Deliver a fix to the current subscriber and remember it as last known.
    ///
    /// Returns `false` if there is no subscriber.
    pub fn push(&self, position: Coordinate) -> bool {
        let listener = {
            let mut state = self.lock();
            state.last_known = Some(position);
            state.listener.clone()
        };
        listener.map_or(false, |l| {
            l.on_position_changed(position.latitude, position.longitude);
            true
        })
    }

    /// Callbacks of the latest connect request, if any.
    #[must_use]
    pub fn callbacks(&self) -> Option<SourceCallbacks> {
        self.lock().callbacks.clone()
    }

    /// The current subscriber, if any.
    #[must_use]
    pub fn listener(&self) -> Option<PositionListener> {
        self.lock().listener.clone()
    }

    /// Whether someone is subscribed.
    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        self.lock().listener.is_some()
    }

    /// Tracking configuration of the latest subscription.
    #[must_use]
    pub fn tracking_config(&self) -> Option<TrackingConfig> {
        self.lock().tracking
    }

    /// Number of calls received so far.
    #[must_use]
    pub fn calls(&self) -> SourceCallCounts {
        self.lock().calls
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ManualState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PositionSource for ManualSource {
    fn connect(&self, callbacks: SourceCallbacks) {
        let mut state = self.lock();
        state.calls.connects += 1;
        state.callbacks = Some(callbacks);
    }

    fn disconnect(&self) {
        self.lock().calls.disconnects += 1;
    }

    fn subscribe(&self, config: &TrackingConfig, listener: PositionListener) {
        let mut state = self.lock();
        state.calls.subscribes += 1;
        state.tracking = Some(*config);
        state.listener = Some(listener);
    }

    fn unsubscribe(&self, listener: &PositionListener) {
        let mut state = self.lock();
        state.calls.unsubscribes += 1;
        if state.listener.as_ref() == Some(listener) {
            state.listener = None;
        }
    }

    fn last_known_position(&self) -> Option<Coordinate> {
        self.lock().last_known
    }
}
