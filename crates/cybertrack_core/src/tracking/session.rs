//! Tracking session state machine and path accumulator.
//!
//! # Responsibility
//! - Run the `Idle -> Active -> Idle` lifecycle over a geolocation provider.
//! - Append delivered samples to the path in delivery order.
//! - Surface delivery errors as notices without leaving `Active`.
//!
//! # Invariants
//! - A provider handle is held iff the session is `Active`.
//! - `stop()` invalidates the subscription before cancelling it, so a
//!   sample still in flight is dropped rather than appended.
//! - `stop()` never discards the path; only `clear_path()` does.
//! - Dropping the session stops it.

use super::geolocation::{GeolocationError, GeolocationProvider, WatchHandle, WatchOptions};
use crate::model::marker::GeoPoint;
use log::{debug, info, warn};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// Position shown before the first fix arrives (Tokyo Station).
pub const DEFAULT_POSITION: GeoPoint = GeoPoint::new(35.6812, 139.7671);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingState {
    Idle,
    Active,
}

/// Result of `refresh_once`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RefreshOutcome {
    /// A new fix was obtained and stored.
    Fresh(GeoPoint),
    /// The fetch failed; this is the last known position.
    Fallback(GeoPoint),
}

impl RefreshOutcome {
    pub fn position(self) -> GeoPoint {
        match self {
            Self::Fresh(point) | Self::Fallback(point) => point,
        }
    }
}

#[derive(Debug)]
struct Tracker {
    live_subscription: Option<u64>,
    path: Vec<GeoPoint>,
    current_position: GeoPoint,
    notices: Vec<GeolocationError>,
}

fn lock(shared: &Mutex<Tracker>) -> MutexGuard<'_, Tracker> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Push callback handed to `GeolocationProvider::watch`.
///
/// Cloneable and safe to call after the session is stopped or dropped;
/// stale deliveries are ignored.
#[derive(Debug, Clone)]
pub struct WatchSink {
    shared: Weak<Mutex<Tracker>>,
    subscription: u64,
}

impl WatchSink {
    /// Delivers one sample. Returns `false` when the sample was dropped
    /// because the subscription is no longer live.
    pub fn deliver(&self, point: GeoPoint) -> bool {
        let Some(shared) = self.shared.upgrade() else {
            return false;
        };
        let mut tracker = lock(&shared);
        if tracker.live_subscription != Some(self.subscription) {
            debug!(
                "event=tracking_sample_dropped module=tracking status=stale subscription={}",
                self.subscription
            );
            return false;
        }
        tracker.current_position = point;
        tracker.path.push(point);
        true
    }

    /// Reports a delivery error. The session stays `Active`.
    pub fn fail(&self, error: GeolocationError) {
        let Some(shared) = self.shared.upgrade() else {
            return;
        };
        let mut tracker = lock(&shared);
        if tracker.live_subscription != Some(self.subscription) {
            return;
        }
        warn!(
            "event=tracking_sample module=tracking status=error subscription={} error={}",
            self.subscription, error
        );
        tracker.notices.push(error);
    }

    pub fn is_live(&self) -> bool {
        let Some(shared) = self.shared.upgrade() else {
            return false;
        };
        let live = lock(&shared).live_subscription;
        live == Some(self.subscription)
    }
}

/// Continuous position tracking over a geolocation provider.
pub struct TrackingSession<G: GeolocationProvider> {
    provider: G,
    options: WatchOptions,
    shared: Arc<Mutex<Tracker>>,
    handle: Option<WatchHandle>,
    next_subscription: u64,
}

impl<G: GeolocationProvider> TrackingSession<G> {
    pub fn new(provider: G) -> Self {
        Self::with_options(provider, WatchOptions::default())
    }

    pub fn with_options(provider: G, options: WatchOptions) -> Self {
        Self {
            provider,
            options,
            shared: Arc::new(Mutex::new(Tracker {
                live_subscription: None,
                path: Vec::new(),
                current_position: DEFAULT_POSITION,
                notices: Vec::new(),
            })),
            handle: None,
            next_subscription: 1,
        }
    }

    pub fn state(&self) -> TrackingState {
        if self.handle.is_some() {
            TrackingState::Active
        } else {
            TrackingState::Idle
        }
    }

    pub fn is_active(&self) -> bool {
        self.handle.is_some()
    }

    /// Starts continuous tracking. No-op while already `Active`.
    ///
    /// # Errors
    /// Returns the provider error when the subscription cannot be opened;
    /// the session then stays `Idle`.
    pub fn start(&mut self) -> Result<(), GeolocationError> {
        if self.handle.is_some() {
            return Ok(());
        }

        let subscription = self.next_subscription;
        self.next_subscription += 1;
        // Armed before `watch` so providers may deliver synchronously.
        lock(&self.shared).live_subscription = Some(subscription);

        let sink = WatchSink {
            shared: Arc::downgrade(&self.shared),
            subscription,
        };
        match self.provider.watch(sink, self.options) {
            Ok(handle) => {
                self.handle = Some(handle);
                info!(
                    "event=tracking_start module=tracking status=ok subscription={}",
                    subscription
                );
                Ok(())
            }
            Err(err) => {
                let mut tracker = lock(&self.shared);
                if tracker.live_subscription == Some(subscription) {
                    tracker.live_subscription = None;
                }
                warn!("event=tracking_start module=tracking status=error error={err}");
                Err(err)
            }
        }
    }

    /// Stops tracking and releases the provider subscription. No-op while
    /// `Idle`. The accumulated path is kept.
    pub fn stop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        lock(&self.shared).live_subscription = None;
        self.provider.cancel(handle);

        info!(
            "event=tracking_stop module=tracking status=ok path_len={}",
            self.path_len()
        );
    }

    /// One-shot position fetch, independent of tracking state.
    ///
    /// Never fails: on provider error the last known position is returned.
    pub fn refresh_once(&self) -> RefreshOutcome {
        match self.provider.get_once() {
            Ok(point) => {
                lock(&self.shared).current_position = point;
                RefreshOutcome::Fresh(point)
            }
            Err(err) => {
                warn!("event=position_refresh module=tracking status=fallback error={err}");
                RefreshOutcome::Fallback(self.current_position())
            }
        }
    }

    pub fn current_position(&self) -> GeoPoint {
        lock(&self.shared).current_position
    }

    /// Snapshot of the accumulated path.
    pub fn path(&self) -> Vec<GeoPoint> {
        lock(&self.shared).path.clone()
    }

    pub fn path_len(&self) -> usize {
        lock(&self.shared).path.len()
    }

    pub fn clear_path(&mut self) {
        lock(&self.shared).path.clear();
    }

    /// Drains delivery errors reported since the last call.
    pub fn take_notices(&mut self) -> Vec<GeolocationError> {
        std::mem::take(&mut lock(&self.shared).notices)
    }

    pub fn options(&self) -> WatchOptions {
        self.options
    }
}

impl<G: GeolocationProvider> Drop for TrackingSession<G> {
    fn drop(&mut self) {
        self.stop();
    }
}
