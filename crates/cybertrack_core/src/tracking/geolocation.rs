//! Geolocation collaborator contract.
//!
//! # Responsibility
//! - Describe one-shot fixes and cancellable push subscriptions.
//!
//! # Invariants
//! - A `WatchHandle` is only meaningful to the provider that issued it.
//! - `cancel` is the only way to stop delivery for a handle.

use super::session::WatchSink;
use crate::model::marker::GeoPoint;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

/// Position acquisition failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeolocationError {
    PermissionDenied,
    PositionUnavailable(String),
    Timeout,
    Unsupported,
}

impl Display for GeolocationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PermissionDenied => f.write_str("location permission denied"),
            Self::PositionUnavailable(reason) => write!(f, "position unavailable: {reason}"),
            Self::Timeout => f.write_str("position request timed out"),
            Self::Unsupported => f.write_str("geolocation is not supported"),
        }
    }
}

impl Error for GeolocationError {}

/// Subscription tuning passed to `watch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchOptions {
    pub high_accuracy: bool,
    pub timeout: Duration,
    /// Maximum age of a cached fix; zero forces fresh readings.
    pub maximum_age: Duration,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout: Duration::from_millis(5000),
            maximum_age: Duration::ZERO,
        }
    }
}

/// Opaque reference to an active provider subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatchHandle(pub u64);

/// Device position source.
pub trait GeolocationProvider {
    /// Single-shot position fetch.
    fn get_once(&self) -> Result<GeoPoint, GeolocationError>;

    /// Starts continuous delivery into `sink`.
    ///
    /// Errors returned here mean the subscription never started. Errors
    /// during delivery go through `WatchSink::fail` instead.
    fn watch(&self, sink: WatchSink, options: WatchOptions) -> Result<WatchHandle, GeolocationError>;

    /// Stops delivery for `handle`.
    fn cancel(&self, handle: WatchHandle);
}

impl<G: GeolocationProvider + ?Sized> GeolocationProvider for &G {
    fn get_once(&self) -> Result<GeoPoint, GeolocationError> {
        (**self).get_once()
    }

    fn watch(&self, sink: WatchSink, options: WatchOptions) -> Result<WatchHandle, GeolocationError> {
        (**self).watch(sink, options)
    }

    fn cancel(&self, handle: WatchHandle) {
        (**self).cancel(handle)
    }
}
