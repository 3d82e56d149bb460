//! Scripted geolocation provider.
//!
//! Replays a recorded track through the `GeolocationProvider` contract.
//! `watch` delivers every step synchronously, in order.

use super::geolocation::{GeolocationError, GeolocationProvider, WatchHandle, WatchOptions};
use super::session::WatchSink;
use crate::model::marker::GeoPoint;
use std::cell::{Cell, RefCell};

/// One scripted delivery: a fix or a delivery error.
pub type ReplayStep = Result<GeoPoint, GeolocationError>;

#[derive(Debug, Default)]
pub struct ReplayGeolocation {
    steps: Vec<ReplayStep>,
    refusal: Option<GeolocationError>,
    next_handle: Cell<u64>,
    cancelled: RefCell<Vec<WatchHandle>>,
}

impl ReplayGeolocation {
    pub fn new(steps: Vec<ReplayStep>) -> Self {
        Self {
            steps,
            ..Self::default()
        }
    }

    /// Provider whose `watch` and `get_once` always fail with `error`.
    pub fn refusing(error: GeolocationError) -> Self {
        Self {
            refusal: Some(error),
            ..Self::default()
        }
    }

    /// Parses `lat,lng` lines. Blank lines and `#` comments are ignored;
    /// unparsable or out-of-range lines become `PositionUnavailable` steps.
    pub fn from_track_text(text: &str) -> Self {
        let steps = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(parse_track_line)
            .collect();
        Self::new(steps)
    }

    pub fn steps(&self) -> &[ReplayStep] {
        &self.steps
    }

    pub fn cancelled_handles(&self) -> Vec<WatchHandle> {
        self.cancelled.borrow().clone()
    }
}

fn parse_track_line(line: &str) -> ReplayStep {
    let unavailable = || GeolocationError::PositionUnavailable(format!("unreadable fix `{line}`"));
    let (lat, lng) = line.split_once(',').ok_or_else(unavailable)?;
    let point = match (lat.trim().parse::<f64>(), lng.trim().parse::<f64>()) {
        (Ok(lat), Ok(lng)) => GeoPoint::new(lat, lng),
        _ => return Err(unavailable()),
    };
    point.validate().map_err(|_| unavailable())?;
    Ok(point)
}

impl GeolocationProvider for ReplayGeolocation {
    fn get_once(&self) -> Result<GeoPoint, GeolocationError> {
        if let Some(error) = &self.refusal {
            return Err(error.clone());
        }
        self.steps
            .iter()
            .rev()
            .find_map(|step| step.as_ref().ok().copied())
            .ok_or_else(|| GeolocationError::PositionUnavailable("no recorded fix".to_string()))
    }

    fn watch(&self, sink: WatchSink, _options: WatchOptions) -> Result<WatchHandle, GeolocationError> {
        if let Some(error) = &self.refusal {
            return Err(error.clone());
        }
        let handle = WatchHandle(self.next_handle.get());
        self.next_handle.set(handle.0 + 1);

        for step in &self.steps {
            match step {
                Ok(point) => {
                    sink.deliver(*point);
                }
                Err(error) => sink.fail(error.clone()),
            }
        }
        Ok(handle)
    }

    fn cancel(&self, handle: WatchHandle) {
        self.cancelled.borrow_mut().push(handle);
    }
}
