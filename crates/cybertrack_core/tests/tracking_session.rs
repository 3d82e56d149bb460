use cybertrack_core::{
    GeoPoint, GeolocationError, GeolocationProvider, RefreshOutcome, ReplayGeolocation,
    TrackingSession, TrackingState, WatchHandle, WatchOptions, WatchSink,
};
use std::cell::{Cell, RefCell};

/// Provider that keeps every sink so tests can push samples by hand,
/// including after the session has cancelled the subscription.
#[derive(Default)]
struct ManualGeolocation {
    refuse_watch: Option<GeolocationError>,
    fix: RefCell<Option<GeoPoint>>,
    sinks: RefCell<Vec<WatchSink>>,
    watch_calls: Cell<u64>,
    cancelled: RefCell<Vec<WatchHandle>>,
}

impl ManualGeolocation {
    fn refusing(error: GeolocationError) -> Self {
        Self {
            refuse_watch: Some(error),
            ..Self::default()
        }
    }

    fn sink(&self, index: usize) -> WatchSink {
        self.sinks.borrow()[index].clone()
    }
}

impl GeolocationProvider for ManualGeolocation {
    fn get_once(&self) -> Result<GeoPoint, GeolocationError> {
        (*self.fix.borrow()).ok_or(GeolocationError::Timeout)
    }

    fn watch(&self, sink: WatchSink, _options: WatchOptions) -> Result<WatchHandle, GeolocationError> {
        self.watch_calls.set(self.watch_calls.get() + 1);
        self.sinks.borrow_mut().push(sink);
        match &self.refuse_watch {
            Some(error) => Err(error.clone()),
            None => Ok(WatchHandle(self.watch_calls.get())),
        }
    }

    fn cancel(&self, handle: WatchHandle) {
        self.cancelled.borrow_mut().push(handle);
    }
}

fn point(lat: f64, lng: f64) -> GeoPoint {
    GeoPoint::new(lat, lng)
}

#[test]
fn start_and_stop_are_idempotent() {
    let provider = ManualGeolocation::default();
    let mut session = TrackingSession::new(&provider);
    assert_eq!(session.state(), TrackingState::Idle);

    session.start().unwrap();
    session.start().unwrap();
    assert_eq!(session.state(), TrackingState::Active);
    assert_eq!(provider.watch_calls.get(), 1);

    session.stop();
    session.stop();
    assert_eq!(session.state(), TrackingState::Idle);
    assert_eq!(*provider.cancelled.borrow(), vec![WatchHandle(1)]);
}

#[test]
fn delivered_samples_extend_path_in_order() {
    let provider = ManualGeolocation::default();
    let mut session = TrackingSession::new(&provider);
    session.start().unwrap();

    let sink = provider.sink(0);
    assert!(sink.deliver(point(1.0, 1.0)));
    assert!(sink.deliver(point(2.0, 2.0)));
    assert!(sink.deliver(point(3.0, 3.0)));

    assert_eq!(
        session.path(),
        vec![point(1.0, 1.0), point(2.0, 2.0), point(3.0, 3.0)]
    );
    assert_eq!(session.current_position(), point(3.0, 3.0));
}

#[test]
fn sample_arriving_after_stop_is_dropped() {
    let provider = ManualGeolocation::default();
    let mut session = TrackingSession::new(&provider);
    session.start().unwrap();
    let sink = provider.sink(0);
    assert!(sink.deliver(point(1.0, 1.0)));

    session.stop();

    assert!(!sink.is_live());
    assert!(!sink.deliver(point(9.0, 9.0)));
    assert_eq!(session.path(), vec![point(1.0, 1.0)]);
    assert_eq!(session.current_position(), point(1.0, 1.0));
}

#[test]
fn restart_ignores_sink_from_previous_subscription() {
    let provider = ManualGeolocation::default();
    let mut session = TrackingSession::new(&provider);
    session.start().unwrap();
    session.stop();
    session.start().unwrap();

    let stale = provider.sink(0);
    let fresh = provider.sink(1);

    assert!(!stale.deliver(point(5.0, 5.0)));
    assert!(fresh.deliver(point(6.0, 6.0)));
    assert_eq!(session.path(), vec![point(6.0, 6.0)]);
}

#[test]
fn stop_keeps_path_until_cleared() {
    let provider = ManualGeolocation::default();
    let mut session = TrackingSession::new(&provider);
    session.start().unwrap();
    provider.sink(0).deliver(point(1.0, 2.0));

    session.stop();
    assert_eq!(session.path_len(), 1);

    session.clear_path();
    assert_eq!(session.path_len(), 0);
}

#[test]
fn refused_start_stays_idle_and_ignores_its_sink() {
    let provider = ManualGeolocation::refusing(GeolocationError::PermissionDenied);
    let mut session = TrackingSession::new(&provider);

    assert_eq!(session.start(), Err(GeolocationError::PermissionDenied));
    assert_eq!(session.state(), TrackingState::Idle);
    assert!(!provider.sink(0).deliver(point(1.0, 1.0)));

    session.stop();
    assert!(provider.cancelled.borrow().is_empty());
    assert!(session.path().is_empty());
}

#[test]
fn delivery_error_is_reported_without_leaving_active() {
    let provider = ManualGeolocation::default();
    let mut session = TrackingSession::new(&provider);
    session.start().unwrap();
    let sink = provider.sink(0);

    sink.fail(GeolocationError::Timeout);
    assert!(sink.deliver(point(4.0, 4.0)));

    assert_eq!(session.state(), TrackingState::Active);
    assert_eq!(session.take_notices(), vec![GeolocationError::Timeout]);
    assert!(session.take_notices().is_empty());
    assert_eq!(session.path_len(), 1);
}

#[test]
fn refresh_once_falls_back_to_last_known_position() {
    let provider = ManualGeolocation::default();
    let mut session = TrackingSession::new(&provider);

    assert_eq!(
        session.refresh_once(),
        RefreshOutcome::Fallback(point(35.6812, 139.7671))
    );

    *provider.fix.borrow_mut() = Some(point(43.0, 141.0));
    assert_eq!(session.refresh_once(), RefreshOutcome::Fresh(point(43.0, 141.0)));
    assert_eq!(session.state(), TrackingState::Idle);
    assert!(session.path().is_empty());

    *provider.fix.borrow_mut() = None;
    session.start().unwrap();
    assert_eq!(
        session.refresh_once().position(),
        point(43.0, 141.0)
    );
}

#[test]
fn dropping_active_session_cancels_subscription() {
    let provider = ManualGeolocation::default();
    {
        let mut session = TrackingSession::new(&provider);
        session.start().unwrap();
    }

    assert_eq!(*provider.cancelled.borrow(), vec![WatchHandle(1)]);
    assert!(!provider.sink(0).is_live());
    assert!(!provider.sink(0).deliver(point(1.0, 1.0)));
}

#[test]
fn replay_provider_feeds_fixes_and_notices() {
    let replay = ReplayGeolocation::from_track_text(
        "# lat,lng\n35.0,139.0\nnot a fix\n35.1,139.1\n",
    );
    let mut session = TrackingSession::new(&replay);

    session.start().unwrap();
    session.stop();

    assert_eq!(session.path(), vec![point(35.0, 139.0), point(35.1, 139.1)]);
    assert_eq!(session.take_notices().len(), 1);
    assert_eq!(replay.cancelled_handles().len(), 1);
}
