//! Core domain logic for CyberTrack.
//! This crate is the single source of truth for target data invariants.

pub mod codec;
pub mod db;
pub mod geo;
pub mod logging;
pub mod model;
pub mod query;
pub mod reconcile;
pub mod repo;
pub mod service;
pub mod store;
pub mod tracking;

pub use codec::{DecodeIssue, DecodeIssueKind, ExportFormat, ImportBatch};
pub use geo::nominatim::NominatimClient;
pub use geo::region::{
    resolve_region_or_unknown, PlaceHit, PlaceSearch, RegionError, RegionResolver,
    UnknownRegionResolver,
};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::marker::{
    CreationSource, GeoPoint, Marker, MarkerId, MarkerPatch, MarkerValidationError, NewMarker,
    Rank,
};
pub use query::filter::{filter_markers, unique_regions, MarkerFilter};
pub use reconcile::{merge, MergeOutcome};
pub use repo::kv_repo::{
    KvRepository, MemoryKvRepository, RepoError, RepoResult, SqliteKvRepository,
};
pub use service::target_service::{ExportPayload, ImportReport, ServiceError, TargetService};
pub use store::marker_store::{MarkerStore, StoreError, StoreResult, STORAGE_KEY};
pub use tracking::geolocation::{GeolocationError, GeolocationProvider, WatchHandle, WatchOptions};
pub use tracking::replay::ReplayGeolocation;
pub use tracking::session::{RefreshOutcome, TrackingSession, TrackingState, WatchSink};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
