use chrono::NaiveDate;
use cybertrack_core::{
    CreationSource, ExportFormat, GeoPoint, ImportReport, MarkerFilter, MarkerPatch, MarkerStore,
    MemoryKvRepository, PlaceHit, Rank, RegionError, RegionResolver, ServiceError, TargetService,
    UnknownRegionResolver, STORAGE_KEY,
};
use std::cell::Cell;

struct FixedRegion {
    region: &'static str,
    calls: Cell<usize>,
}

impl FixedRegion {
    fn new(region: &'static str) -> Self {
        Self {
            region,
            calls: Cell::new(0),
        }
    }
}

impl RegionResolver for FixedRegion {
    fn resolve_region(&self, _point: GeoPoint) -> Result<String, RegionError> {
        self.calls.set(self.calls.get() + 1);
        Ok(self.region.to_string())
    }
}

struct OfflineResolver;

impl RegionResolver for OfflineResolver {
    fn resolve_region(&self, _point: GeoPoint) -> Result<String, RegionError> {
        Err(RegionError::InvalidResponse("network down".to_string()))
    }
}

fn service<Z: RegionResolver>(
    repo: &MemoryKvRepository,
    resolver: Z,
) -> TargetService<&MemoryKvRepository, Z> {
    TargetService::new(MarkerStore::load(repo), resolver)
}

fn rank(value: i64) -> Rank {
    Rank::try_from(value).unwrap()
}

fn export_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
}

#[test]
fn add_at_resolves_region_and_uses_default_name() {
    let repo = MemoryKvRepository::new();
    let resolver = FixedRegion::new("Tokyo");
    let mut service = service(&repo, &resolver);

    let marker = service
        .add_at(GeoPoint::new(35.68, 139.76), CreationSource::CurrentPosition)
        .unwrap();

    assert_eq!(marker.name.as_deref(), Some("Marked Location"));
    assert_eq!(marker.region.as_deref(), Some("Tokyo"));
    assert_eq!(marker.rank, Rank::DEFAULT);
    assert_eq!(resolver.calls.get(), 1);
    assert!(repo.get(STORAGE_KEY).unwrap().contains(&marker.id));
}

#[test]
fn region_lookup_failure_falls_back_to_unknown() {
    let repo = MemoryKvRepository::new();
    let mut service = service(&repo, OfflineResolver);

    let marker = service
        .add_at(GeoPoint::new(10.0, 10.0), CreationSource::MapClick)
        .unwrap();

    assert_eq!(marker.region.as_deref(), Some("Unknown"));
}

#[test]
fn add_at_rejects_invalid_point_before_region_lookup() {
    let repo = MemoryKvRepository::new();
    let resolver = FixedRegion::new("Tokyo");
    let mut service = service(&repo, &resolver);

    let err = service
        .add_at(GeoPoint::new(0.0, 181.0), CreationSource::MapClick)
        .unwrap_err();

    assert!(matches!(err, ServiceError::Store(_)));
    assert_eq!(resolver.calls.get(), 0);
    assert!(service.markers().is_empty());
}

#[test]
fn search_hit_uses_short_name_and_reported_region() {
    let repo = MemoryKvRepository::new();
    let resolver = FixedRegion::new("ignored");
    let mut service = service(&repo, &resolver);
    let hit = PlaceHit {
        point: GeoPoint::new(35.6580, 139.7016),
        display_name: "Shibuya Station, Shibuya, Tokyo, Japan".to_string(),
        region: Some("Tokyo".to_string()),
    };

    let marker = service.add_search_hit(&hit).unwrap();

    assert_eq!(marker.name.as_deref(), Some("Shibuya Station"));
    assert_eq!(marker.region.as_deref(), Some("Tokyo"));
    assert_eq!(resolver.calls.get(), 0);
}

#[test]
fn edit_and_remove_go_through_store() {
    let repo = MemoryKvRepository::new();
    let mut service = service(&repo, UnknownRegionResolver);
    let marker = service
        .add_at(GeoPoint::new(1.0, 1.0), CreationSource::MapClick)
        .unwrap();

    let edited = service
        .edit(
            &marker.id,
            &MarkerPatch {
                name: Some("Depot".to_string()),
                ..MarkerPatch::default()
            },
        )
        .unwrap();
    assert_eq!(edited.name.as_deref(), Some("Depot"));

    assert!(matches!(
        service.edit("ghost", &MarkerPatch::default()),
        Err(ServiceError::Store(_))
    ));
    assert!(service.remove(&marker.id));
    assert!(!service.remove(&marker.id));
}

#[test]
fn filtered_applies_rank_and_region_together() {
    let repo = MemoryKvRepository::new();
    let mut service = service(&repo, UnknownRegionResolver);
    let points = [
        (rank(2), "Tokyo"),
        (rank(2), "Osaka"),
        (rank(3), "Tokyo"),
        (rank(2), "Tokyo"),
    ];
    for (marker_rank, region) in points {
        let marker = service
            .add_at(GeoPoint::new(35.0, 139.0), CreationSource::MapClick)
            .unwrap();
        service
            .edit(
                &marker.id,
                &MarkerPatch {
                    rank: Some(marker_rank),
                    region: Some(region.to_string()),
                    ..MarkerPatch::default()
                },
            )
            .unwrap();
    }

    let both = service.filtered(&MarkerFilter {
        rank: Some(rank(2)),
        region: Some("Tokyo".to_string()),
    });
    let everything = service.filtered(&MarkerFilter::default());

    assert_eq!(both.len(), 2);
    assert!(both
        .iter()
        .all(|m| m.rank == rank(2) && m.region.as_deref() == Some("Tokyo")));
    assert_eq!(everything.len(), 4);
    assert_eq!(service.regions(), vec!["Osaka".to_string(), "Tokyo".to_string()]);
}

#[test]
fn export_of_empty_store_is_refused() {
    let repo = MemoryKvRepository::new();
    let service = service(&repo, UnknownRegionResolver);

    assert_eq!(
        service.export_dated(ExportFormat::Structured, export_date()),
        Err(ServiceError::NothingToExport)
    );
}

#[test]
fn export_names_file_by_date_and_format() {
    let repo = MemoryKvRepository::new();
    let mut service = service(&repo, UnknownRegionResolver);
    service
        .add_at(GeoPoint::new(1.0, 2.0), CreationSource::MapClick)
        .unwrap();

    let csv = service
        .export_dated(ExportFormat::Tabular, export_date())
        .unwrap();
    let json = service
        .export_dated(ExportFormat::Structured, export_date())
        .unwrap();

    assert_eq!(csv.file_name, "gps-targets-2026-10-18.csv");
    assert_eq!(csv.mime_type, "text/csv");
    assert!(String::from_utf8(csv.bytes)
        .unwrap()
        .starts_with("id,name,lat,lng,capturedAt,note,rank,region"));
    assert_eq!(json.file_name, "gps-targets-2026-10-18.json");
    assert_eq!(json.mime_type, "application/json");
}

#[test]
fn reimporting_own_export_is_idempotent_for_both_formats() {
    for format in [ExportFormat::Structured, ExportFormat::Tabular] {
        let repo = MemoryKvRepository::new();
        let mut service = service(&repo, UnknownRegionResolver);
        for lat in [10.0, 20.0, 30.0] {
            service
                .add_at(GeoPoint::new(lat, 100.0), CreationSource::MapClick)
                .unwrap();
        }
        let before = service.markers().to_vec();
        let payload = service.export_dated(format, export_date()).unwrap();
        let content = String::from_utf8(payload.bytes).unwrap();

        let report = service.import(&payload.file_name, &content).unwrap();

        assert_eq!(report.decoded, 3, "format {format}");
        assert_eq!(report.accepted, 0, "format {format}");
        assert_eq!(report.skipped_duplicate, 3, "format {format}");
        assert_eq!(service.markers(), before.as_slice(), "format {format}");
    }
}

#[test]
fn import_into_fresh_store_restores_export() {
    let source_repo = MemoryKvRepository::new();
    let mut source = service(&source_repo, UnknownRegionResolver);
    source
        .add_at(GeoPoint::new(43.06, 141.35), CreationSource::MapClick)
        .unwrap();
    source
        .add_at(GeoPoint::new(34.69, 135.50), CreationSource::CurrentPosition)
        .unwrap();
    let payload = source
        .export_dated(ExportFormat::Tabular, export_date())
        .unwrap();

    let target_repo = MemoryKvRepository::new();
    let mut target = service(&target_repo, UnknownRegionResolver);
    let report = target
        .import(&payload.file_name, &String::from_utf8(payload.bytes).unwrap())
        .unwrap();

    assert_eq!(report.accepted, 2);
    assert_eq!(target.markers(), source.markers());
    assert!(target_repo.get(STORAGE_KEY).is_some());
}

#[test]
fn import_rejects_out_of_range_coordinates_and_keeps_valid_rows() {
    let repo = MemoryKvRepository::new();
    let mut service = service(&repo, UnknownRegionResolver);

    let report = service
        .import(
            "targets.JSON",
            r#"[
                {"id":"north","lat":200,"lng":0,"capturedAt":"t"},
                {"id":"west","lat":0,"lng":-200,"capturedAt":"t"},
                {"id":"ok","lat":45,"lng":90,"capturedAt":"t"},
                {"id":"broken","lng":1}
            ]"#,
        )
        .unwrap();

    assert_eq!(report.decoded, 4);
    assert_eq!(report.accepted, 1);
    assert_eq!(report.skipped_invalid, 2);
    assert_eq!(report.skipped_decode, 1);
    assert_eq!(report.skipped(), 3);
    assert_eq!(service.markers().len(), 1);
    assert_eq!(service.markers()[0].id, "ok");
}

#[test]
fn import_with_nothing_accepted_leaves_storage_untouched() {
    let repo = MemoryKvRepository::new();
    let mut service = service(&repo, UnknownRegionResolver);

    let report = service.import("empty.csv", "").unwrap();

    assert_eq!(report, ImportReport::default());
    assert_eq!(repo.get(STORAGE_KEY), None);
}

#[test]
fn import_appends_after_existing_markers() {
    let repo = MemoryKvRepository::new();
    let mut service = service(&repo, UnknownRegionResolver);
    let existing = service
        .add_at(GeoPoint::new(1.0, 1.0), CreationSource::MapClick)
        .unwrap();

    service
        .import(
            "more.csv",
            "id,name,lat,lng\nnew-1,First,2,2\nnew-2,Second,3,3\n",
        )
        .unwrap();

    let ids: Vec<&str> = service.markers().iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec![existing.id.as_str(), "new-1", "new-2"]);
}

#[test]
fn import_of_unknown_extension_is_unsupported() {
    let repo = MemoryKvRepository::new();
    let mut service = service(&repo, UnknownRegionResolver);

    assert_eq!(
        service.import("targets.xml", "<targets/>"),
        Err(ServiceError::UnsupportedFormat("targets.xml".to_string()))
    );
    assert_eq!(
        service.import("no_extension", "[]"),
        Err(ServiceError::UnsupportedFormat("no_extension".to_string()))
    );
}
