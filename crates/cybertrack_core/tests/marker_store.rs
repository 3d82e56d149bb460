use cybertrack_core::codec::structured;
use cybertrack_core::db::open_db;
use cybertrack_core::{
    CreationSource, GeoPoint, KvRepository, MarkerPatch, MarkerStore, MarkerValidationError,
    MemoryKvRepository, NewMarker, Rank, RepoError, RepoResult, SqliteKvRepository, StoreError,
    STORAGE_KEY,
};
use std::cell::Cell;
use std::collections::HashSet;

fn tokyo() -> GeoPoint {
    GeoPoint::new(35.6812, 139.7671)
}

fn persisted_ids(repo: &MemoryKvRepository) -> Vec<String> {
    let text = repo.get(STORAGE_KEY).unwrap();
    structured::decode(&text)
        .markers
        .into_iter()
        .map(|marker| marker.id)
        .collect()
}

/// Repository whose writes fail until `healthy` is set.
#[derive(Default)]
struct FlakyRepository {
    inner: MemoryKvRepository,
    healthy: Cell<bool>,
}

impl KvRepository for FlakyRepository {
    fn load(&self, key: &str) -> RepoResult<Option<String>> {
        self.inner.load(key)
    }

    fn save(&self, key: &str, value: &str) -> RepoResult<()> {
        if self.healthy.get() {
            self.inner.save(key, value)
        } else {
            Err(RepoError::InvalidData("quota exceeded".to_string()))
        }
    }
}

struct UnreadableRepository;

impl KvRepository for UnreadableRepository {
    fn load(&self, _key: &str) -> RepoResult<Option<String>> {
        Err(RepoError::InvalidData("storage disabled".to_string()))
    }

    fn save(&self, _key: &str, _value: &str) -> RepoResult<()> {
        Ok(())
    }
}

#[test]
fn add_generates_unique_ids_and_persists_each_mutation() {
    let repo = MemoryKvRepository::new();
    let mut store = MarkerStore::load(&repo);

    for _ in 0..50 {
        store
            .add(NewMarker::at(tokyo(), CreationSource::MapClick))
            .unwrap();
    }

    let ids: HashSet<String> = store.markers().iter().map(|m| m.id.clone()).collect();
    assert_eq!(ids.len(), 50);
    assert_eq!(persisted_ids(&repo).len(), 50);
    assert!(store.markers().iter().all(|m| !m.captured_at.is_empty()));
    assert_eq!(store.markers()[0].name.as_deref(), Some("Marked Location"));
}

#[test]
fn add_keeps_insertion_order_and_provided_id() {
    let repo = MemoryKvRepository::new();
    let mut store = MarkerStore::load(&repo);

    let mut draft = NewMarker::at(GeoPoint::new(1.0, 2.0), CreationSource::Import);
    draft.id = Some("fixed".to_string());
    draft.captured_at = Some("08:00:00".to_string());
    store.add(draft).unwrap();
    store
        .add(NewMarker::at(GeoPoint::new(3.0, 4.0), CreationSource::MapClick))
        .unwrap();

    let markers = store.list();
    assert_eq!(markers[0].id, "fixed");
    assert_eq!(markers[0].captured_at, "08:00:00");
    assert_eq!(markers[0].name, None);
    assert_eq!(markers[1].lat, 3.0);
    assert_eq!(persisted_ids(&repo)[0], "fixed");
}

#[test]
fn add_rejects_duplicate_id_and_out_of_range_coordinates() {
    let repo = MemoryKvRepository::new();
    let mut store = MarkerStore::load(&repo);
    let mut draft = NewMarker::at(tokyo(), CreationSource::MapClick);
    draft.id = Some("dup".to_string());
    store.add(draft.clone()).unwrap();

    assert_eq!(
        store.add(draft),
        Err(StoreError::DuplicateId("dup".to_string()))
    );
    assert!(matches!(
        store.add(NewMarker::at(GeoPoint::new(91.0, 0.0), CreationSource::MapClick)),
        Err(StoreError::Validation(MarkerValidationError::LatitudeOutOfRange(_)))
    ));
    assert!(matches!(
        store.add(NewMarker::at(GeoPoint::new(0.0, f64::NAN), CreationSource::MapClick)),
        Err(StoreError::Validation(MarkerValidationError::NonFiniteCoordinate { .. }))
    ));
    assert_eq!(store.len(), 1);
    assert_eq!(persisted_ids(&repo), vec!["dup".to_string()]);
}

#[test]
fn update_merges_present_fields_only() {
    let repo = MemoryKvRepository::new();
    let mut store = MarkerStore::load(&repo);
    let original = store
        .add(NewMarker::at(tokyo(), CreationSource::CurrentPosition))
        .unwrap();

    let updated = store
        .update(
            &original.id,
            &MarkerPatch {
                note: Some("north exit".to_string()),
                rank: Some(Rank::try_from(3_i64).unwrap()),
                ..MarkerPatch::default()
            },
        )
        .unwrap();

    assert_eq!(updated.id, original.id);
    assert_eq!(updated.lat, original.lat);
    assert_eq!(updated.captured_at, original.captured_at);
    assert_eq!(updated.name, original.name);
    assert_eq!(updated.note.as_deref(), Some("north exit"));
    assert_eq!(updated.rank.get(), 3);

    let reloaded = MarkerStore::load(&repo);
    assert_eq!(reloaded.get(&original.id), Some(&updated));
}

#[test]
fn update_of_missing_id_is_not_found() {
    let repo = MemoryKvRepository::new();
    let mut store = MarkerStore::load(&repo);

    let err = store.update("ghost", &MarkerPatch::default()).unwrap_err();

    assert_eq!(err, StoreError::NotFound("ghost".to_string()));
    assert_eq!(repo.get(STORAGE_KEY), None);
}

#[test]
fn remove_missing_id_is_a_no_op() {
    let repo = MemoryKvRepository::new();
    let mut store = MarkerStore::load(&repo);
    let kept = store
        .add(NewMarker::at(tokyo(), CreationSource::MapClick))
        .unwrap();
    let gone = store
        .add(NewMarker::at(tokyo(), CreationSource::MapClick))
        .unwrap();

    assert!(!store.remove("ghost"));
    assert!(store.remove(&gone.id));
    assert!(!store.remove(&gone.id));

    assert_eq!(persisted_ids(&repo), vec![kept.id]);
}

#[test]
fn list_is_a_snapshot() {
    let repo = MemoryKvRepository::new();
    let mut store = MarkerStore::load(&repo);
    store
        .add(NewMarker::at(tokyo(), CreationSource::MapClick))
        .unwrap();

    let snapshot = store.list();
    store
        .add(NewMarker::at(tokyo(), CreationSource::MapClick))
        .unwrap();

    assert_eq!(snapshot.len(), 1);
    assert_eq!(store.len(), 2);
}

#[test]
fn load_drops_duplicate_ids_and_malformed_entries() {
    let repo = MemoryKvRepository::with_entry(
        STORAGE_KEY,
        r#"[
            {"id":"a","lat":1,"lng":2,"capturedAt":"10:00:00","name":"first"},
            {"id":"a","lat":3,"lng":4,"capturedAt":"10:00:01","name":"second"},
            {"id":"b","lng":4},
            {"id":"c","lat":"5.5","lng":"6.5","timestamp":"10:00:02","prefecture":"Kyoto"}
        ]"#,
    );

    let store = MarkerStore::load(&repo);

    assert_eq!(store.len(), 2);
    assert_eq!(store.markers()[0].name.as_deref(), Some("first"));
    let legacy = store.get("c").unwrap();
    assert_eq!(legacy.lat, 5.5);
    assert_eq!(legacy.captured_at, "10:00:02");
    assert_eq!(legacy.region.as_deref(), Some("Kyoto"));
}

#[test]
fn load_of_unparsable_payload_starts_empty() {
    let repo = MemoryKvRepository::with_entry(STORAGE_KEY, "{not json");

    let store = MarkerStore::load(&repo);

    assert!(store.is_empty());
    assert_eq!(store.last_persist_error(), None);
}

#[test]
fn load_failure_starts_empty_and_records_error() {
    let store = MarkerStore::load(UnreadableRepository);

    assert!(store.is_empty());
    assert!(store.last_persist_error().unwrap().contains("storage disabled"));
}

#[test]
fn save_failure_keeps_in_memory_state() {
    let repo = FlakyRepository::default();
    let mut store = MarkerStore::load(&repo);

    let marker = store
        .add(NewMarker::at(tokyo(), CreationSource::MapClick))
        .unwrap();

    assert_eq!(store.len(), 1);
    assert_eq!(store.get(&marker.id), Some(&marker));
    assert!(store.last_persist_error().unwrap().contains("quota exceeded"));
    assert_eq!(repo.inner.get(STORAGE_KEY), None);

    repo.healthy.set(true);
    store
        .add(NewMarker::at(tokyo(), CreationSource::MapClick))
        .unwrap();

    assert_eq!(store.last_persist_error(), None);
    assert_eq!(
        structured::decode(&repo.inner.get(STORAGE_KEY).unwrap())
            .markers
            .len(),
        2
    );
}

#[test]
fn sqlite_backed_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cybertrack.sqlite3");

    let added = {
        let conn = open_db(&path).unwrap();
        let repo = SqliteKvRepository::try_new(&conn).unwrap();
        let mut store = MarkerStore::load(repo);
        let mut draft = NewMarker::at(tokyo(), CreationSource::CurrentPosition);
        draft.region = Some("Tokyo".to_string());
        store.add(draft).unwrap()
    };

    let conn = open_db(&path).unwrap();
    let store = MarkerStore::load(SqliteKvRepository::try_new(&conn).unwrap());

    assert_eq!(store.list(), vec![added]);
}
