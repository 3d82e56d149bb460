//! Target use-case service.
//!
//! # Responsibility
//! - Provide add/edit/remove/filter entry points over the marker store.
//! - Attach resolved region labels to newly created markers.
//! - Own the file export/import surface (codec + reconcile + persist).
//!
//! # Invariants
//! - Region lookups never fail a use-case; they fall back to `"Unknown"`.
//! - Import never overwrites or reorders existing markers.
//! - An import that yields no valid candidates leaves the store untouched.

use crate::codec::{self, ExportFormat};
use crate::geo::region::{resolve_region_or_unknown, PlaceHit, RegionResolver};
use crate::model::marker::{
    CreationSource, GeoPoint, Marker, MarkerPatch, NewMarker, UNKNOWN_LOCATION_NAME,
};
use crate::query::filter::{filter_markers, unique_regions, MarkerFilter};
use crate::reconcile::merge;
use crate::repo::kv_repo::KvRepository;
use crate::store::marker_store::{MarkerStore, StoreError};
use chrono::{NaiveDate, Utc};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for target use-cases.
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceError {
    Store(StoreError),
    /// Import file name has no `.json`/`.csv` extension.
    UnsupportedFormat(String),
    /// Export requested while the store is empty.
    NothingToExport,
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "{err}"),
            Self::UnsupportedFormat(file_name) => {
                write!(f, "unsupported import file `{file_name}`; expected .json or .csv")
            }
            Self::NothingToExport => f.write_str("there are no targets to export"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Encoded export ready to be written or downloaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPayload {
    pub format: ExportFormat,
    pub file_name: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Counts reported after an import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// Data rows/entries found in the file.
    pub decoded: usize,
    pub accepted: usize,
    /// Dropped while decoding (malformed row, missing/non-numeric coordinate).
    pub skipped_decode: usize,
    /// Dropped by the reconciler for out-of-range coordinates.
    pub skipped_invalid: usize,
    /// Dropped because the id already exists.
    pub skipped_duplicate: usize,
}

impl ImportReport {
    pub fn skipped(&self) -> usize {
        self.skipped_decode + self.skipped_invalid + self.skipped_duplicate
    }
}

/// Use-case facade over the marker store and region resolver.
pub struct TargetService<R: KvRepository, Z: RegionResolver> {
    store: MarkerStore<R>,
    resolver: Z,
}

impl<R: KvRepository, Z: RegionResolver> TargetService<R, Z> {
    pub fn new(store: MarkerStore<R>, resolver: Z) -> Self {
        Self { store, resolver }
    }

    /// Records a marker at `point` with the default name for `source`.
    pub fn add_at(&mut self, point: GeoPoint, source: CreationSource) -> Result<Marker, ServiceError> {
        self.add_draft(NewMarker::at(point, source))
    }

    /// Records the first hit of a place search.
    pub fn add_search_hit(&mut self, hit: &PlaceHit) -> Result<Marker, ServiceError> {
        let mut draft = NewMarker::at(hit.point, CreationSource::Search);
        draft.name = Some(hit.short_name().unwrap_or(UNKNOWN_LOCATION_NAME).to_string());
        draft.region = hit.region.clone();
        self.add_draft(draft)
    }

    /// Stores a draft, resolving its region when none is set.
    pub fn add_draft(&mut self, mut draft: NewMarker) -> Result<Marker, ServiceError> {
        draft.point.validate().map_err(StoreError::from)?;
        if draft.region.is_none() {
            draft.region = Some(resolve_region_or_unknown(&self.resolver, draft.point));
        }
        Ok(self.store.add(draft)?)
    }

    pub fn edit(&mut self, id: &str, patch: &MarkerPatch) -> Result<Marker, ServiceError> {
        Ok(self.store.update(id, patch)?)
    }

    pub fn remove(&mut self, id: &str) -> bool {
        self.store.remove(id)
    }

    pub fn markers(&self) -> &[Marker] {
        self.store.markers()
    }

    /// Current view under `filter`, recomputed on every call.
    pub fn filtered(&self, filter: &MarkerFilter) -> Vec<&Marker> {
        filter_markers(self.store.markers(), filter)
    }

    pub fn regions(&self) -> Vec<String> {
        unique_regions(self.store.markers())
    }

    /// Exports the whole store, named after today's UTC date.
    pub fn export(&self, format: ExportFormat) -> Result<ExportPayload, ServiceError> {
        self.export_dated(format, Utc::now().date_naive())
    }

    pub fn export_dated(
        &self,
        format: ExportFormat,
        date: NaiveDate,
    ) -> Result<ExportPayload, ServiceError> {
        if self.store.is_empty() {
            return Err(ServiceError::NothingToExport);
        }
        let text = codec::encode(self.store.markers(), format);
        info!(
            "event=export module=service status=ok format={} count={}",
            format,
            self.store.len()
        );
        Ok(ExportPayload {
            format,
            file_name: format.export_file_name(date),
            mime_type: format.mime_type(),
            bytes: text.into_bytes(),
        })
    }

    /// Decodes `content` (format from `file_name`), merges it into the
    /// store and persists the result.
    pub fn import(&mut self, file_name: &str, content: &str) -> Result<ImportReport, ServiceError> {
        let format = ExportFormat::from_file_name(file_name)
            .ok_or_else(|| ServiceError::UnsupportedFormat(file_name.to_string()))?;

        let batch = codec::decode(content, format);
        let mut report = ImportReport {
            decoded: batch.total_entries,
            skipped_decode: batch.skipped_count(),
            ..ImportReport::default()
        };

        if !batch.is_empty() {
            let outcome = merge(self.store.markers(), batch.markers);
            report.accepted = outcome.accepted;
            report.skipped_invalid = outcome.skipped_invalid;
            report.skipped_duplicate = outcome.skipped_duplicate;
            if outcome.accepted > 0 {
                self.store.replace_all(outcome.markers);
            }
        }

        info!(
            "event=import_merge module=service status=ok format={} decoded={} accepted={} skipped={}",
            format,
            report.decoded,
            report.accepted,
            report.skipped()
        );
        Ok(report)
    }

    pub fn store(&self) -> &MarkerStore<R> {
        &self.store
    }
}
