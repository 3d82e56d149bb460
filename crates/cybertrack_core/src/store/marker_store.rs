//! Authoritative in-memory marker collection.
//!
//! # Responsibility
//! - Hold markers in insertion order and guarantee id uniqueness.
//! - Persist the whole collection after every mutation.
//!
//! # Invariants
//! - Every mutation builds the next collection and swaps it in whole.
//! - Persistence failures never roll back in-memory state.
//! - The structured codec under `STORAGE_KEY` is the only persisted format.

use crate::codec::structured;
use crate::model::marker::{Marker, MarkerId, MarkerPatch, MarkerValidationError, NewMarker};
use crate::repo::kv_repo::{KvRepository, RepoError};
use log::{error, info};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Fixed persistence key for the marker collection.
pub const STORAGE_KEY: &str = "markedLocations";

pub type StoreResult<T> = Result<T, StoreError>;

/// Store-level logic errors. Persistence failures are not reported here.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    Validation(MarkerValidationError),
    DuplicateId(MarkerId),
    NotFound(MarkerId),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::DuplicateId(id) => write!(f, "marker id already exists: {id}"),
            Self::NotFound(id) => write!(f, "marker not found: {id}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::DuplicateId(_) | Self::NotFound(_) => None,
        }
    }
}

impl From<MarkerValidationError> for StoreError {
    fn from(value: MarkerValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Ordered marker store backed by a key-value repository.
pub struct MarkerStore<R: KvRepository> {
    repo: R,
    markers: Vec<Marker>,
    last_persist_error: Option<String>,
}

impl<R: KvRepository> MarkerStore<R> {
    /// Loads the persisted collection once.
    ///
    /// Missing or unreadable storage yields an empty store; the read failure
    /// is kept in `last_persist_error`.
    pub fn load(repo: R) -> Self {
        let mut store = Self {
            repo,
            markers: Vec::new(),
            last_persist_error: None,
        };

        match store.repo.load(STORAGE_KEY) {
            Ok(Some(text)) => {
                let batch = structured::decode(&text);
                let skipped = batch.skipped_count();
                let mut seen = HashSet::new();
                store.markers = batch
                    .markers
                    .into_iter()
                    .filter(|marker| seen.insert(marker.id.clone()))
                    .collect();
                info!(
                    "event=store_load module=store status=ok count={} skipped={}",
                    store.markers.len(),
                    skipped
                );
            }
            Ok(None) => info!("event=store_load module=store status=empty"),
            Err(err) => {
                error!("event=store_load module=store status=error error={err}");
                store.last_persist_error = Some(err.to_string());
            }
        }

        store
    }

    /// Appends a marker, generating id/timestamp when absent.
    ///
    /// # Errors
    /// - `Validation` when coordinates break the range invariant.
    /// - `DuplicateId` when the provided id is already stored.
    pub fn add(&mut self, draft: NewMarker) -> StoreResult<Marker> {
        let marker = draft.into_marker();
        marker.validate()?;
        if self.get(&marker.id).is_some() {
            return Err(StoreError::DuplicateId(marker.id));
        }

        let mut next = self.markers.clone();
        next.push(marker.clone());
        self.commit(next);

        info!("event=marker_add module=store status=ok id={}", marker.id);
        Ok(marker)
    }

    /// Merges the present fields of `patch` into the marker with `id`.
    pub fn update(&mut self, id: &str, patch: &MarkerPatch) -> StoreResult<Marker> {
        let index = self
            .position(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        let mut next = self.markers.clone();
        next[index].apply_patch(patch);
        let updated = next[index].clone();
        self.commit(next);

        info!("event=marker_update module=store status=ok id={id}");
        Ok(updated)
    }

    /// Removes the marker with `id`. Returns `false` when nothing matched.
    pub fn remove(&mut self, id: &str) -> bool {
        let Some(index) = self.position(id) else {
            return false;
        };

        let mut next = self.markers.clone();
        next.remove(index);
        self.commit(next);

        info!("event=marker_remove module=store status=ok id={id}");
        true
    }

    /// Replaces the whole collection, e.g. with a reconciled import.
    pub fn replace_all(&mut self, markers: Vec<Marker>) {
        self.commit(markers);
    }

    /// Snapshot of the current collection in insertion order.
    pub fn list(&self) -> Vec<Marker> {
        self.markers.clone()
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn get(&self, id: &str) -> Option<&Marker> {
        self.markers.iter().find(|marker| marker.id == id)
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Message of the most recent failed load/save, cleared by the next
    /// successful save.
    pub fn last_persist_error(&self) -> Option<&str> {
        self.last_persist_error.as_deref()
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.markers.iter().position(|marker| marker.id == id)
    }

    fn commit(&mut self, next: Vec<Marker>) {
        self.markers = next;
        match self.persist() {
            Ok(()) => self.last_persist_error = None,
            Err(err) => {
                error!(
                    "event=store_save module=store status=error count={} error={}",
                    self.markers.len(),
                    err
                );
                self.last_persist_error = Some(err.to_string());
            }
        }
    }

    fn persist(&self) -> Result<(), RepoError> {
        let text = structured::encode(&self.markers);
        self.repo.save(STORAGE_KEY, &text)
    }
}
