//! Marker (target) domain model.
//!
//! # Responsibility
//! - Define the canonical geo-referenced record kept by the store.
//! - Own coordinate validation and rank normalization rules.
//! - Provide effective-value helpers for optional labels.
//!
//! # Invariants
//! - `id` is stable and never reassigned once a marker is stored.
//! - A valid marker has finite `lat` in `[-90, 90]` and `lng` in `[-180, 180]`.
//! - `rank` is always one of `1..=4`.
//! - Optional labels are never `Some("")`; empty text means absent.

use chrono::Local;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Opaque marker identifier. Generated ids are UUID v4 strings, imported
/// ids are kept verbatim.
pub type MarkerId = String;

/// Effective region for markers without a resolved label.
pub const UNKNOWN_REGION: &str = "Unknown";
/// Default label for markers recorded from a position or map click.
pub const MARKED_LOCATION_NAME: &str = "Marked Location";
/// Display label for markers that carry no name at all.
pub const UNKNOWN_LOCATION_NAME: &str = "Unknown Location";

const CAPTURED_AT_FORMAT: &str = "%H:%M:%S";

/// Generates a fresh marker id.
pub fn new_marker_id() -> MarkerId {
    Uuid::new_v4().to_string()
}

/// Returns the display timestamp used for newly captured markers.
pub fn captured_now() -> String {
    Local::now().format(CAPTURED_AT_FORMAT).to_string()
}

/// Maps empty label text to `None`.
pub(crate) fn non_empty_label(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.is_empty())
}

/// Validation failures for marker coordinates and rank values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MarkerValidationError {
    NonFiniteCoordinate { lat: f64, lng: f64 },
    LatitudeOutOfRange(f64),
    LongitudeOutOfRange(f64),
    InvalidRank(i64),
}

impl Display for MarkerValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonFiniteCoordinate { lat, lng } => {
                write!(f, "coordinate must be finite, got ({lat}, {lng})")
            }
            Self::LatitudeOutOfRange(lat) => {
                write!(f, "latitude {lat} is outside [-90, 90]")
            }
            Self::LongitudeOutOfRange(lng) => {
                write!(f, "longitude {lng} is outside [-180, 180]")
            }
            Self::InvalidRank(value) => write!(f, "rank {value} is outside 1..=4"),
        }
    }
}

impl Error for MarkerValidationError {}

/// A single `{lat, lng}` position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Checks finiteness and the WGS84 coordinate ranges.
    pub fn validate(&self) -> Result<(), MarkerValidationError> {
        if !self.lat.is_finite() || !self.lng.is_finite() {
            return Err(MarkerValidationError::NonFiniteCoordinate {
                lat: self.lat,
                lng: self.lng,
            });
        }
        if !(-90.0..=90.0).contains(&self.lat) {
            return Err(MarkerValidationError::LatitudeOutOfRange(self.lat));
        }
        if !(-180.0..=180.0).contains(&self.lng) {
            return Err(MarkerValidationError::LongitudeOutOfRange(self.lng));
        }
        Ok(())
    }
}

impl Display for GeoPoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4} N / {:.4} E", self.lat, self.lng)
    }
}

/// Classification tag in `1..=4`. Drives color/priority only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Rank(u8);

impl Rank {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 4;
    pub const DEFAULT: Rank = Rank(1);

    pub fn get(self) -> u8 {
        self.0
    }

    /// Parses user/imported text, falling back to `Rank::DEFAULT` on any failure.
    pub fn parse_lenient(value: &str) -> Self {
        value
            .trim()
            .parse::<i64>()
            .ok()
            .and_then(|parsed| Rank::try_from(parsed).ok())
            .unwrap_or_default()
    }
}

impl Default for Rank {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<i64> for Rank {
    type Error = MarkerValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if (i64::from(Self::MIN)..=i64::from(Self::MAX)).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(MarkerValidationError::InvalidRank(value))
        }
    }
}

impl From<Rank> for u8 {
    fn from(value: Rank) -> Self {
        value.0
    }
}

impl Display for Rank {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a marker came into existence. Decides the default name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreationSource {
    /// Recorded at the device's current position.
    CurrentPosition,
    /// Picked on the map surface.
    MapClick,
    /// Created from a place search hit.
    Search,
    /// Decoded from an import file.
    Import,
}

impl CreationSource {
    /// Default label for markers created through this path.
    ///
    /// `None` means the name stays absent and `Marker::display_name` applies.
    pub fn default_name(self) -> Option<&'static str> {
        match self {
            Self::CurrentPosition | Self::MapClick => Some(MARKED_LOCATION_NAME),
            Self::Search => Some(UNKNOWN_LOCATION_NAME),
            Self::Import => None,
        }
    }
}

/// Canonical stored target record.
///
/// Optional labels stay optional on the wire so that structured exports
/// round-trip without inventing values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Marker {
    pub id: MarkerId,
    pub lat: f64,
    pub lng: f64,
    pub captured_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default)]
    pub rank: Rank,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

impl Marker {
    /// Creates a marker at `point` with a generated id and a current timestamp.
    pub fn new(point: GeoPoint) -> Self {
        Self::with_id(new_marker_id(), point)
    }

    /// Creates a marker with a caller-provided id.
    ///
    /// Used by import paths where identity already exists externally.
    pub fn with_id(id: impl Into<MarkerId>, point: GeoPoint) -> Self {
        Self {
            id: id.into(),
            lat: point.lat,
            lng: point.lng,
            captured_at: captured_now(),
            name: None,
            note: None,
            rank: Rank::DEFAULT,
            region: None,
        }
    }

    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lng)
    }

    pub fn validate(&self) -> Result<(), MarkerValidationError> {
        self.point().validate()
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(UNKNOWN_LOCATION_NAME)
    }

    pub fn effective_note(&self) -> &str {
        self.note.as_deref().unwrap_or("")
    }

    pub fn effective_region(&self) -> &str {
        self.region.as_deref().unwrap_or(UNKNOWN_REGION)
    }

    /// Applies only the fields present in `patch`. Identity, position and
    /// capture time are left untouched.
    pub fn apply_patch(&mut self, patch: &MarkerPatch) {
        if let Some(name) = &patch.name {
            self.name = non_empty_label(Some(name.clone()));
        }
        if let Some(note) = &patch.note {
            self.note = non_empty_label(Some(note.clone()));
        }
        if let Some(rank) = patch.rank {
            self.rank = rank;
        }
        if let Some(region) = &patch.region {
            self.region = non_empty_label(Some(region.clone()));
        }
    }
}

/// Partial edit of a stored marker.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkerPatch {
    pub name: Option<String>,
    pub note: Option<String>,
    pub rank: Option<Rank>,
    pub region: Option<String>,
}

impl MarkerPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.note.is_none() && self.rank.is_none() && self.region.is_none()
    }
}

/// Marker draft accepted by the store. `id` and `captured_at` are filled
/// in when absent.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMarker {
    pub id: Option<MarkerId>,
    pub point: GeoPoint,
    pub captured_at: Option<String>,
    pub name: Option<String>,
    pub note: Option<String>,
    pub rank: Rank,
    pub region: Option<String>,
}

impl NewMarker {
    /// Draft at `point` with the default name for `source`.
    pub fn at(point: GeoPoint, source: CreationSource) -> Self {
        Self {
            id: None,
            point,
            captured_at: None,
            name: source.default_name().map(str::to_string),
            note: None,
            rank: Rank::DEFAULT,
            region: None,
        }
    }

    /// Resolves the draft into a full marker, generating missing identity
    /// and timestamp values.
    pub fn into_marker(self) -> Marker {
        let id = self
            .id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(new_marker_id);
        Marker {
            id,
            lat: self.point.lat,
            lng: self.point.lng,
            captured_at: self.captured_at.unwrap_or_else(captured_now),
            name: non_empty_label(self.name),
            note: non_empty_label(self.note),
            rank: self.rank,
            region: non_empty_label(self.region),
        }
    }
}

impl From<Marker> for NewMarker {
    fn from(marker: Marker) -> Self {
        Self {
            point: marker.point(),
            id: Some(marker.id),
            captured_at: Some(marker.captured_at),
            name: marker.name,
            note: marker.note,
            rank: marker.rank,
            region: marker.region,
        }
    }
}
