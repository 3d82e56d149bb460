//! Text encodings for exchanging the marker collection.
//!
//! # Responsibility
//! - Encode an ordered marker list as structured (JSON) or tabular (CSV) text.
//! - Decode either format into a validated `ImportBatch`.
//!
//! # Invariants
//! - Decode never fails for the whole input; bad entries are dropped and
//!   reported as `DecodeIssue`s.
//! - Encode preserves input order.
//! - Range validation is left to the reconciler; decode only guarantees
//!   that coordinates are present and finite.

use crate::model::marker::Marker;
use chrono::NaiveDate;
use std::fmt::{Display, Formatter};

pub mod structured;
pub mod tabular;

/// Supported exchange formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// JSON array of marker objects.
    Structured,
    /// CSV with a fixed header row.
    Tabular,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Structured => "json",
            Self::Tabular => "csv",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Structured => "application/json",
            Self::Tabular => "text/csv",
        }
    }

    /// Derives the format from a file name extension (case-insensitive).
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let (_, extension) = file_name.rsplit_once('.')?;
        match extension.to_ascii_lowercase().as_str() {
            "json" => Some(Self::Structured),
            "csv" => Some(Self::Tabular),
            _ => None,
        }
    }

    /// Suggested export file name, e.g. `gps-targets-2026-10-18.csv`.
    pub fn export_file_name(self, date: NaiveDate) -> String {
        format!(
            "gps-targets-{}.{}",
            date.format("%Y-%m-%d"),
            self.extension()
        )
    }
}

impl Display for ExportFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// Why a single entry was dropped during decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeIssueKind {
    /// Structured entry is not a JSON object.
    NotAnObject,
    /// Latitude or longitude cell/key is absent or empty.
    MissingCoordinate,
    /// Latitude or longitude is not a finite number.
    InvalidCoordinate(String),
    /// Tabular row ended inside a quoted field.
    UnterminatedQuote,
}

impl Display for DecodeIssueKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotAnObject => f.write_str("entry is not an object"),
            Self::MissingCoordinate => f.write_str("lat/lng is missing"),
            Self::InvalidCoordinate(value) => write!(f, "`{value}` is not a finite number"),
            Self::UnterminatedQuote => f.write_str("quoted field is not terminated"),
        }
    }
}

/// One dropped entry. `entry` is the zero-based data row/array index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeIssue {
    pub entry: usize,
    pub kind: DecodeIssueKind,
}

/// Best-effort decode result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportBatch {
    /// Accepted candidates in input order.
    pub markers: Vec<Marker>,
    /// Number of data rows/entries seen in the input.
    pub total_entries: usize,
    /// Dropped entries with reasons.
    pub issues: Vec<DecodeIssue>,
}

impl ImportBatch {
    pub fn skipped_count(&self) -> usize {
        self.total_entries - self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    fn accept(&mut self, marker: Marker) {
        self.total_entries += 1;
        self.markers.push(marker);
    }

    fn reject(&mut self, kind: DecodeIssueKind) {
        self.issues.push(DecodeIssue {
            entry: self.total_entries,
            kind,
        });
        self.total_entries += 1;
    }
}

/// Encodes `markers` in the requested format.
pub fn encode(markers: &[Marker], format: ExportFormat) -> String {
    match format {
        ExportFormat::Structured => structured::encode(markers),
        ExportFormat::Tabular => tabular::encode(markers),
    }
}

/// Decodes `text` in the requested format.
pub fn decode(text: &str, format: ExportFormat) -> ImportBatch {
    match format {
        ExportFormat::Structured => structured::decode(text),
        ExportFormat::Tabular => tabular::decode(text),
    }
}

/// Parses a coordinate cell. Rejects empty, non-numeric and non-finite text.
fn parse_coordinate(raw: Option<&str>) -> Result<f64, DecodeIssueKind> {
    let trimmed = match raw.map(str::trim) {
        Some(value) if !value.is_empty() => value,
        _ => return Err(DecodeIssueKind::MissingCoordinate),
    };
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(DecodeIssueKind::InvalidCoordinate(trimmed.to_string())),
    }
}
