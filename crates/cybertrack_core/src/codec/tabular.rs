//! Tabular (CSV) marker codec.
//!
//! # Responsibility
//! - Emit a fixed header plus one row per marker with minimal quoting.
//! - Scan CSV text with an explicit quoted/unquoted state machine so that
//!   delimiters, quotes and line breaks inside quoted fields survive.
//!
//! # Invariants
//! - Column order is `id,name,lat,lng,capturedAt,note,rank,region`.
//! - Numeric columns are never quoted.
//! - Text with leading or trailing whitespace is quoted, so bare-cell
//!   trimming on decode never alters a stored value.
//! - One malformed row never aborts decoding of the rows after it.

use super::{parse_coordinate, DecodeIssueKind, ImportBatch};
use crate::model::marker::{captured_now, new_marker_id, Marker, Rank};

const DELIMITER: char = ',';
const QUOTE: char = '"';

/// Header columns in emitted order.
pub const HEADER: [&str; 8] = [
    "id",
    "name",
    "lat",
    "lng",
    "capturedAt",
    "note",
    "rank",
    "region",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Id,
    Name,
    Lat,
    Lng,
    CapturedAt,
    Note,
    Rank,
    Region,
}

impl Column {
    fn from_header(name: &str) -> Option<Self> {
        match name {
            "id" => Some(Self::Id),
            "name" => Some(Self::Name),
            "lat" => Some(Self::Lat),
            "lng" => Some(Self::Lng),
            "capturedAt" | "timestamp" => Some(Self::CapturedAt),
            "note" => Some(Self::Note),
            "rank" => Some(Self::Rank),
            "region" | "prefecture" => Some(Self::Region),
            _ => None,
        }
    }
}

/// Encodes markers as CSV text with a header row.
pub fn encode(markers: &[Marker]) -> String {
    let mut lines = Vec::with_capacity(markers.len() + 1);
    lines.push(HEADER.join(","));

    for marker in markers {
        let cells = [
            quote_text(&marker.id),
            quote_text(marker.name.as_deref().unwrap_or("")),
            marker.lat.to_string(),
            marker.lng.to_string(),
            quote_text(&marker.captured_at),
            quote_text(marker.note.as_deref().unwrap_or("")),
            marker.rank.to_string(),
            quote_text(marker.region.as_deref().unwrap_or("")),
        ];
        lines.push(cells.join(","));
    }

    lines.join("\n")
}

fn quote_text(value: &str) -> String {
    if value.contains([DELIMITER, QUOTE, '\n', '\r']) || value != value.trim() {
        format!("\"{}\"", value.replace(QUOTE, "\"\""))
    } else {
        value.to_string()
    }
}

/// Decodes CSV text into an import batch.
///
/// The first non-blank row is the header. Unknown header names are ignored
/// and missing columns fall back to marker defaults.
pub fn decode(text: &str) -> ImportBatch {
    let mut batch = ImportBatch::default();
    let mut rows = scan(text.strip_prefix('\u{feff}').unwrap_or(text)).into_iter();

    let Some(header) = rows.next() else {
        return batch;
    };
    let columns: Vec<Option<Column>> = header
        .cells
        .iter()
        .map(|cell| Column::from_header(cell.value.trim()))
        .collect();

    for row in rows {
        if row.unterminated {
            batch.reject(DecodeIssueKind::UnterminatedQuote);
            continue;
        }
        match marker_from_row(&columns, &row) {
            Ok(marker) => batch.accept(marker),
            Err(kind) => batch.reject(kind),
        }
    }

    batch
}

fn marker_from_row(columns: &[Option<Column>], row: &ScannedRow) -> Result<Marker, DecodeIssueKind> {
    let cell = |wanted: Column| -> Option<String> {
        columns
            .iter()
            .position(|column| *column == Some(wanted))
            .and_then(|index| row.cells.get(index))
            .map(Cell::text)
            .filter(|value| !value.is_empty())
    };

    let lat = parse_coordinate(cell(Column::Lat).as_deref())?;
    let lng = parse_coordinate(cell(Column::Lng).as_deref())?;

    Ok(Marker {
        id: cell(Column::Id).unwrap_or_else(new_marker_id),
        lat,
        lng,
        captured_at: cell(Column::CapturedAt).unwrap_or_else(captured_now),
        name: cell(Column::Name),
        note: cell(Column::Note),
        rank: cell(Column::Rank)
            .map(|raw| Rank::parse_lenient(&raw))
            .unwrap_or_default(),
        region: cell(Column::Region),
    })
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Cell {
    value: String,
    quoted: bool,
}

impl Cell {
    /// Quoted content is kept verbatim; bare content is trimmed.
    fn text(&self) -> String {
        if self.quoted {
            self.value.clone()
        } else {
            self.value.trim().to_string()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
struct ScannedRow {
    cells: Vec<Cell>,
    unterminated: bool,
}

impl ScannedRow {
    fn is_blank(&self) -> bool {
        match self.cells.as_slice() {
            [] => true,
            [only] => !only.quoted && only.value.trim().is_empty(),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Unquoted,
    Quoted,
}

/// Splits CSV text into rows of cells, honoring quote state across
/// delimiters and line breaks. Blank rows are dropped.
fn scan(text: &str) -> Vec<ScannedRow> {
    let mut rows = Vec::new();
    let mut row = ScannedRow::default();
    let mut cell = Cell::default();
    let mut state = ScanState::Unquoted;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match state {
            ScanState::Quoted => {
                if ch == QUOTE {
                    if chars.peek() == Some(&QUOTE) {
                        chars.next();
                        cell.value.push(QUOTE);
                    } else {
                        state = ScanState::Unquoted;
                    }
                } else {
                    cell.value.push(ch);
                }
            }
            ScanState::Unquoted => match ch {
                QUOTE => {
                    cell.quoted = true;
                    state = ScanState::Quoted;
                }
                DELIMITER => row.cells.push(std::mem::take(&mut cell)),
                '\r' | '\n' => {
                    if ch == '\r' && chars.peek() == Some(&'\n') {
                        chars.next();
                    }
                    row.cells.push(std::mem::take(&mut cell));
                    let finished = std::mem::take(&mut row);
                    if !finished.is_blank() {
                        rows.push(finished);
                    }
                }
                _ => cell.value.push(ch),
            },
        }
    }

    row.unterminated = state == ScanState::Quoted;
    row.cells.push(cell);
    if row.unterminated || !row.is_blank() {
        rows.push(row);
    }

    rows
}
