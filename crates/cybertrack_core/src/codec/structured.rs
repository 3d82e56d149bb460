//! Structured (JSON) marker codec.
//!
//! # Responsibility
//! - Serialize the full marker shape as an order-preserving JSON array.
//! - Decode JSON arrays entry by entry, skipping entries that are not
//!   well-formed marker objects.
//!
//! # Invariants
//! - `decode(encode(list))` reproduces `list` field-for-field.
//! - A non-array (or unparsable) payload decodes to an empty batch.
//! - Legacy `timestamp`/`prefecture` keys are accepted on decode only.
//! - Empty label strings decode as absent, matching the tabular codec.

use super::{parse_coordinate, DecodeIssueKind, ImportBatch};
use crate::model::marker::{captured_now, new_marker_id, non_empty_label, Marker, Rank};
use log::warn;
use serde_json::{Map, Value};

/// Encodes markers as a pretty-printed JSON array.
pub fn encode(markers: &[Marker]) -> String {
    match serde_json::to_string_pretty(markers) {
        Ok(text) => text,
        Err(err) => {
            warn!(
                "event=codec_encode module=codec status=error format=json count={} error={}",
                markers.len(),
                err
            );
            "[]".to_string()
        }
    }
}

/// Decodes a JSON array into an import batch.
pub fn decode(text: &str) -> ImportBatch {
    let mut batch = ImportBatch::default();
    let entries = match serde_json::from_str::<Value>(text) {
        Ok(Value::Array(entries)) => entries,
        Ok(_) => {
            warn!("event=codec_decode module=codec status=skipped format=json reason=not_array");
            return batch;
        }
        Err(err) => {
            warn!(
                "event=codec_decode module=codec status=skipped format=json reason=invalid_json line={} column={}",
                err.line(),
                err.column()
            );
            return batch;
        }
    };

    for entry in entries {
        let Value::Object(object) = entry else {
            batch.reject(DecodeIssueKind::NotAnObject);
            continue;
        };
        match marker_from_object(&object) {
            Ok(marker) => batch.accept(marker),
            Err(kind) => batch.reject(kind),
        }
    }

    batch
}

fn marker_from_object(object: &Map<String, Value>) -> Result<Marker, DecodeIssueKind> {
    let lat = parse_coordinate(scalar_text(object.get("lat")).as_deref())?;
    let lng = parse_coordinate(scalar_text(object.get("lng")).as_deref())?;

    let id = scalar_text(object.get("id"))
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(new_marker_id);
    let captured_at = string_field(object, "capturedAt")
        .or_else(|| string_field(object, "timestamp"))
        .unwrap_or_else(captured_now);
    let rank = object.get("rank").map(rank_value).unwrap_or_default();

    Ok(Marker {
        id,
        lat,
        lng,
        captured_at,
        name: string_field(object, "name"),
        note: string_field(object, "note"),
        rank,
        region: string_field(object, "region").or_else(|| string_field(object, "prefecture")),
    })
}

fn string_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    match object.get(key) {
        Some(Value::String(value)) => non_empty_label(Some(value.clone())),
        _ => None,
    }
}

/// Integral numbers (including `2.0`) and numeric strings map to a rank;
/// anything else falls back to the default.
fn rank_value(value: &Value) -> Rank {
    match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| {
                number
                    .as_f64()
                    .filter(|raw| raw.is_finite() && raw.fract() == 0.0)
                    .map(|raw| raw as i64)
            })
            .and_then(|raw| Rank::try_from(raw).ok())
            .unwrap_or_default(),
        Value::String(text) => Rank::parse_lenient(text),
        _ => Rank::DEFAULT,
    }
}

/// Numbers and strings both count as scalar text; everything else is absent.
fn scalar_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}
