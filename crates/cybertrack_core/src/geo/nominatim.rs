//! Nominatim (OpenStreetMap) HTTP backend for region lookup and place search.
//!
//! # Responsibility
//! - Issue blocking reverse/search requests.
//! - Extract region labels from Nominatim address details.
//!
//! # Invariants
//! - Response parsing is pure and independent of the HTTP client.
//! - Region preference is `address.province`, then `address.state`.

use super::region::{PlaceHit, PlaceSearch, RegionError, RegionResolver};
use crate::model::marker::{GeoPoint, UNKNOWN_REGION};
use log::debug;
use reqwest::blocking::Client;
use reqwest::Url;
use serde_json::Value;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://nominatim.openstreetmap.org";
const USER_AGENT: &str = concat!("cybertrack/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const REVERSE_ZOOM: &str = "10";

/// Blocking Nominatim client.
pub struct NominatimClient {
    base_url: String,
    client: Client,
}

impl NominatimClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, RegionError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    fn get_json(&self, path: &str, params: &[(&str, &str)]) -> Result<Value, RegionError> {
        let url = Url::parse_with_params(&format!("{}/{path}", self.base_url), params)
            .map_err(|err| RegionError::InvalidResponse(format!("bad request url: {err}")))?;
        let value = self
            .client
            .get(url)
            .send()?
            .error_for_status()?
            .json::<Value>()?;
        Ok(value)
    }
}

impl RegionResolver for NominatimClient {
    fn resolve_region(&self, point: GeoPoint) -> Result<String, RegionError> {
        let lat = point.lat.to_string();
        let lng = point.lng.to_string();
        let body = self.get_json(
            "reverse",
            &[
                ("format", "json"),
                ("lat", lat.as_str()),
                ("lon", lng.as_str()),
                ("zoom", REVERSE_ZOOM),
            ],
        )?;
        let region = parse_reverse_region(&body);
        debug!("event=region_resolve module=geo status=ok source=nominatim");
        Ok(region)
    }
}

impl PlaceSearch for NominatimClient {
    fn search(&self, query: &str) -> Result<Option<PlaceHit>, RegionError> {
        let body = self.get_json(
            "search",
            &[("format", "json"), ("addressdetails", "1"), ("q", query)],
        )?;
        parse_search_hit(&body)
    }
}

/// Extracts the region label from a `/reverse` response body.
pub fn parse_reverse_region(body: &Value) -> String {
    address_region(body).unwrap_or_else(|| UNKNOWN_REGION.to_string())
}

/// Extracts the first hit from a `/search` response body.
///
/// An empty array is `Ok(None)`; a non-array body or a hit without usable
/// coordinates is an `InvalidResponse`.
pub fn parse_search_hit(body: &Value) -> Result<Option<PlaceHit>, RegionError> {
    let hits = body
        .as_array()
        .ok_or_else(|| RegionError::InvalidResponse("search body is not an array".to_string()))?;
    let Some(first) = hits.first() else {
        return Ok(None);
    };

    let lat = coordinate(first, "lat")?;
    let lng = coordinate(first, "lon")?;
    let point = GeoPoint::new(lat, lng);
    point
        .validate()
        .map_err(|err| RegionError::InvalidResponse(err.to_string()))?;

    Ok(Some(PlaceHit {
        point,
        display_name: first
            .get("display_name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        region: address_region(first),
    }))
}

fn address_region(body: &Value) -> Option<String> {
    let address = body.get("address")?;
    ["province", "state"]
        .iter()
        .filter_map(|key| address.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(str::to_string)
}

// Nominatim returns coordinates as JSON strings.
fn coordinate(hit: &Value, key: &str) -> Result<f64, RegionError> {
    let parsed = match hit.get(key) {
        Some(Value::String(text)) => text.trim().parse::<f64>().ok(),
        Some(Value::Number(number)) => number.as_f64(),
        _ => None,
    };
    parsed
        .filter(|value| value.is_finite())
        .ok_or_else(|| RegionError::InvalidResponse(format!("search hit has no usable `{key}`")))
}
