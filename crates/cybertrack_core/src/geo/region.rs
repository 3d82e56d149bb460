//! Region-resolution and place-search collaborator contracts.
//!
//! # Invariants
//! - Callers obtain labels via `resolve_region_or_unknown`, which never
//!   propagates an error.

use crate::model::marker::{GeoPoint, UNKNOWN_REGION};
use log::warn;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Lookup failure from a region/place backend.
#[derive(Debug)]
pub enum RegionError {
    Http(reqwest::Error),
    InvalidResponse(String),
}

impl Display for RegionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http(err) => write!(f, "{err}"),
            Self::InvalidResponse(message) => write!(f, "invalid lookup response: {message}"),
        }
    }
}

impl Error for RegionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Http(err) => Some(err),
            Self::InvalidResponse(_) => None,
        }
    }
}

impl From<reqwest::Error> for RegionError {
    fn from(value: reqwest::Error) -> Self {
        Self::Http(value)
    }
}

/// Reverse lookup of a coarse region label for a coordinate.
pub trait RegionResolver {
    fn resolve_region(&self, point: GeoPoint) -> Result<String, RegionError>;
}

impl<Z: RegionResolver + ?Sized> RegionResolver for &Z {
    fn resolve_region(&self, point: GeoPoint) -> Result<String, RegionError> {
        (**self).resolve_region(point)
    }
}

/// First hit of a free-text place search.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceHit {
    pub point: GeoPoint,
    pub display_name: String,
    /// Region reported by the search backend, when it carried address details.
    pub region: Option<String>,
}

impl PlaceHit {
    /// Leading comma-separated segment of the display name.
    pub fn short_name(&self) -> Option<&str> {
        self.display_name
            .split(',')
            .next()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}

/// Free-text place search.
pub trait PlaceSearch {
    fn search(&self, query: &str) -> Result<Option<PlaceHit>, RegionError>;
}

/// Offline resolver: every coordinate is in `"Unknown"`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnknownRegionResolver;

impl RegionResolver for UnknownRegionResolver {
    fn resolve_region(&self, _point: GeoPoint) -> Result<String, RegionError> {
        Ok(UNKNOWN_REGION.to_string())
    }
}

/// Resolves the region for `point`, falling back to `"Unknown"` on failure.
pub fn resolve_region_or_unknown<Z: RegionResolver + ?Sized>(resolver: &Z, point: GeoPoint) -> String {
    match resolver.resolve_region(point) {
        Ok(region) if !region.trim().is_empty() => region,
        Ok(_) => UNKNOWN_REGION.to_string(),
        Err(err) => {
            warn!("event=region_resolve module=geo status=fallback error={err}");
            UNKNOWN_REGION.to_string()
        }
    }
}
