//! Predicate filter over the marker list.
//!
//! # Responsibility
//! - Produce the order-preserving view handed to presentation.
//! - List the distinct effective regions for region pickers.
//!
//! # Invariants
//! - Pure: results are recomputed on every call, nothing is cached.
//! - Predicates combine with AND; absent predicates match everything.
//! - Comparisons use effective values (`rank` default 1, region `"Unknown"`).

use crate::model::marker::{Marker, Rank};
use std::collections::BTreeSet;

/// Exact-match predicates for the marker view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkerFilter {
    pub rank: Option<Rank>,
    pub region: Option<String>,
}

impl MarkerFilter {
    pub fn is_empty(&self) -> bool {
        self.rank.is_none() && self.region.is_none()
    }

    pub fn matches(&self, marker: &Marker) -> bool {
        if let Some(rank) = self.rank {
            if marker.rank != rank {
                return false;
            }
        }
        if let Some(region) = self.region.as_deref() {
            if marker.effective_region() != region {
                return false;
            }
        }
        true
    }
}

/// Returns the subsequence of `markers` matching `filter`, in order.
pub fn filter_markers<'a>(markers: &'a [Marker], filter: &MarkerFilter) -> Vec<&'a Marker> {
    markers
        .iter()
        .filter(|marker| filter.matches(marker))
        .collect()
}

/// Sorted distinct effective regions.
pub fn unique_regions(markers: &[Marker]) -> Vec<String> {
    markers
        .iter()
        .map(|marker| marker.effective_region().to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
