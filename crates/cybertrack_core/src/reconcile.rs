//! Import merge reconciliation.
//!
//! # Responsibility
//! - Combine a decoded import batch with the current marker list.
//! - Drop candidates that violate the coordinate invariant.
//! - Deduplicate by id without ever overwriting existing records.
//!
//! # Invariants
//! - Existing records keep their order and content.
//! - Accepted records are appended in batch order.
//! - Re-importing an unchanged export accepts zero records.

use crate::model::marker::Marker;
use log::debug;
use std::collections::HashSet;

/// Result of merging one batch into an existing list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeOutcome {
    /// Existing records followed by accepted candidates.
    pub markers: Vec<Marker>,
    pub accepted: usize,
    /// Candidates with missing, non-finite or out-of-range coordinates.
    pub skipped_invalid: usize,
    /// Candidates whose id is already present (in the list or earlier in the batch).
    pub skipped_duplicate: usize,
}

impl MergeOutcome {
    pub fn skipped(&self) -> usize {
        self.skipped_invalid + self.skipped_duplicate
    }
}

/// Merges `incoming` into `existing`.
pub fn merge(existing: &[Marker], incoming: Vec<Marker>) -> MergeOutcome {
    let mut known_ids: HashSet<String> = existing.iter().map(|marker| marker.id.clone()).collect();
    let mut outcome = MergeOutcome {
        markers: existing.to_vec(),
        ..MergeOutcome::default()
    };

    for candidate in incoming {
        if let Err(err) = candidate.validate() {
            debug!(
                "event=import_merge module=reconcile status=skipped reason=invalid id={} error={}",
                candidate.id, err
            );
            outcome.skipped_invalid += 1;
            continue;
        }
        if !known_ids.insert(candidate.id.clone()) {
            outcome.skipped_duplicate += 1;
            continue;
        }
        outcome.markers.push(candidate);
        outcome.accepted += 1;
    }

    outcome
}
