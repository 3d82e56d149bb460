//! Domain model for geo-referenced targets.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//!
//! # Invariants
//! - Every stored target is identified by a stable `MarkerId`.
//! - Coordinates are validated by the model, not by callers.

pub mod marker;
