//! In-memory record store over the persistence collaborator.
//!
//! # Invariants
//! - A single actor owns and mutates the store.

pub mod marker_store;
