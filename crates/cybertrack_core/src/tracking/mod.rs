//! Continuous position tracking.
//!
//! # Responsibility
//! - Define the geolocation collaborator contract.
//! - Accumulate the tracked path with idempotent start/stop.
//!
//! # Invariants
//! - Sessions are ephemeral and never persisted.

pub mod geolocation;
pub mod replay;
pub mod session;
