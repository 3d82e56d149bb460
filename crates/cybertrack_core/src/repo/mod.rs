//! Persistence collaborator contracts and implementations.
//!
//! # Responsibility
//! - Define the key-value `load`/`save` contract used by the marker store.
//! - Keep SQLite details out of the store and service layers.
//!
//! # Invariants
//! - Repositories store opaque text; encoding is owned by the caller.

pub mod kv_repo;
