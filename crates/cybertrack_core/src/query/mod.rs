//! Derived read views over the marker store.

pub mod filter;
