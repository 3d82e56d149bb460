//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate store, codec and lookup calls into use-case level APIs.
//! - Keep CLI/UI layers decoupled from storage and encoding details.

pub mod target_service;
