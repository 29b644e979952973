// Rust guideline compliant 2026-10-16

//! Adapters (secondary ports) for the invoice-delay binaries.
//!
//! Each sub-module implements one or more hexagonal port traits defined in the
//! `domain` crate. Adapters never reach into session or scheduling logic.

pub mod demo_provider;
pub mod in_memory_audit_sink;
pub mod json_file_sink;
pub mod sqlite_audit_sink;
pub mod stripe;
