// Rust guideline compliant 2026-10-16

//! Wiring for the invoice-delay binaries: provider and audit adapters,
//! environment configuration, tracing setup and the shared run sequence.
//!
//! Three binaries sit on top of this library:
//!
//! - `invoice_delay`: Stripe account, JSON audit files.
//! - `invoice_delay_sqlite`: Stripe account, `SQLite` audit database.
//! - `invoice_delay_demo`: generated offline account, in-memory audit.

pub mod adapters;
pub mod config;
pub mod runner;
pub mod telemetry;
