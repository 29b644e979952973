// Rust guideline compliant 2026-10-16

//! Invoice-delay job -- offline demo.
//!
//! Runs the full session against a generated account: no provider key, no
//! network. Records are kept in memory and printed as JSON at the end.
//!
//! # Usage
//!
//! ```text
//! # Reproducible run with one refusal in ten
//! DEMO_SEED=42 cargo run --bin invoice_delay_demo
//!
//! # Every update refused
//! DEMO_SEED=42 DEMO_FAILURE_RATE=1 cargo run --bin invoice_delay_demo
//! ```
//!
//! `DEMO_CHARGES` and `DEMO_INVOICES` size the account. All the job's
//! variables (`GROSS_VOLUME_LIMIT`, `DELAY_SCHEME`, ...) apply as usual.

use anyhow::Context as _;
use business_time::SystemClock;
use invoice_delay::adapters::demo_provider::DemoProvider;
use invoice_delay::adapters::in_memory_audit_sink::InMemoryAuditSink;
use invoice_delay::config::{AppConfig, DemoSettings};
use invoice_delay::{runner, telemetry};
use session::ProcessingSession;

/// One run produces at most one record.
const AUDIT_CAPACITY: usize = 16;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("invalid configuration")?;
    let demo = DemoSettings::from_lookup(|var| std::env::var(var).ok())
        .context("invalid demo settings")?;
    let log_file = telemetry::init(&config.log_level, &config.logs_dir, config.business_today())?;
    tracing::info!(log_file = %log_file.display(), demo = ?demo, "demo_main.start");

    let session = ProcessingSession::new(config.session.clone(), SystemClock)
        .context("failed to build processing session")?;
    let time = session.time();
    let provider = DemoProvider::new(&demo, session.gate().currency(), &time.day_range(&time.now()));
    let sink = InMemoryAuditSink::new(AUDIT_CAPACITY);
    tracing::info!(
        charges = provider.charge_count(),
        invoices = demo.invoices,
        "demo_main.account_generated"
    );

    let shutdown = runner::shutdown_signal();
    runner::execute(&session, &provider, &sink, &shutdown)
        .await
        .inspect_err(|e| tracing::error!(error = format!("{e:#}"), "demo_main.failed"))?;

    for record in sink.records() {
        let json = serde_json::to_string_pretty(&record).context("failed to encode record")?;
        println!("{json}");
    }
    Ok(())
}
