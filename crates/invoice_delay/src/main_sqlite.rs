// Rust guideline compliant 2026-10-16

//! Invoice-delay job -- `SQLite` audit database.
//!
//! Identical to the `invoice_delay` binary except that session records are
//! stored in the `SQLite` database at `AUDIT_DB_URL` (default
//! `sqlite:invoice_delay.db`) instead of JSON files. Only this entry point and
//! the sink adapter differ; the session crates are untouched.
//!
//! # Usage
//!
//! ```text
//! STRIPE_SECRET_KEY=sk_test_... cargo run --bin invoice_delay_sqlite
//! ```
//!
//! The database file is created on first run. Inspect rows with any `SQLite`
//! browser.

use anyhow::Context as _;
use business_time::SystemClock;
use invoice_delay::adapters::sqlite_audit_sink::SqliteAuditSink;
use invoice_delay::adapters::stripe::StripeClient;
use invoice_delay::config::AppConfig;
use invoice_delay::{runner, telemetry};
use session::ProcessingSession;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("invalid configuration")?;
    let log_file = telemetry::init(&config.log_level, &config.logs_dir, config.business_today())?;
    tracing::info!(
        log_file = %log_file.display(),
        audit_db = %config.audit_db_url,
        config = ?config,
        "main_sqlite.start"
    );

    let result = async {
        let key = config.require_stripe_key()?;
        let client = StripeClient::new(&config.stripe_api_base, key.expose())
            .context("failed to build Stripe client")?;
        let sink = SqliteAuditSink::new(&config.audit_db_url)
            .await
            .with_context(|| format!("failed to open audit database {}", config.audit_db_url))?;
        let session = ProcessingSession::new(config.session.clone(), SystemClock)
            .context("failed to build processing session")?;
        let shutdown = runner::shutdown_signal();
        runner::execute(&session, &client, &sink, &shutdown).await
    }
    .await;

    if let Err(e) = &result {
        tracing::error!(error = format!("{e:#}"), "main_sqlite.failed");
    }
    result.map(|_| ())
}
