// Rust guideline compliant 2026-10-16

//! Invoice-delay job -- Stripe account, JSON audit files.
//!
//! One run: report today's gross volume, and when it reaches the threshold
//! push the due date of every open invoice out along the delay scheme. The
//! session record lands in `DATA_DIR/transfer-session-*.json`.
//!
//! # Usage
//!
//! ```text
//! STRIPE_SECRET_KEY=sk_test_... cargo run --bin invoice_delay
//!
//! # Per-charge and per-request debug output
//! RUST_LOG=debug STRIPE_SECRET_KEY=sk_test_... cargo run --bin invoice_delay
//! ```
//!
//! Exits non-zero when configuration is invalid or the provider cannot be
//! listed. Ctrl+C stops the batch after the current invoice.

use anyhow::Context as _;
use business_time::SystemClock;
use invoice_delay::adapters::json_file_sink::JsonFileSink;
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
        env_file = ?config.env_file,
        config = ?config,
        "main.start"
    );

    let result = async {
        let key = config.require_stripe_key()?;
        let client = StripeClient::new(&config.stripe_api_base, key.expose())
            .context("failed to build Stripe client")?;
        let sink = JsonFileSink::new(&config.data_dir);
        let session = ProcessingSession::new(config.session.clone(), SystemClock)
            .context("failed to build processing session")?;
        let shutdown = runner::shutdown_signal();
        runner::execute(&session, &client, &sink, &shutdown).await
    }
    .await;

    if let Err(e) = &result {
        tracing::error!(error = format!("{e:#}"), "main.failed");
    }
    result.map(|_| ())
}
