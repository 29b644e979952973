// Rust guideline compliant 2026-10-16

//! Shared run sequence for the binaries: log the status summary, run one
//! session, log the outcome.

use anyhow::Context as _;
use domain::{AuditSink, ChargeSource, Clock, InvoiceMutator, InvoiceSource};
use session::{BatchExecutor, ProcessingSession, ProcessingSummary, RunOutcome};
use tokio::signal;
use tokio::sync::watch;
use tracing::Instrument as _;

/// Receiver flipped to `true` on SIGINT (Ctrl+C) or, on Unix, SIGTERM.
///
/// Must be called from inside a Tokio runtime. A handler that cannot be
/// installed is logged and never fires.
#[must_use]
pub fn shutdown_signal() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);

    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = signal::ctrl_c().await {
                tracing::error!(error = %e, "runner.signal.ctrl_c_unavailable");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut stream) => {
                    stream.recv().await;
                }
                Err(e) => {
                    tracing::error!(error = %e, "runner.signal.sigterm_unavailable");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            () = ctrl_c => tracing::warn!("runner.shutdown: SIGINT received, stopping after the current invoice"),
            () = terminate => tracing::warn!("runner.shutdown: SIGTERM received, stopping after the current invoice"),
        }
        tx.send_replace(true);
    });

    rx
}

/// Log a summary at info level, one field per figure.
pub fn log_summary(summary: &ProcessingSummary) {
    tracing::info!(
        current_time = %summary.current_time,
        timezone = summary.timezone,
        daily_volume = %summary.daily_volume,
        volume_limit = %summary.volume_limit,
        currency = summary.currency.code(),
        counted_charges = summary.counted_charges,
        open_invoices = summary.open_invoices,
        limit_reached = summary.limit_reached,
        past_transfer_time = summary.past_transfer_time,
        possibly_truncated = summary.possibly_truncated,
        invoices_possibly_truncated = summary.invoices_possibly_truncated,
        "runner.summary"
    );
}

/// Log the outcome of a finished run.
pub fn log_outcome(outcome: &RunOutcome) {
    match outcome {
        RunOutcome::Processed { record, audit_location } => tracing::info!(
            session_id = %record.session_id,
            transferred = record.processing.total_transferred,
            failed = record.processing.total_failed,
            interrupted = record.interrupted,
            audit = audit_location.as_deref().unwrap_or("<not stored>"),
            "runner.completed: invoice processing completed"
        ),
        RunOutcome::NotNeeded { reason, snapshot } => tracing::info!(
            volume = %snapshot.volume,
            "runner.completed: no processing needed: {reason}"
        ),
    }
}

/// Summary, then one session run against `provider` and `sink`.
///
/// # Errors
///
/// Returns an error when either listing fails or a due date cannot be
/// computed. Per-invoice update failures and audit failures are not errors;
/// they are carried in the returned outcome.
pub async fn execute<C, E, P, A>(
    session: &ProcessingSession<C, E>,
    provider: &P,
    sink: &A,
    shutdown: &watch::Receiver<bool>,
) -> anyhow::Result<RunOutcome>
where
    C: Clock,
    E: BatchExecutor,
    P: ChargeSource + InvoiceSource + InvoiceMutator,
    A: AuditSink,
{
    let summary = session
        .summary(provider, provider)
        .await
        .context("failed to build processing summary")?;
    log_summary(&summary);
    if !summary.past_transfer_time {
        tracing::info!(
            transfer_hour = session.time().transfer_hour(),
            "runner.early: running before the configured transfer hour"
        );
    }

    let outcome = session
        .run(provider, provider, provider, sink, shutdown)
        .instrument(tracing::info_span!("session"))
        .await
        .context("invoice processing failed")?;
    log_outcome(&outcome);
    Ok(outcome)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use business_time::FixedClock;
    use chrono::{TimeZone as _, Utc};
    use domain::{Currency, DelayScheme};
    use rust_decimal::Decimal;
    use session::{ProcessingSession, RunOutcome, SessionConfig, SkipReason};
    use tokio::sync::watch;
    use volume_gate::GateConfig;

    use super::execute;
    use crate::adapters::demo_provider::DemoProvider;
    use crate::adapters::in_memory_audit_sink::InMemoryAuditSink;
    use crate::config::DemoSettings;

    fn session(threshold: i64) -> ProcessingSession<FixedClock> {
        let gate = GateConfig::builder(Currency::parse("AED").unwrap())
            .threshold(Decimal::from(threshold))
            .build()
            .unwrap();
        let config = SessionConfig::builder(gate, DelayScheme::new(vec![1, 3, 5, 7, 9]).unwrap())
            .pacing(Duration::ZERO)
            .build()
            .unwrap();
        // 09:15 in Dubai.
        let clock = FixedClock(Utc.with_ymd_and_hms(2026, 3, 3, 5, 15, 0).unwrap());
        ProcessingSession::new(config, clock).unwrap()
    }

    fn provider(session: &ProcessingSession<FixedClock>) -> DemoProvider {
        let time = session.time();
        let range = time.day_range(&time.now());
        let settings = DemoSettings { seed: Some(11), charges: 30, invoices: 8, failure_rate: 0.0 };
        DemoProvider::new(&settings, session.gate().currency(), &range)
    }

    // RUN-T01: a busy day reschedules every account-currency invoice.
    #[tokio::test]
    async fn busy_day_is_processed_and_audited() {
        let session = session(1);
        let provider = provider(&session);
        let sink = InMemoryAuditSink::new(4);
        let (_tx, rx) = watch::channel(false);

        let outcome = execute(&session, &provider, &sink, &rx).await.unwrap();

        let RunOutcome::Processed { record, audit_location } = outcome else {
            panic!("expected a processed run");
        };
        assert_eq!(audit_location.as_deref(), Some("memory:0"));
        assert_eq!(record.processing.total_failed, 0);
        assert_eq!(record.processing.total_transferred, provider.applied().len());
        assert_eq!(sink.len(), 1);
    }

    // RUN-T02: an unreachable threshold leaves the provider untouched.
    #[tokio::test]
    async fn quiet_day_is_not_needed() {
        let session = session(1_000_000);
        let provider = provider(&session);
        let sink = InMemoryAuditSink::new(4);
        let (_tx, rx) = watch::channel(false);

        let outcome = execute(&session, &provider, &sink, &rx).await.unwrap();

        assert!(matches!(
            outcome,
            RunOutcome::NotNeeded { reason: SkipReason::VolumeBelowLimit, .. }
        ));
        assert!(provider.applied().is_empty());
        assert!(sink.is_empty());
    }

    // RUN-T03: a raised shutdown flag stops before the first update.
    #[tokio::test]
    async fn shutdown_before_batch_applies_nothing() {
        let session = session(1);
        let provider = provider(&session);
        let sink = InMemoryAuditSink::new(4);
        let (_tx, rx) = watch::channel(true);

        let outcome = execute(&session, &provider, &sink, &rx).await.unwrap();

        let RunOutcome::Processed { record, .. } = outcome else {
            panic!("expected a processed run");
        };
        assert!(record.interrupted);
        assert!(record.transfers.is_empty());
        assert!(provider.applied().is_empty());
    }
}
