// Rust guideline compliant 2026-10-16

//! Processing session -- one check-and-process run of the invoice-delay job.
//!
//! Measures the business day's gross volume, and when it reaches the
//! threshold reschedules every open invoice in the account currency along the
//! delay scheme, then writes a [`SessionRecord`] to the audit sink.
//!
//! Entry points: [`ProcessingSession::run`], [`ProcessingSession::summary`].
//! Configuration via [`SessionConfig::builder`].

mod executor;

use std::fmt;
use std::time::Duration;

use business_time::{BusinessTime, DEFAULT_TRANSFER_HOUR, DEFAULT_ZONE, TimeError};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use delay_scheduler::{DelayScheduler, ScheduledInvoice};
use domain::{
    AuditSink, ChargeSource, Clock, Currency, DelayScheme, Invoice, InvoiceMutator, InvoiceSource,
    ProcessingStats, SessionRecord, SourceError, TransferFailure, TransferRecord, Trigger,
    UpdateError, VolumeSnapshot,
};
use rust_decimal::Decimal;
use tokio::sync::watch;
use volume_gate::{GateConfig, VolumeGate};

pub use executor::{BatchExecutor, BatchRun, SequentialExecutor};

// ---------------------------------------------------------------------------
// SessionError
// ---------------------------------------------------------------------------

/// Errors that abort a run, or prevent one from being configured.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The supplied configuration is invalid.
    #[error("invalid session configuration: {reason}")]
    InvalidConfig {
        /// Human-readable description of the problem.
        reason: String,
    },
    /// The charge listing could not be obtained.
    #[error("charge fetch failed: {0}")]
    ChargeFetch(SourceError),
    /// The open-invoice listing could not be obtained.
    #[error("invoice fetch failed: {0}")]
    InvoiceFetch(SourceError),
    /// A due date could not be computed.
    #[error("scheduling failed: {0}")]
    Schedule(TimeError),
}

// ---------------------------------------------------------------------------
// SessionConfig + builder
// ---------------------------------------------------------------------------

/// Runtime configuration for a [`ProcessingSession`].
///
/// Construct via [`SessionConfig::builder`].
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Gate currency and threshold, already validated.
    pub gate: GateConfig,
    /// Day offsets applied cyclically across the invoice batch.
    pub scheme: DelayScheme,
    /// Business timezone.
    pub zone: Tz,
    /// Hour of day (0-23) for new due dates.
    pub transfer_hour: u32,
    /// Pause between consecutive due-date updates.
    pub pacing: Duration,
}

/// Builder for [`SessionConfig`].
///
/// Obtain via [`SessionConfig::builder`]; finalize with [`build`](Self::build).
#[derive(Debug)]
pub struct SessionConfigBuilder {
    gate: GateConfig,
    scheme: DelayScheme,
    zone: Tz,
    transfer_hour: u32,
    pacing: Duration,
}

impl SessionConfig {
    /// Create a builder. `gate` and `scheme` are the required parameters.
    ///
    /// Default values: `zone = Asia/Dubai`, `transfer_hour = 12`,
    /// `pacing = 100 ms`.
    #[must_use]
    pub fn builder(gate: GateConfig, scheme: DelayScheme) -> SessionConfigBuilder {
        SessionConfigBuilder {
            gate,
            scheme,
            zone: DEFAULT_ZONE,
            transfer_hour: DEFAULT_TRANSFER_HOUR,
            pacing: Duration::from_millis(100),
        }
    }
}

impl SessionConfigBuilder {
    /// Override the business timezone.
    #[must_use]
    pub fn zone(mut self, zone: Tz) -> Self {
        self.zone = zone;
        self
    }

    /// Override the transfer hour.
    #[must_use]
    pub fn transfer_hour(mut self, hour: u32) -> Self {
        self.transfer_hour = hour;
        self
    }

    /// Override the pause between updates. `Duration::ZERO` disables pacing.
    #[must_use]
    pub fn pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    /// Validate and build the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidConfig`] when `transfer_hour > 23`.
    #[must_use = "the Result must be checked; use ? or unwrap"]
    pub fn build(self) -> Result<SessionConfig, SessionError> {
        if self.transfer_hour > 23 {
            return Err(SessionError::InvalidConfig {
                reason: format!("transfer_hour must be in [0, 23], got {}", self.transfer_hour),
            });
        }
        Ok(SessionConfig {
            gate: self.gate,
            scheme: self.scheme,
            zone: self.zone,
            transfer_hour: self.transfer_hour,
            pacing: self.pacing,
        })
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Why a run did not process any invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Gross volume stayed under the threshold.
    VolumeBelowLimit,
    /// The gate opened but no open invoice is in the account currency.
    NoUnpaidInvoices,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VolumeBelowLimit => f.write_str("Volume below limit"),
            Self::NoUnpaidInvoices => f.write_str("No unpaid invoices"),
        }
    }
}

/// Result of a completed run.
#[derive(Debug)]
pub enum RunOutcome {
    /// Invoices were processed (possibly with per-invoice failures).
    Processed {
        record: SessionRecord,
        /// Where the audit record landed; `None` when the write failed.
        audit_location: Option<String>,
    },
    /// Nothing to do.
    NotNeeded {
        reason: SkipReason,
        snapshot: VolumeSnapshot,
    },
}

impl RunOutcome {
    #[must_use]
    pub fn is_processed(&self) -> bool {
        matches!(self, Self::Processed { .. })
    }
}

/// Read-only status report; see [`ProcessingSession::summary`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingSummary {
    /// Business-local time of the report, `YYYY-MM-DD HH:mm:ss`.
    pub current_time: String,
    pub timezone: &'static str,
    pub daily_volume: Decimal,
    pub volume_limit: Decimal,
    pub currency: Currency,
    /// Open invoices in the account currency.
    pub open_invoices: usize,
    pub limit_reached: bool,
    pub counted_charges: usize,
    pub past_transfer_time: bool,
    /// The charge listing was cut short; `daily_volume` may be low.
    pub possibly_truncated: bool,
    /// The open-invoice listing was cut short; `open_invoices` may be low.
    pub invoices_possibly_truncated: bool,
}

// ---------------------------------------------------------------------------
// ProcessingSession
// ---------------------------------------------------------------------------

/// Runs the gate, the scheduler and the update batch for one business day.
///
/// Generic over the clock and the batch executor. Provider ports and the
/// audit sink are injected per call; the session holds no adapter references
/// and keeps no state between runs.
#[derive(Debug)]
pub struct ProcessingSession<C: Clock, E: BatchExecutor = SequentialExecutor> {
    time: BusinessTime<C>,
    gate: VolumeGate,
    scheduler: DelayScheduler,
    executor: E,
}

impl<C: Clock> ProcessingSession<C, SequentialExecutor> {
    /// Create a session paced by a [`SequentialExecutor`].
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidConfig`] if the time service rejects
    /// the configuration.
    pub fn new(config: SessionConfig, clock: C) -> Result<Self, SessionError> {
        let executor = SequentialExecutor::new(config.pacing);
        Self::with_executor(config, clock, executor)
    }
}

impl<C: Clock, E: BatchExecutor> ProcessingSession<C, E> {
    /// Create a session driving updates through `executor`.
    ///
    /// `config.pacing` is ignored; pacing belongs to the executor.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidConfig`] if the time service rejects
    /// the configuration.
    pub fn with_executor(config: SessionConfig, clock: C, executor: E) -> Result<Self, SessionError> {
        let time = BusinessTime::new(config.zone, config.transfer_hour, clock)
            .map_err(|e| SessionError::InvalidConfig { reason: e.to_string() })?;
        Ok(Self {
            time,
            gate: VolumeGate::new(config.gate),
            scheduler: DelayScheduler::new(config.scheme),
            executor,
        })
    }

    /// The time service.
    #[must_use]
    pub fn time(&self) -> &BusinessTime<C> {
        &self.time
    }

    /// The volume gate.
    #[must_use]
    pub fn gate(&self) -> &VolumeGate {
        &self.gate
    }

    /// Execute one check-and-process cycle.
    ///
    /// Per-invoice update failures are recorded in the session record and do
    /// not stop the batch. An audit write failure is logged and reported as
    /// `audit_location: None`. When `shutdown` reads `true` the batch stops
    /// before the next update and the record is flagged `interrupted`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::ChargeFetch`] or [`SessionError::InvoiceFetch`]
    /// when a listing fails, and [`SessionError::Schedule`] when a due date
    /// overflows the calendar.
    pub async fn run<CS, IS, M, A>(
        &self,
        charges: &CS,
        invoices: &IS,
        mutator: &M,
        sink: &A,
        shutdown: &watch::Receiver<bool>,
    ) -> Result<RunOutcome, SessionError>
    where
        CS: ChargeSource,
        IS: InvoiceSource,
        M: InvoiceMutator,
        A: AuditSink,
    {
        let now = self.time.now();
        let range = self.time.day_range(&now);
        tracing::info!(
            now = %self.time.format(&now),
            timezone = self.time.zone_name(),
            day = %range.start_date,
            "session.run.started"
        );

        let page = charges.list_charges(&range).await.map_err(SessionError::ChargeFetch)?;
        let snapshot = self.gate.evaluate(page, range);
        if !self.gate.is_open(&snapshot) {
            let reason = SkipReason::VolumeBelowLimit;
            tracing::info!(
                volume = %snapshot.volume,
                threshold = %self.gate.threshold(),
                reason = %reason,
                "session.run.skipped"
            );
            return Ok(RunOutcome::NotNeeded { reason, snapshot });
        }

        let OpenBatch { invoices: batch, skipped_other_currency, possibly_truncated } =
            self.open_invoices(invoices).await?;
        if batch.is_empty() {
            let reason = SkipReason::NoUnpaidInvoices;
            tracing::info!(reason = %reason, skipped_other_currency, "session.run.skipped");
            return Ok(RunOutcome::NotNeeded { reason, snapshot });
        }

        let stats = BatchStats {
            total_unpaid_invoices: batch.len(),
            skipped_other_currency,
            invoices_possibly_truncated: possibly_truncated,
        };
        let scheduled = self
            .scheduler
            .schedule(batch, &self.time, &now)
            .map_err(SessionError::Schedule)?;

        let time = &self.time;
        let run = self
            .executor
            .execute(scheduled, shutdown, |entry: ScheduledInvoice| async move {
                let due_utc = entry.due_at.with_timezone(&Utc);
                let result = mutator.update_due_date(&entry.invoice.id, due_utc).await;
                let applied_at = time.now();
                match &result {
                    Ok(()) => log_applied(time, &entry),
                    Err(e) => log_failed(&entry, e),
                }
                (entry, result.map(|()| applied_at))
            })
            .await;

        let record = self.assemble_record(&now, snapshot, run, &stats);

        tracing::info!(
            session_id = %record.session_id,
            total = record.processing.total_unpaid_invoices,
            transferred = record.processing.total_transferred,
            failed = record.processing.total_failed,
            interrupted = record.interrupted,
            "session.run.completed"
        );

        let audit_location = match sink.store(&record).await {
            Ok(location) => {
                tracing::info!(session_id = %record.session_id, location = %location, "session.audit.stored");
                Some(location)
            }
            Err(e) => {
                tracing::error!(session_id = %record.session_id, error = %e, "session.audit.failed");
                None
            }
        };

        Ok(RunOutcome::Processed { record, audit_location })
    }

    /// Report the current volume and open-invoice situation without mutating
    /// anything.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::ChargeFetch`] or [`SessionError::InvoiceFetch`]
    /// when a listing fails.
    pub async fn summary<CS, IS>(
        &self,
        charges: &CS,
        invoices: &IS,
    ) -> Result<ProcessingSummary, SessionError>
    where
        CS: ChargeSource,
        IS: InvoiceSource,
    {
        let now = self.time.now();
        let range = self.time.day_range(&now);
        let page = charges.list_charges(&range).await.map_err(SessionError::ChargeFetch)?;
        let snapshot = self.gate.evaluate(page, range);
        let open = self.open_invoices(invoices).await?;
        Ok(ProcessingSummary {
            current_time: self.time.format(&now),
            timezone: self.time.zone_name(),
            limit_reached: self.gate.is_open(&snapshot),
            daily_volume: snapshot.volume,
            volume_limit: self.gate.threshold(),
            currency: snapshot.currency,
            open_invoices: open.invoices.len(),
            invoices_possibly_truncated: open.possibly_truncated,
            counted_charges: snapshot.charges.len(),
            past_transfer_time: self.time.is_past_transfer_time(&now),
            possibly_truncated: snapshot.possibly_truncated,
        })
    }

    /// Open invoices in the gate currency, in provider order.
    async fn open_invoices<IS: InvoiceSource>(&self, invoices: &IS) -> Result<OpenBatch, SessionError> {
        let page = invoices.list_open_invoices().await.map_err(SessionError::InvoiceFetch)?;
        if page.has_more {
            tracing::warn!(
                fetched = page.items.len(),
                "session.invoices.truncated: more open invoices than were fetched"
            );
        }
        let fetched = page.items.len();
        let currency = self.gate.currency();
        let matching: Vec<Invoice> =
            page.items.into_iter().filter(|inv| currency.matches(&inv.currency)).collect();
        let skipped = fetched - matching.len();
        if skipped > 0 {
            tracing::info!(skipped, currency = %currency, "session.invoices.other_currency");
        }
        Ok(OpenBatch {
            invoices: matching,
            skipped_other_currency: skipped,
            possibly_truncated: page.has_more,
        })
    }

    fn assemble_record(
        &self,
        now: &DateTime<Tz>,
        snapshot: VolumeSnapshot,
        run: BatchRun<(ScheduledInvoice, Result<DateTime<Tz>, UpdateError>)>,
        stats: &BatchStats,
    ) -> SessionRecord {
        let mut transfers = vec![];
        let mut failures = vec![];
        for (entry, result) in run.results {
            match result {
                Ok(applied_at) => transfers.push(self.transfer_record(&entry, &applied_at)),
                Err(e) => failures.push(failure_record(&entry, &e)),
            }
        }

        SessionRecord {
            session_id: format!("session-{}", uuid::Uuid::new_v4()),
            timestamp: self.time.to_fixed(now),
            timezone: self.time.zone_name().to_owned(),
            trigger: Trigger {
                daily_volume: snapshot.volume,
                volume_limit: self.gate.threshold(),
                currency: snapshot.currency.clone(),
                possibly_truncated: snapshot.possibly_truncated,
            },
            processing: ProcessingStats {
                total_unpaid_invoices: stats.total_unpaid_invoices,
                total_transferred: transfers.len(),
                total_failed: failures.len(),
                skipped_other_currency: stats.skipped_other_currency,
                invoices_possibly_truncated: stats.invoices_possibly_truncated,
                delay_scheme: self.scheduler.scheme().clone(),
            },
            transfers,
            failures,
            volume_details: snapshot,
            interrupted: run.interrupted,
        }
    }

    fn transfer_record(&self, entry: &ScheduledInvoice, applied_at: &DateTime<Tz>) -> TransferRecord {
        TransferRecord {
            invoice_id: entry.invoice.id.clone(),
            invoice_number: entry.invoice_number,
            original_due_date: entry.invoice.due_date.map(|d| self.time.to_fixed(&d)),
            new_due_date: self.time.to_fixed(&entry.due_at),
            new_due_timestamp: entry.due_at.timestamp(),
            days_offset: entry.days_offset,
            cycle_position: entry.cycle_position,
            amount: domain::minor_to_major(entry.invoice.amount_due_minor),
            currency: entry.invoice.currency.clone(),
            transferred_at: self.time.to_fixed(applied_at),
        }
    }
}

/// Invoices left for a run after the currency filter.
struct OpenBatch {
    invoices: Vec<Invoice>,
    skipped_other_currency: usize,
    /// The provider held more open invoices than were listed.
    possibly_truncated: bool,
}

/// Batch figures carried into the session record.
struct BatchStats {
    total_unpaid_invoices: usize,
    skipped_other_currency: usize,
    invoices_possibly_truncated: bool,
}

// Emitted as each update returns, so a crash mid-batch keeps the trail.
fn log_applied<C: Clock>(time: &BusinessTime<C>, entry: &ScheduledInvoice) {
    tracing::info!(
        invoice_id = %entry.invoice.id,
        invoice_number = entry.invoice_number,
        days_offset = entry.days_offset,
        new_due_date = %time.format(&entry.due_at),
        "session.transfer.applied"
    );
}

fn log_failed(entry: &ScheduledInvoice, error: &UpdateError) {
    tracing::warn!(
        invoice_id = %entry.invoice.id,
        invoice_number = entry.invoice_number,
        kind = %error.kind(),
        error = %error,
        "session.transfer.failed"
    );
}

fn failure_record(entry: &ScheduledInvoice, error: &UpdateError) -> TransferFailure {
    TransferFailure {
        invoice_id: entry.invoice.id.clone(),
        invoice_number: entry.invoice_number,
        kind: error.kind(),
        reason: error.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
