// Rust guideline compliant 2026-10-16

//! Audit records produced by a processing session.
//!
//! All types here are `Serialize` only: they are written once to an audit
//! sink and never read back by the job. Business-zone instants serialize as
//! `YYYY-MM-DD HH:mm:ss` in their own offset; provider instants (charge
//! creation) serialize as RFC 3339 UTC.

use chrono::{DateTime, FixedOffset, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{Currency, DelayScheme, UpdateErrorKind};

/// `strftime` pattern for every human-facing timestamp.
pub const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

mod audit_time {
    use chrono::{DateTime, FixedOffset};
    use serde::Serializer;

    use super::DISPLAY_FORMAT;

    pub(super) fn serialize<S: Serializer>(
        at: &DateTime<FixedOffset>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&at.format(DISPLAY_FORMAT))
    }

    #[allow(clippy::ref_option, reason = "signature imposed by serde's serialize_with")]
    pub(super) fn serialize_option<S: Serializer>(
        at: &Option<DateTime<FixedOffset>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match at {
            Some(at) => serializer.collect_str(&at.format(DISPLAY_FORMAT)),
            None => serializer.serialize_none(),
        }
    }
}

/// Boundaries of one business-local calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayRange {
    /// Epoch seconds of local midnight (inclusive).
    pub start: i64,
    /// Epoch seconds of the day's last second, `23:59:59` (inclusive).
    pub end: i64,
    /// Local date of `start`, `YYYY-MM-DD`.
    pub start_date: String,
    /// Local date of `end`, `YYYY-MM-DD`.
    pub end_date: String,
}

/// A charge that contributed to the gross volume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountedCharge {
    pub id: String,
    /// Major-unit amount.
    pub amount: Decimal,
    pub currency: String,
    pub created_at: DateTime<Utc>,
}

/// Gross volume for one business day, recomputed on every check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeSnapshot {
    /// Sum of counted charge amounts, major units.
    pub volume: Decimal,
    pub currency: Currency,
    /// Only the succeeded charges in `currency`, in source order.
    pub charges: Vec<CountedCharge>,
    pub date_range: DayRange,
    /// The source reported more charges than were fetched.
    pub possibly_truncated: bool,
}

/// One successfully rescheduled invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRecord {
    pub invoice_id: String,
    /// 1-indexed position in the processed batch.
    pub invoice_number: usize,
    #[serde(serialize_with = "audit_time::serialize_option")]
    pub original_due_date: Option<DateTime<FixedOffset>>,
    #[serde(serialize_with = "audit_time::serialize")]
    pub new_due_date: DateTime<FixedOffset>,
    /// `new_due_date` as epoch seconds, as sent to the provider.
    pub new_due_timestamp: i64,
    pub days_offset: u32,
    /// 1-indexed position within the delay scheme.
    pub cycle_position: usize,
    /// Major-unit amount due.
    pub amount: Decimal,
    pub currency: String,
    #[serde(serialize_with = "audit_time::serialize")]
    pub transferred_at: DateTime<FixedOffset>,
}

/// One invoice whose due-date update was refused or failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferFailure {
    pub invoice_id: String,
    pub invoice_number: usize,
    pub kind: UpdateErrorKind,
    pub reason: String,
}

/// The volume figures that opened the gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Trigger {
    pub daily_volume: Decimal,
    pub volume_limit: Decimal,
    pub currency: Currency,
    pub possibly_truncated: bool,
}

/// Counts for one session. `total_transferred + total_failed` equals
/// `total_unpaid_invoices` unless the run was interrupted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingStats {
    pub total_unpaid_invoices: usize,
    pub total_transferred: usize,
    pub total_failed: usize,
    /// Open invoices ignored because they are in another currency.
    pub skipped_other_currency: usize,
    /// The provider held more open invoices than were listed, so
    /// `total_unpaid_invoices` covers only part of the backlog.
    pub invoices_possibly_truncated: bool,
    pub delay_scheme: DelayScheme,
}

/// Audit document for one run that processed invoices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub session_id: String,
    #[serde(serialize_with = "audit_time::serialize")]
    pub timestamp: DateTime<FixedOffset>,
    /// IANA name of the business timezone.
    pub timezone: String,
    pub trigger: Trigger,
    pub processing: ProcessingStats,
    pub transfers: Vec<TransferRecord>,
    pub failures: Vec<TransferFailure>,
    pub volume_details: VolumeSnapshot,
    /// A shutdown signal stopped the batch before every invoice was attempted.
    pub interrupted: bool,
}
