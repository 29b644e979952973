// Rust guideline compliant 2026-10-16

//! Shared domain types for the invoice-delay job.
//!
//! Defines the provider entities (`Invoice`, `Charge`), the load-time
//! validated values (`Currency`, `DelayScheme`), the audit records written by
//! a session, and the hexagonal port traits: `ChargeSource`, `InvoiceSource`,
//! `InvoiceMutator`, `AuditSink`, and `Clock`.
//! Every other crate depends on this one; it depends on no workspace crate.

mod money;
mod records;
mod scheme;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

pub use money::{Currency, MINOR_UNIT_SCALE, minor_to_major};
pub use records::{
    CountedCharge, DISPLAY_FORMAT, DayRange, ProcessingStats, SessionRecord, TransferFailure,
    TransferRecord, Trigger, VolumeSnapshot,
};
pub use scheme::{CycleSlot, DelayScheme};

// ---------------------------------------------------------------------------
// Provider entities
// ---------------------------------------------------------------------------

/// An open (unpaid) invoice as listed by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invoice {
    /// Opaque provider identifier, unique.
    pub id: String,
    /// Amount still due, provider minor units.
    pub amount_due_minor: i64,
    /// Raw provider currency code (usually lower-case).
    pub currency: String,
    /// Provider customer reference, when the invoice has one.
    pub customer_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Current due date; `None` when the provider has none set.
    pub due_date: Option<DateTime<Utc>>,
}

/// Lifecycle status of a charge. Only `Succeeded` counts toward volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargeStatus {
    Succeeded,
    Pending,
    Failed,
    /// Any status string the job does not recognise.
    Other,
}

impl ChargeStatus {
    /// Map a provider status string (`"succeeded"`, `"pending"`, ...).
    #[must_use]
    pub fn from_provider(raw: &str) -> Self {
        match raw {
            "succeeded" => Self::Succeeded,
            "pending" => Self::Pending,
            "failed" => Self::Failed,
            _ => Self::Other,
        }
    }
}

/// A single payment as listed by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Charge {
    pub id: String,
    /// Provider minor units.
    pub amount_minor: i64,
    /// Raw provider currency code.
    pub currency: String,
    pub status: ChargeStatus,
    pub created_at: DateTime<Utc>,
}

/// One listing result from a provider port.
///
/// `has_more` is `true` when the provider holds items beyond `items` that were
/// not fetched (page cap reached). Consumers must not treat such a page as
/// exhaustive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub has_more: bool,
}

impl<T> Page<T> {
    /// A page known to hold every matching item.
    #[must_use]
    pub fn complete(items: Vec<T>) -> Self {
        Self { items, has_more: false }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A configured value failed validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValueError {
    /// Currency is not three ASCII letters.
    #[error("invalid currency code {code:?}: expected three ASCII letters")]
    InvalidCurrency { code: String },
    /// Currency has no two-decimal minor unit.
    #[error("currency {code} has no two-decimal minor unit")]
    ZeroDecimalCurrency { code: String },
    /// Delay scheme has no offsets.
    #[error("delay scheme must contain at least one offset")]
    EmptyScheme,
    /// Delay scheme contains a zero offset (1-indexed `position`).
    #[error("delay scheme offset at position {position} must be >= 1")]
    NonPositiveOffset { position: usize },
    /// Delay scheme entry is not a non-negative integer.
    #[error("invalid delay scheme entry {entry:?}: {reason}")]
    UnparsableOffset { entry: String, reason: String },
}

/// Errors from the `ChargeSource` and `InvoiceSource` ports.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    /// Network failure or provider outage.
    #[error("provider unavailable: {reason}")]
    Unavailable { reason: String },
    /// Credentials were refused.
    #[error("provider rejected credentials")]
    Unauthorized,
    /// Provider answered with an error status.
    #[error("provider request failed (status {status}): {reason}")]
    Rejected { status: u16, reason: String },
    /// Provider answered with a body that could not be decoded.
    #[error("malformed provider response: {reason}")]
    Malformed { reason: String },
}

/// Classification of an [`UpdateError`], kept in logs and audit records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateErrorKind {
    NotFound,
    InvalidState,
    RateLimited,
    Rejected,
    Transport,
}

impl UpdateErrorKind {
    /// Stable snake-case label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::InvalidState => "invalid_state",
            Self::RateLimited => "rate_limited",
            Self::Rejected => "rejected",
            Self::Transport => "transport",
        }
    }
}

impl fmt::Display for UpdateErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors from the `InvoiceMutator` port.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UpdateError {
    /// The provider does not know the invoice.
    #[error("invoice not found: {reason}")]
    NotFound { reason: String },
    /// The invoice exists but can no longer be edited (paid, voided, ...).
    #[error("invoice not editable: {reason}")]
    InvalidState { reason: String },
    /// The provider throttled the request.
    #[error("rate limited by provider")]
    RateLimited,
    /// Any other provider refusal.
    #[error("update rejected (status {status}): {reason}")]
    Rejected { status: u16, reason: String },
    /// The request never got a provider answer.
    #[error("transport failure: {reason}")]
    Transport { reason: String },
}

impl UpdateError {
    /// Kind label for logs and audit records.
    #[must_use]
    pub fn kind(&self) -> UpdateErrorKind {
        match self {
            Self::NotFound { .. } => UpdateErrorKind::NotFound,
            Self::InvalidState { .. } => UpdateErrorKind::InvalidState,
            Self::RateLimited => UpdateErrorKind::RateLimited,
            Self::Rejected { .. } => UpdateErrorKind::Rejected,
            Self::Transport { .. } => UpdateErrorKind::Transport,
        }
    }
}

/// Errors from the `AuditSink` port.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuditError {
    /// The record could not be encoded.
    #[error("audit record serialization failed: {reason}")]
    Serialization { reason: String },
    /// The backing store refused or failed the write.
    #[error("audit sink unavailable: {reason}")]
    Unavailable { reason: String },
}

// ---------------------------------------------------------------------------
// Ports
// ---------------------------------------------------------------------------

/// Hexagonal port: charges created within a business day.
#[expect(
    async_fn_in_trait,
    reason = "no dyn dispatch needed; internal workspace only"
)]
pub trait ChargeSource {
    /// List charges created in `[range.start, range.end]` (epoch seconds, inclusive).
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] when the listing cannot be obtained.
    async fn list_charges(&self, range: &DayRange) -> Result<Page<Charge>, SourceError>;
}

/// Hexagonal port: invoices awaiting payment.
#[expect(
    async_fn_in_trait,
    reason = "no dyn dispatch needed; internal workspace only"
)]
pub trait InvoiceSource {
    /// List invoices with provider status `open`, in provider order.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] when the listing cannot be obtained.
    async fn list_open_invoices(&self) -> Result<Page<Invoice>, SourceError>;
}

/// Hexagonal port: due-date rescheduling.
#[expect(
    async_fn_in_trait,
    reason = "no dyn dispatch needed; internal workspace only"
)]
pub trait InvoiceMutator {
    /// Overwrite the due date of `invoice_id` with `due_at`.
    ///
    /// # Errors
    ///
    /// Returns an [`UpdateError`] whose kind identifies the failure.
    async fn update_due_date(&self, invoice_id: &str, due_at: DateTime<Utc>)
    -> Result<(), UpdateError>;
}

/// Hexagonal port: durable storage for session records.
#[expect(
    async_fn_in_trait,
    reason = "no dyn dispatch needed; internal workspace only"
)]
pub trait AuditSink {
    /// Store `record` and return where it was written (path, key, ...).
    ///
    /// # Errors
    ///
    /// Returns [`AuditError`] when the record cannot be stored.
    async fn store(&self, record: &SessionRecord) -> Result<String, AuditError>;
}

/// Hexagonal port: the wall clock.
pub trait Clock {
    /// The current instant.
    fn now_utc(&self) -> DateTime<Utc>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn charge_status_maps_provider_strings() {
        assert_eq!(ChargeStatus::from_provider("succeeded"), ChargeStatus::Succeeded);
        assert_eq!(ChargeStatus::from_provider("pending"), ChargeStatus::Pending);
        assert_eq!(ChargeStatus::from_provider("failed"), ChargeStatus::Failed);
        assert_eq!(ChargeStatus::from_provider("refunded"), ChargeStatus::Other);
        // Provider statuses are case-sensitive lower-case.
        assert_eq!(ChargeStatus::from_provider("SUCCEEDED"), ChargeStatus::Other);
    }

    #[test]
    fn update_error_kinds() {
        let cases = [
            (UpdateError::NotFound { reason: "x".to_owned() }, UpdateErrorKind::NotFound),
            (UpdateError::InvalidState { reason: "paid".to_owned() }, UpdateErrorKind::InvalidState),
            (UpdateError::RateLimited, UpdateErrorKind::RateLimited),
            (
                UpdateError::Rejected { status: 400, reason: "bad".to_owned() },
                UpdateErrorKind::Rejected,
            ),
            (UpdateError::Transport { reason: "reset".to_owned() }, UpdateErrorKind::Transport),
        ];
        for (err, kind) in cases {
            assert_eq!(err.kind(), kind, "{err}");
        }
        assert_eq!(UpdateErrorKind::InvalidState.to_string(), "invalid_state");
    }

    #[test]
    fn error_messages() {
        let e = SourceError::Rejected { status: 500, reason: "boom".to_owned() };
        assert_eq!(e.to_string(), "provider request failed (status 500): boom");
        let e = AuditError::Unavailable { reason: "disk full".to_owned() };
        assert_eq!(e.to_string(), "audit sink unavailable: disk full");
        let e = ValueError::NonPositiveOffset { position: 3 };
        assert_eq!(e.to_string(), "delay scheme offset at position 3 must be >= 1");
    }

    #[test]
    fn complete_page_has_no_more() {
        let page = Page::complete(vec![1, 2, 3]);
        assert!(!page.has_more);
        assert_eq!(page.items.len(), 3);
    }

    /// Verify that minimal implementations of every port compile and run.
    #[tokio::test]
    async fn port_trait_struct_impl() {
        struct AllPorts {
            updated: RefCell<Vec<String>>,
        }

        impl ChargeSource for AllPorts {
            async fn list_charges(&self, _range: &DayRange) -> Result<Page<Charge>, SourceError> {
                Ok(Page::complete(vec![]))
            }
        }

        impl InvoiceSource for AllPorts {
            async fn list_open_invoices(&self) -> Result<Page<Invoice>, SourceError> {
                Err(SourceError::Unauthorized)
            }
        }

        impl InvoiceMutator for AllPorts {
            async fn update_due_date(
                &self,
                invoice_id: &str,
                _due_at: DateTime<Utc>,
            ) -> Result<(), UpdateError> {
                self.updated.borrow_mut().push(invoice_id.to_owned());
                Ok(())
            }
        }

        let ports = AllPorts { updated: RefCell::new(vec![]) };
        let range = DayRange {
            start: 0,
            end: 86_399,
            start_date: "1970-01-01".to_owned(),
            end_date: "1970-01-01".to_owned(),
        };
        assert!(ports.list_charges(&range).await.unwrap().items.is_empty());
        assert_eq!(ports.list_open_invoices().await, Err(SourceError::Unauthorized));
        ports.update_due_date("in_1", Utc::now()).await.unwrap();
        assert_eq!(*ports.updated.borrow(), vec!["in_1".to_owned()]);
    }
}
