// Rust guideline compliant 2026-10-16

//! Cyclical due-date scheduling for a batch of invoices.
//!
//! [`DelayScheduler`] assigns every invoice of a batch a day offset taken
//! from a [`DelayScheme`] by batch position, and the absolute due date that
//! offset yields from the run's captured instant. It performs no I/O and
//! holds no state beyond the scheme.

use business_time::{BusinessTime, TimeError};
use chrono::DateTime;
use chrono_tz::Tz;
use domain::{Clock, DelayScheme, Invoice};

// ---------------------------------------------------------------------------
// ScheduledInvoice
// ---------------------------------------------------------------------------

/// An invoice paired with its computed rescheduling target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledInvoice {
    /// The input invoice, unchanged.
    pub invoice: Invoice,
    /// 1-indexed position in the input batch.
    pub invoice_number: usize,
    /// 1-indexed position within the scheme.
    pub cycle_position: usize,
    /// Days added to the run instant.
    pub days_offset: u32,
    /// New due date, at the transfer hour in the business zone.
    pub due_at: DateTime<Tz>,
}

// ---------------------------------------------------------------------------
// DelayScheduler
// ---------------------------------------------------------------------------

/// Pure scheduling component.
///
/// Every due date is anchored to the single `now` passed to
/// [`schedule`](Self::schedule), never to an invoice's own history, so one
/// batch lands on at most `scheme.len()` distinct dates.
#[derive(Debug, Clone)]
pub struct DelayScheduler {
    scheme: DelayScheme,
}

impl DelayScheduler {
    /// Create a scheduler for `scheme`.
    #[must_use]
    pub fn new(scheme: DelayScheme) -> Self {
        Self { scheme }
    }

    /// The scheme in use.
    #[must_use]
    pub fn scheme(&self) -> &DelayScheme {
        &self.scheme
    }

    /// Schedule `invoices` in input order; returns one entry per input.
    ///
    /// The batch is neither sorted nor deduplicated: entry `i` always wraps
    /// `invoices[i]` with `invoice_number = i + 1`.
    ///
    /// # Errors
    ///
    /// Returns [`TimeError::OutOfRange`] if a due date overflows the calendar.
    pub fn schedule<C: Clock>(
        &self,
        invoices: Vec<Invoice>,
        time: &BusinessTime<C>,
        now: &DateTime<Tz>,
    ) -> Result<Vec<ScheduledInvoice>, TimeError> {
        tracing::debug!(batch_size = invoices.len(), scheme = %self.scheme, "scheduler.schedule");
        let mut scheduled = Vec::with_capacity(invoices.len());
        for (idx, invoice) in invoices.into_iter().enumerate() {
            let invoice_number = idx + 1;
            let slot = self.scheme.slot(invoice_number);
            let due_at = time.due_date_for(slot.days_offset, now)?;
            scheduled.push(ScheduledInvoice {
                invoice,
                invoice_number,
                cycle_position: slot.cycle_position,
                days_offset: slot.days_offset,
                due_at,
            });
        }
        Ok(scheduled)
    }
}
