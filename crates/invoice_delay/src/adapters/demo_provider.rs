// Rust guideline compliant 2026-10-16

//! Offline provider for the demo binary.
//!
//! Implements `ChargeSource`, `InvoiceSource` and `InvoiceMutator` over a
//! randomly generated account. Seeded randomness makes runs reproducible.
//! Most charges are succeeded and in the account currency; a few are pending
//! or in a foreign currency so the gate's filters have something to do.
//! Due-date updates fail with probability `failure_rate`.

use std::cell::RefCell;

use chrono::{DateTime, TimeZone as _, Utc};
use domain::{
    Charge, ChargeSource, ChargeStatus, Currency, DayRange, Invoice, InvoiceMutator,
    InvoiceSource, Page, SourceError, UpdateError,
};
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::config::DemoSettings;

/// Currency used for the off-account share of generated items.
const FOREIGN_CURRENCY: &str = "eur";

/// One applied due-date change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedUpdate {
    pub invoice_id: String,
    pub due_at: DateTime<Utc>,
}

/// Generated provider account.
#[derive(Debug)]
pub struct DemoProvider {
    charges: Vec<Charge>,
    invoices: RefCell<Vec<Invoice>>,
    applied: RefCell<Vec<AppliedUpdate>>,
    failure_rate: f64,
    /// Interior mutability required (ports take `&self`).
    rng: RefCell<StdRng>,
}

impl DemoProvider {
    /// Generate an account whose charges fall inside `day`.
    ///
    /// `settings.seed = Some(s)` produces the same account and the same update
    /// failures on every run; `None` seeds from the OS.
    #[must_use]
    pub fn new(settings: &DemoSettings, currency: &Currency, day: &DayRange) -> Self {
        let mut rng = match settings.seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_os_rng(),
        };
        let account = currency.code().to_ascii_lowercase();

        let charges = (0..settings.charges)
            .map(|i| {
                let status = if rng.random_bool(0.85) {
                    ChargeStatus::Succeeded
                } else {
                    ChargeStatus::Pending
                };
                Charge {
                    id: format!("ch_demo_{i:03}"),
                    amount_minor: rng.random_range(100..=1_500),
                    currency: pick_currency(&mut rng, &account),
                    status,
                    created_at: epoch(rng.random_range(day.start..=day.end)),
                }
            })
            .collect();

        let invoices = (0..settings.invoices)
            .map(|i| Invoice {
                id: format!("in_demo_{i:03}"),
                amount_due_minor: rng.random_range(1_000..=50_000),
                currency: pick_currency(&mut rng, &account),
                customer_ref: Some(format!("cus_demo_{:02}", rng.random_range(0..5_u32))),
                created_at: epoch(day.start - rng.random_range(86_400..=30 * 86_400)),
                due_date: None,
            })
            .collect();

        Self {
            charges,
            invoices: RefCell::new(invoices),
            applied: RefCell::new(vec![]),
            failure_rate: settings.failure_rate,
            rng: RefCell::new(rng),
        }
    }

    /// Due-date changes applied so far, in call order.
    #[must_use]
    pub fn applied(&self) -> Vec<AppliedUpdate> {
        self.applied.borrow().clone()
    }

    /// Number of generated charges, before any filtering.
    #[must_use]
    pub fn charge_count(&self) -> usize {
        self.charges.len()
    }
}

fn pick_currency(rng: &mut StdRng, account: &str) -> String {
    if rng.random_bool(0.15) {
        FOREIGN_CURRENCY.to_owned()
    } else {
        account.to_owned()
    }
}

fn epoch(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().unwrap_or_default()
}

impl ChargeSource for DemoProvider {
    async fn list_charges(&self, range: &DayRange) -> Result<Page<Charge>, SourceError> {
        let items: Vec<Charge> = self
            .charges
            .iter()
            .filter(|c| (range.start..=range.end).contains(&c.created_at.timestamp()))
            .cloned()
            .collect();
        tracing::debug!(count = items.len(), "demo_provider.list_charges");
        Ok(Page::complete(items))
    }
}

impl InvoiceSource for DemoProvider {
    async fn list_open_invoices(&self) -> Result<Page<Invoice>, SourceError> {
        Ok(Page::complete(self.invoices.borrow().clone()))
    }
}

impl InvoiceMutator for DemoProvider {
    /// Apply the change, or fail with probability `failure_rate`.
    ///
    /// # Errors
    ///
    /// `UpdateError::NotFound` for unknown ids and `UpdateError::InvalidState`
    /// for simulated refusals.
    async fn update_due_date(
        &self,
        invoice_id: &str,
        due_at: DateTime<Utc>,
    ) -> Result<(), UpdateError> {
        let mut invoices = self.invoices.borrow_mut();
        let Some(invoice) = invoices.iter_mut().find(|i| i.id == invoice_id) else {
            return Err(UpdateError::NotFound { reason: format!("no such invoice: {invoice_id}") });
        };
        if self.rng.borrow_mut().random_bool(self.failure_rate) {
            tracing::debug!(invoice_id, "demo_provider.update.simulated_failure");
            return Err(UpdateError::InvalidState {
                reason: "simulated: invoice finalized elsewhere".to_owned(),
            });
        }
        invoice.due_date = Some(due_at);
        self.applied
            .borrow_mut()
            .push(AppliedUpdate { invoice_id: invoice_id.to_owned(), due_at });
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
