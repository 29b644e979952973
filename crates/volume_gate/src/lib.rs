// Rust guideline compliant 2026-10-16

//! Volume gate -- sums a business day's successful charges in the account
//! currency and decides whether invoice processing should run.
//!
//! Entry points: [`VolumeGate::evaluate`], [`VolumeGate::is_open`].
//! Configuration via [`GateConfig::builder`].

use domain::{Charge, ChargeStatus, CountedCharge, Currency, DayRange, Page, VolumeSnapshot};
use rust_decimal::Decimal;

// ---------------------------------------------------------------------------
// GateError
// ---------------------------------------------------------------------------

/// Errors that can occur while configuring the gate.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    /// The supplied configuration is invalid.
    #[error("invalid gate configuration: {reason}")]
    InvalidConfig {
        /// Human-readable description of the problem.
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// GateConfig + builder
// ---------------------------------------------------------------------------

/// Runtime configuration for a [`VolumeGate`].
///
/// Construct via [`GateConfig::builder`].
#[derive(Debug, Clone)]
pub struct GateConfig {
    /// Only charges in this currency count toward the volume.
    pub currency: Currency,
    /// Gross volume (major units) at or above which the gate opens.
    pub threshold: Decimal,
}

/// Builder for [`GateConfig`].
///
/// Obtain via [`GateConfig::builder`]; finalize with [`build`](Self::build).
#[derive(Debug)]
pub struct GateConfigBuilder {
    currency: Currency,
    threshold: Decimal,
}

impl GateConfig {
    /// Create a builder. `currency` is the only required parameter.
    ///
    /// Default values: `threshold = 30`.
    #[must_use]
    pub fn builder(currency: Currency) -> GateConfigBuilder {
        GateConfigBuilder { currency, threshold: Decimal::from(30) }
    }
}

impl GateConfigBuilder {
    /// Override the volume threshold.
    #[must_use]
    pub fn threshold(mut self, threshold: Decimal) -> Self {
        self.threshold = threshold;
        self
    }

    /// Validate and build the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::InvalidConfig`] when the threshold is not positive.
    #[must_use = "the Result must be checked; use ? or unwrap"]
    pub fn build(self) -> Result<GateConfig, GateError> {
        if self.threshold <= Decimal::ZERO {
            return Err(GateError::InvalidConfig {
                reason: format!("threshold must be > 0, got {}", self.threshold),
            });
        }
        Ok(GateConfig { currency: self.currency, threshold: self.threshold })
    }
}

// ---------------------------------------------------------------------------
// VolumeGate
// ---------------------------------------------------------------------------

/// Decides whether today's gross volume has reached the configured threshold.
///
/// Stateless apart from its configuration; every call to
/// [`evaluate`](Self::evaluate) starts from the charges it is given.
#[derive(Debug, Clone)]
pub struct VolumeGate {
    config: GateConfig,
}

impl VolumeGate {
    /// Create a gate from `config`.
    #[must_use]
    pub fn new(config: GateConfig) -> Self {
        Self { config }
    }

    /// Configured threshold, major units.
    #[must_use]
    pub fn threshold(&self) -> Decimal {
        self.config.threshold
    }

    /// Configured currency.
    #[must_use]
    pub fn currency(&self) -> &Currency {
        &self.config.currency
    }

    /// Sum the succeeded charges of `page` that are in the configured currency.
    ///
    /// Excluded charges appear neither in the sum nor in the snapshot's charge
    /// list. A page flagged `has_more` yields a snapshot marked
    /// `possibly_truncated`.
    #[must_use]
    pub fn evaluate(&self, page: Page<Charge>, date_range: DayRange) -> VolumeSnapshot {
        let fetched = page.items.len();
        let charges: Vec<CountedCharge> = page
            .items
            .into_iter()
            .filter(|c| c.status == ChargeStatus::Succeeded && self.config.currency.matches(&c.currency))
            .map(|c| CountedCharge {
                amount: domain::minor_to_major(c.amount_minor),
                id: c.id,
                currency: c.currency,
                created_at: c.created_at,
            })
            .collect();
        let volume: Decimal = charges.iter().map(|c| c.amount).sum();

        tracing::info!(
            volume = %volume,
            currency = %self.config.currency,
            counted = charges.len(),
            excluded = fetched - charges.len(),
            start_date = %date_range.start_date,
            "gate.volume.evaluated"
        );
        if page.has_more {
            tracing::warn!(
                fetched,
                "gate.volume.truncated: charge source holds more data; volume may be understated"
            );
        }

        VolumeSnapshot {
            volume,
            currency: self.config.currency.clone(),
            charges,
            date_range,
            possibly_truncated: page.has_more,
        }
    }

    /// `true` iff `snapshot.volume >= threshold` (inclusive).
    #[must_use]
    pub fn is_open(&self, snapshot: &VolumeSnapshot) -> bool {
        snapshot.volume >= self.config.threshold
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
