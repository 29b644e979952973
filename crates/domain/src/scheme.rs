// Rust guideline compliant 2026-10-16

//! The cyclical delay scheme.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::ValueError;

/// Ordered, non-empty list of day offsets applied cyclically by batch position.
///
/// Every offset is `>= 1`; both invariants are checked by [`DelayScheme::new`]
/// so a constructed scheme is always usable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DelayScheme(Vec<u32>);

/// Where an invoice lands inside one repetition of a [`DelayScheme`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleSlot {
    /// 1-indexed position within the scheme.
    pub cycle_position: usize,
    /// Day offset stored at that position.
    pub days_offset: u32,
}

impl DelayScheme {
    /// Validate and wrap `offsets`.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::EmptyScheme`] for an empty list and
    /// [`ValueError::NonPositiveOffset`] when any entry is zero.
    pub fn new(offsets: Vec<u32>) -> Result<Self, ValueError> {
        if offsets.is_empty() {
            return Err(ValueError::EmptyScheme);
        }
        if let Some(idx) = offsets.iter().position(|&d| d == 0) {
            return Err(ValueError::NonPositiveOffset { position: idx + 1 });
        }
        Ok(Self(offsets))
    }

    /// Offsets in scheme order.
    #[must_use]
    pub fn offsets(&self) -> &[u32] {
        &self.0
    }

    /// Number of offsets in one cycle (always `>= 1`).
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`; present for API symmetry with `len`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Slot for the `invoice_number`-th invoice of a batch (1-indexed).
    ///
    /// `cycle_position = ((invoice_number - 1) mod len) + 1`. An
    /// `invoice_number` of 0 is treated as 1.
    #[must_use]
    pub fn slot(&self, invoice_number: usize) -> CycleSlot {
        let idx = invoice_number.saturating_sub(1) % self.0.len();
        CycleSlot { cycle_position: idx + 1, days_offset: self.0[idx] }
    }
}

impl fmt::Display for DelayScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(u32::to_string).collect();
        write!(f, "[{}]", parts.join(", "))
    }
}

impl FromStr for DelayScheme {
    type Err = ValueError;

    /// Parse a comma-separated list such as `"1,3,5,7,9"`.
    ///
    /// Negative or non-numeric entries are rejected as unparsable.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let offsets = s
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| {
                entry
                    .parse::<u32>()
                    .map_err(|e| ValueError::UnparsableOffset {
                        entry: entry.to_owned(),
                        reason: e.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(offsets)
    }
}
