// Rust guideline compliant 2026-10-16

//! In-memory adapter for the `AuditSink` port.
//!
//! Intended for the offline demo and unit tests. Returns
//! `AuditError::Unavailable` once `capacity` records are held.

use std::cell::RefCell;

use domain::{AuditError, AuditSink, SessionRecord};

/// `AuditSink` adapter backed by an in-memory `Vec<SessionRecord>`.
#[derive(Debug)]
pub struct InMemoryAuditSink {
    inner: RefCell<Vec<SessionRecord>>,
    /// Maximum number of records the sink can hold.
    capacity: usize,
}

impl InMemoryAuditSink {
    /// Create an empty sink holding at most `capacity` records.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self { inner: RefCell::new(vec![]), capacity }
    }

    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.borrow().is_empty()
    }

    /// Copy of the stored records, oldest first.
    #[must_use]
    pub fn records(&self) -> Vec<SessionRecord> {
        self.inner.borrow().clone()
    }
}

impl AuditSink for InMemoryAuditSink {
    /// Append `record`; the location is `memory:<index>`.
    ///
    /// # Errors
    ///
    /// Returns `AuditError::Unavailable` when the sink is full.
    async fn store(&self, record: &SessionRecord) -> Result<String, AuditError> {
        let mut inner = self.inner.borrow_mut();
        if inner.len() >= self.capacity {
            return Err(AuditError::Unavailable {
                reason: format!("in-memory sink full (capacity {})", self.capacity),
            });
        }
        inner.push(record.clone());
        Ok(format!("memory:{}", inner.len() - 1))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::InMemoryAuditSink;
    use crate::adapters::test_support::sample_record;
    use domain::{AuditError, AuditSink as _};

    // IMA-T01: records accumulate with increasing locations.
    #[tokio::test]
    async fn records_accumulate() {
        let sink = InMemoryAuditSink::new(10);
        assert!(sink.is_empty());
        assert_eq!(sink.store(&sample_record("s-1")).await.unwrap(), "memory:0");
        assert_eq!(sink.store(&sample_record("s-2")).await.unwrap(), "memory:1");
        assert_eq!(sink.len(), 2);
        assert_eq!(sink.records()[1].session_id, "s-2");
    }

    // IMA-T02: a full sink refuses further records.
    #[tokio::test]
    async fn full_sink_is_unavailable() {
        let sink = InMemoryAuditSink::new(1);
        sink.store(&sample_record("s-1")).await.unwrap();
        let result = sink.store(&sample_record("s-2")).await;
        assert!(matches!(result, Err(AuditError::Unavailable { .. })), "{result:?}");
        assert_eq!(sink.len(), 1);
    }
}
