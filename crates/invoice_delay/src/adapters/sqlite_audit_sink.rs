// Rust guideline compliant 2026-10-16

//! SQLite adapter for the `AuditSink` port.
//!
//! Stores one row per session in `sessions` (headline figures plus the full
//! JSON document) and one row per applied transfer in `transfers`, inside a
//! single transaction. Session ids are primary keys: storing the same session
//! twice fails instead of overwriting the first record.

use domain::{AuditError, AuditSink, DISPLAY_FORMAT, SessionRecord};

/// `AuditSink` adapter backed by a SQLite database via `sqlx`.
#[derive(Debug, Clone)]
pub struct SqliteAuditSink {
    pool: sqlx::SqlitePool,
}

impl SqliteAuditSink {
    /// Open or create a SQLite database and initialize the schema.
    ///
    /// The file is created on first use; `CREATE TABLE IF NOT EXISTS` makes
    /// repeated calls safe.
    ///
    /// # Errors
    ///
    /// Returns `sqlx::Error` when the connection or schema creation fails.
    pub async fn new(db_url: &str) -> Result<Self, sqlx::Error> {
        let opts = db_url
            .parse::<sqlx::sqlite::SqliteConnectOptions>()?
            .create_if_missing(true);
        let pool = sqlx::SqlitePool::connect_with(opts).await?;
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS sessions (
                session_id          TEXT    PRIMARY KEY,
                recorded_at         TEXT    NOT NULL,
                timezone            TEXT    NOT NULL,
                daily_volume        TEXT    NOT NULL,
                volume_limit        TEXT    NOT NULL,
                currency            TEXT    NOT NULL,
                total_unpaid        INTEGER NOT NULL,
                total_transferred   INTEGER NOT NULL,
                total_failed        INTEGER NOT NULL,
                interrupted         INTEGER NOT NULL,
                document            TEXT    NOT NULL
            )",
        )
        .execute(&pool)
        .await?;
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS transfers (
                session_id          TEXT    NOT NULL REFERENCES sessions(session_id),
                invoice_id          TEXT    NOT NULL,
                invoice_number      INTEGER NOT NULL,
                cycle_position      INTEGER NOT NULL,
                days_offset         INTEGER NOT NULL,
                new_due_date        TEXT    NOT NULL,
                new_due_timestamp   INTEGER NOT NULL,
                amount              TEXT    NOT NULL,
                currency            TEXT    NOT NULL,
                PRIMARY KEY (session_id, invoice_number)
            )",
        )
        .execute(&pool)
        .await?;
        Ok(Self { pool })
    }
}

fn to_i64(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

fn unavailable(error: &sqlx::Error) -> AuditError {
    tracing::error!(error = %error, "sqlite_audit_sink.store");
    AuditError::Unavailable { reason: error.to_string() }
}

impl AuditSink for SqliteAuditSink {
    /// Insert the session and its transfers; returns `sqlite:sessions/<id>`.
    ///
    /// # Errors
    ///
    /// Returns `AuditError::Serialization` if the document cannot be encoded,
    /// or `AuditError::Unavailable` on any `sqlx` error (including a
    /// duplicate session id). Nothing is written on error.
    async fn store(&self, record: &SessionRecord) -> Result<String, AuditError> {
        let document = serde_json::to_string(record)
            .map_err(|e| AuditError::Serialization { reason: e.to_string() })?;

        let mut tx = self.pool.begin().await.map_err(|e| unavailable(&e))?;
        sqlx::query(
            "INSERT INTO sessions
             (session_id, recorded_at, timezone, daily_volume, volume_limit, currency,
              total_unpaid, total_transferred, total_failed, interrupted, document)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.session_id)
        .bind(record.timestamp.format(DISPLAY_FORMAT).to_string())
        .bind(&record.timezone)
        .bind(record.trigger.daily_volume.to_string())
        .bind(record.trigger.volume_limit.to_string())
        .bind(record.trigger.currency.code())
        .bind(to_i64(record.processing.total_unpaid_invoices))
        .bind(to_i64(record.processing.total_transferred))
        .bind(to_i64(record.processing.total_failed))
        .bind(i64::from(record.interrupted))
        .bind(document)
        .execute(&mut *tx)
        .await
        .map_err(|e| unavailable(&e))?;

        for transfer in &record.transfers {
            sqlx::query(
                "INSERT INTO transfers
                 (session_id, invoice_id, invoice_number, cycle_position, days_offset,
                  new_due_date, new_due_timestamp, amount, currency)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&record.session_id)
            .bind(&transfer.invoice_id)
            .bind(to_i64(transfer.invoice_number))
            .bind(to_i64(transfer.cycle_position))
            .bind(i64::from(transfer.days_offset))
            .bind(transfer.new_due_date.format(DISPLAY_FORMAT).to_string())
            .bind(transfer.new_due_timestamp)
            .bind(transfer.amount.to_string())
            .bind(&transfer.currency)
            .execute(&mut *tx)
            .await
            .map_err(|e| unavailable(&e))?;
        }

        tx.commit().await.map_err(|e| unavailable(&e))?;
        Ok(format!("sqlite:sessions/{}", record.session_id))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::SqliteAuditSink;
    use crate::adapters::test_support::sample_record;
    use domain::{AuditError, AuditSink as _};

    // Every call opens a fresh in-memory database, so tests are isolated.
    async fn make_sink() -> SqliteAuditSink {
        SqliteAuditSink::new("sqlite::memory:")
            .await
            .expect("in-memory SQLite should open")
    }

    async fn count(sink: &SqliteAuditSink, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&sink.pool)
            .await
            .unwrap()
    }

    // SAS-T01: one session row and one row per transfer.
    #[tokio::test]
    async fn store_writes_session_and_transfers() {
        let sink = make_sink().await;
        let location = sink.store(&sample_record("session-1")).await.unwrap();
        assert_eq!(location, "sqlite:sessions/session-1");
        assert_eq!(count(&sink, "sessions").await, 1);
        assert_eq!(count(&sink, "transfers").await, 2);
    }

    // SAS-T02: headline columns and the document are readable back.
    #[tokio::test]
    async fn session_columns_round_trip() {
        let sink = make_sink().await;
        sink.store(&sample_record("session-2")).await.unwrap();

        let (volume, transferred, failed, document): (String, i64, i64, String) = sqlx::query_as(
            "SELECT daily_volume, total_transferred, total_failed, document
             FROM sessions WHERE session_id = ?",
        )
        .bind("session-2")
        .fetch_one(&sink.pool)
        .await
        .unwrap();

        assert_eq!(volume, "30.00");
        assert_eq!(transferred, 2);
        assert_eq!(failed, 1);
        let json: serde_json::Value = serde_json::from_str(&document).unwrap();
        assert_eq!(json["sessionId"], "session-2");
    }

    // SAS-T03: transfer rows keep due dates in business-local form.
    #[tokio::test]
    async fn transfer_rows_keep_due_dates() {
        let sink = make_sink().await;
        sink.store(&sample_record("session-3")).await.unwrap();
        let dates: Vec<String> = sqlx::query_scalar(
            "SELECT new_due_date FROM transfers WHERE session_id = ? ORDER BY invoice_number",
        )
        .bind("session-3")
        .fetch_all(&sink.pool)
        .await
        .unwrap();
        assert_eq!(dates, vec!["2026-03-04 12:00:00".to_owned(), "2026-03-08 12:00:00".to_owned()]);
    }

    // SAS-T04: a duplicate session id fails and leaves the first intact.
    #[tokio::test]
    async fn duplicate_session_is_rejected() {
        let sink = make_sink().await;
        sink.store(&sample_record("session-dup")).await.unwrap();
        let result = sink.store(&sample_record("session-dup")).await;
        assert!(matches!(result, Err(AuditError::Unavailable { .. })), "{result:?}");
        assert_eq!(count(&sink, "sessions").await, 1);
        assert_eq!(count(&sink, "transfers").await, 2);
    }
}
