// Rust guideline compliant 2026-10-16

//! File adapter for the `AuditSink` port.
//!
//! Writes one pretty-printed JSON document per processed run to
//! `<dir>/transfer-session-YYYY-MM-DD-HHmmss.json`, stamped with the run's
//! business-local time. An existing file is never overwritten; a second run
//! within the same second gets the session id appended to its name.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use domain::{AuditError, AuditSink, SessionRecord};
use tokio::io::AsyncWriteExt as _;

/// `AuditSink` writing JSON files into a directory.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    dir: PathBuf,
}

impl JsonFileSink {
    /// Create a sink writing into `dir`. The directory is created on first write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Target directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Primary file name for `record`.
    #[must_use]
    pub fn file_name(record: &SessionRecord) -> String {
        format!("transfer-session-{}.json", record.timestamp.format("%Y-%m-%d-%H%M%S"))
    }

    /// Create `path` exclusively and write `bytes`. `Ok(false)` when it exists.
    async fn write_new(path: &Path, bytes: &[u8]) -> Result<bool, AuditError> {
        let file = tokio::fs::OpenOptions::new().write(true).create_new(true).open(path).await;
        let mut file = match file {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(false),
            Err(e) => return Err(unavailable(path, &e)),
        };
        file.write_all(bytes).await.map_err(|e| unavailable(path, &e))?;
        file.flush().await.map_err(|e| unavailable(path, &e))?;
        Ok(true)
    }
}

fn unavailable(path: &Path, error: &std::io::Error) -> AuditError {
    AuditError::Unavailable { reason: format!("{}: {error}", path.display()) }
}

impl AuditSink for JsonFileSink {
    /// Write `record` and return the file path.
    ///
    /// # Errors
    ///
    /// Returns `AuditError::Serialization` if the record cannot be encoded and
    /// `AuditError::Unavailable` on any filesystem failure.
    async fn store(&self, record: &SessionRecord) -> Result<String, AuditError> {
        let bytes = serde_json::to_vec_pretty(record)
            .map_err(|e| AuditError::Serialization { reason: e.to_string() })?;
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| unavailable(&self.dir, &e))?;

        let primary = self.dir.join(Self::file_name(record));
        if Self::write_new(&primary, &bytes).await? {
            return Ok(primary.display().to_string());
        }

        let stem = Self::file_name(record);
        let stem = stem.trim_end_matches(".json");
        let fallback = self.dir.join(format!("{stem}-{}.json", record.session_id));
        tracing::warn!(
            existing = %primary.display(),
            path = %fallback.display(),
            "json_file_sink.name_taken"
        );
        if Self::write_new(&fallback, &bytes).await? {
            return Ok(fallback.display().to_string());
        }
        Err(AuditError::Unavailable { reason: format!("{} already exists", fallback.display()) })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
