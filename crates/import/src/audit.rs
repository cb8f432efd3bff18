//! Append-only audit log.
//!
//! One line per event (job start/stop/finish, per-row outcome). The
//! file-backed sink syncs every line to disk before returning, so a mid-job
//! crash retains the log up to the last completed row.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use chrono::Utc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("failed to append audit line: {0}")]
    Io(#[from] std::io::Error),
}

/// Append-only sink for job events. Entries must be durable by the time
/// `append` returns; no buffering that could lose lines on abnormal
/// termination.
pub trait AuditLog {
    fn append(&mut self, message: &str) -> Result<(), AuditError>;
}

/// File-backed audit log. Each line is timestamped and synced to disk.
#[derive(Debug)]
pub struct FileAuditLog {
    file: File,
}

impl FileAuditLog {
    /// Open an existing log file for appending. The file itself is created
    /// (collision-safe) by the upload store.
    pub fn open_append(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        let file = File::options().append(true).open(path.as_ref())?;
        Ok(Self { file })
    }
}

impl AuditLog for FileAuditLog {
    fn append(&mut self, message: &str) -> Result<(), AuditError> {
        let line = format!("{} {}\n", Utc::now().format("%Y-%m-%d %H:%M:%S"), message);
        self.file.write_all(line.as_bytes())?;
        self.file.sync_data()?;
        Ok(())
    }
}

/// In-memory audit log for tests. Stores raw messages without timestamps so
/// assertions stay deterministic.
#[derive(Debug, Default)]
pub struct MemoryAuditLog {
    lines: Vec<String>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

impl AuditLog for MemoryAuditLog {
    fn append(&mut self, message: &str) -> Result<(), AuditError> {
        self.lines.push(message.to_string());
        Ok(())
    }
}
