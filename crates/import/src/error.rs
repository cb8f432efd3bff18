//! Import workflow error taxonomy.
//!
//! Row-level failures (missing SKU, brand creation) never surface here —
//! they become skipped-row outcomes and the job continues. This enum covers
//! the failures that prevent a job from starting or abort it outright.

use thiserror::Error;

use catsync_catalog::StoreError;
use catsync_core::{DomainError, JobId};

use crate::audit::AuditError;
use crate::history::HistoryError;

#[derive(Debug, Error)]
pub enum ImportError {
    /// At most one import job may run at a time, process-wide.
    #[error("an import job is already running: {0}")]
    AlreadyRunning(JobId),

    /// No job with that id in the history store.
    #[error("unknown job: {0}")]
    UnknownJob(JobId),

    /// The job exists but is not currently running.
    #[error("job is not running: {0}")]
    NotRunning(JobId),

    /// The source stream could not be stored. The job never starts.
    #[error("upload failed: {0}")]
    Upload(String),

    /// The catalog backend probe failed. The job never starts.
    #[error("catalog backend unavailable: {0}")]
    DependencyUnavailable(String),

    /// The stored source file could not be read mid-job. Fatal: the job
    /// aborts immediately.
    #[error("failed to read source file: {0}")]
    FileRead(String),

    /// The source header row is missing required columns. Fatal before any
    /// row is processed.
    #[error("source header mismatch; missing columns: {missing:?}")]
    SchemaMismatch { missing: Vec<String> },

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Audit(#[from] AuditError),

    #[error(transparent)]
    History(#[from] HistoryError),
}
