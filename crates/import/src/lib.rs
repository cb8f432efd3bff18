//! `catsync-import` — the CSV import workflow.
//!
//! A job-controlled, cooperatively cancellable row loop: the controller owns
//! job lifecycle and history, the row processor upserts catalog records and
//! resolves brand terms, and every decision lands in an append-only audit
//! log, one line per event.

pub mod audit;
pub mod cancel;
pub mod controller;
pub mod error;
pub mod history;
pub mod job;
pub mod row;
pub mod schema;
pub mod upload;

#[cfg(test)]
mod integration_tests;

pub use audit::{AuditLog, FileAuditLog, MemoryAuditLog};
pub use cancel::CancelToken;
pub use controller::{JobController, JobSummary};
pub use error::ImportError;
pub use history::{InMemoryHistory, JobHistoryStore, JsonlHistory};
pub use job::{ImportJob, JobCounters, JobStatus};
pub use row::{ImportOptions, RowOutcome, RowProcessor, SkipReason};
pub use schema::{ImportSchema, RawRow};
pub use upload::{FileRef, UploadStore};
