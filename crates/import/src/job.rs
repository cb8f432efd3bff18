//! Import job lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use catsync_core::{DomainError, DomainResult, JobId};

use crate::row::RowOutcome;
use crate::upload::FileRef;

/// Job execution status.
///
/// State machine: `Created → Running → {Completed | Stopped | Failed}`.
/// `Stopped` and `Failed` are terminal and distinct from `Completed` for
/// audit purposes; nothing transitions out of a terminal state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Upload accepted, not yet processing.
    Created,
    /// Row loop in progress.
    Running,
    /// Reached end of input.
    Completed,
    /// Operator requested a stop; the loop honoured it at a row boundary.
    Stopped,
    /// Aborted on an unrecoverable error.
    Failed { error: String },
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Stopped | JobStatus::Failed { .. }
        )
    }
}

/// Per-row outcome tallies for one job run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobCounters {
    pub created: u64,
    pub updated: u64,
    pub deleted: u64,
    pub skipped: u64,
}

impl JobCounters {
    pub fn record(&mut self, outcome: &RowOutcome) {
        match outcome {
            RowOutcome::Created { .. } => self.created += 1,
            RowOutcome::Updated { .. } => self.updated += 1,
            RowOutcome::Deleted { .. } => self.deleted += 1,
            RowOutcome::Skipped { .. } => self.skipped += 1,
        }
    }

    pub fn rows(&self) -> u64 {
        self.created + self.updated + self.deleted + self.skipped
    }
}

/// One import job run. A historical record: created when an upload is
/// accepted, mutated through its state machine, never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportJob {
    pub id: JobId,
    pub source: FileRef,
    pub log: FileRef,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub counters: JobCounters,
}

impl ImportJob {
    pub fn new(source: FileRef, log: FileRef) -> Self {
        Self {
            id: JobId::new(),
            source,
            log,
            status: JobStatus::Created,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
            counters: JobCounters::default(),
        }
    }

    pub fn mark_running(&mut self) -> DomainResult<()> {
        if self.status != JobStatus::Created {
            return Err(DomainError::conflict(format!(
                "job {} cannot start from {:?}",
                self.id, self.status
            )));
        }
        self.status = JobStatus::Running;
        self.started_at = Some(Utc::now());
        Ok(())
    }

    pub fn mark_completed(&mut self) -> DomainResult<()> {
        self.finish(JobStatus::Completed)
    }

    pub fn mark_stopped(&mut self) -> DomainResult<()> {
        self.finish(JobStatus::Stopped)
    }

    pub fn mark_failed(&mut self, error: impl Into<String>) -> DomainResult<()> {
        self.finish(JobStatus::Failed {
            error: error.into(),
        })
    }

    fn finish(&mut self, status: JobStatus) -> DomainResult<()> {
        if self.status != JobStatus::Running {
            return Err(DomainError::conflict(format!(
                "job {} cannot finish from {:?}",
                self.id, self.status
            )));
        }
        self.status = status;
        self.finished_at = Some(Utc::now());
        Ok(())
    }
}
