//! Job controller: owns job lifecycle, enforces the single-job rule, and
//! drives the cancellable row loop.

use std::fs::File;
use std::io::Read;
use std::sync::Mutex;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use catsync_catalog::{CatalogStore, TaxonomyStore};
use catsync_core::JobId;

use crate::audit::{AuditLog, FileAuditLog};
use crate::cancel::CancelToken;
use crate::error::ImportError;
use crate::history::JobHistoryStore;
use crate::job::{ImportJob, JobCounters, JobStatus};
use crate::row::{ImportOptions, RowProcessor};
use crate::schema::ImportSchema;
use crate::upload::UploadStore;

/// What a finished (or stopped) run looked like.
#[derive(Debug, Clone)]
pub struct JobSummary {
    pub job_id: JobId,
    pub status: JobStatus,
    pub counters: JobCounters,
}

impl From<&ImportJob> for JobSummary {
    fn from(job: &ImportJob) -> Self {
        Self {
            job_id: job.id,
            status: job.status.clone(),
            counters: job.counters,
        }
    }
}

enum LoopEnd {
    Completed,
    Stopped,
}

/// Controls import job runs. At most one job is active at a time,
/// process-wide; every state transition is persisted to the history store
/// before the call returns, so a crash between rows leaves an accurate
/// last-known status.
pub struct JobController<H: JobHistoryStore> {
    history: H,
    uploads: UploadStore,
    active: Mutex<Option<(JobId, CancelToken)>>,
}

impl<H: JobHistoryStore> JobController<H> {
    pub fn new(history: H, uploads: UploadStore) -> Self {
        Self {
            history,
            uploads,
            active: Mutex::new(None),
        }
    }

    /// Accept an upload and start a job: store the source, create its log,
    /// persist `Created → Running`, register the cancellation token.
    ///
    /// Fails without starting anything when a job is already running, the
    /// catalog probe fails, or the source cannot be stored.
    pub fn start<C: CatalogStore>(
        &self,
        source: impl Read,
        catalog: &C,
    ) -> Result<JobId, ImportError> {
        let mut active = self.active.lock().unwrap();
        if let Some((id, _)) = active.as_ref() {
            return Err(ImportError::AlreadyRunning(*id));
        }
        // A `Running` history entry with no live token is a leftover from a
        // process that died mid-job. Fail it durably; otherwise no job could
        // ever start again after a crash.
        if let Some(mut stale) = self.history.running()? {
            stale.mark_failed("interrupted: process exited mid-job")?;
            self.history.update(&stale)?;
            warn!(job_id = %stale.id, "failed stale running job left by a previous process");
        }

        catalog
            .ready()
            .map_err(|e| ImportError::DependencyUnavailable(e.to_string()))?;

        let source_ref = self.uploads.save_upload(source)?;
        let (log_ref, _log) = self.uploads.create_log()?;

        let mut job = ImportJob::new(source_ref, log_ref);
        self.history.insert(&job)?;
        job.mark_running()?;
        self.history.update(&job)?;

        let token = CancelToken::new();
        *active = Some((job.id, token));
        info!(job_id = %job.id, source = %job.source.name, "import job started");
        Ok(job.id)
    }

    /// Request a cooperative stop. Takes effect at the next row boundary;
    /// the in-flight row completes.
    pub fn request_stop(&self, job_id: JobId) -> Result<(), ImportError> {
        let active = self.active.lock().unwrap();
        match active.as_ref() {
            Some((id, token)) if *id == job_id => {
                token.cancel();
                info!(job_id = %job_id, "stop requested");
                Ok(())
            }
            _ => Err(ImportError::NotRunning(job_id)),
        }
    }

    pub fn status(&self, job_id: JobId) -> Result<JobStatus, ImportError> {
        self.history
            .get(job_id)?
            .map(|job| job.status)
            .ok_or(ImportError::UnknownJob(job_id))
    }

    pub fn history(&self) -> &H {
        &self.history
    }

    /// Open the job's own audit log file for appending.
    pub fn open_log(&self, job: &ImportJob) -> Result<FileAuditLog, ImportError> {
        Ok(FileAuditLog::open_append(&job.log.path)?)
    }

    /// Load a started job.
    pub fn job(&self, job_id: JobId) -> Result<ImportJob, ImportError> {
        self.history
            .get(job_id)?
            .ok_or(ImportError::UnknownJob(job_id))
    }

    /// Drive the row loop for a started job until EOF, cancellation, or an
    /// unrecoverable error. Row-level failures never abort the job;
    /// file-level, schema and store failures do.
    pub fn run<C, T, A>(
        &self,
        job_id: JobId,
        catalog: &C,
        taxonomy: &T,
        audit: &mut A,
        options: ImportOptions,
    ) -> Result<JobSummary, ImportError>
    where
        C: CatalogStore,
        T: TaxonomyStore,
        A: AuditLog,
    {
        let mut job = self.job(job_id)?;
        if job.status != JobStatus::Running {
            return Err(ImportError::NotRunning(job_id));
        }
        let token = self
            .active_token(job_id)
            .ok_or(ImportError::NotRunning(job_id))?;

        let result = run_loop(&mut job, &token, catalog, taxonomy, audit, options);
        match result {
            Ok(LoopEnd::Completed) => {
                job.mark_completed()?;
                self.history.update(&job)?;
                self.clear_active(job_id);
                info!(job_id = %job.id, rows = job.counters.rows(), "import job completed");
                Ok(JobSummary::from(&job))
            }
            Ok(LoopEnd::Stopped) => {
                job.mark_stopped()?;
                self.history.update(&job)?;
                self.clear_active(job_id);
                info!(job_id = %job.id, rows = job.counters.rows(), "import job stopped");
                Ok(JobSummary::from(&job))
            }
            Err(err) => {
                // Best-effort: the error itself is what we report.
                let _ = audit.append(&format!("Processing failed: {err}"));
                if job.mark_failed(err.to_string()).is_ok() {
                    let _ = self.history.update(&job);
                }
                self.clear_active(job_id);
                error!(job_id = %job.id, error = %err, "import job failed");
                Err(err)
            }
        }
    }

    fn active_token(&self, job_id: JobId) -> Option<CancelToken> {
        self.active
            .lock()
            .unwrap()
            .as_ref()
            .filter(|(id, _)| *id == job_id)
            .map(|(_, token)| token.clone())
    }

    fn clear_active(&self, job_id: JobId) {
        let mut active = self.active.lock().unwrap();
        if matches!(active.as_ref(), Some((id, _)) if *id == job_id) {
            *active = None;
        }
    }
}

fn run_loop<C, T, A>(
    job: &mut ImportJob,
    token: &CancelToken,
    catalog: &C,
    taxonomy: &T,
    audit: &mut A,
    options: ImportOptions,
) -> Result<LoopEnd, ImportError>
where
    C: CatalogStore,
    T: TaxonomyStore,
    A: AuditLog,
{
    audit.append(&format!("Processing started on {}", now_stamp()))?;

    let file = File::open(&job.source.path).map_err(|e| ImportError::FileRead(e.to_string()))?;
    let mut reader = csv::Reader::from_reader(file);
    let headers = reader
        .headers()
        .map_err(|e| ImportError::FileRead(e.to_string()))?
        .clone();
    let schema = ImportSchema::from_headers(&headers)?;

    let mut processor = RowProcessor::new(catalog, taxonomy, options);
    for record in reader.into_records() {
        // Cancellation is polled once per row boundary.
        if token.is_cancelled() {
            audit.append(&format!("Processing was stopped on {}", now_stamp()))?;
            return Ok(LoopEnd::Stopped);
        }

        let record = record.map_err(|e| ImportError::FileRead(e.to_string()))?;
        let raw = schema.bind(&record);
        let outcome = processor.process(&raw)?;
        audit.append(&outcome.log_line())?;
        job.counters.record(&outcome);
        debug!(job_id = %job.id, row = job.counters.rows(), outcome = %outcome.log_line(), "row processed");
    }

    audit.append(&format!("Processing finished on {}", now_stamp()))?;
    Ok(LoopEnd::Completed)
}

fn now_stamp() -> String {
    Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}
