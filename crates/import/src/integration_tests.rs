//! End-to-end import workflow tests against in-memory and file-backed
//! collaborators.

use catsync_catalog::{CatalogStore, InMemoryCatalog, Sku, Taxonomy};
use catsync_core::JobId;

use crate::audit::{AuditError, AuditLog, MemoryAuditLog};
use crate::controller::JobController;
use crate::error::ImportError;
use crate::history::{InMemoryHistory, JobHistoryStore, JsonlHistory};
use crate::job::JobStatus;
use crate::row::ImportOptions;
use crate::upload::UploadStore;

fn new_controller(dir: &std::path::Path) -> JobController<InMemoryHistory> {
    let uploads = UploadStore::new(dir.join("uploads")).unwrap();
    JobController::new(InMemoryHistory::new(), uploads)
}

#[test]
fn second_upload_updates_instead_of_duplicating() {
    let dir = tempfile::tempdir().unwrap();
    let controller = new_controller(dir.path());
    let catalog = InMemoryCatalog::new();

    let first = "SKU,Title,Stock,Brand\nABC123,Blue Widget,10,Acme\n";
    let job = controller.start(first.as_bytes(), &catalog).unwrap();
    let mut audit = MemoryAuditLog::new();
    controller
        .run(job, &catalog, &catalog, &mut audit, ImportOptions::default())
        .unwrap();

    let second = "SKU,Title,Stock,Brand\nABC123,Blue Widget v2,7,Acme\n";
    let job = controller.start(second.as_bytes(), &catalog).unwrap();
    let mut audit = MemoryAuditLog::new();
    let summary = controller
        .run(job, &catalog, &catalog, &mut audit, ImportOptions::default())
        .unwrap();

    assert_eq!(summary.counters.updated, 1);
    assert_eq!(catalog.product_count(), 1);
    // The Acme term from the first job is reused, not re-created.
    assert_eq!(catalog.term_count(Taxonomy::Brand), 1);

    let record = catalog
        .find_by_sku(&Sku::parse("ABC123").unwrap())
        .unwrap()
        .unwrap();
    assert_eq!(record.name, "Blue Widget v2");
    assert_eq!(record.stock_quantity, 7);
}

/// Audit sink that requests a stop once `k` row outcomes have been logged.
/// Cancellation is polled at the next row boundary, so exactly `k` rows
/// land.
struct StopAfter<'a, H: JobHistoryStore> {
    inner: MemoryAuditLog,
    controller: &'a JobController<H>,
    job_id: JobId,
    remaining: usize,
}

impl<H: JobHistoryStore> AuditLog for StopAfter<'_, H> {
    fn append(&mut self, message: &str) -> Result<(), AuditError> {
        self.inner.append(message)?;
        if !message.starts_with("Processing") && self.remaining > 0 {
            self.remaining -= 1;
            if self.remaining == 0 {
                self.controller.request_stop(self.job_id).unwrap();
            }
        }
        Ok(())
    }
}

#[test]
fn cancellation_after_k_rows_leaves_k_outcomes_and_a_stopped_entry() {
    let dir = tempfile::tempdir().unwrap();
    let controller = new_controller(dir.path());
    let catalog = InMemoryCatalog::new();

    let csv = "SKU,Title,Stock,Brand\n\
               A,One,1,Acme\n\
               B,Two,2,Acme\n\
               C,Three,3,Acme\n\
               D,Four,4,Acme\n\
               E,Five,5,Acme\n";
    let job_id = controller.start(csv.as_bytes(), &catalog).unwrap();

    let mut audit = StopAfter {
        inner: MemoryAuditLog::new(),
        controller: &controller,
        job_id,
        remaining: 2,
    };
    let summary = controller
        .run(job_id, &catalog, &catalog, &mut audit, ImportOptions::default())
        .unwrap();

    assert_eq!(summary.status, JobStatus::Stopped);
    assert_eq!(summary.counters.rows(), 2);

    let lines = audit.inner.lines();
    // started + 2 outcomes + stopped, nothing after.
    assert_eq!(lines.len(), 4);
    assert!(lines[0].starts_with("Processing started"));
    assert!(lines[1].contains("Added new product SKU A"));
    assert!(lines[2].contains("Added new product SKU B"));
    assert!(lines[3].starts_with("Processing was stopped"));

    // No catalog mutations past row k.
    assert_eq!(catalog.product_count(), 2);
    assert_eq!(controller.status(job_id).unwrap(), JobStatus::Stopped);
}

#[test]
fn stop_before_run_processes_no_rows() {
    let dir = tempfile::tempdir().unwrap();
    let controller = new_controller(dir.path());
    let catalog = InMemoryCatalog::new();

    let csv = "SKU,Title,Stock,Brand\nA,One,1,Acme\n";
    let job_id = controller.start(csv.as_bytes(), &catalog).unwrap();
    controller.request_stop(job_id).unwrap();

    let mut audit = MemoryAuditLog::new();
    let summary = controller
        .run(job_id, &catalog, &catalog, &mut audit, ImportOptions::default())
        .unwrap();

    assert_eq!(summary.status, JobStatus::Stopped);
    assert_eq!(summary.counters.rows(), 0);
    assert_eq!(catalog.product_count(), 0);
    assert_eq!(audit.lines().len(), 2);
    assert!(audit.lines()[1].starts_with("Processing was stopped"));
}

#[test]
fn skipped_rows_do_not_abort_the_job() {
    let dir = tempfile::tempdir().unwrap();
    let controller = new_controller(dir.path());
    let catalog = InMemoryCatalog::new();

    let csv = "SKU,Title,Stock,Brand\n\
               ,No Sku,1,Acme\n\
               ABC123,Blue Widget,abc,Acme\n";
    let job_id = controller.start(csv.as_bytes(), &catalog).unwrap();
    let mut audit = MemoryAuditLog::new();
    let summary = controller
        .run(job_id, &catalog, &catalog, &mut audit, ImportOptions::default())
        .unwrap();

    assert_eq!(summary.status, JobStatus::Completed);
    assert_eq!(summary.counters.skipped, 1);
    assert_eq!(summary.counters.created, 1);
    assert!(audit.lines()[1].contains("missing identifier"));

    // Malformed stock normalized to 0, not rejected.
    let record = catalog
        .find_by_sku(&Sku::parse("ABC123").unwrap())
        .unwrap()
        .unwrap();
    assert_eq!(record.stock_quantity, 0);
}

#[test]
fn file_backed_run_leaves_durable_log_and_history() {
    let dir = tempfile::tempdir().unwrap();
    let uploads = UploadStore::new(dir.path().join("uploads")).unwrap();
    let history = JsonlHistory::open(dir.path().join("history.jsonl")).unwrap();
    let controller = JobController::new(history, uploads);
    let catalog = InMemoryCatalog::new();

    let csv = "SKU,Title,Stock,Brand\nABC123,Blue Widget,10,Acme\n";
    let job_id = controller.start(csv.as_bytes(), &catalog).unwrap();
    let job = controller.job(job_id).unwrap();
    let mut audit = controller.open_log(&job).unwrap();
    controller
        .run(job_id, &catalog, &catalog, &mut audit, ImportOptions::default())
        .unwrap();

    // The audit log survives on disk, one timestamped line per event.
    let log = std::fs::read_to_string(&job.log.path).unwrap();
    let lines: Vec<_> = log.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[1].contains("Added new product SKU ABC123"));

    // History replays to the terminal status after a "restart".
    let reopened = JsonlHistory::open(dir.path().join("history.jsonl")).unwrap();
    let job = reopened.get(job_id).unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.counters.created, 1);
}

#[test]
fn stale_running_job_from_a_dead_process_is_failed_on_next_start() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = InMemoryCatalog::new();
    let csv = "SKU,Title,Stock,Brand\nA,One,1,Acme\n";

    // First process dies between `start` and `run`: the history file keeps
    // a `Running` entry whose cancel token is gone.
    let stale_id = {
        let history = JsonlHistory::open(dir.path().join("history.jsonl")).unwrap();
        let uploads = UploadStore::new(dir.path().join("uploads")).unwrap();
        let controller = JobController::new(history, uploads);
        controller.start(csv.as_bytes(), &catalog).unwrap()
    };

    let history = JsonlHistory::open(dir.path().join("history.jsonl")).unwrap();
    let uploads = UploadStore::new(dir.path().join("uploads")).unwrap();
    let controller = JobController::new(history, uploads);
    assert_eq!(controller.status(stale_id).unwrap(), JobStatus::Running);

    // The next start fails the stale job durably instead of refusing
    // forever with AlreadyRunning.
    let job_id = controller.start(csv.as_bytes(), &catalog).unwrap();
    assert!(matches!(
        controller.status(stale_id).unwrap(),
        JobStatus::Failed { .. }
    ));

    let mut audit = MemoryAuditLog::new();
    let summary = controller
        .run(job_id, &catalog, &catalog, &mut audit, ImportOptions::default())
        .unwrap();
    assert_eq!(summary.status, JobStatus::Completed);

    // The failure is on disk, not just in this controller's cache.
    let reopened = JsonlHistory::open(dir.path().join("history.jsonl")).unwrap();
    assert!(matches!(
        reopened.get(stale_id).unwrap().unwrap().status,
        JobStatus::Failed { .. }
    ));
}

#[test]
fn upload_failure_leaves_no_job_behind() {
    let dir = tempfile::tempdir().unwrap();
    let controller = new_controller(dir.path());
    let catalog = InMemoryCatalog::new();

    struct BrokenSource;
    impl std::io::Read for BrokenSource {
        fn read(&mut self, _: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("stream reset"))
        }
    }

    let err = controller.start(BrokenSource, &catalog).unwrap_err();
    assert!(matches!(err, ImportError::Upload(_)));
    assert!(controller.history().list(10).unwrap().is_empty());

    // And a fresh job can still start.
    let csv = "SKU,Title,Stock,Brand\nA,One,1,Acme\n";
    controller.start(csv.as_bytes(), &catalog).unwrap();
}
