//! Job history storage.
//!
//! An explicit, queryable record of every import run (one entry per job:
//! file reference, log reference, status, timestamps). In-memory for tests;
//! append-only JSONL for the CLI, so state transitions hit disk before the
//! controller returns.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

use catsync_core::JobId;

use crate::job::{ImportJob, JobStatus};

#[derive(Debug, Clone, thiserror::Error)]
pub enum HistoryError {
    #[error("job not found: {0}")]
    NotFound(JobId),
    #[error("job already exists: {0}")]
    AlreadyExists(JobId),
    #[error("history storage error: {0}")]
    Storage(String),
}

/// Job history abstraction.
pub trait JobHistoryStore {
    /// Record a new job. Fails if the id is already known.
    fn insert(&self, job: &ImportJob) -> Result<(), HistoryError>;

    /// Persist a state change for a known job.
    fn update(&self, job: &ImportJob) -> Result<(), HistoryError>;

    fn get(&self, id: JobId) -> Result<Option<ImportJob>, HistoryError>;

    /// The currently running job, if any (there is at most one).
    fn running(&self) -> Result<Option<ImportJob>, HistoryError>;

    /// Most recent jobs first.
    fn list(&self, limit: usize) -> Result<Vec<ImportJob>, HistoryError>;
}

/// In-memory history for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryHistory {
    jobs: RwLock<HashMap<JobId, ImportJob>>,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl JobHistoryStore for InMemoryHistory {
    fn insert(&self, job: &ImportJob) -> Result<(), HistoryError> {
        let mut jobs = self.jobs.write().unwrap();
        if jobs.contains_key(&job.id) {
            return Err(HistoryError::AlreadyExists(job.id));
        }
        jobs.insert(job.id, job.clone());
        Ok(())
    }

    fn update(&self, job: &ImportJob) -> Result<(), HistoryError> {
        let mut jobs = self.jobs.write().unwrap();
        if !jobs.contains_key(&job.id) {
            return Err(HistoryError::NotFound(job.id));
        }
        jobs.insert(job.id, job.clone());
        Ok(())
    }

    fn get(&self, id: JobId) -> Result<Option<ImportJob>, HistoryError> {
        Ok(self.jobs.read().unwrap().get(&id).cloned())
    }

    fn running(&self) -> Result<Option<ImportJob>, HistoryError> {
        Ok(self
            .jobs
            .read()
            .unwrap()
            .values()
            .find(|j| j.status == JobStatus::Running)
            .cloned())
    }

    fn list(&self, limit: usize) -> Result<Vec<ImportJob>, HistoryError> {
        let mut jobs: Vec<_> = self.jobs.read().unwrap().values().cloned().collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs.truncate(limit);
        Ok(jobs)
    }
}

/// Append-only JSONL history. Every insert/update appends one job snapshot
/// line and flushes it; on open, the file is replayed and the last snapshot
/// per id wins.
#[derive(Debug)]
pub struct JsonlHistory {
    path: PathBuf,
    file: Mutex<File>,
    jobs: RwLock<HashMap<JobId, ImportJob>>,
}

impl JsonlHistory {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, HistoryError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| HistoryError::Storage(e.to_string()))?;
        }

        let mut jobs = HashMap::new();
        if path.exists() {
            let file = File::open(&path).map_err(|e| HistoryError::Storage(e.to_string()))?;
            for (n, line) in BufReader::new(file).lines().enumerate() {
                let line = line.map_err(|e| HistoryError::Storage(e.to_string()))?;
                if line.trim().is_empty() {
                    continue;
                }
                let job: ImportJob = serde_json::from_str(&line).map_err(|e| {
                    HistoryError::Storage(format!("corrupt history line {}: {e}", n + 1))
                })?;
                jobs.insert(job.id, job);
            }
        }

        let file = File::options()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| HistoryError::Storage(e.to_string()))?;

        Ok(Self {
            path,
            file: Mutex::new(file),
            jobs: RwLock::new(jobs),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, job: &ImportJob) -> Result<(), HistoryError> {
        let line =
            serde_json::to_string(job).map_err(|e| HistoryError::Storage(e.to_string()))?;
        let mut file = self.file.lock().unwrap();
        writeln!(file, "{line}").map_err(|e| HistoryError::Storage(e.to_string()))?;
        file.sync_data()
            .map_err(|e| HistoryError::Storage(e.to_string()))?;
        Ok(())
    }
}

impl JobHistoryStore for JsonlHistory {
    fn insert(&self, job: &ImportJob) -> Result<(), HistoryError> {
        {
            let jobs = self.jobs.read().unwrap();
            if jobs.contains_key(&job.id) {
                return Err(HistoryError::AlreadyExists(job.id));
            }
        }
        self.append(job)?;
        self.jobs.write().unwrap().insert(job.id, job.clone());
        Ok(())
    }

    fn update(&self, job: &ImportJob) -> Result<(), HistoryError> {
        {
            let jobs = self.jobs.read().unwrap();
            if !jobs.contains_key(&job.id) {
                return Err(HistoryError::NotFound(job.id));
            }
        }
        self.append(job)?;
        self.jobs.write().unwrap().insert(job.id, job.clone());
        Ok(())
    }

    fn get(&self, id: JobId) -> Result<Option<ImportJob>, HistoryError> {
        Ok(self.jobs.read().unwrap().get(&id).cloned())
    }

    fn running(&self) -> Result<Option<ImportJob>, HistoryError> {
        Ok(self
            .jobs
            .read()
            .unwrap()
            .values()
            .find(|j| j.status == JobStatus::Running)
            .cloned())
    }

    fn list(&self, limit: usize) -> Result<Vec<ImportJob>, HistoryError> {
        let mut jobs: Vec<_> = self.jobs.read().unwrap().values().cloned().collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs.truncate(limit);
        Ok(jobs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::FileRef;

    fn test_job() -> ImportJob {
        ImportJob::new(
            FileRef {
                name: "csv_upload_a.csv".into(),
                path: "/tmp/csv_upload_a.csv".into(),
            },
            FileRef {
                name: "log_a.txt".into(),
                path: "/tmp/log_a.txt".into(),
            },
        )
    }

    #[test]
    fn insert_then_update_round_trips() {
        let store = InMemoryHistory::new();
        let mut job = test_job();
        store.insert(&job).unwrap();

        job.mark_running().unwrap();
        store.update(&job).unwrap();

        let loaded = store.get(job.id).unwrap().unwrap();
        assert_eq!(loaded.status, JobStatus::Running);
        assert_eq!(store.running().unwrap().unwrap().id, job.id);
    }

    #[test]
    fn double_insert_is_rejected() {
        let store = InMemoryHistory::new();
        let job = test_job();
        store.insert(&job).unwrap();
        assert!(matches!(
            store.insert(&job),
            Err(HistoryError::AlreadyExists(_))
        ));
    }

    #[test]
    fn update_of_unknown_job_is_rejected() {
        let store = InMemoryHistory::new();
        assert!(matches!(
            store.update(&test_job()),
            Err(HistoryError::NotFound(_))
        ));
    }

    #[test]
    fn jsonl_replays_latest_snapshot_per_job() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.jsonl");

        let mut job = test_job();
        {
            let store = JsonlHistory::open(&path).unwrap();
            store.insert(&job).unwrap();
            job.mark_running().unwrap();
            store.update(&job).unwrap();
            job.mark_completed().unwrap();
            store.update(&job).unwrap();
        }

        // Three snapshot lines on disk, latest wins on replay.
        let lines = std::fs::read_to_string(&path).unwrap();
        assert_eq!(lines.lines().count(), 3);

        let store = JsonlHistory::open(&path).unwrap();
        let loaded = store.get(job.id).unwrap().unwrap();
        assert_eq!(loaded.status, JobStatus::Completed);
        assert!(store.running().unwrap().is_none());
    }

    #[test]
    fn list_returns_newest_first() {
        let store = InMemoryHistory::new();
        let first = test_job();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = test_job();
        store.insert(&first).unwrap();
        store.insert(&second).unwrap();

        let listed = store.list(10).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, second.id);

        assert_eq!(store.list(1).unwrap().len(), 1);
    }
}
