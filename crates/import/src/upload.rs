//! Upload storage.
//!
//! Accepts a source byte stream, stores it under a timestamped name, and
//! hands back stable references for the stored file and its paired log —
//! the references the job history keeps forever.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::audit::FileAuditLog;
use crate::error::ImportError;

/// Stable reference to a stored file (uploaded CSV or job log).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    pub name: String,
    pub path: PathBuf,
}

/// Directory-backed store for uploaded sources and job logs.
#[derive(Debug)]
pub struct UploadStore {
    root: PathBuf,
}

impl UploadStore {
    /// Open (or create) the upload directory.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, ImportError> {
        let root = root.into();
        std::fs::create_dir_all(&root)
            .map_err(|e| ImportError::Upload(format!("cannot create upload dir: {e}")))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Store an uploaded source stream as `csv_upload_<timestamp>.csv`.
    pub fn save_upload<R: Read>(&self, mut source: R) -> Result<FileRef, ImportError> {
        let (file_ref, mut file) = self
            .create_unique("csv_upload_", "csv")
            .map_err(|e| ImportError::Upload(e.to_string()))?;
        io::copy(&mut source, &mut file).map_err(|e| ImportError::Upload(e.to_string()))?;
        file.flush().map_err(|e| ImportError::Upload(e.to_string()))?;
        Ok(file_ref)
    }

    /// Create the job's log file (`log_<timestamp>.txt`) alongside the
    /// upload.
    pub fn create_log(&self) -> Result<(FileRef, FileAuditLog), ImportError> {
        let (file_ref, file) = self
            .create_unique("log_", "txt")
            .map_err(|e| ImportError::Upload(format!("cannot create log file: {e}")))?;
        drop(file);
        let log = FileAuditLog::open_append(&file_ref.path)?;
        Ok((file_ref, log))
    }

    /// Create a file with a timestamped name, bumping a numeric suffix on
    /// collision (two jobs within the same second).
    fn create_unique(&self, prefix: &str, ext: &str) -> io::Result<(FileRef, File)> {
        let stamp = Utc::now().format("%Y-%m-%d_%H-%M-%S").to_string();
        let mut attempt = 0u32;
        loop {
            let name = if attempt == 0 {
                format!("{prefix}{stamp}.{ext}")
            } else {
                format!("{prefix}{stamp}-{attempt}.{ext}")
            };
            let path = self.root.join(&name);
            match File::options().write(true).create_new(true).open(&path) {
                Ok(file) => return Ok((FileRef { name, path }, file)),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => attempt += 1,
                Err(e) => return Err(e),
            }
        }
    }
}
