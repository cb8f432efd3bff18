//! `catsync` — CSV-driven catalog sync.
//!
//! Bulk create/update catalog products from a CSV upload, export the
//! catalog back out, and inspect past import runs. All state lives under a
//! single data directory: the catalog file, the append-only job history,
//! and the stored uploads with their per-job logs.

mod trace;

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::warn;

use catsync_catalog::JsonCatalog;
use catsync_export::export_catalog;
use catsync_import::{
    ImportJob, ImportOptions, JobController, JobHistoryStore, JobStatus, JsonlHistory, UploadStore,
};

#[derive(Parser)]
#[command(name = "catsync", version, about = "CSV-driven catalog sync")]
struct Cli {
    /// Directory holding the catalog, job history, uploads and logs.
    #[arg(long, global = true, default_value = "./catsync-data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Import a CSV file (columns by name: SKU, Title, Stock, Brand; Web
    /// optional). Ctrl-C stops the job at the next row boundary.
    Import {
        file: PathBuf,

        /// Delete products whose Web flag is not 1 instead of upserting
        /// them.
        #[arg(long)]
        delete_unflagged: bool,
    },

    /// Export the whole catalog as CSV.
    Export {
        /// Output file; stdout when omitted.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List past import jobs, newest first.
    History {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

fn main() -> Result<()> {
    trace::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Import {
            file,
            delete_unflagged,
        } => run_import(&cli.data_dir, &file, delete_unflagged),
        Command::Export { output } => run_export(&cli.data_dir, output.as_deref()),
        Command::History { limit } => show_history(&cli.data_dir, limit),
    }
}

fn open_catalog(data_dir: &Path) -> Result<JsonCatalog> {
    JsonCatalog::open(data_dir.join("catalog.json")).context("cannot open catalog")
}

fn run_import(data_dir: &Path, file: &Path, delete_unflagged: bool) -> Result<()> {
    let catalog = open_catalog(data_dir)?;
    let history = JsonlHistory::open(data_dir.join("history.jsonl"))?;
    let uploads = UploadStore::new(data_dir.join("uploads"))?;
    let controller = Arc::new(JobController::new(history, uploads));

    let source =
        File::open(file).with_context(|| format!("cannot open {}", file.display()))?;
    let job_id = controller.start(source, &catalog)?;

    // Ctrl-C requests a cooperative stop; the in-flight row completes.
    {
        let controller = Arc::clone(&controller);
        if let Err(e) = ctrlc::set_handler(move || {
            eprintln!("stopping after the current row...");
            if let Err(e) = controller.request_stop(job_id) {
                eprintln!("stop request failed: {e}");
            }
        }) {
            warn!(error = %e, "could not install Ctrl-C handler");
        }
    }

    let job = controller.job(job_id)?;
    let mut audit = controller.open_log(&job)?;
    let summary = controller.run(
        job_id,
        &catalog,
        &catalog,
        &mut audit,
        ImportOptions { delete_unflagged },
    )?;

    println!("job {} {}", summary.job_id, status_label(&summary.status));
    println!(
        "  created {}, updated {}, deleted {}, skipped {}",
        summary.counters.created,
        summary.counters.updated,
        summary.counters.deleted,
        summary.counters.skipped
    );
    println!("  log: {}", job.log.path.display());
    Ok(())
}

fn run_export(data_dir: &Path, output: Option<&Path>) -> Result<()> {
    let catalog = open_catalog(data_dir)?;
    match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("cannot create {}", path.display()))?;
            let written = export_catalog(&catalog, &catalog, file)?;
            println!("exported {written} records to {}", path.display());
        }
        None => {
            export_catalog(&catalog, &catalog, io::stdout().lock())?;
        }
    }
    Ok(())
}

fn show_history(data_dir: &Path, limit: usize) -> Result<()> {
    let history = JsonlHistory::open(data_dir.join("history.jsonl"))?;
    let jobs = history.list(limit)?;
    if jobs.is_empty() {
        println!("no import jobs yet");
        return Ok(());
    }
    for job in jobs {
        print_job(&job);
    }
    Ok(())
}

fn print_job(job: &ImportJob) {
    println!(
        "{} {} {}",
        job.created_at.format("%Y-%m-%d %H:%M:%S"),
        job.id,
        status_label(&job.status)
    );
    println!(
        "  source: {} log: {} rows: {}",
        job.source.name,
        job.log.name,
        job.counters.rows()
    );
}

fn status_label(status: &JobStatus) -> String {
    match status {
        JobStatus::Created => "created".into(),
        JobStatus::Running => "running".into(),
        JobStatus::Completed => "completed".into(),
        JobStatus::Stopped => "stopped".into(),
        JobStatus::Failed { error } => format!("failed ({error})"),
    }
}
