//! `catsync-export` — stream the catalog back out as CSV.

pub mod writer;

pub use writer::{EXPORT_HEADERS, ExportError, export_catalog};
