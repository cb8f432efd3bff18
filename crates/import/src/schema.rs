//! Named-column CSV schema.
//!
//! Columns are bound by header name (case-insensitive), not position, so a
//! shifted column produces a clear schema error instead of silently
//! misreading fields. Title and description come from the same source
//! column.

use csv::StringRecord;

use crate::error::ImportError;

/// Required import columns.
pub const REQUIRED_COLUMNS: [&str; 4] = ["sku", "title", "stock", "brand"];

/// Optional publish flag column (drives the delete-unflagged policy).
pub const WEB_COLUMN: &str = "web";

/// Header-derived column bindings for one import run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSchema {
    sku: usize,
    title: usize,
    stock: usize,
    brand: usize,
    web: Option<usize>,
}

/// One row's raw cells, pre-normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    pub sku: String,
    pub title: String,
    pub stock: String,
    pub brand: String,
    pub web: Option<String>,
}

impl ImportSchema {
    /// Validate the header row and bind column names to indices.
    ///
    /// Every required column must be present (matched case-insensitively on
    /// the trimmed header cell); otherwise the job fails up front with a
    /// schema mismatch listing what is missing.
    pub fn from_headers(headers: &StringRecord) -> Result<Self, ImportError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|cell| cell.trim().eq_ignore_ascii_case(name))
        };

        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|name| find(name).is_none())
            .map(|name| name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ImportError::SchemaMismatch { missing });
        }

        Ok(Self {
            sku: find("sku").unwrap_or_default(),
            title: find("title").unwrap_or_default(),
            stock: find("stock").unwrap_or_default(),
            brand: find("brand").unwrap_or_default(),
            web: find(WEB_COLUMN),
        })
    }

    /// Extract one row's cells. Missing trailing cells read as empty.
    pub fn bind(&self, record: &StringRecord) -> RawRow {
        let cell = |idx: usize| record.get(idx).unwrap_or("").to_string();
        RawRow {
            sku: cell(self.sku),
            title: cell(self.title),
            stock: cell(self.stock),
            brand: cell(self.brand),
            web: self.web.map(cell),
        }
    }
}
