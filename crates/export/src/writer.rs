//! Export writer.
//!
//! Streams every catalog record (not scoped to any job) to CSV in a fixed
//! column order. Records lacking a brand, units-sold value, or categories
//! emit empty fields; the column is never omitted, so the output always has
//! the same shape — and stays importable.

use std::io::Write;

use thiserror::Error;
use tracing::info;

use catsync_catalog::{CatalogStore, StoreError, Taxonomy, TaxonomyStore};

/// Fixed export column order.
pub const EXPORT_HEADERS: [&str; 6] = [
    "SKU",
    "Title",
    "Stock",
    "Units Sold Annually",
    "Brand",
    "Category",
];

#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("csv write error: {0}")]
    Csv(#[from] csv::Error),
    #[error("export io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Write the whole catalog to `out`. Returns the number of records written
/// (excluding the header row).
pub fn export_catalog<W, C, T>(catalog: &C, taxonomy: &T, out: W) -> Result<u64, ExportError>
where
    W: Write,
    C: CatalogStore,
    T: TaxonomyStore,
{
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(EXPORT_HEADERS)?;

    let mut written = 0u64;
    for record in catalog.all()? {
        let brand = match record.brand {
            Some(id) => taxonomy
                .get(Taxonomy::Brand, id)?
                .map(|term| term.name)
                .unwrap_or_default(),
            None => String::new(),
        };

        let mut categories = Vec::new();
        for id in &record.categories {
            if let Some(term) = taxonomy.get(Taxonomy::Category, *id)? {
                categories.push(term.name);
            }
        }

        let units = record
            .units_sold_annually
            .map(|n| n.to_string())
            .unwrap_or_default();
        let stock = record.stock_quantity.to_string();
        let categories = categories.join(", ");

        writer.write_record([
            record.sku.as_str(),
            record.name.as_str(),
            stock.as_str(),
            units.as_str(),
            brand.as_str(),
            categories.as_str(),
        ])?;
        written += 1;
    }

    writer.flush()?;
    info!(records = written, "catalog exported");
    Ok(written)
}
