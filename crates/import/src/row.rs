//! Row processing: normalize, resolve the brand term, upsert the product.

use std::collections::HashMap;

use tracing::warn;

use catsync_catalog::{
    CatalogStore, ProductRecord, Sku, StoreError, Taxonomy, TaxonomyStore, slugify,
};
use catsync_core::TermId;

use crate::schema::RawRow;

/// Per-job processing options.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImportOptions {
    /// When enabled, a row whose web flag is not `1` deletes the matching
    /// product instead of upserting it. Destructive, so off by default and
    /// an explicit opt-in.
    pub delete_unflagged: bool,
}

/// Why a row was skipped. Skips never abort the job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Empty SKU cell; upserting an ambiguous record is refused.
    MissingSku,
    /// The taxonomy store refused to create the brand term.
    BrandCreation { name: String, detail: String },
    /// Delete-unflagged policy matched but there was nothing to delete.
    NotPublished,
}

impl core::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SkipReason::MissingSku => f.write_str("missing identifier"),
            SkipReason::BrandCreation { name, detail } => {
                write!(f, "error creating brand {name}: {detail}")
            }
            SkipReason::NotPublished => f.write_str("not flagged for publication"),
        }
    }
}

/// The single outcome of one processed row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    Created {
        sku: Sku,
        title: String,
        stock: i64,
        brand: String,
    },
    Updated {
        sku: Sku,
        title: String,
        stock: i64,
        brand: String,
    },
    Deleted {
        sku: Sku,
    },
    Skipped {
        reason: SkipReason,
    },
}

impl RowOutcome {
    /// The audit line for this outcome. The wording ("Added new product
    /// SKU …") is part of the log format operators already parse; keep it
    /// stable.
    pub fn log_line(&self) -> String {
        match self {
            RowOutcome::Created {
                sku,
                title,
                stock,
                brand,
            } => format!(
                "Added new product SKU {sku}, Title: {title}, Stock: {stock}, Brand: {brand}."
            ),
            RowOutcome::Updated {
                sku,
                title,
                stock,
                brand,
            } => format!(
                "Updated product SKU {sku}, Title: {title}, Stock: {stock}, Brand: {brand}."
            ),
            RowOutcome::Deleted { sku } => format!("Deleted product SKU {sku}."),
            RowOutcome::Skipped { reason } => format!("Skipped row: {reason}."),
        }
    }
}

/// Normalize a stock cell: integer, defaulting to 0 when unparsable.
pub fn normalize_stock(raw: &str) -> i64 {
    raw.trim().parse().unwrap_or(0)
}

/// Processes rows against the catalog and taxonomy collaborators.
///
/// Holds a job-scoped brand name→id cache so a name resolved once is never
/// re-created for a later row, even if the backing store were to allow the
/// duplicate.
pub struct RowProcessor<'a, C, T> {
    catalog: &'a C,
    taxonomy: &'a T,
    options: ImportOptions,
    brand_cache: HashMap<String, TermId>,
}

impl<'a, C: CatalogStore, T: TaxonomyStore> RowProcessor<'a, C, T> {
    pub fn new(catalog: &'a C, taxonomy: &'a T, options: ImportOptions) -> Self {
        Self {
            catalog,
            taxonomy,
            options,
            brand_cache: HashMap::new(),
        }
    }

    /// Process one row. Returns exactly one outcome; `Err` is reserved for
    /// store failures that abort the whole job.
    pub fn process(&mut self, row: &RawRow) -> Result<RowOutcome, StoreError> {
        let sku = match Sku::parse(&row.sku) {
            Ok(sku) => sku,
            Err(_) => {
                return Ok(RowOutcome::Skipped {
                    reason: SkipReason::MissingSku,
                });
            }
        };

        if self.options.delete_unflagged && !web_flag_set(row.web.as_deref()) {
            return if self.catalog.delete_by_sku(&sku)? {
                Ok(RowOutcome::Deleted { sku })
            } else {
                Ok(RowOutcome::Skipped {
                    reason: SkipReason::NotPublished,
                })
            };
        }

        let title = row.title.trim().to_string();
        let stock = normalize_stock(&row.stock);
        let brand_name = row.brand.trim().to_string();

        let brand_id = if brand_name.is_empty() {
            None
        } else {
            match self.resolve_brand(&brand_name)? {
                Ok(id) => Some(id),
                Err(detail) => {
                    warn!(sku = %sku, brand = %brand_name, %detail, "brand creation failed, skipping row");
                    return Ok(RowOutcome::Skipped {
                        reason: SkipReason::BrandCreation {
                            name: brand_name,
                            detail,
                        },
                    });
                }
            }
        };

        let (mut record, existed) = match self.catalog.find_by_sku(&sku)? {
            Some(record) => (record, true),
            None => (ProductRecord::new(sku.clone()), false),
        };

        record.name = title.clone();
        // Title and description share one source column.
        record.description = title.clone();
        record.stock_quantity = stock;
        record.manage_stock = true;
        if brand_id.is_some() {
            record.brand = brand_id;
        }

        self.catalog.upsert(record)?;

        Ok(if existed {
            RowOutcome::Updated {
                sku,
                title,
                stock,
                brand: brand_name,
            }
        } else {
            RowOutcome::Created {
                sku,
                title,
                stock,
                brand: brand_name,
            }
        })
    }

    /// Resolve a brand term, creating it on first encounter. The inner
    /// `Err(detail)` marks a non-fatal creation failure (row skipped); the
    /// outer `Err` a fatal store failure.
    fn resolve_brand(&mut self, name: &str) -> Result<Result<TermId, String>, StoreError> {
        if let Some(id) = self.brand_cache.get(name) {
            return Ok(Ok(*id));
        }

        if let Some(term) = self.taxonomy.find_by_name(Taxonomy::Brand, name)? {
            self.brand_cache.insert(name.to_string(), term.id);
            return Ok(Ok(term.id));
        }

        match self
            .taxonomy
            .create(Taxonomy::Brand, name, Some(&slugify(name)))
        {
            Ok(term) => {
                self.brand_cache.insert(name.to_string(), term.id);
                Ok(Ok(term.id))
            }
            Err(e) => Ok(Err(e.to_string())),
        }
    }
}

fn web_flag_set(web: Option<&str>) -> bool {
    // Rows without a web column count as published; the delete policy only
    // acts on an explicit non-1 flag.
    match web {
        Some(cell) => cell.trim() == "1",
        None => true,
    }
}
