//! Catalog product records.

use serde::{Deserialize, Serialize};

use catsync_core::{ProductId, TermId};

use crate::sku::Sku;

/// A catalog product, keyed by SKU (upsert semantics — the importer creates
/// a record if absent, updates it in place if present).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub id: ProductId,
    pub sku: Sku,
    pub name: String,
    pub description: String,
    pub stock_quantity: i64,
    /// Whether stock levels are tracked for this record. New records created
    /// by the importer have this enabled.
    pub manage_stock: bool,
    /// Custom numeric attribute carried for export; the importer never
    /// touches it.
    pub units_sold_annually: Option<u64>,
    pub brand: Option<TermId>,
    pub categories: Vec<TermId>,
}

impl ProductRecord {
    /// Create a fresh record for a SKU with stock management enabled.
    pub fn new(sku: Sku) -> Self {
        Self {
            id: ProductId::new(),
            sku,
            name: String::new(),
            description: String::new(),
            stock_quantity: 0,
            manage_stock: true,
            units_sold_annually: None,
            brand: None,
            categories: Vec::new(),
        }
    }
}
