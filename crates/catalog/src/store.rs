//! Catalog and taxonomy store abstractions plus the in-memory
//! implementation used by tests and dev tooling.

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use catsync_core::TermId;

use crate::product::ProductRecord;
use crate::sku::Sku;
use crate::term::{Taxonomy, Term};

/// Store-level error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// The backing catalog system is not reachable/active. Fatal at job
    /// start.
    #[error("catalog backend unavailable: {0}")]
    Unavailable(String),

    /// A term with the same name already exists in the taxonomy (name
    /// collision at the storage layer).
    #[error("{taxonomy} term already exists: {name}")]
    DuplicateTerm { taxonomy: Taxonomy, name: String },

    /// Anything else the backend reports.
    #[error("storage error: {0}")]
    Storage(String),
}

/// Product catalog collaborator.
pub trait CatalogStore {
    /// Probe the backend. The importer calls this before starting a job and
    /// refuses to start when it fails.
    fn ready(&self) -> Result<(), StoreError>;

    /// Look a record up by its SKU (exact, case-sensitive).
    fn find_by_sku(&self, sku: &Sku) -> Result<Option<ProductRecord>, StoreError>;

    /// Create-if-absent, update-if-present, keyed on the record's SKU.
    fn upsert(&self, record: ProductRecord) -> Result<(), StoreError>;

    /// Remove a record. Returns whether anything was deleted.
    fn delete_by_sku(&self, sku: &Sku) -> Result<bool, StoreError>;

    /// All records, ordered by SKU (export order).
    fn all(&self) -> Result<Vec<ProductRecord>, StoreError>;
}

/// Taxonomy collaborator (brands, categories).
pub trait TaxonomyStore {
    /// Exact, case-sensitive name lookup within one taxonomy.
    fn find_by_name(&self, taxonomy: Taxonomy, name: &str) -> Result<Option<Term>, StoreError>;

    /// Create a term. Fails with [`StoreError::DuplicateTerm`] if the name is
    /// already taken within the taxonomy.
    fn create(&self, taxonomy: Taxonomy, name: &str, slug: Option<&str>)
    -> Result<Term, StoreError>;

    /// Resolve a term by id.
    fn get(&self, taxonomy: Taxonomy, id: TermId) -> Result<Option<Term>, StoreError>;
}

/// In-memory catalog + taxonomy for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    products: RwLock<HashMap<Sku, ProductRecord>>,
    terms: RwLock<Vec<Term>>,
    unavailable: AtomicBool,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the backend going away (makes `ready()` fail).
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    pub fn product_count(&self) -> usize {
        self.products.read().unwrap().len()
    }

    pub fn term_count(&self, taxonomy: Taxonomy) -> usize {
        self.terms
            .read()
            .unwrap()
            .iter()
            .filter(|t| t.taxonomy == taxonomy)
            .count()
    }
}

impl CatalogStore for InMemoryCatalog {
    fn ready(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("in-memory catalog disabled".into()));
        }
        Ok(())
    }

    fn find_by_sku(&self, sku: &Sku) -> Result<Option<ProductRecord>, StoreError> {
        Ok(self.products.read().unwrap().get(sku).cloned())
    }

    fn upsert(&self, record: ProductRecord) -> Result<(), StoreError> {
        self.products
            .write()
            .unwrap()
            .insert(record.sku.clone(), record);
        Ok(())
    }

    fn delete_by_sku(&self, sku: &Sku) -> Result<bool, StoreError> {
        Ok(self.products.write().unwrap().remove(sku).is_some())
    }

    fn all(&self) -> Result<Vec<ProductRecord>, StoreError> {
        let mut records: Vec<_> = self.products.read().unwrap().values().cloned().collect();
        records.sort_by(|a, b| a.sku.cmp(&b.sku));
        Ok(records)
    }
}

impl TaxonomyStore for InMemoryCatalog {
    fn find_by_name(&self, taxonomy: Taxonomy, name: &str) -> Result<Option<Term>, StoreError> {
        Ok(self
            .terms
            .read()
            .unwrap()
            .iter()
            .find(|t| t.taxonomy == taxonomy && t.name == name)
            .cloned())
    }

    fn create(
        &self,
        taxonomy: Taxonomy,
        name: &str,
        slug: Option<&str>,
    ) -> Result<Term, StoreError> {
        let mut terms = self.terms.write().unwrap();
        if terms.iter().any(|t| t.taxonomy == taxonomy && t.name == name) {
            return Err(StoreError::DuplicateTerm {
                taxonomy,
                name: name.to_string(),
            });
        }
        let term = Term::new(taxonomy, name, slug);
        terms.push(term.clone());
        Ok(term)
    }

    fn get(&self, taxonomy: Taxonomy, id: TermId) -> Result<Option<Term>, StoreError> {
        Ok(self
            .terms
            .read()
            .unwrap()
            .iter()
            .find(|t| t.taxonomy == taxonomy && t.id == id)
            .cloned())
    }
}
