//! JSON-file-backed catalog + taxonomy store.
//!
//! Keeps the whole catalog in memory and rewrites the backing file on every
//! mutation (write to a sibling temp file, then rename). Suited to the
//! single-writer, catalog-sized workloads this tool targets.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use tracing::debug;

use catsync_core::TermId;

use crate::product::ProductRecord;
use crate::sku::Sku;
use crate::store::{CatalogStore, StoreError, TaxonomyStore};
use crate::term::{Taxonomy, Term};

#[derive(Debug, Default, Serialize, Deserialize)]
struct CatalogState {
    products: HashMap<Sku, ProductRecord>,
    terms: Vec<Term>,
}

/// Catalog persisted as a single JSON document on disk.
#[derive(Debug)]
pub struct JsonCatalog {
    path: PathBuf,
    state: RwLock<CatalogState>,
}

impl JsonCatalog {
    /// Open (or create) the catalog file at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::Unavailable(e.to_string()))?;
        }

        let state = if path.exists() {
            let bytes = fs::read(&path).map_err(|e| StoreError::Unavailable(e.to_string()))?;
            serde_json::from_slice(&bytes)
                .map_err(|e| StoreError::Storage(format!("corrupt catalog file: {e}")))?
        } else {
            CatalogState::default()
        };

        debug!(path = %path.display(), "opened catalog file");
        Ok(Self {
            path,
            state: RwLock::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the current state to disk (temp file + rename).
    fn persist(&self, state: &CatalogState) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(state).map_err(|e| StoreError::Storage(e.to_string()))?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, bytes).map_err(|e| StoreError::Storage(e.to_string()))?;
        fs::rename(&tmp, &self.path).map_err(|e| StoreError::Storage(e.to_string()))?;
        Ok(())
    }
}

impl CatalogStore for JsonCatalog {
    fn ready(&self) -> Result<(), StoreError> {
        // The file was readable (or creatable) at open time; the directory
        // still existing is the only thing left to check.
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() && !parent.exists() => Err(
                StoreError::Unavailable(format!("catalog directory missing: {}", parent.display())),
            ),
            _ => Ok(()),
        }
    }

    fn find_by_sku(&self, sku: &Sku) -> Result<Option<ProductRecord>, StoreError> {
        Ok(self.state.read().unwrap().products.get(sku).cloned())
    }

    fn upsert(&self, record: ProductRecord) -> Result<(), StoreError> {
        let mut state = self.state.write().unwrap();
        state.products.insert(record.sku.clone(), record);
        self.persist(&state)
    }

    fn delete_by_sku(&self, sku: &Sku) -> Result<bool, StoreError> {
        let mut state = self.state.write().unwrap();
        let removed = state.products.remove(sku).is_some();
        if removed {
            self.persist(&state)?;
        }
        Ok(removed)
    }

    fn all(&self) -> Result<Vec<ProductRecord>, StoreError> {
        let state = self.state.read().unwrap();
        let mut records: Vec<_> = state.products.values().cloned().collect();
        records.sort_by(|a, b| a.sku.cmp(&b.sku));
        Ok(records)
    }
}

impl TaxonomyStore for JsonCatalog {
    fn find_by_name(&self, taxonomy: Taxonomy, name: &str) -> Result<Option<Term>, StoreError> {
        Ok(self
            .state
            .read()
            .unwrap()
            .terms
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
        let mut state = self.state.write().unwrap();
        if state
            .terms
            .iter()
            .any(|t| t.taxonomy == taxonomy && t.name == name)
        {
            return Err(StoreError::DuplicateTerm {
                taxonomy,
                name: name.to_string(),
            });
        }
        let term = Term::new(taxonomy, name, slug);
        state.terms.push(term.clone());
        self.persist(&state)?;
        Ok(term)
    }

    fn get(&self, taxonomy: Taxonomy, id: TermId) -> Result<Option<Term>, StoreError> {
        Ok(self
            .state
            .read()
            .unwrap()
            .terms
            .iter()
            .find(|t| t.taxonomy == taxonomy && t.id == id)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");

        {
            let store = JsonCatalog::open(&path).unwrap();
            let mut record = ProductRecord::new(Sku::parse("ABC123").unwrap());
            record.name = "Blue Widget".into();
            store.upsert(record).unwrap();
            store.create(Taxonomy::Brand, "Acme", None).unwrap();
        }

        let store = JsonCatalog::open(&path).unwrap();
        let record = store
            .find_by_sku(&Sku::parse("ABC123").unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(record.name, "Blue Widget");
        assert!(
            store
                .find_by_name(Taxonomy::Brand, "Acme")
                .unwrap()
                .is_some()
        );
    }

    #[test]
    fn corrupt_file_is_reported_not_wiped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        fs::write(&path, b"{ not json").unwrap();

        let err = JsonCatalog::open(&path).unwrap_err();
        assert!(matches!(err, StoreError::Storage(_)));
        // The broken file is left in place for inspection.
        assert!(path.exists());
    }

    #[test]
    fn delete_removes_and_reports() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonCatalog::open(dir.path().join("catalog.json")).unwrap();
        let sku = Sku::parse("A").unwrap();
        store.upsert(ProductRecord::new(sku.clone())).unwrap();

        assert!(store.delete_by_sku(&sku).unwrap());
        assert!(!store.delete_by_sku(&sku).unwrap());
    }
}
