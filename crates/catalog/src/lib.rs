//! `catsync-catalog` — catalog entities and their stores.
//!
//! The product catalog and taxonomy are external collaborators of the sync
//! workflow; this crate defines their domain types, the store traits the
//! workflow talks to, and local (in-memory and JSON-file-backed)
//! implementations.

pub mod json;
pub mod product;
pub mod sku;
pub mod store;
pub mod term;

pub use json::JsonCatalog;
pub use product::ProductRecord;
pub use sku::Sku;
pub use store::{CatalogStore, InMemoryCatalog, StoreError, TaxonomyStore};
pub use term::{Taxonomy, Term, slugify};
