//! Taxonomy terms (brands, categories).

use serde::{Deserialize, Serialize};

use catsync_core::TermId;

/// The taxonomies a catalog record can be classified under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Taxonomy {
    Brand,
    Category,
}

impl Taxonomy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Taxonomy::Brand => "brand",
            Taxonomy::Category => "category",
        }
    }
}

impl core::fmt::Display for Taxonomy {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A taxonomy value attachable to catalog records. Keyed by case-sensitive
/// name within its taxonomy; the slug is a URL-safe derivative of the name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    pub id: TermId,
    pub taxonomy: Taxonomy,
    pub name: String,
    pub slug: String,
}

impl Term {
    /// Create a term. When `slug` is not given it is derived from the name.
    pub fn new(taxonomy: Taxonomy, name: impl Into<String>, slug: Option<&str>) -> Self {
        let name = name.into();
        let slug = slug.map(str::to_string).unwrap_or_else(|| slugify(&name));
        Self {
            id: TermId::new(),
            taxonomy,
            name,
            slug,
        }
    }
}

/// Derive a URL-safe slug from a term name: lowercase alphanumerics with
/// single `-` separators.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_sep = false;
    for ch in name.trim().chars() {
        if ch.is_alphanumeric() {
            if pending_sep && !slug.is_empty() {
                slug.push('-');
            }
            pending_sep = false;
            for lower in ch.to_lowercase() {
                slug.push(lower);
            }
        } else {
            pending_sep = true;
        }
    }
    slug
}
