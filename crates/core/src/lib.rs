//! `catsync-core` — domain foundation building blocks.
//!
//! Pure domain primitives (no IO, no storage concerns): strongly-typed
//! identifiers and the shared domain error.

pub mod error;
pub mod id;

pub use error::{DomainError, DomainResult};
pub use id::{JobId, ProductId, TermId};
