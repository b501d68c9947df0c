//! Faceted search and filter engine for job listings.
//!
//! A [`FilterStore`] tracks one selection per catalog facet, compiles it into
//! a [`JobPredicate`], and round-trips through a URL query string with
//! [`query::encode`] / [`query::decode`]. [`match_candidates`] powers the
//! free-text facets' autocomplete.

pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod matcher;
pub mod models;
pub mod predicate;
pub mod query;
pub mod search;
pub mod state;

pub use catalog::FacetCatalog;
pub use error::{CatalogError, FilterError};
pub use matcher::{MatchResult, match_candidates};
pub use models::{FacetDefinition, FacetKind, FacetValue, JobField, JobRecord};
pub use predicate::{JobPredicate, compile, compile_at};
pub use search::{SearchPage, SearchRequest};
pub use state::{FacetSelection, FilterState, FilterStore};
