use thiserror::Error;

use crate::models::FacetKind;

/// Wiring errors raised by the filter store. These point at a catalog/UI
/// mismatch, never at bad user input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("unknown facet key: {0}")]
    UnknownFacetKey(String),

    #[error("facet '{key}' is {actual}, not {expected}")]
    KindMismatch {
        key: String,
        expected: FacetKind,
        actual: FacetKind,
    },

    #[error("facet '{key}' has no candidate '{id}'")]
    UnknownCandidate { key: String, id: String },
}

/// Problems found while building a facet catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("facet key must not be empty")]
    EmptyKey,

    #[error("duplicate facet key: {0}")]
    DuplicateKey(String),

    #[error("facet key '{0}' is reserved for search parameters")]
    ReservedKey(String),

    #[error("facet '{key}' lists candidate '{id}' more than once")]
    DuplicateCandidate { key: String, id: String },

    #[error("facet '{key}': {reason}")]
    InvalidBinding { key: String, reason: String },

    #[error("failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("failed to read catalog: {0}")]
    Io(#[from] std::io::Error),
}
