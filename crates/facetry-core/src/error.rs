//! Error types for facetry-core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Facet {0} is declared both conjunctive and disjunctive")]
    FacetConflict(String),

    #[error("Result count mismatch: expected {expected}, got {actual}")]
    ResultCountMismatch { expected: usize, actual: usize },
}
