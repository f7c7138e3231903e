//! Error taxonomy for the indexing pipeline (spec §7).
//!
//! Recovery policy lives with the caller, not the error type: extraction and
//! summarization catch `ExtractionParse`/`Model` per item and recover
//! locally (skip + fallback); every other variant propagates to the
//! pipeline runtime and ends the run.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GraphRagError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("failed to parse extraction output: {0}")]
    ExtractionParse(String),

    #[error("model call failed: {0}")]
    Model(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("cancelled")]
    Cancelled,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, GraphRagError>;
