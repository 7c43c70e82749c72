//! Error types for the intake engine

use crate::store::StoreError;
use std::io;
use thiserror::Error;

/// Intake error type
#[derive(Error, Debug)]
pub enum IntakeError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Pattern error: {0}")]
    Pattern(String),

    #[error("Malformed dataset id {id:?}: expected 5 tab-separated fields, found {fields}")]
    MalformedDatasetId { id: String, fields: usize },

    #[error("Dataset not found: {0}")]
    DatasetNotFound(String),

    #[error("Dataset {dataset_id} is frozen; {action} is not allowed")]
    Frozen { dataset_id: String, action: &'static str },

    #[error("Dataset {0} must be locked before it can be frozen")]
    NotLocked(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, IntakeError>;
