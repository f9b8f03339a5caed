use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Artifact not found at {path}; run the stage that produces it first")]
    MissingArtifact { path: PathBuf },

    #[error("Column '{column}' in {artifact} contains a null value")]
    NullValue { artifact: &'static str, column: &'static str },

    #[error("Artifact {artifact} is malformed: {reason}")]
    Malformed { artifact: &'static str, reason: String },

    #[error("DataFrame operation failed: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    #[error("An error occurred during JSON serialization/deserialization: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
