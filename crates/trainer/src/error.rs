use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrainerError {
    #[error("Insufficient training data: {observations} observations for {features} features")]
    InsufficientData { observations: usize, features: usize },

    #[error("No usable features remain after excluding zero-variance columns: {excluded:?}")]
    NoUsableFeatures { excluded: Vec<String> },

    #[error("Model artifact is invalid: {0}")]
    InvalidModel(String),

    #[error("Unsupported model format version {found} (expected {expected})")]
    UnsupportedFormat { found: u32, expected: u32 },

    #[error("Matrix shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("Model serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
