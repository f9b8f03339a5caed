use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AcquisitionError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("The API request to {url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("Failed to deserialize the API response: {0}")]
    Deserialization(String),

    #[error("Failed to parse {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to render a raw season file: {0}")]
    Render(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
