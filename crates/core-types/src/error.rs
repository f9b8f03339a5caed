use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum CoreError {
    #[error("Unknown feature name: '{0}'")]
    UnknownFeature(String),

    #[error("Malformed season list '{0}': expected comma-separated years")]
    MalformedSeasonList(String),
}
