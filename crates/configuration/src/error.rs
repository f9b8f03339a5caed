use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation error in [{section}] {key}: {reason}")]
    ValidationError {
        section: &'static str,
        key: &'static str,
        reason: String,
    },

    #[error("Failed to initialise logging: {0}")]
    Logging(String),
}

impl ConfigError {
    pub(crate) fn invalid(section: &'static str, key: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::ValidationError { section, key, reason: reason.into() }
    }
}
