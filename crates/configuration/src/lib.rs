use crate::error::ConfigError;
use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod logging;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use logging::init_logging;
pub use settings::{
    AcquisitionSettings, DataPaths, FeatureSettings, LoggingSettings, RankingSettings,
    RegressionSettings, Settings, TuningSettings,
};

/// Environment variables with this prefix override file values, using `__`
/// between path segments: `LAPRANK__REGRESSION__ALPHA=0.05`.
pub const ENV_PREFIX: &str = "LAPRANK";

/// Loads and validates the application configuration.
///
/// The TOML file at `path` is optional; missing keys fall back to defaults
/// and environment variables are applied on top.
pub fn load_config(path: &Path) -> Result<Settings, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::from(path).required(false))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let settings = builder.try_deserialize::<Settings>()?;
    settings.validate()?;

    tracing::debug!(path = %path.display(), "configuration loaded");
    Ok(settings)
}

/// Command-line arguments shared by every subcommand that needs settings.
#[cfg(feature = "clap")]
#[derive(Debug, Clone, clap::Args)]
pub struct ConfigArgs {
    /// Path to the TOML configuration file.
    #[arg(long, short, global = true, default_value = "config.toml")]
    pub config: std::path::PathBuf,
}

#[cfg(feature = "clap")]
impl ConfigArgs {
    pub fn load(&self) -> Result<Settings, ConfigError> {
        load_config(&self.config)
    }
}
