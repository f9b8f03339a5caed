use crate::error::ConfigError;
use core_types::{Feature, WeightingPolicy};
use serde::Deserialize;
use std::path::PathBuf;

/// The root configuration structure for the entire application.
///
/// Every section falls back to its `Default`, so an empty or missing
/// `config.toml` yields a runnable configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub data: DataPaths,
    pub acquisition: AcquisitionSettings,
    pub features: FeatureSettings,
    pub regression: RegressionSettings,
    pub ranking: RankingSettings,
    pub logging: LoggingSettings,
}

/// Where raw inputs and stage outputs live on disk.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DataPaths {
    /// Per-season raw JSON files written by `fetch`.
    pub raw_dir: PathBuf,
    /// Parquet tables, the model artifact and the ranking.
    pub artifact_dir: PathBuf,
}

/// Parameters for talking to the Ergast-compatible results service.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AcquisitionSettings {
    pub base_url: String,
    /// Race name as published by the service, e.g. "Italian Grand Prix".
    pub circuit: String,
    pub first_season: i32,
    pub last_season: i32,
    /// Seasons from this year on are stored lap by lap; earlier seasons only
    /// carry total race times.
    pub format_cutoff_year: i32,
    pub page_size: u32,
    /// Pause between two paged requests.
    pub request_delay_ms: u64,
    pub timeout_secs: u64,
    /// How many seasons are downloaded at once.
    pub concurrency: usize,
}

/// Parameters for the feature engineering stage.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeatureSettings {
    /// |z| above this counts as an outlier lap.
    pub outlier_threshold: f64,
    /// Minimum laps for a decay-rate slope.
    pub min_decay_laps: usize,
    /// Scheduled race length in laps. Inferred from finishers when unset.
    pub race_distance: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RegressionSettings {
    pub features: Vec<Feature>,
    /// Overall penalty strength.
    pub alpha: f64,
    /// Share of the penalty that is L1 (1.0 = lasso, 0.0 = ridge).
    pub l1_ratio: f64,
    pub max_iter: usize,
    pub tolerance: f64,
    /// Share of rows held out to report an out-of-sample R². 0 disables it.
    pub test_fraction: f64,
    pub tuning: TuningSettings,
}

/// Grid search over (alpha, l1_ratio) with k-fold cross-validation.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TuningSettings {
    pub enabled: bool,
    pub folds: usize,
    pub alphas: Vec<f64>,
    pub l1_ratios: Vec<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RankingSettings {
    pub weighting: WeightingPolicy,
    /// Share of the historical ground truth in the final score, in [0, 1].
    pub ground_truth_blend: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default filter directive; `RUST_LOG` takes precedence.
    pub level: String,
    /// When set, logs are also written to a daily-rolling file here.
    pub directory: Option<PathBuf>,
    pub file_prefix: String,
}

// --- Default Implementations ---

impl Default for DataPaths {
    fn default() -> Self {
        Self {
            raw_dir: PathBuf::from("data/raw"),
            artifact_dir: PathBuf::from("data/artifacts"),
        }
    }
}

impl Default for AcquisitionSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.jolpi.ca/ergast/f1".to_string(),
            circuit: "Italian Grand Prix".to_string(),
            first_season: 1984,
            last_season: 2024,
            format_cutoff_year: 1996,
            page_size: 100,
            request_delay_ms: 250,
            timeout_secs: 30,
            concurrency: 2,
        }
    }
}

impl Default for FeatureSettings {
    fn default() -> Self {
        Self {
            outlier_threshold: 2.0,
            min_decay_laps: 3,
            race_distance: None,
        }
    }
}

impl Default for RegressionSettings {
    fn default() -> Self {
        Self {
            features: Feature::DEFAULT_SET.to_vec(),
            alpha: 0.1,
            l1_ratio: 0.5,
            max_iter: 10_000,
            tolerance: 1e-4,
            test_fraction: 0.2,
            tuning: TuningSettings::default(),
        }
    }
}

impl Default for TuningSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            folds: 5,
            alphas: vec![0.001, 0.01, 0.1, 0.5, 1.0],
            l1_ratios: vec![0.1, 0.3, 0.5, 0.7, 0.9],
        }
    }
}

impl Default for RankingSettings {
    fn default() -> Self {
        Self {
            weighting: WeightingPolicy::Equal,
            ground_truth_blend: 0.0,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
            file_prefix: "laprank".to_string(),
        }
    }
}

impl Settings {
    /// Rejects values that would make a stage meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let acq = &self.acquisition;
        if acq.first_season > acq.last_season {
            return Err(ConfigError::invalid(
                "acquisition",
                "first_season",
                format!("{} is after last_season {}", acq.first_season, acq.last_season),
            ));
        }
        if acq.page_size == 0 {
            return Err(ConfigError::invalid("acquisition", "page_size", "must be positive"));
        }
        if acq.concurrency == 0 {
            return Err(ConfigError::invalid("acquisition", "concurrency", "must be positive"));
        }

        let feat = &self.features;
        if !(feat.outlier_threshold.is_finite() && feat.outlier_threshold > 0.0) {
            return Err(ConfigError::invalid(
                "features",
                "outlier_threshold",
                format!("must be a positive number, got {}", feat.outlier_threshold),
            ));
        }
        if feat.min_decay_laps < 2 {
            return Err(ConfigError::invalid(
                "features",
                "min_decay_laps",
                "a slope needs at least 2 laps",
            ));
        }
        if feat.race_distance == Some(0) {
            return Err(ConfigError::invalid("features", "race_distance", "must be positive"));
        }

        let reg = &self.regression;
        if reg.features.is_empty() {
            return Err(ConfigError::invalid("regression", "features", "at least one feature is required"));
        }
        check_alpha("alpha", reg.alpha)?;
        check_ratio("regression", "l1_ratio", reg.l1_ratio)?;
        if reg.max_iter == 0 {
            return Err(ConfigError::invalid("regression", "max_iter", "must be positive"));
        }
        if !(reg.tolerance > 0.0) {
            return Err(ConfigError::invalid("regression", "tolerance", "must be positive"));
        }
        if !(0.0..=0.5).contains(&reg.test_fraction) {
            return Err(ConfigError::invalid(
                "regression",
                "test_fraction",
                format!("must lie in [0, 0.5], got {}", reg.test_fraction),
            ));
        }
        if reg.tuning.enabled {
            if reg.tuning.folds < 2 {
                return Err(ConfigError::invalid("regression.tuning", "folds", "needs at least 2 folds"));
            }
            if reg.tuning.alphas.is_empty() || reg.tuning.l1_ratios.is_empty() {
                return Err(ConfigError::invalid(
                    "regression.tuning",
                    "alphas",
                    "grid must not be empty when tuning is enabled",
                ));
            }
            for &alpha in &reg.tuning.alphas {
                check_alpha("tuning.alphas", alpha)?;
            }
            for &ratio in &reg.tuning.l1_ratios {
                check_ratio("regression.tuning", "l1_ratios", ratio)?;
            }
        }

        check_ratio("ranking", "ground_truth_blend", self.ranking.ground_truth_blend)?;
        Ok(())
    }
}

fn check_alpha(key: &'static str, alpha: f64) -> Result<(), ConfigError> {
    if alpha.is_finite() && alpha >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid("regression", key, format!("must be >= 0, got {}", alpha)))
    }
}

fn check_ratio(section: &'static str, key: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::invalid(section, key, format!("must lie in [0, 1], got {}", value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        Settings::default().validate().unwrap();
    }

    #[test]
    fn default_feature_set_excludes_range() {
        let settings = Settings::default();
        assert!(!settings.regression.features.contains(&Feature::ZscoreRange));
        assert_eq!(settings.regression.features.len(), 8);
    }

    #[test]
    fn blend_outside_unit_interval_is_rejected() {
        let mut settings = Settings::default();
        settings.ranking.ground_truth_blend = 1.5;
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("ground_truth_blend"));
    }

    #[test]
    fn holdout_larger_than_half_is_rejected() {
        let mut settings = Settings::default();
        settings.regression.test_fraction = 0.6;
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("test_fraction"));
    }

    #[test]
    fn non_positive_outlier_threshold_is_rejected() {
        let mut settings = Settings::default();
        settings.features.outlier_threshold = 0.0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn tuning_grid_is_only_checked_when_enabled() {
        let mut settings = Settings::default();
        settings.regression.tuning.alphas.clear();
        assert!(settings.validate().is_err());
        settings.regression.tuning.enabled = false;
        settings.validate().unwrap();
    }
}
