use crate::error::TrainerError;
use crate::scaler::FeatureScaler;
use crate::tuning::CrossValidationResults;
use chrono::{DateTime, Utc};
use core_types::{DriverSeasonFeatures, Feature};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use uuid::Uuid;

pub const MODEL_FORMAT_VERSION: u32 = 1;

/// Mean and population standard deviation used to standardize one feature.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Standardization {
    pub mean: f64,
    pub std_dev: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hyperparameters {
    pub alpha: f64,
    pub l1_ratio: f64,
    pub max_iter: usize,
    pub tolerance: f64,
}

/// Fit quality. `r2` is in-sample and absent when the targets are constant;
/// `test_r2` is measured on a held-out share of the rows when there are
/// enough of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetrics {
    pub observations: usize,
    pub r2: Option<f64>,
    #[serde(default)]
    pub test_r2: Option<f64>,
    pub mse: f64,
    pub iterations: usize,
    pub converged: bool,
    pub cross_validation: Option<CrossValidationResults>,
}

/// The persisted regression model.
///
/// Weights apply to standardized features and are keyed by feature name, so
/// the artifact reads as a flat name → weight mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelWeights {
    pub format_version: u32,
    pub model_id: Uuid,
    pub trained_at: DateTime<Utc>,
    pub intercept: f64,
    pub weights: BTreeMap<String, f64>,
    pub standardization: BTreeMap<String, Standardization>,
    /// Selected features dropped for having zero variance in training.
    pub excluded_features: Vec<String>,
    pub hyperparameters: Hyperparameters,
    pub metrics: TrainingMetrics,
}

impl ModelWeights {
    /// Features that carry a weight, in name order.
    pub fn features(&self) -> Result<Vec<Feature>, TrainerError> {
        self.weights
            .keys()
            .map(|name| {
                name.parse::<Feature>()
                    .map_err(|e| TrainerError::InvalidModel(e.to_string()))
            })
            .collect()
    }

    /// Rebuilds the training-time scaler from the persisted parameters,
    /// with columns in the order of [`ModelWeights::features`].
    pub fn scaler(&self) -> Result<(Vec<Feature>, FeatureScaler), TrainerError> {
        let features = self.features()?;
        let mut means = Vec::with_capacity(features.len());
        let mut stds = Vec::with_capacity(features.len());
        for feature in &features {
            let params = self.standardization.get(feature.name()).ok_or_else(|| {
                TrainerError::InvalidModel(format!("no standardization for '{feature}'"))
            })?;
            means.push(params.mean);
            stds.push(params.std_dev);
        }
        Ok((features, FeatureScaler::from_parts(means, stds)))
    }

    /// Predicted performance score for one feature row.
    ///
    /// A feature the row lacks contributes nothing, which is the same as
    /// imputing the training mean.
    pub fn score(&self, row: &DriverSeasonFeatures) -> Result<f64, TrainerError> {
        let mut score = self.intercept;
        for (name, weight) in &self.weights {
            let feature: Feature = name
                .parse()
                .map_err(|e: core_types::CoreError| TrainerError::InvalidModel(e.to_string()))?;
            let params = self.standardization.get(name).ok_or_else(|| {
                TrainerError::InvalidModel(format!("no standardization for '{name}'"))
            })?;
            if let Some(value) = row.value(feature).filter(|v| v.is_finite()) {
                if params.std_dev > 0.0 {
                    score += weight * (value - params.mean) / params.std_dev;
                }
            }
        }
        Ok(score)
    }

    /// Checks that the artifact is usable for scoring.
    pub fn validate(&self) -> Result<(), TrainerError> {
        if self.format_version != MODEL_FORMAT_VERSION {
            return Err(TrainerError::UnsupportedFormat {
                found: self.format_version,
                expected: MODEL_FORMAT_VERSION,
            });
        }
        self.features()?;
        if let Some(name) = self.weights.keys().find(|n| !self.standardization.contains_key(*n)) {
            return Err(TrainerError::InvalidModel(format!(
                "no standardization for '{name}'"
            )));
        }
        Ok(())
    }

    pub fn save_json(&self, path: &Path) -> Result<(), TrainerError> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        tracing::info!(path = %path.display(), model_id = %self.model_id, "model saved");
        Ok(())
    }

    pub fn load_json(path: &Path) -> Result<Self, TrainerError> {
        let reader = BufReader::new(File::open(path)?);
        let model: ModelWeights = serde_json::from_reader(reader)?;
        model.validate()?;
        Ok(model)
    }
}
