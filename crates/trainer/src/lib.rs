//! Regression stage: turns feature rows and official results into a fitted
//! elastic-net model.

pub mod dataset;
pub mod elastic_net;
pub mod error;
pub mod model;
pub mod scaler;
pub mod targets;
pub mod tuning;

pub use dataset::{assemble, TrainingSet};
pub use elastic_net::{ElasticNet, ElasticNetFit};
pub use error::TrainerError;
pub use model::{Hyperparameters, ModelWeights, Standardization, TrainingMetrics, MODEL_FORMAT_VERSION};
pub use scaler::FeatureScaler;
pub use targets::{ground_truth_from_results, results_from_laps, TargetTable};
pub use tuning::{grid_search, holdout_r2, holdout_split, CrossValidationResults, GridScore};

use chrono::Utc;
use configuration::RegressionSettings;
use core_types::{DataQualityIssue, DriverSeasonFeatures, GroundTruth};
use smartcore::metrics::{mean_squared_error, r2};
use std::collections::BTreeMap;
use uuid::Uuid;

/// A trained model together with the rows that were left out of training.
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub model: ModelWeights,
    pub issues: Vec<DataQualityIssue>,
}

/// Fits the elastic-net model from the regression settings.
#[derive(Debug, Clone)]
pub struct Trainer {
    settings: RegressionSettings,
}

impl Trainer {
    pub fn new(settings: RegressionSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &RegressionSettings {
        &self.settings
    }

    /// Trains on every row that has both a target and all selected features.
    ///
    /// Selected features with zero variance across the training rows are
    /// dropped and recorded in the artifact. Training fails when there are
    /// fewer rows than features, or fewer than two rows.
    pub fn fit(
        &self,
        rows: &[DriverSeasonFeatures],
        ground_truth: &[GroundTruth],
    ) -> Result<TrainingOutcome, TrainerError> {
        let targets: BTreeMap<(i32, &str), f64> = ground_truth
            .iter()
            .map(|t| ((t.season, t.driver_id.as_str()), t.target))
            .collect();

        let (full, issues) = assemble(rows, &targets, &self.settings.features)?;
        tracing::info!(
            observations = full.observations(),
            excluded_rows = issues.len(),
            features = full.features.len(),
            "training set assembled"
        );
        // A single row has zero variance in every column, so this check has
        // to run before the zero-variance exclusion.
        if full.observations() < 2 {
            return Err(TrainerError::InsufficientData {
                observations: full.observations(),
                features: full.features.len(),
            });
        }

        let raw_scaler = FeatureScaler::fit(&full.x);
        let constant = raw_scaler.zero_variance_columns();
        let excluded_features: Vec<String> = constant
            .iter()
            .map(|&j| full.features[j].name().to_string())
            .collect();
        for name in &excluded_features {
            tracing::warn!(feature = %name, "feature has zero variance, excluded from the model");
        }

        let kept: Vec<usize> = (0..full.features.len()).filter(|j| !constant.contains(j)).collect();
        if kept.is_empty() {
            if full.observations() < full.features.len() {
                return Err(TrainerError::InsufficientData {
                    observations: full.observations(),
                    features: full.features.len(),
                });
            }
            return Err(TrainerError::NoUsableFeatures { excluded: excluded_features });
        }
        let set = full.select_columns(&kept);
        if set.observations() < set.features.len() {
            return Err(TrainerError::InsufficientData {
                observations: set.observations(),
                features: set.features.len(),
            });
        }

        let scaler = FeatureScaler::fit(&set.x);
        let x = scaler.transform(&set.x);

        let cross_validation = if self.settings.tuning.enabled {
            grid_search(
                &x,
                &set.y,
                &self.settings.tuning,
                self.settings.max_iter,
                self.settings.tolerance,
            )
        } else {
            None
        };
        let (alpha, l1_ratio) = cross_validation
            .as_ref()
            .map(|cv| (cv.best_alpha, cv.best_l1_ratio))
            .unwrap_or((self.settings.alpha, self.settings.l1_ratio));

        let hyperparameters = Hyperparameters {
            alpha,
            l1_ratio,
            max_iter: self.settings.max_iter,
            tolerance: self.settings.tolerance,
        };
        let solver = ElasticNet {
            alpha,
            l1_ratio,
            max_iter: self.settings.max_iter,
            tolerance: self.settings.tolerance,
        };
        let test_r2 = holdout_r2(&solver, &x, &set.y, self.settings.test_fraction);
        let fit = solver.fit(&x, &set.y);

        let y_true = set.y.to_vec();
        let y_pred = fit.predict(&x).to_vec();
        let constant_target = y_true.iter().all(|v| *v == y_true[0]);
        let metrics = TrainingMetrics {
            observations: set.observations(),
            r2: (!constant_target).then(|| r2(&y_true, &y_pred)),
            test_r2,
            mse: mean_squared_error(&y_true, &y_pred),
            iterations: fit.iterations,
            converged: fit.converged,
            cross_validation,
        };

        let mut weights = BTreeMap::new();
        let mut standardization = BTreeMap::new();
        for (j, feature) in set.features.iter().enumerate() {
            weights.insert(feature.name().to_string(), fit.coefficients[j]);
            standardization.insert(
                feature.name().to_string(),
                Standardization {
                    mean: scaler.means()[j],
                    std_dev: scaler.stds()[j],
                },
            );
        }

        let model = ModelWeights {
            format_version: MODEL_FORMAT_VERSION,
            model_id: Uuid::new_v4(),
            trained_at: Utc::now(),
            intercept: fit.intercept,
            weights,
            standardization,
            excluded_features,
            hyperparameters,
            metrics,
        };

        tracing::info!(
            model_id = %model.model_id,
            alpha,
            l1_ratio,
            r2 = ?model.metrics.r2,
            test_r2 = ?model.metrics.test_r2,
            mse = model.metrics.mse,
            "elastic net trained"
        );
        Ok(TrainingOutcome { model, issues })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use configuration::TuningSettings;
    use core_types::{DeltaFeatures, Feature};

    fn row(season: i32, driver: &str, mean: f64, variance: f64) -> DriverSeasonFeatures {
        DriverSeasonFeatures {
            driver_id: driver.to_string(),
            season,
            lap_count: 5,
            finished: true,
            mean_zscore: mean,
            zscore_variance: variance,
            best_zscore: mean - 0.5,
            worst_zscore: mean + 0.5,
            median_zscore: mean,
            decay_rate: Some(0.0),
            outlier_ratio: 0.0,
            completion_rate: Some(1.0),
            relative_delta: DeltaFeatures::default(),
        }
    }

    fn truth(season: i32, driver: &str, target: f64) -> GroundTruth {
        GroundTruth { season, driver_id: driver.to_string(), target }
    }

    fn settings(features: Vec<Feature>) -> RegressionSettings {
        RegressionSettings {
            features,
            alpha: 0.01,
            l1_ratio: 0.5,
            tuning: TuningSettings { enabled: false, ..TuningSettings::default() },
            ..RegressionSettings::default()
        }
    }

    #[test]
    fn faster_mean_pace_earns_a_higher_score() {
        let rows = vec![
            row(2000, "A", -1.0, 0.1),
            row(2000, "B", 1.0, 0.3),
            row(2001, "A", -0.8, 0.2),
            row(2001, "B", 0.8, 0.1),
        ];
        let truths = vec![
            truth(2000, "A", 1.0),
            truth(2000, "B", -1.0),
            truth(2001, "A", 1.0),
            truth(2001, "B", -1.0),
        ];
        let trainer = Trainer::new(settings(vec![Feature::MeanZscore, Feature::ZscoreVariance]));
        let outcome = trainer.fit(&rows, &truths).unwrap();

        assert!(outcome.model.weights["mean_zscore"] < 0.0);
        assert!(outcome.model.score(&rows[0]).unwrap() > outcome.model.score(&rows[1]).unwrap());
        assert!(outcome.model.metrics.r2.unwrap() > 0.9);
    }

    #[test]
    fn constant_features_are_excluded_and_recorded() {
        let rows = vec![row(2000, "A", -1.0, 0.1), row(2000, "B", 1.0, 0.3)];
        let truths = vec![truth(2000, "A", 1.0), truth(2000, "B", -1.0)];
        let trainer = Trainer::new(settings(vec![Feature::MeanZscore, Feature::OutlierRatio]));
        let outcome = trainer.fit(&rows, &truths).unwrap();

        assert_eq!(outcome.model.excluded_features, vec!["outlier_ratio".to_string()]);
        assert!(!outcome.model.weights.contains_key("outlier_ratio"));
    }

    #[test]
    fn fewer_rows_than_features_is_an_error() {
        let rows = vec![row(2000, "A", -1.0, 0.1), row(2000, "B", 1.0, 0.3)];
        let truths = vec![truth(2000, "A", 1.0)];
        let trainer = Trainer::new(settings(vec![Feature::MeanZscore, Feature::ZscoreVariance]));

        assert!(matches!(
            trainer.fit(&rows, &truths),
            Err(TrainerError::InsufficientData { observations: 1, features: 2 })
        ));
    }

    #[test]
    fn a_single_row_is_insufficient_even_when_every_column_is_constant() {
        let rows = vec![row(2000, "A", -1.0, 0.1)];
        let truths = vec![truth(2000, "A", 1.0)];
        let trainer = Trainer::new(settings(vec![Feature::MeanZscore]));

        assert!(matches!(
            trainer.fit(&rows, &truths),
            Err(TrainerError::InsufficientData { observations: 1, features: 1 })
        ));
    }

    #[test]
    fn too_few_rows_for_the_selection_is_insufficient_not_unusable() {
        // Two rows, three selected features, all of them constant.
        let rows = vec![row(2000, "A", -1.0, 0.1), row(2000, "B", 1.0, 0.3)];
        let truths = vec![truth(2000, "A", 1.0), truth(2000, "B", -1.0)];
        let trainer = Trainer::new(settings(vec![
            Feature::OutlierRatio,
            Feature::CompletionRate,
            Feature::DecayRate,
        ]));

        assert!(matches!(
            trainer.fit(&rows, &truths),
            Err(TrainerError::InsufficientData { observations: 2, features: 3 })
        ));
    }

    #[test]
    fn holdout_r2_is_reported_for_larger_training_sets() {
        let mut rows = Vec::new();
        let mut truths = Vec::new();
        for i in 0..20 {
            let mean = (i as f64 - 10.0) / 10.0;
            let driver = format!("D{i:02}");
            rows.push(row(2000 + i / 4, &driver, mean, 0.1 + (i % 3) as f64 * 0.05));
            truths.push(truth(2000 + i / 4, &driver, -2.0 * mean));
        }
        let trainer = Trainer::new(settings(vec![Feature::MeanZscore, Feature::ZscoreVariance]));
        let outcome = trainer.fit(&rows, &truths).unwrap();

        assert!(outcome.model.metrics.test_r2.unwrap() > 0.9);
    }

    #[test]
    fn all_constant_features_leave_nothing_to_fit() {
        let rows = vec![row(2000, "A", -1.0, 0.1), row(2000, "B", 1.0, 0.3)];
        let truths = vec![truth(2000, "A", 1.0), truth(2000, "B", -1.0)];
        let trainer = Trainer::new(settings(vec![Feature::OutlierRatio, Feature::CompletionRate]));

        assert!(matches!(
            trainer.fit(&rows, &truths),
            Err(TrainerError::NoUsableFeatures { .. })
        ));
    }

    #[test]
    fn rows_without_targets_are_reported() {
        let rows = vec![
            row(2000, "A", -1.0, 0.1),
            row(2000, "B", 1.0, 0.3),
            row(2000, "C", 0.0, 0.2),
        ];
        let truths = vec![truth(2000, "A", 1.0), truth(2000, "B", -1.0)];
        let trainer = Trainer::new(settings(vec![Feature::MeanZscore]));
        let outcome = trainer.fit(&rows, &truths).unwrap();

        assert_eq!(outcome.model.metrics.observations, 2);
        assert_eq!(outcome.issues.len(), 1);
        assert_eq!(outcome.issues[0].driver_id.as_deref(), Some("C"));
    }
}
