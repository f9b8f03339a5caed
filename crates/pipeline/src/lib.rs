//! # Pipeline orchestration
//!
//! Wires the stage crates together: normalization → feature engineering →
//! regression → ranking. Data flows strictly forward and each stage fully
//! consumes its input before the next one starts.
//!
//! `Pipeline` runs the stages on in-memory values. The functions in
//! [`stages`] run one stage each against a [`store::FlatFileStore`], which is
//! what the command-line subcommands use.

use crate::error::at;
use acquisition::RawDataset;
use configuration::Settings;
use core_types::{
    DataQualityIssue, DriverRankingEntry, DriverSeasonFeatures, GroundTruth, LapRecord, RaceResult, Stage,
    ZScoreRecord,
};
use features::{normalize_seasons, EngineeredFeatures, FeatureEngineer, NormalizedSeasons};
use ranking::Ranker;
use std::collections::BTreeSet;
use trainer::{ground_truth_from_results, results_from_laps, ModelWeights, TargetTable, Trainer, TrainingOutcome};

pub mod error;
pub mod stages;

pub use error::PipelineError;

/// Everything one end-to-end run produced.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub normalized: NormalizedSeasons,
    pub features: EngineeredFeatures,
    pub targets: TargetTable,
    pub training: TrainingOutcome,
    pub ranking: Vec<DriverRankingEntry>,
}

impl PipelineReport {
    /// Every data-quality issue raised along the way, in stage order.
    pub fn issues(&self) -> Vec<&DataQualityIssue> {
        self.normalized
            .issues
            .iter()
            .chain(&self.features.issues)
            .chain(&self.targets.issues)
            .chain(&self.training.issues)
            .collect()
    }
}

/// The central orchestrator for one analysis run.
pub struct Pipeline {
    settings: Settings,
}

impl Pipeline {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn normalize(&self, laps: &[LapRecord]) -> Result<NormalizedSeasons, PipelineError> {
        if laps.is_empty() {
            return Err(PipelineError::EmptyStage {
                stage: Stage::Normalization,
                precondition: "at least one lap record from the raw data",
            });
        }
        let normalized = normalize_seasons(laps);
        if normalized.records.is_empty() {
            return Err(PipelineError::EmptyStage {
                stage: Stage::Normalization,
                precondition: "at least one season with two or more valid lap times",
            });
        }
        Ok(normalized)
    }

    pub fn engineer(&self, zscores: &[ZScoreRecord]) -> Result<EngineeredFeatures, PipelineError> {
        if zscores.is_empty() {
            return Err(PipelineError::EmptyStage {
                stage: Stage::FeatureEngineering,
                precondition: "normalized Z-score records",
            });
        }
        Ok(FeatureEngineer::new(self.settings.features.clone()).build(zscores))
    }

    /// Derives regression targets. Seasons without an official
    /// classification fall back to the lap-time sums of their finishers.
    pub fn ground_truth(&self, laps: &[LapRecord], results: &[RaceResult]) -> TargetTable {
        let official: BTreeSet<i32> = results.iter().map(|r| r.season).collect();
        let uncovered: Vec<LapRecord> = laps
            .iter()
            .filter(|lap| !official.contains(&lap.season))
            .cloned()
            .collect();

        let mut combined = results.to_vec();
        if !uncovered.is_empty() {
            let derived = results_from_laps(&uncovered);
            tracing::info!(
                seasons = derived.iter().map(|r| r.season).collect::<BTreeSet<_>>().len(),
                "results derived from lap times for seasons without an official classification"
            );
            combined.extend(derived);
        }
        ground_truth_from_results(&combined)
    }

    pub fn train(
        &self,
        rows: &[DriverSeasonFeatures],
        ground_truth: &[GroundTruth],
    ) -> Result<TrainingOutcome, PipelineError> {
        if rows.is_empty() {
            return Err(PipelineError::EmptyStage {
                stage: Stage::Regression,
                precondition: "at least one driver-season feature row",
            });
        }
        if ground_truth.is_empty() {
            return Err(PipelineError::EmptyStage {
                stage: Stage::Regression,
                precondition: "ground-truth targets for at least one season",
            });
        }
        Trainer::new(self.settings.regression.clone())
            .fit(rows, ground_truth)
            .map_err(at(Stage::Regression))
    }

    pub fn rank(
        &self,
        model: &ModelWeights,
        rows: &[DriverSeasonFeatures],
        ground_truth: &[GroundTruth],
    ) -> Result<Vec<DriverRankingEntry>, PipelineError> {
        if rows.is_empty() {
            return Err(PipelineError::EmptyStage {
                stage: Stage::Ranking,
                precondition: "at least one driver-season feature row to score",
            });
        }
        Ranker::new(self.settings.ranking.clone())
            .rank(model, rows, ground_truth)
            .map_err(at(Stage::Ranking))
    }

    /// Runs every stage on data already loaded from the raw directory.
    pub fn run(&self, raw: &RawDataset) -> Result<PipelineReport, PipelineError> {
        let normalized = self.normalize(&raw.laps)?;
        let features = self.engineer(&normalized.records)?;
        let targets = self.ground_truth(&raw.laps, &raw.results);
        let training = self.train(&features.rows, &targets.targets)?;
        let ranking = self.rank(&training.model, &features.rows, &targets.targets)?;

        tracing::info!(
            seasons = normalized.summaries.len(),
            feature_rows = features.rows.len(),
            drivers = ranking.len(),
            "pipeline run complete"
        );
        Ok(PipelineReport {
            normalized,
            features,
            targets,
            training,
            ranking,
        })
    }
}
