//! Store-backed stage runners. Each reads the previous stage's artifacts
//! from the store and writes its own.

use crate::error::{at, PipelineError};
use crate::{Pipeline, PipelineReport};
use acquisition::load_raw_dir;
use core_types::{DriverRankingEntry, Stage};
use features::{EngineeredFeatures, NormalizedSeasons};
use store::{Artifact, FlatFileStore};
use trainer::{ModelWeights, TargetTable, TrainingOutcome};

/// Raw directory → laps, Z-scores, season summaries and targets.
pub fn run_normalize(
    pipeline: &Pipeline,
    store: &FlatFileStore,
) -> Result<(NormalizedSeasons, TargetTable), PipelineError> {
    let settings = pipeline.settings();
    let raw = load_raw_dir(&settings.data.raw_dir, settings.acquisition.format_cutoff_year)
        .map_err(at(Stage::Acquisition))?;
    tracing::info!(
        seasons = raw.seasons().len(),
        with_official_results = raw.seasons_with_results().len(),
        laps = raw.laps.len(),
        "raw data loaded"
    );

    let normalized = pipeline.normalize(&raw.laps)?;
    let targets = pipeline.ground_truth(&raw.laps, &raw.results);

    store.save_laps(&raw.laps).map_err(at(Stage::Normalization))?;
    store.save_zscores(&normalized.records).map_err(at(Stage::Normalization))?;
    store
        .save_season_summaries(&normalized.summaries)
        .map_err(at(Stage::Normalization))?;
    store.save_targets(&targets.targets).map_err(at(Stage::Normalization))?;

    Ok((normalized, targets))
}

/// Z-scores → feature table.
pub fn run_features(pipeline: &Pipeline, store: &FlatFileStore) -> Result<EngineeredFeatures, PipelineError> {
    let zscores = store.load_zscores().map_err(at(Stage::FeatureEngineering))?;
    let features = pipeline.engineer(&zscores)?;
    store
        .save_features(&features.rows)
        .map_err(at(Stage::FeatureEngineering))?;
    Ok(features)
}

/// Feature table + targets → model artifact.
pub fn run_train(pipeline: &Pipeline, store: &FlatFileStore) -> Result<TrainingOutcome, PipelineError> {
    let rows = store.load_features().map_err(at(Stage::Regression))?;
    let targets = store.load_targets().map_err(at(Stage::Regression))?;
    let outcome = pipeline.train(&rows, &targets)?;
    outcome
        .model
        .save_json(&store.path(Artifact::Model))
        .map_err(at(Stage::Regression))?;
    Ok(outcome)
}

/// Model artifact + feature table → ranking.
pub fn run_rank(pipeline: &Pipeline, store: &FlatFileStore) -> Result<Vec<DriverRankingEntry>, PipelineError> {
    let model_path = store.path(Artifact::Model);
    if !model_path.is_file() {
        return Err(PipelineError::EmptyStage {
            stage: Stage::Ranking,
            precondition: "a trained model artifact; run `train` first",
        });
    }
    let model = ModelWeights::load_json(&model_path).map_err(at(Stage::Ranking))?;
    let rows = store.load_features().map_err(at(Stage::Ranking))?;
    let targets = store.load_targets().map_err(at(Stage::Ranking))?;

    let ranking = pipeline.rank(&model, &rows, &targets)?;
    store.save_ranking(&ranking).map_err(at(Stage::Ranking))?;
    Ok(ranking)
}

/// Every stage in order, persisting each output on the way.
pub fn run_all(pipeline: &Pipeline, store: &FlatFileStore) -> Result<PipelineReport, PipelineError> {
    let (normalized, targets) = run_normalize(pipeline, store)?;
    let features = run_features(pipeline, store)?;
    let training = run_train(pipeline, store)?;
    let ranking = run_rank(pipeline, store)?;

    Ok(PipelineReport {
        normalized,
        features,
        targets,
        training,
        ranking,
    })
}
