use acquisition::RawDataset;
use configuration::Settings;
use core_types::LapRecord;
use pipeline::{stages, Pipeline, PipelineError};
use serde_json::json;
use std::collections::BTreeMap;
use std::fs;
use store::{Artifact, FlatFileStore};

const SEASONS: [(i32, [f64; 5], [f64; 5]); 3] = [
    (2000, [80.0, 81.0, 79.0, 80.0, 82.0], [85.0, 86.0, 84.0, 85.0, 83.0]),
    (2001, [78.0, 79.0, 78.0, 77.0, 79.0], [80.0, 82.0, 81.0, 80.0, 81.0]),
    (2002, [76.0, 77.0, 75.0, 76.0, 78.0], [77.0, 76.0, 78.0, 77.0, 79.0]),
];

fn synthetic_laps() -> Vec<LapRecord> {
    let mut laps = Vec::new();
    for (season, a, b) in SEASONS {
        for (driver, times) in [("A", a), ("B", b)] {
            for (i, time) in times.iter().enumerate() {
                laps.push(LapRecord {
                    season,
                    driver_id: driver.to_string(),
                    lap_number: i as u32 + 1,
                    lap_time_seconds: *time,
                    finished: true,
                });
            }
        }
    }
    laps
}

#[test]
fn three_seasons_two_drivers_run_end_to_end() {
    let raw = RawDataset { laps: synthetic_laps(), results: Vec::new() };
    let pipeline = Pipeline::new(Settings::default());
    let report = pipeline.run(&raw).unwrap();

    // Z-scores sum to zero within each season.
    let mut sums: BTreeMap<i32, f64> = BTreeMap::new();
    for record in &report.normalized.records {
        *sums.entry(record.lap.season).or_default() += record.zscore;
    }
    assert_eq!(sums.len(), 3);
    assert!(sums.values().all(|s| s.abs() < 1e-9));

    // One feature row per driver-season.
    assert_eq!(report.features.rows.len(), 6);

    // Completion and outlier ratio are constant here and cannot be fitted.
    let model = &report.training.model;
    assert!(model.excluded_features.contains(&"completion_rate".to_string()));
    assert!(model.excluded_features.contains(&"outlier_ratio".to_string()));
    assert!(model.weights.len() <= report.features.rows.len());

    // A is faster in every season.
    let order: Vec<&str> = report.ranking.iter().map(|e| e.driver_id.as_str()).collect();
    assert_eq!(order, vec!["A", "B"]);
    assert_eq!(report.ranking[0].rank, 1);
    assert_eq!(report.ranking[0].seasons_considered.len(), 3);
    assert!(!report.ranking[0].low_confidence);
}

#[test]
fn repeated_runs_rank_identically() {
    let raw = RawDataset { laps: synthetic_laps(), results: Vec::new() };
    let pipeline = Pipeline::new(Settings::default());
    let first = pipeline.run(&raw).unwrap();
    let second = pipeline.run(&raw).unwrap();

    assert_eq!(first.training.model.weights, second.training.model.weights);
    assert_eq!(first.ranking, second.ranking);
}

#[test]
fn stages_run_through_the_store() {
    let dir = tempfile::tempdir().unwrap();
    let raw_dir = dir.path().join("raw");
    fs::create_dir_all(&raw_dir).unwrap();

    for (season, a, b) in SEASONS {
        let mut file = serde_json::Map::new();
        for (driver, times) in [("A", a), ("B", b)] {
            let laps: serde_json::Map<String, serde_json::Value> = times
                .iter()
                .enumerate()
                .map(|(i, t)| ((i + 1).to_string(), json!({ "time": t })))
                .collect();
            file.insert(driver.to_string(), laps.into());
        }
        fs::write(
            raw_dir.join(format!("{season}_laps.json")),
            serde_json::to_string(&file).unwrap(),
        )
        .unwrap();
    }

    let mut settings = Settings::default();
    settings.data.raw_dir = raw_dir;
    settings.data.artifact_dir = dir.path().join("artifacts");
    let store = FlatFileStore::open(&settings.data.artifact_dir).unwrap();
    let pipeline = Pipeline::new(settings);

    let report = stages::run_all(&pipeline, &store).unwrap();

    for artifact in [
        Artifact::Laps,
        Artifact::ZScores,
        Artifact::SeasonSummary,
        Artifact::Features,
        Artifact::Targets,
        Artifact::Model,
        Artifact::Ranking,
        Artifact::RankingJson,
    ] {
        assert!(store.exists(artifact), "{} was not written", artifact.file_name());
    }
    assert_eq!(store.load_ranking().unwrap(), report.ranking);
    assert_eq!(report.ranking[0].driver_id, "A");
}

#[test]
fn ranking_before_training_names_the_missing_model() {
    let dir = tempfile::tempdir().unwrap();
    let store = FlatFileStore::open(dir.path()).unwrap();
    let pipeline = Pipeline::new(Settings::default());

    let err = stages::run_rank(&pipeline, &store).unwrap_err();
    assert!(matches!(err, PipelineError::EmptyStage { .. }));
    assert!(err.to_string().contains("train"));
}
