use configuration::{RegressionSettings, TuningSettings};
use core_types::{DeltaFeatures, DriverSeasonFeatures, Feature, GroundTruth};
use std::collections::BTreeMap;
use trainer::{assemble, ModelWeights, Trainer};

fn rows() -> Vec<DriverSeasonFeatures> {
    (0..12)
        .map(|i| {
            let mean = (i as f64 - 5.5) * 0.3;
            let variance = 0.1 + (i % 4) as f64 * 0.05;
            DriverSeasonFeatures {
                driver_id: format!("D{i}"),
                season: 2000 + (i % 3),
                lap_count: 10 + i as usize,
                finished: true,
                mean_zscore: mean,
                zscore_variance: variance,
                best_zscore: mean - 1.0 - variance,
                worst_zscore: mean + 1.0 + (i % 2) as f64 * 0.4,
                median_zscore: mean + 0.05 * (i % 5) as f64,
                decay_rate: Some(0.002 * (i % 3) as f64),
                outlier_ratio: 0.0,
                completion_rate: Some(1.0),
                relative_delta: DeltaFeatures::default(),
            }
        })
        .collect()
}

fn truths(rows: &[DriverSeasonFeatures]) -> Vec<GroundTruth> {
    rows.iter()
        .map(|r| GroundTruth {
            season: r.season,
            driver_id: r.driver_id.clone(),
            target: -2.0 * r.mean_zscore + r.zscore_variance,
        })
        .collect()
}

#[test]
fn reloaded_scaler_standardizes_the_training_matrix() {
    let rows = rows();
    let truths = truths(&rows);
    let settings = RegressionSettings {
        tuning: TuningSettings { enabled: false, ..TuningSettings::default() },
        ..RegressionSettings::default()
    };
    let outcome = Trainer::new(settings).fit(&rows, &truths).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.json");
    outcome.model.save_json(&path).unwrap();
    let loaded = ModelWeights::load_json(&path).unwrap();

    let (features, scaler) = loaded.scaler().unwrap();
    assert!(!features.contains(&Feature::OutlierRatio));
    assert!(!features.contains(&Feature::CompletionRate));

    let targets: BTreeMap<(i32, &str), f64> = truths
        .iter()
        .map(|t| ((t.season, t.driver_id.as_str()), t.target))
        .collect();
    let (set, issues) = assemble(&rows, &targets, &features).unwrap();
    assert!(issues.is_empty());
    assert_eq!(set.observations(), rows.len());

    let standardized = scaler.transform(&set.x);
    let n = standardized.nrows() as f64;
    for column in standardized.columns() {
        let mean = column.sum() / n;
        let variance = column.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        assert!(mean.abs() < 1e-9, "column mean {mean}");
        assert!((variance - 1.0).abs() < 1e-9, "column variance {variance}");
    }
}

#[test]
fn reloaded_scaler_reproduces_persisted_scores() {
    let rows = rows();
    let truths = truths(&rows);
    let settings = RegressionSettings {
        tuning: TuningSettings { enabled: false, ..TuningSettings::default() },
        ..RegressionSettings::default()
    };
    let model = Trainer::new(settings).fit(&rows, &truths).unwrap().model;

    let (features, scaler) = model.scaler().unwrap();
    let placeholders: BTreeMap<(i32, &str), f64> = rows
        .iter()
        .map(|r| ((r.season, r.driver_id.as_str()), 0.0))
        .collect();
    let (set, _) = assemble(&rows, &placeholders, &features).unwrap();
    let standardized = scaler.transform(&set.x);

    for (row, x) in rows.iter().zip(standardized.rows()) {
        let by_hand: f64 = model.intercept
            + features
                .iter()
                .zip(x.iter())
                .map(|(f, v)| model.weights.get(f.name()).copied().unwrap_or_default() * v)
                .sum::<f64>();
        assert!((model.score(row).unwrap() - by_hand).abs() < 1e-9);
    }
}
