use core_types::{DataQualityIssue, DriverSeasonFeatures, Feature, IssueKind, Stage};
use ndarray::{Array1, Array2};
use std::collections::BTreeMap;

/// Design matrix and targets for the rows that can be trained on.
#[derive(Debug, Clone)]
pub struct TrainingSet {
    pub features: Vec<Feature>,
    pub x: Array2<f64>,
    pub y: Array1<f64>,
    /// (season, driver) of each row of `x`.
    pub keys: Vec<(i32, String)>,
}

impl TrainingSet {
    pub fn observations(&self) -> usize {
        self.x.nrows()
    }

    /// Same rows, keeping only the columns at `indices`.
    pub fn select_columns(&self, indices: &[usize]) -> TrainingSet {
        let x = self.x.select(ndarray::Axis(1), indices);
        TrainingSet {
            features: indices.iter().map(|&j| self.features[j]).collect(),
            x,
            y: self.y.clone(),
            keys: self.keys.clone(),
        }
    }
}

/// Joins feature rows with their targets.
///
/// A row is kept only when it has a target and a value for every selected
/// feature; each excluded row is reported.
pub fn assemble(
    rows: &[DriverSeasonFeatures],
    targets: &BTreeMap<(i32, &str), f64>,
    features: &[Feature],
) -> Result<(TrainingSet, Vec<DataQualityIssue>), ndarray::ShapeError> {
    let mut issues = Vec::new();
    let mut values = Vec::with_capacity(rows.len() * features.len());
    let mut y = Vec::with_capacity(rows.len());
    let mut keys = Vec::with_capacity(rows.len());

    for row in rows {
        let Some(&target) = targets.get(&(row.season, row.driver_id.as_str())) else {
            issues.push(DataQualityIssue::driver(
                Stage::Regression,
                row.season,
                &row.driver_id,
                IssueKind::MissingGroundTruth,
            ));
            continue;
        };

        let mut row_values = Vec::with_capacity(features.len());
        let mut missing = None;
        for feature in features {
            match row.value(*feature) {
                Some(value) if value.is_finite() => row_values.push(value),
                _ => {
                    missing = Some(*feature);
                    break;
                }
            }
        }
        if let Some(feature) = missing {
            issues.push(DataQualityIssue::driver(
                Stage::Regression,
                row.season,
                &row.driver_id,
                IssueKind::MissingFeature { feature },
            ));
            continue;
        }

        values.extend(row_values);
        y.push(target);
        keys.push((row.season, row.driver_id.clone()));
    }

    for issue in &issues {
        issue.log();
    }

    let x = Array2::from_shape_vec((y.len(), features.len()), values)?;
    Ok((
        TrainingSet {
            features: features.to_vec(),
            x,
            y: Array1::from(y),
            keys,
        },
        issues,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::DeltaFeatures;

    fn row(season: i32, driver: &str, mean: f64, decay: Option<f64>) -> DriverSeasonFeatures {
        DriverSeasonFeatures {
            driver_id: driver.to_string(),
            season,
            lap_count: 5,
            finished: true,
            mean_zscore: mean,
            zscore_variance: 0.1,
            best_zscore: mean - 1.0,
            worst_zscore: mean + 1.0,
            median_zscore: mean,
            decay_rate: decay,
            outlier_ratio: 0.0,
            completion_rate: Some(1.0),
            relative_delta: DeltaFeatures::default(),
        }
    }

    #[test]
    fn rows_without_targets_or_features_are_excluded() {
        let rows = vec![
            row(2000, "A", -0.5, Some(0.01)),
            row(2000, "B", 0.5, None),
            row(2000, "C", 0.2, Some(0.02)),
        ];
        let mut targets = BTreeMap::new();
        targets.insert((2000, "A"), 1.0);
        targets.insert((2000, "B"), -1.0);

        let features = [Feature::MeanZscore, Feature::DecayRate];
        let (set, issues) = assemble(&rows, &targets, &features).unwrap();

        assert_eq!(set.observations(), 1);
        assert_eq!(set.keys, vec![(2000, "A".to_string())]);
        assert_eq!(set.x.row(0).to_vec(), vec![-0.5, 0.01]);
        assert_eq!(issues.len(), 2);
        assert!(issues.iter().any(|i| i.kind == IssueKind::MissingGroundTruth));
        assert!(issues.iter().any(|i| i.kind == IssueKind::MissingFeature { feature: Feature::DecayRate }));
    }

    #[test]
    fn selecting_columns_keeps_rows_aligned() {
        let rows = vec![row(2000, "A", -0.5, Some(0.01)), row(2000, "B", 0.5, Some(0.03))];
        let mut targets = BTreeMap::new();
        targets.insert((2000, "A"), 1.0);
        targets.insert((2000, "B"), -1.0);

        let features = [Feature::MeanZscore, Feature::ZscoreVariance, Feature::DecayRate];
        let (set, _) = assemble(&rows, &targets, &features).unwrap();
        let narrowed = set.select_columns(&[0, 2]);

        assert_eq!(narrowed.features, vec![Feature::MeanZscore, Feature::DecayRate]);
        assert_eq!(narrowed.x.row(1).to_vec(), vec![0.5, 0.03]);
        assert_eq!(narrowed.y, set.y);
    }
}
