use crate::enums::Feature;
use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A single timed lap, as delivered by the acquisition stage.
///
/// For seasons recorded in the total-time format the whole race is one
/// "lap" with `lap_number == 1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LapRecord {
    pub season: i32,
    pub driver_id: String,
    pub lap_number: u32,
    pub lap_time_seconds: f64,
    /// Whether the driver was classified as a finisher of this race.
    pub finished: bool,
}

/// A lap annotated with its Z-score inside its own season.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZScoreRecord {
    #[serde(flatten)]
    pub lap: LapRecord,
    pub zscore: f64,
}

/// The normalization parameters that were applied to one season.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonSummary {
    pub season: i32,
    pub lap_count: usize,
    pub mean: f64,
    pub std_dev: f64,
}

/// An official race classification. `total_time_seconds` is `None` for
/// drivers who were not classified as finishers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceResult {
    pub season: i32,
    pub driver_id: String,
    pub total_time_seconds: Option<f64>,
}

/// The regression target for one (driver, season) observation.
/// Higher is better.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundTruth {
    pub season: i32,
    pub driver_id: String,
    pub target: f64,
}

/// Derived statistics for one driver in one season.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverSeasonFeatures {
    pub driver_id: String,
    pub season: i32,
    pub lap_count: usize,
    pub finished: bool,
    pub mean_zscore: f64,
    pub zscore_variance: f64,
    pub best_zscore: f64,
    pub worst_zscore: f64,
    pub median_zscore: f64,
    /// Slope of Z-score over lap number. `None` when too few laps.
    pub decay_rate: Option<f64>,
    pub outlier_ratio: f64,
    /// `None` when neither a finish flag nor the race distance is known.
    pub completion_rate: Option<f64>,
    pub relative_delta: DeltaFeatures,
}

/// Aggregates of each lap's relative gap to the fastest time set on the
/// same lap number that season. A gap of `0.1` is 10% slower.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeltaFeatures {
    pub mean: f64,
    pub variance: f64,
    pub best: f64,
    pub worst: f64,
    pub median: f64,
    /// Slope of the gap over lap number. `None` when too few laps.
    pub decay_rate: Option<f64>,
}

impl DriverSeasonFeatures {
    /// Looks up a feature by name. Returns `None` for undefined values.
    pub fn value(&self, feature: Feature) -> Option<f64> {
        match feature {
            Feature::MeanZscore => Some(self.mean_zscore),
            Feature::ZscoreVariance => Some(self.zscore_variance),
            Feature::BestZscore => Some(self.best_zscore),
            Feature::WorstZscore => Some(self.worst_zscore),
            Feature::MedianZscore => Some(self.median_zscore),
            Feature::ZscoreRange => Some(self.worst_zscore - self.best_zscore),
            Feature::DecayRate => self.decay_rate,
            Feature::OutlierRatio => Some(self.outlier_ratio),
            Feature::CompletionRate => self.completion_rate,
            Feature::MeanDelta => Some(self.relative_delta.mean),
            Feature::DeltaVariance => Some(self.relative_delta.variance),
            Feature::BestDelta => Some(self.relative_delta.best),
            Feature::WorstDelta => Some(self.relative_delta.worst),
            Feature::DeltaRange => Some(self.relative_delta.worst - self.relative_delta.best),
            Feature::MedianDelta => Some(self.relative_delta.median),
            Feature::DeltaDecayRate => self.relative_delta.decay_rate,
        }
    }
}

/// One line of the final ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverRankingEntry {
    pub driver_id: String,
    pub aggregate_score: f64,
    pub seasons_considered: BTreeSet<i32>,
    pub rank: usize,
    /// The model-only component of `aggregate_score`.
    pub model_score: f64,
    /// Mean historical target, when the driver has any.
    pub ground_truth: Option<f64>,
    /// Set when only one season backs the score.
    pub low_confidence: bool,
}

/// Renders a season set as `2000,2001,2004` for flat tables.
pub fn format_seasons(seasons: &BTreeSet<i32>) -> String {
    seasons
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Inverse of [`format_seasons`]. An empty string is an empty set.
pub fn parse_seasons(raw: &str) -> Result<BTreeSet<i32>, CoreError> {
    if raw.trim().is_empty() {
        return Ok(BTreeSet::new());
    }
    raw.split(',')
        .map(|part| {
            part.trim()
                .parse::<i32>()
                .map_err(|_| CoreError::MalformedSeasonList(raw.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> DriverSeasonFeatures {
        DriverSeasonFeatures {
            driver_id: "Ayrton Senna".to_string(),
            season: 1990,
            lap_count: 1,
            finished: true,
            mean_zscore: -1.2,
            zscore_variance: 0.0,
            best_zscore: -1.5,
            worst_zscore: -0.5,
            median_zscore: -1.2,
            decay_rate: None,
            outlier_ratio: 0.0,
            completion_rate: Some(1.0),
            relative_delta: DeltaFeatures {
                mean: 0.02,
                variance: 0.0,
                best: 0.0,
                worst: 0.05,
                median: 0.02,
                decay_rate: None,
            },
        }
    }

    #[test]
    fn range_is_derived_from_best_and_worst() {
        assert_eq!(row().value(Feature::ZscoreRange), Some(1.0));
        assert_eq!(row().value(Feature::DeltaRange), Some(0.05));
        assert_eq!(row().value(Feature::DeltaDecayRate), None);
    }

    #[test]
    fn undefined_decay_is_reported_as_missing() {
        assert_eq!(row().value(Feature::DecayRate), None);
        assert_eq!(row().value(Feature::CompletionRate), Some(1.0));
    }

    #[test]
    fn season_lists_round_trip() {
        let seasons: BTreeSet<i32> = [2004, 1996, 2000].into_iter().collect();
        let flat = format_seasons(&seasons);
        assert_eq!(flat, "1996,2000,2004");
        assert_eq!(parse_seasons(&flat).unwrap(), seasons);
        assert!(parse_seasons("").unwrap().is_empty());
    }

    #[test]
    fn malformed_season_list_is_an_error() {
        assert_eq!(
            parse_seasons("1996,x"),
            Err(CoreError::MalformedSeasonList("1996,x".to_string()))
        );
    }
}
