use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A derived per-(driver, season) statistic that can feed the regression.
///
/// The string form (see [`Feature::name`]) is what appears in config files
/// and in the persisted model artifact, so it must stay stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    MeanZscore,
    ZscoreVariance,
    BestZscore,
    WorstZscore,
    MedianZscore,
    ZscoreRange,
    DecayRate,
    OutlierRatio,
    CompletionRate,
    MeanDelta,
    DeltaVariance,
    BestDelta,
    WorstDelta,
    DeltaRange,
    MedianDelta,
    DeltaDecayRate,
}

impl Feature {
    /// Every feature the engineering stage computes, in column order.
    pub const ALL: [Feature; 16] = [
        Feature::MeanZscore,
        Feature::ZscoreVariance,
        Feature::BestZscore,
        Feature::WorstZscore,
        Feature::MedianZscore,
        Feature::ZscoreRange,
        Feature::DecayRate,
        Feature::OutlierRatio,
        Feature::CompletionRate,
        Feature::MeanDelta,
        Feature::DeltaVariance,
        Feature::BestDelta,
        Feature::WorstDelta,
        Feature::DeltaRange,
        Feature::MedianDelta,
        Feature::DeltaDecayRate,
    ];

    /// The feature set used when the configuration does not name one.
    /// `zscore_range` is left out because it is exactly `worst - best`. The
    /// relative-delta family is opt-in.
    pub const DEFAULT_SET: [Feature; 8] = [
        Feature::MeanZscore,
        Feature::ZscoreVariance,
        Feature::BestZscore,
        Feature::WorstZscore,
        Feature::MedianZscore,
        Feature::DecayRate,
        Feature::OutlierRatio,
        Feature::CompletionRate,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Feature::MeanZscore => "mean_zscore",
            Feature::ZscoreVariance => "zscore_variance",
            Feature::BestZscore => "best_zscore",
            Feature::WorstZscore => "worst_zscore",
            Feature::MedianZscore => "median_zscore",
            Feature::ZscoreRange => "zscore_range",
            Feature::DecayRate => "decay_rate",
            Feature::OutlierRatio => "outlier_ratio",
            Feature::CompletionRate => "completion_rate",
            Feature::MeanDelta => "mean_delta",
            Feature::DeltaVariance => "delta_variance",
            Feature::BestDelta => "best_delta",
            Feature::WorstDelta => "worst_delta",
            Feature::DeltaRange => "delta_range",
            Feature::MedianDelta => "median_delta",
            Feature::DeltaDecayRate => "delta_decay_rate",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Feature {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Feature::ALL
            .iter()
            .copied()
            .find(|feature| feature.name() == s)
            .ok_or_else(|| CoreError::UnknownFeature(s.to_string()))
    }
}

/// The stages of the pipeline, in the order data flows through them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Acquisition,
    Normalization,
    FeatureEngineering,
    Regression,
    Ranking,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Acquisition => "acquisition",
            Stage::Normalization => "normalization",
            Stage::FeatureEngineering => "feature engineering",
            Stage::Regression => "regression",
            Stage::Ranking => "ranking",
        };
        f.write_str(name)
    }
}

/// How per-season scores are combined into one driver score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightingPolicy {
    /// Plain mean over seasons; a long career does not count for more.
    #[default]
    Equal,
    /// Mean weighted by the number of laps behind each season's row.
    LapWeighted,
}
