use crate::enums::{Feature, Stage};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a group or a record was left out of a stage's output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IssueKind {
    /// A statistic needs more samples than the group has.
    InsufficientSamples { statistic: String, needed: usize, found: usize },
    /// Every lap shares one lap number, so no trend over the race exists.
    DegenerateLapNumbering { laps: usize },
    /// A lap time that is zero, negative or not a number.
    InvalidLapTime { lap_number: u32, value: f64 },
    /// A feature row has no target score and cannot be used for training.
    MissingGroundTruth,
    /// A feature row lacks a value for a selected feature.
    MissingFeature { feature: Feature },
    /// The completion rate could not be determined.
    UnknownRaceDistance,
}

/// A recoverable, per-group data-quality problem. Never fatal: the group is
/// dropped (or the value left undefined) and the run continues.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataQualityIssue {
    pub stage: Stage,
    pub season: i32,
    pub driver_id: Option<String>,
    pub kind: IssueKind,
}

impl DataQualityIssue {
    pub fn season(stage: Stage, season: i32, kind: IssueKind) -> Self {
        Self { stage, season, driver_id: None, kind }
    }

    pub fn driver(stage: Stage, season: i32, driver_id: &str, kind: IssueKind) -> Self {
        Self { stage, season, driver_id: Some(driver_id.to_string()), kind }
    }

    /// Emits the issue as a `warn` event.
    pub fn log(&self) {
        tracing::warn!(stage = %self.stage, season = self.season, "{}", self);
    }
}

impl fmt::Display for DataQualityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.driver_id {
            Some(driver) => write!(f, "season {} / {}: ", self.season, driver)?,
            None => write!(f, "season {}: ", self.season)?,
        }
        match &self.kind {
            IssueKind::InsufficientSamples { statistic, needed, found } => write!(
                f,
                "{} needs at least {} samples, found {}",
                statistic, needed, found
            ),
            IssueKind::DegenerateLapNumbering { laps } => {
                write!(f, "all {} laps share one lap number, decay rate undefined", laps)
            }
            IssueKind::InvalidLapTime { lap_number, value } => {
                write!(f, "lap {} has invalid time {}", lap_number, value)
            }
            IssueKind::MissingGroundTruth => write!(f, "no ground-truth target, excluded from training"),
            IssueKind::MissingFeature { feature } => {
                write!(f, "feature '{}' undefined, excluded from training", feature)
            }
            IssueKind::UnknownRaceDistance => write!(f, "race distance unknown, completion rate missing"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_season_driver_and_reason() {
        let issue = DataQualityIssue::driver(
            Stage::FeatureEngineering,
            2001,
            "Mika Hakkinen",
            IssueKind::InsufficientSamples { statistic: "decay rate".to_string(), needed: 3, found: 2 },
        );
        assert_eq!(
            issue.to_string(),
            "season 2001 / Mika Hakkinen: decay rate needs at least 3 samples, found 2"
        );
    }
}
