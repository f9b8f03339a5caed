use crate::stats;
use configuration::FeatureSettings;
use core_types::{DataQualityIssue, DeltaFeatures, DriverSeasonFeatures, IssueKind, Stage, ZScoreRecord};
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

/// Output of the feature engineering stage.
#[derive(Debug, Clone, Default)]
pub struct EngineeredFeatures {
    /// One row per (driver, season) with at least one lap, ordered by
    /// season then driver.
    pub rows: Vec<DriverSeasonFeatures>,
    pub issues: Vec<DataQualityIssue>,
}

/// Aggregates per-lap Z-scores into one feature row per (driver, season).
#[derive(Debug, Clone)]
pub struct FeatureEngineer {
    settings: FeatureSettings,
}

impl FeatureEngineer {
    pub fn new(settings: FeatureSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &FeatureSettings {
        &self.settings
    }

    /// Builds the feature table. Groups are computed in parallel; the output
    /// order does not depend on scheduling.
    pub fn build(&self, records: &[ZScoreRecord]) -> EngineeredFeatures {
        let mut groups: BTreeMap<(i32, &str), Vec<&ZScoreRecord>> = BTreeMap::new();
        for record in records {
            groups
                .entry((record.lap.season, record.lap.driver_id.as_str()))
                .or_default()
                .push(record);
        }

        let distances = self.race_distances(records);
        let fastest = fastest_laps(records);

        let results: Vec<(DriverSeasonFeatures, Vec<DataQualityIssue>)> = groups
            .into_iter()
            .collect::<Vec<_>>()
            .par_iter()
            .map(|((season, driver), laps)| {
                self.build_group(*season, driver, laps, distances.get(season).copied(), &fastest)
            })
            .collect();

        let mut output = EngineeredFeatures::default();
        for (row, issues) in results {
            for issue in &issues {
                issue.log();
            }
            output.rows.push(row);
            output.issues.extend(issues);
        }

        tracing::info!(
            rows = output.rows.len(),
            issues = output.issues.len(),
            "feature engineering complete"
        );
        output
    }

    /// Race length per season: the configured distance, or else the furthest
    /// lap reached by a classified finisher.
    fn race_distances(&self, records: &[ZScoreRecord]) -> BTreeMap<i32, u32> {
        let mut distances = BTreeMap::new();
        for record in records {
            if let Some(configured) = self.settings.race_distance {
                distances.insert(record.lap.season, configured);
            } else if record.lap.finished {
                let entry = distances.entry(record.lap.season).or_insert(0);
                *entry = (*entry).max(record.lap.lap_number);
            }
        }
        distances
    }

    fn build_group(
        &self,
        season: i32,
        driver: &str,
        laps: &[&ZScoreRecord],
        race_distance: Option<u32>,
        fastest: &BTreeMap<(i32, u32), f64>,
    ) -> (DriverSeasonFeatures, Vec<DataQualityIssue>) {
        let mut issues = Vec::new();

        let mut ordered: Vec<&ZScoreRecord> = laps.to_vec();
        ordered.sort_by_key(|r| r.lap.lap_number);

        let zscores: Vec<f64> = ordered.iter().map(|r| r.zscore).collect();
        let lap_numbers: Vec<u32> = ordered.iter().map(|r| r.lap.lap_number).collect();

        let deltas: Vec<f64> = ordered
            .iter()
            .map(|r| {
                relative_delta(
                    r.lap.lap_time_seconds,
                    fastest.get(&(season, r.lap.lap_number)).copied(),
                )
            })
            .collect();

        let decay = decay_rate(&lap_numbers, &zscores, self.settings.min_decay_laps);
        if decay.is_none() {
            let kind = if zscores.len() < self.settings.min_decay_laps {
                IssueKind::InsufficientSamples {
                    statistic: "decay rate".to_string(),
                    needed: self.settings.min_decay_laps,
                    found: zscores.len(),
                }
            } else {
                IssueKind::DegenerateLapNumbering { laps: zscores.len() }
            };
            issues.push(DataQualityIssue::driver(Stage::FeatureEngineering, season, driver, kind));
        }

        let finished = ordered.iter().any(|r| r.lap.finished);
        let completed: BTreeSet<u32> = lap_numbers.iter().copied().collect();
        let completion = completion_rate(finished, completed.len(), race_distance);
        if completion.is_none() {
            issues.push(DataQualityIssue::driver(
                Stage::FeatureEngineering,
                season,
                driver,
                IssueKind::UnknownRaceDistance,
            ));
        }

        // Groups are never empty, so the descriptive statistics are defined.
        let row = DriverSeasonFeatures {
            driver_id: driver.to_string(),
            season,
            lap_count: zscores.len(),
            finished,
            mean_zscore: stats::mean(&zscores).unwrap_or_default(),
            zscore_variance: stats::variance(&zscores).unwrap_or_default(),
            best_zscore: stats::min(&zscores).unwrap_or_default(),
            worst_zscore: stats::max(&zscores).unwrap_or_default(),
            median_zscore: stats::median(&zscores).unwrap_or_default(),
            decay_rate: decay,
            outlier_ratio: outlier_ratio(&zscores, self.settings.outlier_threshold),
            completion_rate: completion,
            relative_delta: DeltaFeatures {
                mean: stats::mean(&deltas).unwrap_or_default(),
                variance: stats::variance(&deltas).unwrap_or_default(),
                best: stats::min(&deltas).unwrap_or_default(),
                worst: stats::max(&deltas).unwrap_or_default(),
                median: stats::median(&deltas).unwrap_or_default(),
                decay_rate: decay_rate(&lap_numbers, &deltas, self.settings.min_decay_laps),
            },
        };
        (row, issues)
    }
}

/// Fastest time per (season, lap number) across all drivers. For total-time
/// seasons lap 1 is the whole race, so this is the winning time.
fn fastest_laps(records: &[ZScoreRecord]) -> BTreeMap<(i32, u32), f64> {
    let mut fastest: BTreeMap<(i32, u32), f64> = BTreeMap::new();
    for record in records {
        let time = record.lap.lap_time_seconds;
        fastest
            .entry((record.lap.season, record.lap.lap_number))
            .and_modify(|best| *best = best.min(time))
            .or_insert(time);
    }
    fastest
}

/// Gap to the fastest time as a fraction of it. `0.0` when no positive
/// reference time exists.
pub fn relative_delta(time: f64, fastest: Option<f64>) -> f64 {
    match fastest {
        Some(reference) if reference > 0.0 => (time - reference) / reference,
        _ => 0.0,
    }
}

/// Slope of Z-score against lap number.
///
/// Positive means the driver lost pace as the race went on. Undefined below
/// `min_laps` laps.
pub fn decay_rate(lap_numbers: &[u32], zscores: &[f64], min_laps: usize) -> Option<f64> {
    if zscores.len() < min_laps {
        return None;
    }
    let xs: Vec<f64> = lap_numbers.iter().map(|&n| n as f64).collect();
    stats::slope(&xs, zscores)
}

/// Fraction of laps whose |z| is strictly above `threshold`.
pub fn outlier_ratio(zscores: &[f64], threshold: f64) -> f64 {
    if zscores.is_empty() {
        return 0.0;
    }
    let outliers = zscores.iter().filter(|z| z.abs() > threshold).count();
    outliers as f64 / zscores.len() as f64
}

/// 1.0 for finishers, otherwise the share of the race distance completed.
pub fn completion_rate(finished: bool, laps_completed: usize, race_distance: Option<u32>) -> Option<f64> {
    if finished {
        return Some(1.0);
    }
    match race_distance {
        Some(distance) if distance > 0 => Some((laps_completed as f64 / distance as f64).min(1.0)),
        _ => None,
    }
}
