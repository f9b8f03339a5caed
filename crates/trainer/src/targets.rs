use core_types::{DataQualityIssue, GroundTruth, IssueKind, LapRecord, RaceResult, Stage};
use ndarray::Array1;
use std::collections::BTreeMap;

/// Ground-truth targets for every classified finisher, plus the seasons that
/// could not produce any.
#[derive(Debug, Clone, Default)]
pub struct TargetTable {
    pub targets: Vec<GroundTruth>,
    pub issues: Vec<DataQualityIssue>,
}

/// Reconstructs race results from lap times.
///
/// A driver who finished gets the sum of their valid lap times as the total;
/// a driver who retired gets no total.
pub fn results_from_laps(laps: &[LapRecord]) -> Vec<RaceResult> {
    let mut totals: BTreeMap<(i32, &str), (bool, f64)> = BTreeMap::new();
    for lap in laps {
        let entry = totals
            .entry((lap.season, lap.driver_id.as_str()))
            .or_insert((false, 0.0));
        entry.0 |= lap.finished;
        if lap.lap_time_seconds.is_finite() && lap.lap_time_seconds > 0.0 {
            entry.1 += lap.lap_time_seconds;
        }
    }

    totals
        .into_iter()
        .map(|((season, driver), (finished, total))| RaceResult {
            season,
            driver_id: driver.to_string(),
            total_time_seconds: (finished && total > 0.0).then_some(total),
        })
        .collect()
}

/// Converts official results into regression targets.
///
/// For each season the gap of every classified finisher to the winner's
/// total time is standardized within that season and negated, so faster
/// drivers get larger targets and a season with a dominant winner does not
/// swamp the others. Seasons with fewer than two finishers produce no
/// targets.
pub fn ground_truth_from_results(results: &[RaceResult]) -> TargetTable {
    let mut by_season: BTreeMap<i32, Vec<(&str, f64)>> = BTreeMap::new();
    for result in results {
        if let Some(total) = result.total_time_seconds {
            if total.is_finite() && total > 0.0 {
                by_season
                    .entry(result.season)
                    .or_default()
                    .push((result.driver_id.as_str(), total));
            }
        }
    }

    let mut table = TargetTable::default();

    for (season, mut finishers) in by_season {
        if finishers.len() < 2 {
            let issue = DataQualityIssue::season(
                Stage::Regression,
                season,
                IssueKind::InsufficientSamples {
                    statistic: "ground-truth time gap".to_string(),
                    needed: 2,
                    found: finishers.len(),
                },
            );
            issue.log();
            table.issues.push(issue);
            continue;
        }
        finishers.sort_by(|a, b| a.0.cmp(b.0));

        let fastest = finishers
            .iter()
            .map(|(_, total)| *total)
            .fold(f64::INFINITY, f64::min);
        let gaps: Array1<f64> = finishers.iter().map(|(_, total)| total - fastest).collect();
        let mean = gaps.mean().unwrap_or_default();
        let std_dev = gaps.std(0.0);

        for ((driver, _), gap) in finishers.iter().zip(&gaps) {
            let zscore = if std_dev > 0.0 { (gap - mean) / std_dev } else { 0.0 };
            table.targets.push(GroundTruth {
                season,
                driver_id: driver.to_string(),
                target: -zscore,
            });
        }
        tracing::debug!(season, finishers = gaps.len(), "ground truth derived");
    }

    table
}
