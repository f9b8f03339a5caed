use crate::stats;
use core_types::{DataQualityIssue, IssueKind, LapRecord, SeasonSummary, Stage, ZScoreRecord};
use std::collections::BTreeMap;

// Relative spread below which a season is treated as having identical laps.
const DEGENERATE_STD_RATIO: f64 = 1e-12;

/// Output of the normalization stage.
#[derive(Debug, Clone, Default)]
pub struct NormalizedSeasons {
    /// Ordered by season, then driver, then lap number.
    pub records: Vec<ZScoreRecord>,
    pub summaries: Vec<SeasonSummary>,
    pub issues: Vec<DataQualityIssue>,
}

/// Converts raw lap times into per-season Z-scores.
///
/// Each season is normalized on its own mean and population standard
/// deviation, which puts eras with very different absolute pace on one
/// scale. Seasons with fewer than two valid laps are dropped; a season whose
/// laps are all identical gets Z-scores of zero.
pub fn normalize_seasons(laps: &[LapRecord]) -> NormalizedSeasons {
    let mut by_season: BTreeMap<i32, Vec<&LapRecord>> = BTreeMap::new();
    for lap in laps {
        by_season.entry(lap.season).or_default().push(lap);
    }

    let mut output = NormalizedSeasons::default();

    for (season, season_laps) in by_season {
        let mut valid = Vec::with_capacity(season_laps.len());
        for lap in season_laps {
            if lap.lap_time_seconds.is_finite() && lap.lap_time_seconds > 0.0 {
                valid.push(lap);
            } else {
                let issue = DataQualityIssue::driver(
                    Stage::Normalization,
                    season,
                    &lap.driver_id,
                    IssueKind::InvalidLapTime {
                        lap_number: lap.lap_number,
                        value: lap.lap_time_seconds,
                    },
                );
                issue.log();
                output.issues.push(issue);
            }
        }

        if valid.len() < 2 {
            let issue = DataQualityIssue::season(
                Stage::Normalization,
                season,
                IssueKind::InsufficientSamples {
                    statistic: "season standard deviation".to_string(),
                    needed: 2,
                    found: valid.len(),
                },
            );
            issue.log();
            output.issues.push(issue);
            continue;
        }

        let times: Vec<f64> = valid.iter().map(|lap| lap.lap_time_seconds).collect();
        // `times` has at least two entries, so both statistics are defined.
        let mean = stats::mean(&times).unwrap_or_default();
        let std_dev = stats::std_dev(&times).unwrap_or_default();
        let degenerate = std_dev <= DEGENERATE_STD_RATIO * mean.abs().max(1.0);

        valid.sort_by(|a, b| {
            a.driver_id
                .cmp(&b.driver_id)
                .then(a.lap_number.cmp(&b.lap_number))
        });

        for lap in valid {
            let zscore = if degenerate {
                0.0
            } else {
                (lap.lap_time_seconds - mean) / std_dev
            };
            output.records.push(ZScoreRecord { lap: lap.clone(), zscore });
        }

        tracing::debug!(season, laps = times.len(), mean, std_dev, "season normalized");
        output.summaries.push(SeasonSummary {
            season,
            lap_count: times.len(),
            mean,
            std_dev,
        });
    }

    tracing::info!(
        seasons = output.summaries.len(),
        records = output.records.len(),
        dropped = output.issues.len(),
        "normalization complete"
    );
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lap(season: i32, driver: &str, lap_number: u32, time: f64) -> LapRecord {
        LapRecord {
            season,
            driver_id: driver.to_string(),
            lap_number,
            lap_time_seconds: time,
            finished: true,
        }
    }

    #[test]
    fn seasons_are_normalized_independently() {
        let laps = vec![
            lap(1990, "A", 1, 100.0),
            lap(1990, "B", 1, 110.0),
            lap(2020, "A", 1, 80.0),
            lap(2020, "B", 1, 81.0),
        ];
        let out = normalize_seasons(&laps);

        // Two laps per season: each is exactly one standard deviation out.
        let z: Vec<f64> = out.records.iter().map(|r| r.zscore).collect();
        assert_eq!(z, vec![-1.0, 1.0, -1.0, 1.0]);
        assert_eq!(out.summaries.len(), 2);
        assert_eq!(out.summaries[0].mean, 105.0);
        assert!(out.issues.is_empty());
    }

    #[test]
    fn single_lap_season_is_dropped_with_an_issue() {
        let laps = vec![
            lap(1985, "A", 1, 5000.0),
            lap(1986, "A", 1, 5000.0),
            lap(1986, "B", 1, 5100.0),
        ];
        let out = normalize_seasons(&laps);

        assert!(out.records.iter().all(|r| r.lap.season == 1986));
        assert_eq!(out.issues.len(), 1);
        assert_eq!(out.issues[0].season, 1985);
        assert!(matches!(
            out.issues[0].kind,
            IssueKind::InsufficientSamples { needed: 2, found: 1, .. }
        ));
    }

    #[test]
    fn identical_laps_give_zero_zscores() {
        let laps = vec![lap(2000, "A", 1, 90.1), lap(2000, "A", 2, 90.1), lap(2000, "B", 1, 90.1)];
        let out = normalize_seasons(&laps);
        assert!(out.records.iter().all(|r| r.zscore == 0.0));
    }

    #[test]
    fn invalid_lap_times_are_discarded_before_statistics() {
        let laps = vec![
            lap(2000, "A", 1, 80.0),
            lap(2000, "A", 2, 0.0),
            lap(2000, "B", 1, 82.0),
            lap(2000, "B", 2, f64::NAN),
        ];
        let out = normalize_seasons(&laps);

        assert_eq!(out.records.len(), 2);
        assert_eq!(out.summaries[0].mean, 81.0);
        assert_eq!(
            out.issues
                .iter()
                .filter(|i| matches!(i.kind, IssueKind::InvalidLapTime { .. }))
                .count(),
            2
        );
    }

    #[test]
    fn output_is_sorted_by_driver_then_lap() {
        let laps = vec![
            lap(2000, "B", 2, 82.0),
            lap(2000, "A", 2, 81.0),
            lap(2000, "B", 1, 83.0),
            lap(2000, "A", 1, 80.0),
        ];
        let out = normalize_seasons(&laps);
        let keys: Vec<(&str, u32)> = out
            .records
            .iter()
            .map(|r| (r.lap.driver_id.as_str(), r.lap.lap_number))
            .collect();
        assert_eq!(keys, vec![("A", 1), ("A", 2), ("B", 1), ("B", 2)]);
    }
}
