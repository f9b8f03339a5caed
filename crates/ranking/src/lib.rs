use configuration::RankingSettings;
use core_types::{DriverRankingEntry, DriverSeasonFeatures, GroundTruth, WeightingPolicy};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use trainer::ModelWeights;

pub mod error;

pub use error::RankingError;

/// One scored (driver, season) row.
#[derive(Debug, Clone, Copy, PartialEq)]
struct SeasonScore {
    season: i32,
    score: f64,
    lap_count: usize,
}

/// Scores every driver-season with a trained model and orders the drivers.
pub struct Ranker {
    settings: RankingSettings,
}

impl Ranker {
    pub fn new(settings: RankingSettings) -> Self {
        Self { settings }
    }

    /// Scores, aggregates and ranks all drivers that have at least one
    /// feature row. Ground truth only matters when the blend is non-zero,
    /// but is always reported on the entries.
    pub fn rank(
        &self,
        model: &ModelWeights,
        rows: &[DriverSeasonFeatures],
        ground_truth: &[GroundTruth],
    ) -> Result<Vec<DriverRankingEntry>, RankingError> {
        // 1. Score
        let mut by_driver: BTreeMap<&str, Vec<SeasonScore>> = BTreeMap::new();
        for row in rows {
            let score = model.score(row)?;
            if !score.is_finite() {
                return Err(RankingError::NonFiniteScore {
                    driver_id: row.driver_id.clone(),
                    season: row.season,
                });
            }
            by_driver.entry(row.driver_id.as_str()).or_default().push(SeasonScore {
                season: row.season,
                score,
                lap_count: row.lap_count,
            });
        }

        let mut targets: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
        for truth in ground_truth {
            targets.entry(truth.driver_id.as_str()).or_default().push(truth.target);
        }

        // 2. Aggregate
        let blend = self.settings.ground_truth_blend;
        let mut entries: Vec<DriverRankingEntry> = by_driver
            .into_iter()
            .map(|(driver, scores)| {
                let model_score = aggregate(&scores, self.settings.weighting);
                let ground_truth = targets
                    .get(driver)
                    .map(|t| t.iter().sum::<f64>() / t.len() as f64);
                let aggregate_score = match ground_truth {
                    Some(truth) if blend > 0.0 => (1.0 - blend) * model_score + blend * truth,
                    _ => model_score,
                };
                let seasons_considered: BTreeSet<i32> = scores.iter().map(|s| s.season).collect();

                DriverRankingEntry {
                    driver_id: driver.to_string(),
                    aggregate_score,
                    low_confidence: seasons_considered.len() == 1,
                    seasons_considered,
                    rank: 0,
                    model_score,
                    ground_truth,
                }
            })
            .collect();

        // 3. Rank
        entries.sort_by(compare_entries);
        for (i, entry) in entries.iter_mut().enumerate() {
            entry.rank = i + 1;
        }

        tracing::info!(
            drivers = entries.len(),
            low_confidence = entries.iter().filter(|e| e.low_confidence).count(),
            "ranking complete"
        );
        Ok(entries)
    }
}

/// Higher aggregate first, then more seasons considered, then driver id.
///
/// `-0.0` and `0.0` compare equal. Scores are finite by the time they are
/// ranked.
pub fn compare_entries(a: &DriverRankingEntry, b: &DriverRankingEntry) -> Ordering {
    // Adding +0.0 turns -0.0 into 0.0 and leaves every other value alone.
    let (a_score, b_score) = (a.aggregate_score + 0.0, b.aggregate_score + 0.0);
    b_score
        .total_cmp(&a_score)
        .then_with(|| b.seasons_considered.len().cmp(&a.seasons_considered.len()))
        .then_with(|| a.driver_id.cmp(&b.driver_id))
}

fn aggregate(scores: &[SeasonScore], policy: WeightingPolicy) -> f64 {
    let equal = || scores.iter().map(|s| s.score).sum::<f64>() / scores.len() as f64;
    match policy {
        WeightingPolicy::Equal => equal(),
        WeightingPolicy::LapWeighted => {
            let total_laps: usize = scores.iter().map(|s| s.lap_count).sum();
            if total_laps == 0 {
                return equal();
            }
            scores
                .iter()
                .map(|s| s.score * s.lap_count as f64)
                .sum::<f64>()
                / total_laps as f64
        }
    }
}
