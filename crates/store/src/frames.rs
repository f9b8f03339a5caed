//! Conversions between typed records and polars DataFrames.

use crate::error::StoreError;
use core_types::{
    format_seasons, parse_seasons, DeltaFeatures, DriverRankingEntry, DriverSeasonFeatures,
    GroundTruth, LapRecord, SeasonSummary, ZScoreRecord,
};
use polars::prelude::*;

pub fn laps_to_frame(laps: &[LapRecord]) -> PolarsResult<DataFrame> {
    DataFrame::new(lap_columns(laps.iter()))
}

pub fn laps_from_frame(df: &DataFrame) -> Result<Vec<LapRecord>, StoreError> {
    read_laps(df, "laps")
}

pub fn zscores_to_frame(records: &[ZScoreRecord]) -> PolarsResult<DataFrame> {
    let mut columns = lap_columns(records.iter().map(|r| &r.lap));
    columns.push(Series::new(
        "zscore",
        records.iter().map(|r| r.zscore).collect::<Vec<f64>>(),
    ));
    DataFrame::new(columns)
}

pub fn zscores_from_frame(df: &DataFrame) -> Result<Vec<ZScoreRecord>, StoreError> {
    const ARTIFACT: &str = "zscores";
    let laps = read_laps(df, ARTIFACT)?;
    let zscores = f64_column(df, ARTIFACT, "zscore")?;
    Ok(laps
        .into_iter()
        .zip(zscores)
        .map(|(lap, zscore)| ZScoreRecord { lap, zscore })
        .collect())
}

pub fn summaries_to_frame(summaries: &[SeasonSummary]) -> PolarsResult<DataFrame> {
    DataFrame::new(vec![
        Series::new("season", summaries.iter().map(|s| s.season).collect::<Vec<i32>>()),
        Series::new(
            "lap_count",
            summaries.iter().map(|s| s.lap_count as u64).collect::<Vec<u64>>(),
        ),
        Series::new("mean", summaries.iter().map(|s| s.mean).collect::<Vec<f64>>()),
        Series::new("std_dev", summaries.iter().map(|s| s.std_dev).collect::<Vec<f64>>()),
    ])
}

pub fn summaries_from_frame(df: &DataFrame) -> Result<Vec<SeasonSummary>, StoreError> {
    const ARTIFACT: &str = "season_summary";
    let seasons = i32_column(df, ARTIFACT, "season")?;
    let counts = u64_column(df, ARTIFACT, "lap_count")?;
    let means = f64_column(df, ARTIFACT, "mean")?;
    let stds = f64_column(df, ARTIFACT, "std_dev")?;

    Ok((0..df.height())
        .map(|i| SeasonSummary {
            season: seasons[i],
            lap_count: counts[i] as usize,
            mean: means[i],
            std_dev: stds[i],
        })
        .collect())
}

pub fn features_to_frame(rows: &[DriverSeasonFeatures]) -> PolarsResult<DataFrame> {
    let f64s = |f: fn(&DriverSeasonFeatures) -> f64| rows.iter().map(f).collect::<Vec<f64>>();
    let optional = |f: fn(&DriverSeasonFeatures) -> Option<f64>| {
        rows.iter().map(f).collect::<Vec<Option<f64>>>()
    };

    DataFrame::new(vec![
        Series::new("driver_id", rows.iter().map(|r| r.driver_id.as_str()).collect::<Vec<&str>>()),
        Series::new("season", rows.iter().map(|r| r.season).collect::<Vec<i32>>()),
        Series::new("lap_count", rows.iter().map(|r| r.lap_count as u64).collect::<Vec<u64>>()),
        Series::new("finished", rows.iter().map(|r| r.finished).collect::<Vec<bool>>()),
        Series::new("mean_zscore", f64s(|r| r.mean_zscore)),
        Series::new("zscore_variance", f64s(|r| r.zscore_variance)),
        Series::new("best_zscore", f64s(|r| r.best_zscore)),
        Series::new("worst_zscore", f64s(|r| r.worst_zscore)),
        Series::new("median_zscore", f64s(|r| r.median_zscore)),
        Series::new("decay_rate", optional(|r| r.decay_rate)),
        Series::new("outlier_ratio", f64s(|r| r.outlier_ratio)),
        Series::new("completion_rate", optional(|r| r.completion_rate)),
        Series::new("mean_delta", f64s(|r| r.relative_delta.mean)),
        Series::new("delta_variance", f64s(|r| r.relative_delta.variance)),
        Series::new("best_delta", f64s(|r| r.relative_delta.best)),
        Series::new("worst_delta", f64s(|r| r.relative_delta.worst)),
        Series::new("median_delta", f64s(|r| r.relative_delta.median)),
        Series::new("delta_decay_rate", optional(|r| r.relative_delta.decay_rate)),
    ])
}

pub fn features_from_frame(df: &DataFrame) -> Result<Vec<DriverSeasonFeatures>, StoreError> {
    const ARTIFACT: &str = "features";
    let drivers = str_column(df, ARTIFACT, "driver_id")?;
    let seasons = i32_column(df, ARTIFACT, "season")?;
    let lap_counts = u64_column(df, ARTIFACT, "lap_count")?;
    let finished = bool_column(df, ARTIFACT, "finished")?;
    let mean = f64_column(df, ARTIFACT, "mean_zscore")?;
    let variance = f64_column(df, ARTIFACT, "zscore_variance")?;
    let best = f64_column(df, ARTIFACT, "best_zscore")?;
    let worst = f64_column(df, ARTIFACT, "worst_zscore")?;
    let median = f64_column(df, ARTIFACT, "median_zscore")?;
    let decay = optional_f64_column(df, "decay_rate")?;
    let outliers = f64_column(df, ARTIFACT, "outlier_ratio")?;
    let completion = optional_f64_column(df, "completion_rate")?;
    let mean_delta = f64_column(df, ARTIFACT, "mean_delta")?;
    let delta_variance = f64_column(df, ARTIFACT, "delta_variance")?;
    let best_delta = f64_column(df, ARTIFACT, "best_delta")?;
    let worst_delta = f64_column(df, ARTIFACT, "worst_delta")?;
    let median_delta = f64_column(df, ARTIFACT, "median_delta")?;
    let delta_decay = optional_f64_column(df, "delta_decay_rate")?;

    Ok((0..df.height())
        .map(|i| DriverSeasonFeatures {
            driver_id: drivers[i].clone(),
            season: seasons[i],
            lap_count: lap_counts[i] as usize,
            finished: finished[i],
            mean_zscore: mean[i],
            zscore_variance: variance[i],
            best_zscore: best[i],
            worst_zscore: worst[i],
            median_zscore: median[i],
            decay_rate: decay[i],
            outlier_ratio: outliers[i],
            completion_rate: completion[i],
            relative_delta: DeltaFeatures {
                mean: mean_delta[i],
                variance: delta_variance[i],
                best: best_delta[i],
                worst: worst_delta[i],
                median: median_delta[i],
                decay_rate: delta_decay[i],
            },
        })
        .collect())
}

pub fn targets_to_frame(targets: &[GroundTruth]) -> PolarsResult<DataFrame> {
    DataFrame::new(vec![
        Series::new("season", targets.iter().map(|t| t.season).collect::<Vec<i32>>()),
        Series::new(
            "driver_id",
            targets.iter().map(|t| t.driver_id.as_str()).collect::<Vec<&str>>(),
        ),
        Series::new("target", targets.iter().map(|t| t.target).collect::<Vec<f64>>()),
    ])
}

pub fn targets_from_frame(df: &DataFrame) -> Result<Vec<GroundTruth>, StoreError> {
    const ARTIFACT: &str = "targets";
    let seasons = i32_column(df, ARTIFACT, "season")?;
    let drivers = str_column(df, ARTIFACT, "driver_id")?;
    let values = f64_column(df, ARTIFACT, "target")?;

    Ok(seasons
        .into_iter()
        .zip(drivers)
        .zip(values)
        .map(|((season, driver_id), target)| GroundTruth { season, driver_id, target })
        .collect())
}

pub fn ranking_to_frame(entries: &[DriverRankingEntry]) -> PolarsResult<DataFrame> {
    DataFrame::new(vec![
        Series::new("rank", entries.iter().map(|e| e.rank as u64).collect::<Vec<u64>>()),
        Series::new(
            "driver_id",
            entries.iter().map(|e| e.driver_id.as_str()).collect::<Vec<&str>>(),
        ),
        Series::new(
            "aggregate_score",
            entries.iter().map(|e| e.aggregate_score).collect::<Vec<f64>>(),
        ),
        Series::new(
            "model_score",
            entries.iter().map(|e| e.model_score).collect::<Vec<f64>>(),
        ),
        Series::new(
            "ground_truth",
            entries.iter().map(|e| e.ground_truth).collect::<Vec<Option<f64>>>(),
        ),
        Series::new(
            "seasons_considered",
            entries
                .iter()
                .map(|e| format_seasons(&e.seasons_considered))
                .collect::<Vec<String>>(),
        ),
        Series::new(
            "low_confidence",
            entries.iter().map(|e| e.low_confidence).collect::<Vec<bool>>(),
        ),
    ])
}

pub fn ranking_from_frame(df: &DataFrame) -> Result<Vec<DriverRankingEntry>, StoreError> {
    const ARTIFACT: &str = "ranking";
    let ranks = u64_column(df, ARTIFACT, "rank")?;
    let drivers = str_column(df, ARTIFACT, "driver_id")?;
    let aggregate = f64_column(df, ARTIFACT, "aggregate_score")?;
    let model = f64_column(df, ARTIFACT, "model_score")?;
    let truth = optional_f64_column(df, "ground_truth")?;
    let seasons = str_column(df, ARTIFACT, "seasons_considered")?;
    let low_confidence = bool_column(df, ARTIFACT, "low_confidence")?;

    (0..df.height())
        .map(|i| {
            let seasons_considered = parse_seasons(&seasons[i]).map_err(|e| StoreError::Malformed {
                artifact: ARTIFACT,
                reason: e.to_string(),
            })?;
            Ok(DriverRankingEntry {
                driver_id: drivers[i].clone(),
                aggregate_score: aggregate[i],
                seasons_considered,
                rank: ranks[i] as usize,
                model_score: model[i],
                ground_truth: truth[i],
                low_confidence: low_confidence[i],
            })
        })
        .collect()
}

fn lap_columns<'a>(laps: impl Iterator<Item = &'a LapRecord> + Clone) -> Vec<Series> {
    vec![
        Series::new("season", laps.clone().map(|l| l.season).collect::<Vec<i32>>()),
        Series::new(
            "driver_id",
            laps.clone().map(|l| l.driver_id.as_str()).collect::<Vec<&str>>(),
        ),
        Series::new("lap_number", laps.clone().map(|l| l.lap_number).collect::<Vec<u32>>()),
        Series::new(
            "lap_time_seconds",
            laps.clone().map(|l| l.lap_time_seconds).collect::<Vec<f64>>(),
        ),
        Series::new("finished", laps.map(|l| l.finished).collect::<Vec<bool>>()),
    ]
}

fn read_laps(df: &DataFrame, artifact: &'static str) -> Result<Vec<LapRecord>, StoreError> {
    let seasons = i32_column(df, artifact, "season")?;
    let drivers = str_column(df, artifact, "driver_id")?;
    let lap_numbers = u32_column(df, artifact, "lap_number")?;
    let times = f64_column(df, artifact, "lap_time_seconds")?;
    let finished = bool_column(df, artifact, "finished")?;

    Ok((0..df.height())
        .map(|i| LapRecord {
            season: seasons[i],
            driver_id: drivers[i].clone(),
            lap_number: lap_numbers[i],
            lap_time_seconds: times[i],
            finished: finished[i],
        })
        .collect())
}

// Integer columns are cast on read so that files written by other tools
// with a wider or signed type still load.

fn i32_column(df: &DataFrame, artifact: &'static str, column: &'static str) -> Result<Vec<i32>, StoreError> {
    let series = df.column(column)?.cast(&DataType::Int32)?;
    let values = series.i32()?;
    values
        .into_iter()
        .map(|v| v.ok_or(StoreError::NullValue { artifact, column }))
        .collect()
}

fn u32_column(df: &DataFrame, artifact: &'static str, column: &'static str) -> Result<Vec<u32>, StoreError> {
    let series = df.column(column)?.cast(&DataType::UInt32)?;
    let values = series.u32()?;
    values
        .into_iter()
        .map(|v| v.ok_or(StoreError::NullValue { artifact, column }))
        .collect()
}

fn u64_column(df: &DataFrame, artifact: &'static str, column: &'static str) -> Result<Vec<u64>, StoreError> {
    let series = df.column(column)?.cast(&DataType::UInt64)?;
    let values = series.u64()?;
    values
        .into_iter()
        .map(|v| v.ok_or(StoreError::NullValue { artifact, column }))
        .collect()
}

fn f64_column(df: &DataFrame, artifact: &'static str, column: &'static str) -> Result<Vec<f64>, StoreError> {
    let values = df.column(column)?.f64()?;
    values
        .into_iter()
        .map(|v| v.ok_or(StoreError::NullValue { artifact, column }))
        .collect()
}

fn optional_f64_column(df: &DataFrame, column: &str) -> Result<Vec<Option<f64>>, StoreError> {
    Ok(df.column(column)?.f64()?.into_iter().collect())
}

fn bool_column(df: &DataFrame, artifact: &'static str, column: &'static str) -> Result<Vec<bool>, StoreError> {
    let values = df.column(column)?.bool()?;
    values
        .into_iter()
        .map(|v| v.ok_or(StoreError::NullValue { artifact, column }))
        .collect()
}

fn str_column(df: &DataFrame, artifact: &'static str, column: &'static str) -> Result<Vec<String>, StoreError> {
    let values = df.column(column)?.str()?;
    values
        .into_iter()
        .map(|v| v.map(str::to_string).ok_or(StoreError::NullValue { artifact, column }))
        .collect()
}
