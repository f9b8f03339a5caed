//! On-disk shapes of the raw season files.
//!
//! Seasons from the lap-timing era are stored lap by lap; earlier seasons only
//! have a total race time per driver. Both are converted to `LapRecord`s by a
//! `RawFormat` adapter picked with [`format_for_season`].

use crate::error::AcquisitionError;
use core_types::{LapRecord, RaceResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// One race as fetched from the API, keyed by driver name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeasonRace {
    pub season: i32,
    pub race_name: String,
    /// Lap number → seconds, per driver. Empty for total-time seasons.
    pub lap_times: BTreeMap<String, BTreeMap<u32, f64>>,
    /// Official total race time; `None` for drivers who were not classified
    /// on the lead lap.
    pub totals: BTreeMap<String, Option<f64>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct LapTimeEntry {
    time: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct TotalTimeEntry {
    /// Zero marks a driver who was not classified.
    total_time: f64,
}

/// Adapter between one raw file layout and `LapRecord`s.
pub trait RawFormat: Send + Sync {
    /// File-name suffix, e.g. `laps` for `2004_laps.json`.
    fn kind(&self) -> &'static str;

    fn file_name(&self, season: i32) -> String {
        format!("{season}_{}.json", self.kind())
    }

    /// Whether the per-lap endpoint has to be fetched for this format.
    fn needs_lap_data(&self) -> bool;

    fn render(&self, race: &SeasonRace) -> Result<String, serde_json::Error>;

    fn parse(&self, season: i32, path: &Path, raw: &str) -> Result<Vec<LapRecord>, AcquisitionError>;
}

/// `{ "<driver>": { "<lap>": { "time": <seconds> } } }`
#[derive(Debug, Clone, Copy, Default)]
pub struct LapTimesFormat;

impl RawFormat for LapTimesFormat {
    fn kind(&self) -> &'static str {
        "laps"
    }

    fn needs_lap_data(&self) -> bool {
        true
    }

    fn render(&self, race: &SeasonRace) -> Result<String, serde_json::Error> {
        let shaped: BTreeMap<&str, BTreeMap<u32, LapTimeEntry>> = race
            .lap_times
            .iter()
            .map(|(driver, laps)| {
                let laps = laps
                    .iter()
                    .map(|(&lap, &time)| (lap, LapTimeEntry { time }))
                    .collect();
                (driver.as_str(), laps)
            })
            .collect();
        serde_json::to_string_pretty(&shaped)
    }

    /// A driver finished when they reached the season's final lap.
    fn parse(&self, season: i32, path: &Path, raw: &str) -> Result<Vec<LapRecord>, AcquisitionError> {
        let parsed: BTreeMap<String, BTreeMap<u32, LapTimeEntry>> = from_json(path, raw)?;

        let race_distance = parsed
            .values()
            .filter_map(|laps| laps.keys().next_back())
            .max()
            .copied()
            .unwrap_or(0);

        let mut records = Vec::new();
        for (driver, laps) in parsed {
            let last_lap = laps.keys().next_back().copied().unwrap_or(0);
            let finished = last_lap == race_distance;
            records.extend(laps.into_iter().map(|(lap_number, entry)| LapRecord {
                season,
                driver_id: driver.clone(),
                lap_number,
                lap_time_seconds: entry.time,
                finished,
            }));
        }
        Ok(records)
    }
}

/// `{ "<driver>": { "total_time": <seconds> } }`
#[derive(Debug, Clone, Copy, Default)]
pub struct TotalTimeFormat;

impl RawFormat for TotalTimeFormat {
    fn kind(&self) -> &'static str {
        "total_time"
    }

    fn needs_lap_data(&self) -> bool {
        false
    }

    fn render(&self, race: &SeasonRace) -> Result<String, serde_json::Error> {
        render_totals(race)
    }

    /// Each classified driver becomes a single record covering the whole race.
    fn parse(&self, season: i32, path: &Path, raw: &str) -> Result<Vec<LapRecord>, AcquisitionError> {
        let parsed: BTreeMap<String, TotalTimeEntry> = from_json(path, raw)?;
        Ok(parsed
            .into_iter()
            .filter(|(_, entry)| entry.total_time > 0.0)
            .map(|(driver, entry)| LapRecord {
                season,
                driver_id: driver,
                lap_number: 1,
                lap_time_seconds: entry.total_time,
                finished: true,
            })
            .collect())
    }
}

/// Seasons before `cutoff` use the total-time layout.
pub fn format_for_season(season: i32, cutoff: i32) -> Box<dyn RawFormat> {
    if season >= cutoff {
        Box::new(LapTimesFormat)
    } else {
        Box::new(TotalTimeFormat)
    }
}

/// File holding the official classification of a season.
pub fn results_file_name(season: i32) -> String {
    format!("{season}_results.json")
}

/// Renders the official classification in the total-time layout.
pub fn render_totals(race: &SeasonRace) -> Result<String, serde_json::Error> {
    let shaped: BTreeMap<&str, TotalTimeEntry> = race
        .totals
        .iter()
        .map(|(driver, total)| {
            (
                driver.as_str(),
                TotalTimeEntry { total_time: total.unwrap_or(0.0) },
            )
        })
        .collect();
    serde_json::to_string_pretty(&shaped)
}

/// Parses a total-time shaped file into official results.
pub fn parse_results(season: i32, path: &Path, raw: &str) -> Result<Vec<RaceResult>, AcquisitionError> {
    let parsed: BTreeMap<String, TotalTimeEntry> = from_json(path, raw)?;
    Ok(parsed
        .into_iter()
        .map(|(driver, entry)| RaceResult {
            season,
            driver_id: driver,
            total_time_seconds: (entry.total_time > 0.0).then_some(entry.total_time),
        })
        .collect())
}

fn from_json<T: serde::de::DeserializeOwned>(path: &Path, raw: &str) -> Result<T, AcquisitionError> {
    serde_json::from_str(raw).map_err(|source| AcquisitionError::Json {
        path: path.to_path_buf(),
        source,
    })
}
