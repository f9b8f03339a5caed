use crate::error::AcquisitionError;
use crate::formats::{format_for_season, parse_results, render_totals, results_file_name, SeasonRace};
use core_types::{LapRecord, RaceResult};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Everything read from the raw directory.
#[derive(Debug, Clone, Default)]
pub struct RawDataset {
    pub laps: Vec<LapRecord>,
    /// Official results, only for seasons that ship them. For total-time
    /// seasons the total-time file itself is the classification.
    pub results: Vec<RaceResult>,
}

impl RawDataset {
    pub fn seasons(&self) -> BTreeSet<i32> {
        self.laps.iter().map(|l| l.season).collect()
    }

    pub fn seasons_with_results(&self) -> BTreeSet<i32> {
        self.results.iter().map(|r| r.season).collect()
    }
}

/// Seasons that have at least one raw file in `dir`, recognised by the
/// `{season}_<kind>.json` naming.
pub fn discover_seasons(dir: &Path) -> Result<BTreeSet<i32>, AcquisitionError> {
    let mut seasons = BTreeSet::new();
    for entry in fs::read_dir(dir)? {
        let name = entry?.file_name();
        let Some(name) = name.to_str() else { continue };
        let Some(stem) = name.strip_suffix(".json") else { continue };
        let Some((season, _kind)) = stem.split_once('_') else { continue };
        if let Ok(season) = season.parse::<i32>() {
            seasons.insert(season);
        }
    }
    Ok(seasons)
}

/// Loads every season in `dir`, choosing the file layout by `cutoff`.
///
/// A season whose expected file is missing is skipped with a warning.
pub fn load_raw_dir(dir: &Path, cutoff: i32) -> Result<RawDataset, AcquisitionError> {
    let mut dataset = RawDataset::default();

    for season in discover_seasons(dir)? {
        let format = format_for_season(season, cutoff);
        let path = dir.join(format.file_name(season));
        if !path.is_file() {
            tracing::warn!(season, expected = %path.display(), "no raw data in the expected format, season skipped");
            continue;
        }

        let raw = fs::read_to_string(&path)?;
        let laps = format.parse(season, &path, &raw)?;
        tracing::debug!(season, format = format.kind(), records = laps.len(), "raw season loaded");

        let results_path = dir.join(results_file_name(season));
        if results_path.is_file() {
            let raw = fs::read_to_string(&results_path)?;
            dataset.results.extend(parse_results(season, &results_path, &raw)?);
        } else if !format.needs_lap_data() {
            dataset.results.extend(parse_results(season, &path, &raw)?);
        }

        dataset.laps.extend(laps);
    }

    tracing::info!(
        dir = %dir.display(),
        seasons = dataset.seasons().len(),
        laps = dataset.laps.len(),
        "raw data loaded"
    );
    Ok(dataset)
}

/// Writes one fetched race into `dir`: the season's lap file in its format,
/// plus the official classification for lap-timed seasons.
pub fn save_season(dir: &Path, race: &SeasonRace, cutoff: i32) -> Result<Vec<PathBuf>, AcquisitionError> {
    fs::create_dir_all(dir)?;
    let format = format_for_season(race.season, cutoff);

    let mut written = Vec::new();
    let path = dir.join(format.file_name(race.season));
    fs::write(&path, format.render(race)?)?;
    written.push(path);

    if format.needs_lap_data() {
        let path = dir.join(results_file_name(race.season));
        fs::write(&path, render_totals(race)?)?;
        written.push(path);
    }

    tracing::info!(season = race.season, files = written.len(), "raw season saved");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn mixed_eras_load_with_their_own_format() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("1990_total_time.json"),
            r#"{"A": {"total_time": 4800.0}, "B": {"total_time": 0}}"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("2000_laps.json"),
            r#"{"A": {"1": {"time": 80.0}, "2": {"time": 81.0}}, "B": {"1": {"time": 85.0}}}"#,
        )
        .unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let dataset = load_raw_dir(dir.path(), 1996).unwrap();

        assert_eq!(dataset.seasons(), BTreeSet::from([1990, 2000]));
        assert_eq!(dataset.laps.len(), 4);
        // The total-time file doubles as the 1990 classification; 2000 has none.
        assert_eq!(dataset.seasons_with_results(), BTreeSet::from([1990]));
    }

    #[test]
    fn season_in_the_wrong_layout_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("2000_total_time.json"), r#"{"A": {"total_time": 4800.0}}"#).unwrap();
        let dataset = load_raw_dir(dir.path(), 1996).unwrap();
        assert!(dataset.laps.is_empty());
    }

    #[test]
    fn saved_seasons_load_back() {
        let dir = tempfile::tempdir().unwrap();
        let race = SeasonRace {
            season: 2004,
            race_name: "Italian Grand Prix".to_string(),
            lap_times: BTreeMap::from([
                ("A".to_string(), BTreeMap::from([(1, 82.0), (2, 81.0)])),
                ("B".to_string(), BTreeMap::from([(1, 83.0)])),
            ]),
            totals: BTreeMap::from([("A".to_string(), Some(163.0)), ("B".to_string(), None)]),
        };
        let written = save_season(dir.path(), &race, 1996).unwrap();
        assert_eq!(written.len(), 2);

        let dataset = load_raw_dir(dir.path(), 1996).unwrap();
        assert_eq!(dataset.laps.len(), 3);
        assert_eq!(dataset.results.len(), 2);
    }
}
