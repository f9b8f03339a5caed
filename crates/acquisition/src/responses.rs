use serde::Deserialize;

// The Ergast API mixes PascalCase containers ("MRData", "Races", "Laps")
// with camelCase leaf fields ("raceName", "driverId").

/// Envelope of every Ergast response.
#[derive(Debug, Clone, Deserialize)]
pub struct ErgastResponse {
    #[serde(rename = "MRData")]
    pub mr_data: MrData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MrData {
    /// Total number of items across all pages, as a string.
    #[serde(default)]
    pub total: String,
    #[serde(rename = "RaceTable", default)]
    pub race_table: RaceTable,
}

impl MrData {
    pub fn total(&self) -> usize {
        self.total.parse().unwrap_or(0)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RaceTable {
    #[serde(rename = "Races", default)]
    pub races: Vec<Race>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Race {
    pub season: String,
    pub round: String,
    pub race_name: String,
    #[serde(rename = "Laps", default)]
    pub laps: Vec<Lap>,
    #[serde(rename = "Results", default)]
    pub results: Vec<ResultEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Lap {
    pub number: String,
    #[serde(rename = "Timings", default)]
    pub timings: Vec<Timing>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timing {
    pub driver_id: String,
    #[serde(default)]
    pub time: String,
}

/// One classified or retired entrant from `/{season}/{round}/results`.
#[derive(Debug, Clone, Deserialize)]
pub struct ResultEntry {
    #[serde(rename = "Driver")]
    pub driver: Driver,
    #[serde(default)]
    pub status: String,
    /// Present only for drivers who finished on the lead lap.
    #[serde(rename = "Time")]
    pub time: Option<ResultTime>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResultTime {
    pub millis: Option<String>,
    #[serde(default)]
    pub time: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Driver {
    pub driver_id: String,
    #[serde(default)]
    pub given_name: String,
    #[serde(default)]
    pub family_name: String,
}

impl Driver {
    /// "Given Family", the identifier used throughout the pipeline.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.given_name, self.family_name).trim().to_string()
    }
}

/// Parses "1:23.456", "1:20:29.065" or "83.456" into seconds.
///
/// Gap strings such as "+5.123" and empty strings are not lap times.
pub fn parse_duration(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() || raw.starts_with('+') {
        return None;
    }
    let mut seconds = 0.0;
    for part in raw.split(':') {
        seconds = seconds * 60.0 + part.parse::<f64>().ok()?;
    }
    Some(seconds)
}
