use crate::error::AcquisitionError;
use crate::responses::{parse_duration, ErgastResponse};
use async_trait::async_trait;
use configuration::AcquisitionSettings;
use futures::stream::{self, StreamExt};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

pub mod error;
pub mod formats;
pub mod raw;
pub mod responses;
// --- Public API ---
pub use formats::{format_for_season, LapTimesFormat, RawFormat, SeasonRace, TotalTimeFormat};
pub use raw::{discover_seasons, load_raw_dir, save_season, RawDataset};

/// The abstract interface for a source of historical race data.
/// The fetch command only talks to this trait, so the HTTP client can be
/// swapped for a fixture in tests.
#[async_trait]
pub trait RaceDataSource: Send + Sync {
    /// Fetches the configured race of `season`. `Ok(None)` when the race was
    /// not held that year. Lap timings are only requested when `with_laps`.
    async fn fetch_race(&self, season: i32, with_laps: bool) -> Result<Option<SeasonRace>, AcquisitionError>;
}

/// A client for the Ergast-compatible F1 REST API.
#[derive(Clone)]
pub struct ErgastClient {
    client: reqwest::Client,
    base_url: String,
    circuit: String,
    page_size: u32,
    request_delay: Duration,
}

impl ErgastClient {
    pub fn new(settings: &AcquisitionSettings) -> Result<Self, AcquisitionError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            circuit: settings.circuit.clone(),
            page_size: settings.page_size,
            request_delay: Duration::from_millis(settings.request_delay_ms),
        })
    }

    async fn get(&self, path: &str, limit: u32, offset: usize) -> Result<ErgastResponse, AcquisitionError> {
        let url = format!("{}/{}.json", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .query(&[("limit", limit.to_string()), ("offset", offset.to_string())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AcquisitionError::Status { url, status: status.as_u16() });
        }
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| AcquisitionError::Deserialization(format!("{url}: {e}")))
    }

    /// Walks the paged laps endpoint until `total` timings have been seen.
    async fn fetch_lap_times(
        &self,
        season: i32,
        round: &str,
        names: &BTreeMap<String, String>,
    ) -> Result<BTreeMap<String, BTreeMap<u32, f64>>, AcquisitionError> {
        let mut lap_times: BTreeMap<String, BTreeMap<u32, f64>> = BTreeMap::new();
        let mut offset = 0usize;

        loop {
            let page = self
                .get(&format!("{season}/{round}/laps"), self.page_size, offset)
                .await?;
            let total = page.mr_data.total();
            let Some(race) = page.mr_data.race_table.races.into_iter().next() else { break };
            if race.laps.is_empty() {
                break;
            }

            for lap in race.laps {
                let Ok(lap_number) = lap.number.parse::<u32>() else {
                    tracing::warn!(season, lap = %lap.number, "unparseable lap number skipped");
                    continue;
                };
                for timing in lap.timings {
                    let (Some(name), Some(seconds)) = (names.get(&timing.driver_id), parse_duration(&timing.time)) else {
                        continue;
                    };
                    lap_times.entry(name.clone()).or_default().insert(lap_number, seconds);
                }
            }

            offset += self.page_size as usize;
            tracing::debug!(season, offset, total, "lap page fetched");
            if offset >= total {
                break;
            }
            tokio::time::sleep(self.request_delay).await;
        }

        Ok(lap_times)
    }
}

#[async_trait]
impl RaceDataSource for ErgastClient {
    async fn fetch_race(&self, season: i32, with_laps: bool) -> Result<Option<SeasonRace>, AcquisitionError> {
        let schedule = self.get(&season.to_string(), 1000, 0).await?;
        let Some(race) = schedule
            .mr_data
            .race_table
            .races
            .into_iter()
            .find(|race| race.race_name == self.circuit)
        else {
            return Ok(None);
        };
        tokio::time::sleep(self.request_delay).await;

        let classification = self
            .get(&format!("{season}/{}/results", race.round), 1000, 0)
            .await?;
        let entries = classification
            .mr_data
            .race_table
            .races
            .into_iter()
            .next()
            .map(|r| r.results)
            .unwrap_or_default();

        let mut names = BTreeMap::new();
        let mut totals = BTreeMap::new();
        for entry in entries {
            let name = entry.driver.display_name();
            let total = entry
                .time
                .as_ref()
                .and_then(|t| t.millis.as_deref())
                .and_then(|ms| ms.parse::<f64>().ok())
                .map(|ms| ms / 1000.0);
            names.insert(entry.driver.driver_id.clone(), name.clone());
            totals.insert(name, total);
        }

        let lap_times = if with_laps {
            tokio::time::sleep(self.request_delay).await;
            self.fetch_lap_times(season, &race.round, &names).await?
        } else {
            BTreeMap::new()
        };

        tracing::info!(
            season,
            race = %race.race_name,
            drivers = totals.len(),
            lapped_drivers = lap_times.len(),
            "race fetched"
        );
        Ok(Some(SeasonRace {
            season,
            race_name: race.race_name,
            lap_times,
            totals,
        }))
    }
}

/// Outcome of a multi-season download.
#[derive(Debug, Clone, Default)]
pub struct FetchSummary {
    pub saved: Vec<i32>,
    /// Seasons in which the race was not held.
    pub missing: Vec<i32>,
    pub failed: Vec<(i32, String)>,
}

/// Downloads `seasons` with at most `concurrency` requests in flight and
/// writes each one into `raw_dir`. A failing season does not stop the
/// others. `on_season` is called as each season completes.
pub async fn fetch_seasons<S, F>(
    source: &S,
    seasons: &[i32],
    raw_dir: &Path,
    cutoff: i32,
    concurrency: usize,
    on_season: F,
) -> FetchSummary
where
    S: RaceDataSource + ?Sized,
    F: Fn(i32) + Sync,
{
    let on_season = &on_season;
    let mut outcomes: Vec<(i32, Result<Option<SeasonRace>, AcquisitionError>)> = stream::iter(seasons.iter().copied())
        .map(|season| async move {
            let with_laps = format_for_season(season, cutoff).needs_lap_data();
            let outcome = source.fetch_race(season, with_laps).await;
            on_season(season);
            (season, outcome)
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;
    outcomes.sort_by_key(|(season, _)| *season);

    let mut summary = FetchSummary::default();
    for (season, outcome) in outcomes {
        match outcome.and_then(|race| race.map(|race| save_season(raw_dir, &race, cutoff)).transpose()) {
            Ok(Some(_)) => summary.saved.push(season),
            Ok(None) => {
                tracing::warn!(season, "race not found for season");
                summary.missing.push(season);
            }
            Err(e) => {
                tracing::error!(season, error = %e, "season download failed");
                summary.failed.push((season, e.to_string()));
            }
        }
    }
    summary
}
