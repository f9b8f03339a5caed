use crate::error::StoreError;
use crate::frames;
use core_types::{
    DriverRankingEntry, DriverSeasonFeatures, GroundTruth, LapRecord, SeasonSummary, ZScoreRecord,
};
use polars::prelude::*;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

/// The files a pipeline run produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    Laps,
    ZScores,
    SeasonSummary,
    Features,
    Targets,
    Model,
    Ranking,
    RankingJson,
}

impl Artifact {
    pub fn file_name(&self) -> &'static str {
        match self {
            Artifact::Laps => "laps.parquet",
            Artifact::ZScores => "zscores.parquet",
            Artifact::SeasonSummary => "season_summary.parquet",
            Artifact::Features => "features.parquet",
            Artifact::Targets => "targets.parquet",
            Artifact::Model => "model.json",
            Artifact::Ranking => "ranking.parquet",
            Artifact::RankingJson => "ranking.json",
        }
    }
}

/// Reads and writes stage artifacts in one directory.
#[derive(Debug, Clone)]
pub struct FlatFileStore {
    root: PathBuf,
}

impl FlatFileStore {
    /// Opens the store, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, artifact: Artifact) -> PathBuf {
        self.root.join(artifact.file_name())
    }

    pub fn exists(&self, artifact: Artifact) -> bool {
        self.path(artifact).is_file()
    }

    pub fn save_laps(&self, laps: &[LapRecord]) -> Result<(), StoreError> {
        let mut df = frames::laps_to_frame(laps)?;
        self.write_parquet(Artifact::Laps, &mut df)
    }

    pub fn load_laps(&self) -> Result<Vec<LapRecord>, StoreError> {
        frames::laps_from_frame(&self.read_parquet(Artifact::Laps)?)
    }

    pub fn save_zscores(&self, records: &[ZScoreRecord]) -> Result<(), StoreError> {
        let mut df = frames::zscores_to_frame(records)?;
        self.write_parquet(Artifact::ZScores, &mut df)
    }

    pub fn load_zscores(&self) -> Result<Vec<ZScoreRecord>, StoreError> {
        frames::zscores_from_frame(&self.read_parquet(Artifact::ZScores)?)
    }

    pub fn save_season_summaries(&self, summaries: &[SeasonSummary]) -> Result<(), StoreError> {
        let mut df = frames::summaries_to_frame(summaries)?;
        self.write_parquet(Artifact::SeasonSummary, &mut df)
    }

    pub fn load_season_summaries(&self) -> Result<Vec<SeasonSummary>, StoreError> {
        frames::summaries_from_frame(&self.read_parquet(Artifact::SeasonSummary)?)
    }

    pub fn save_features(&self, rows: &[DriverSeasonFeatures]) -> Result<(), StoreError> {
        let mut df = frames::features_to_frame(rows)?;
        self.write_parquet(Artifact::Features, &mut df)
    }

    pub fn load_features(&self) -> Result<Vec<DriverSeasonFeatures>, StoreError> {
        frames::features_from_frame(&self.read_parquet(Artifact::Features)?)
    }

    pub fn save_targets(&self, targets: &[GroundTruth]) -> Result<(), StoreError> {
        let mut df = frames::targets_to_frame(targets)?;
        self.write_parquet(Artifact::Targets, &mut df)
    }

    pub fn load_targets(&self) -> Result<Vec<GroundTruth>, StoreError> {
        frames::targets_from_frame(&self.read_parquet(Artifact::Targets)?)
    }

    /// Writes the ranking both as Parquet and as pretty-printed JSON.
    pub fn save_ranking(&self, entries: &[DriverRankingEntry]) -> Result<(), StoreError> {
        let mut df = frames::ranking_to_frame(entries)?;
        self.write_parquet(Artifact::Ranking, &mut df)?;

        let path = self.path(Artifact::RankingJson);
        let writer = BufWriter::new(File::create(&path)?);
        serde_json::to_writer_pretty(writer, entries)?;
        tracing::debug!(path = %path.display(), "ranking JSON written");
        Ok(())
    }

    pub fn load_ranking(&self) -> Result<Vec<DriverRankingEntry>, StoreError> {
        frames::ranking_from_frame(&self.read_parquet(Artifact::Ranking)?)
    }

    pub fn load_ranking_json(&self) -> Result<Vec<DriverRankingEntry>, StoreError> {
        let path = self.existing(Artifact::RankingJson)?;
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    fn existing(&self, artifact: Artifact) -> Result<PathBuf, StoreError> {
        let path = self.path(artifact);
        if path.is_file() {
            Ok(path)
        } else {
            Err(StoreError::MissingArtifact { path })
        }
    }

    fn write_parquet(&self, artifact: Artifact, df: &mut DataFrame) -> Result<(), StoreError> {
        let path = self.path(artifact);
        let mut file = File::create(&path)?;
        ParquetWriter::new(&mut file).finish(df)?;
        tracing::info!(path = %path.display(), rows = df.height(), "artifact written");
        Ok(())
    }

    fn read_parquet(&self, artifact: Artifact) -> Result<DataFrame, StoreError> {
        let path = self.existing(artifact)?;
        let file = File::open(&path)?;
        let df = ParquetReader::new(file).finish()?;
        tracing::debug!(path = %path.display(), rows = df.height(), "artifact read");
        Ok(df)
    }
}
