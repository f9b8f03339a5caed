pub mod enums;
pub mod error;
pub mod quality;
pub mod structs;

// Re-export the core types to provide a clean public API.
pub use enums::{Feature, Stage, WeightingPolicy};
pub use error::CoreError;
pub use quality::{DataQualityIssue, IssueKind};
pub use structs::{
    format_seasons, parse_seasons, DeltaFeatures, DriverRankingEntry, DriverSeasonFeatures, GroundTruth,
    LapRecord, RaceResult, SeasonSummary, ZScoreRecord,
};
