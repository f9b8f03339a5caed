//! # Lap-time feature stages
//!
//! The normalization stage turns raw lap times into per-season Z-scores and
//! the engineering stage condenses each driver's Z-score sequence for a
//! season into a fixed feature row.
//!
//! Both stages are pure: they take a slice of the previous stage's records
//! and return their own table together with the non-fatal data-quality
//! issues they ran into.

pub mod engineering;
pub mod normalize;
pub mod stats;

pub use engineering::{
    completion_rate, decay_rate, outlier_ratio, relative_delta, EngineeredFeatures, FeatureEngineer,
};
pub use normalize::{normalize_seasons, NormalizedSeasons};
