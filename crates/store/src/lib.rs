//! # Flat-file artifact store
//!
//! Every stage of the pipeline reads its input from, and writes its output
//! to, a single artifact directory. Tables are stored as Parquet through
//! `polars`; the final ranking is additionally written as JSON.
//!
//! ## Public API
//!
//! - `FlatFileStore`: typed save/load methods, one pair per artifact.
//! - `Artifact`: the fixed set of artifact files and their names.
//! - `StoreError`: the specific error types that can be returned from this crate.

pub mod error;
pub mod frames;
pub mod repository;

pub use error::StoreError;
pub use repository::{Artifact, FlatFileStore};
