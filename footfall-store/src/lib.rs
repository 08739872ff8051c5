// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Footfall Store
//!
//! Persists the report documents produced by a pull.
//!
//! - **Persistence**: JSON file helpers with temp-file + rename writes
//! - **ReportWriter**: writes `data.json`, `filtered-data.json` and
//!   `visits.json` together or not at all
//!
//! ## Usage
//!
//! ```ignore
//! use footfall_store::ReportWriter;
//!
//! let writer = ReportWriter::new("data");
//! writer.write_all(&reports).await?;
//! ```

pub mod error;
pub mod persistence;
pub mod writer;

pub use error::StoreError;
pub use persistence::{Replacement, StagedFile, ensure_dir, load_json, save_json, stage_json};
pub use writer::{DEFAULT_OUTPUT_DIR, OutputPaths, ReportWriter, read_listing};

#[cfg(test)]
mod persistence_tests;
