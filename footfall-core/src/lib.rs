// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Footfall Core
//!
//! Core types and report derivation for the Footfall visit puller.
//!
//! This crate has no I/O. It provides:
//!
//! - Wire models for the visits API ([`Visit`], [`VisitId`], [`VisitPage`])
//! - Output documents ([`Listing`], [`VisitCount`])
//! - Report derivation over an already-fetched collection ([`report`])
//! - Error types
//!
//! ## Example
//!
//! ```ignore
//! use footfall_core::report::{self, Reports};
//!
//! let reports = Reports::derive(visits, report::today());
//! assert_eq!(reports.raw.total, reports.raw.data.len());
//! ```

pub mod error;
pub mod models;
pub mod report;

// Re-export error types
pub use error::CoreError;

// Re-export all model types
pub use models::{Listing, Visit, VisitCount, VisitDate, VisitId, VisitPage};

// Re-export report entry points
pub use report::{Reports, count_visits, filter_visits};
