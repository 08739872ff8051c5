//! Domain models for Footfall.
//!
//! ## Submodules
//!
//! - [`visit`] - Wire types for the visits API (Visit, VisitId, VisitDate, VisitPage)
//! - [`document`] - Output documents (Listing, VisitCount)

mod document;
mod visit;

pub use document::{Listing, VisitCount};
pub use visit::{Visit, VisitDate, VisitId, VisitPage, parse_visit_date};
