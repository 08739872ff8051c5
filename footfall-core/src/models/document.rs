//! Output documents written by the report sink.

use serde::{Deserialize, Serialize};

/// A `{ total, data }` document.
///
/// `total` always equals `data.len()`; use [`Listing::new`] to keep the two
/// in step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing<T> {
    /// Number of entries in `data`.
    pub total: usize,
    /// The entries.
    pub data: Vec<T>,
}

impl<T> Listing<T> {
    /// Wraps `data`, deriving `total` from its length.
    pub fn new(data: Vec<T>) -> Self {
        Self {
            total: data.len(),
            data,
        }
    }

    /// Unwraps the entries.
    pub fn into_data(self) -> Vec<T> {
        self.data
    }
}

impl<T> Default for Listing<T> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

/// Number of visits recorded for one visitor name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitCount {
    /// Visitor display name.
    pub name: String,
    /// How many visits this name has.
    pub visits: u64,
}

impl VisitCount {
    /// Creates a count entry.
    pub fn new(name: impl Into<String>, visits: u64) -> Self {
        Self {
            name: name.into(),
            visits,
        }
    }
}
