//! Report derivation over a fetched visit collection.
//!
//! Everything here is a pure function of its inputs. "Today" is passed in
//! rather than read from the clock so reports can be reproduced.

use std::collections::{BTreeMap, HashSet};

use chrono::{Datelike, NaiveDate, Utc, Weekday};

use crate::models::{Listing, Visit, VisitCount};

/// Returns today's date in UTC.
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Returns true if a visit belongs in the filtered report.
///
/// Weekend visits, visits dated `today` and visits whose date cannot be
/// read are excluded.
pub fn is_reportable(visit: &Visit, today: NaiveDate) -> bool {
    visit
        .day()
        .is_some_and(|day| !matches!(day.weekday(), Weekday::Sat | Weekday::Sun) && day != today)
}

/// Keeps weekday visits not dated `today`, collapsing repeated ids.
///
/// The first occurrence of each id wins.
pub fn filter_visits(visits: &[Visit], today: NaiveDate) -> Vec<Visit> {
    let mut seen = HashSet::new();
    visits
        .iter()
        .filter(|visit| is_reportable(visit, today))
        .filter(|visit| seen.insert(visit.id.clone()))
        .cloned()
        .collect()
}

/// Counts visits per name, sorted by name.
pub fn count_visits(visits: &[Visit]) -> Vec<VisitCount> {
    let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
    for visit in visits {
        *counts.entry(visit.name.as_str()).or_default() += 1;
    }

    counts
        .into_iter()
        .map(|(name, visits)| VisitCount::new(name, visits))
        .collect()
}

// ============================================================================
// Report Bundle
// ============================================================================

/// The three documents produced from one pull.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reports {
    /// Everything that was fetched, duplicates included.
    pub raw: Listing<Visit>,
    /// Weekday, not-today, de-duplicated visits.
    pub filtered: Listing<Visit>,
    /// Visit counts per name over the filtered set.
    pub visits: Listing<VisitCount>,
}

impl Reports {
    /// Derives all reports from a fetched collection.
    pub fn derive(visits: Vec<Visit>, today: NaiveDate) -> Self {
        let filtered = filter_visits(&visits, today);
        let counts = count_visits(&filtered);

        Self {
            raw: Listing::new(visits),
            filtered: Listing::new(filtered),
            visits: Listing::new(counts),
        }
    }
}
