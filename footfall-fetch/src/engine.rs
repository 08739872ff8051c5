//! Paginated fetch engine.
//!
//! A fixed pool of workers drains a shared FIFO of page indices. Page 1 fixes
//! the page size; any page reporting a larger total than previously seen
//! plans the extra pages. The pull finishes when no page is queued and none
//! is in flight.
//!
//! All bookkeeping lives in one [`FetchState`] behind one mutex. Workers hold
//! the lock only to take a page or to fold a response in, never across a
//! network call, so planning new pages is atomic with retiring the page that
//! discovered them.

use footfall_core::{Visit, VisitPage};
use std::collections::{BTreeSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::api::Token;
use crate::error::FetchError;
use crate::source::PageSource;

/// Default number of concurrent page fetches.
pub const DEFAULT_PARALLELISM: usize = 5;

// ============================================================================
// Configuration
// ============================================================================

/// Engine settings.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Number of concurrent workers.
    pub parallelism: usize,
}

impl EngineConfig {
    /// Creates a config with the given parallelism.
    pub fn new(parallelism: usize) -> Self {
        Self { parallelism }
    }

    /// Checks the settings.
    pub fn validate(&self) -> Result<(), FetchError> {
        if self.parallelism == 0 {
            return Err(FetchError::InvalidConfig(
                "parallelism must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new(DEFAULT_PARALLELISM)
    }
}

// ============================================================================
// Fetch State
// ============================================================================

/// What a worker should do next.
#[derive(Debug, PartialEq, Eq)]
enum Next {
    /// Fetch this page.
    Page(u32),
    /// Nothing queued yet, but pages in flight may plan more.
    Wait,
    /// Nothing queued and nothing in flight.
    Drained,
}

/// Mutable state of one pull.
#[derive(Debug)]
struct FetchState {
    visits: Vec<Visit>,
    /// Set once, from page 1.
    page_size: Option<u64>,
    /// Largest total reported so far.
    known_total: u64,
    /// Highest page index enqueued so far.
    planned_pages: u32,
    pending: VecDeque<u32>,
    /// Enqueued but not yet completed, in flight included.
    outstanding: BTreeSet<u32>,
    in_flight: usize,
    pages_fetched: u32,
}

impl FetchState {
    fn new() -> Self {
        Self {
            visits: Vec::new(),
            page_size: None,
            known_total: 0,
            planned_pages: 1,
            pending: VecDeque::from([1]),
            outstanding: BTreeSet::from([1]),
            in_flight: 0,
            pages_fetched: 0,
        }
    }

    fn next(&mut self) -> Next {
        if let Some(page) = self.pending.pop_front() {
            self.in_flight += 1;
            return Next::Page(page);
        }

        if self.in_flight == 0 {
            Next::Drained
        } else {
            Next::Wait
        }
    }

    /// Folds a fetched page in and retires it.
    ///
    /// Returns the page indices newly planned because the total grew.
    fn complete(&mut self, page: u32, fetched: VisitPage) -> Vec<u32> {
        if page == 1 && self.page_size.is_none() {
            let size = u64::try_from(fetched.len()).unwrap_or(u64::MAX).max(1);
            self.page_size = Some(size);
            self.planned_pages = self.planned_pages.max(self.pages_for(self.known_total));
        }

        let reported_total = fetched.total;
        self.visits.extend(fetched.data);
        self.pages_fetched += 1;

        let mut planned = Vec::new();
        let collected = u64::try_from(self.visits.len()).unwrap_or(u64::MAX);

        if reported_total > self.known_total && collected < reported_total {
            self.known_total = reported_total;
            let expected = self.pages_for(reported_total);

            if expected > self.planned_pages {
                planned.extend(self.planned_pages + 1..=expected);
                for &next in &planned {
                    self.pending.push_back(next);
                    self.outstanding.insert(next);
                }
                self.planned_pages = expected;
            }
        }

        self.outstanding.remove(&page);
        self.in_flight = self.in_flight.saturating_sub(1);
        planned
    }

    /// Pages needed to hold `total` visits, at least one.
    fn pages_for(&self, total: u64) -> u32 {
        let size = self.page_size.unwrap_or(1);
        u32::try_from(total.div_ceil(size).max(1)).unwrap_or(u32::MAX)
    }
}

/// State shared by the workers of one pull.
struct Shared {
    state: Mutex<FetchState>,
    wake: Notify,
    cancel: CancellationToken,
}

impl Shared {
    fn new() -> Self {
        Self {
            state: Mutex::new(FetchState::new()),
            wake: Notify::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Locks the state.
    ///
    /// A poisoned lock means a worker panicked mid-update; that panic is
    /// reported through the join set and fails the pull, so the guard is
    /// still handed out here.
    fn lock(&self) -> MutexGuard<'_, FetchState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stops every worker.
    fn abort(&self) {
        self.cancel.cancel();
        self.wake.notify_waiters();
    }
}

// ============================================================================
// Paginated Fetcher
// ============================================================================

/// Pulls every page of the visit log with bounded parallelism.
#[derive(Debug, Clone, Default)]
pub struct PaginatedFetcher {
    config: EngineConfig,
}

impl PaginatedFetcher {
    /// Creates a fetcher.
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Fetches every known page and returns all visits.
    ///
    /// Visits are returned in completion order and are not de-duplicated.
    /// The first page failure cancels the remaining work and is returned;
    /// nothing collected up to that point is kept.
    #[instrument(skip(self, token, source), fields(parallelism = self.config.parallelism))]
    pub async fn fetch_all(
        &self,
        token: &Token,
        source: Arc<dyn PageSource>,
    ) -> Result<Vec<Visit>, FetchError> {
        self.config.validate()?;

        let shared = Arc::new(Shared::new());
        let mut workers = JoinSet::new();

        for worker in 0..self.config.parallelism {
            workers.spawn(run_worker(
                worker,
                Arc::clone(&shared),
                Arc::clone(&source),
                token.clone(),
            ));
        }

        let mut failure = None;
        while let Some(joined) = workers.join_next().await {
            let outcome = joined.unwrap_or_else(|e| Err(FetchError::Worker(e.to_string())));

            if let Err(e) = outcome {
                shared.abort();
                if failure.is_none() {
                    failure = Some(e);
                }
            }
        }

        if let Some(e) = failure {
            warn!(error = %e, "Fetch failed, discarding collected visits");
            return Err(e);
        }

        if shared.cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }

        let mut state = shared.lock();
        let collected = u64::try_from(state.visits.len()).unwrap_or(u64::MAX);
        if collected < state.known_total {
            warn!(
                collected,
                total = state.known_total,
                "Queue drained with fewer visits than the last reported total"
            );
        }

        info!(
            pages = state.pages_fetched,
            visits = collected,
            total = state.known_total,
            "Fetch complete"
        );
        Ok(std::mem::take(&mut state.visits))
    }
}

/// One worker: take a page, fetch it outside the lock, fold it in, repeat.
async fn run_worker(
    worker: usize,
    shared: Arc<Shared>,
    source: Arc<dyn PageSource>,
    token: Token,
) -> Result<(), FetchError> {
    loop {
        // Register for wake-ups before looking at the queue so a
        // notification between the check and the wait is not lost.
        let notified = shared.wake.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        if shared.cancel.is_cancelled() {
            return Ok(());
        }

        let next = shared.lock().next();

        match next {
            Next::Drained => {
                shared.wake.notify_waiters();
                return Ok(());
            }
            Next::Wait => {
                tokio::select! {
                    () = notified.as_mut() => {}
                    () = shared.cancel.cancelled() => return Ok(()),
                }
            }
            Next::Page(page) => {
                debug!(worker, page, "Fetching page");

                let fetched = tokio::select! {
                    result = source.fetch_page(page, &token) => result,
                    () = shared.cancel.cancelled() => return Ok(()),
                };

                let fetched = match fetched {
                    Ok(fetched) => fetched,
                    Err(e) => {
                        shared.abort();
                        return Err(FetchError::Page {
                            page,
                            source: Box::new(e),
                        });
                    }
                };

                {
                    let mut state = shared.lock();
                    let planned = state.complete(page, fetched);

                    debug!(
                        page,
                        pages = state.planned_pages,
                        total = state.known_total,
                        collected = state.visits.len(),
                        outstanding = state.outstanding.len(),
                        "Page fetched"
                    );

                    if let (Some(first), Some(last)) = (planned.first(), planned.last()) {
                        info!(
                            first,
                            last,
                            total = state.known_total,
                            "Total grew, planned more pages"
                        );
                    }
                }

                shared.wake.notify_waiters();
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn visits(from: u64, count: u64) -> Vec<Visit> {
        (from..from + count)
            .map(|id| {
                Visit::new(
                    i64::try_from(id).unwrap(),
                    format!("Visitor #{id}"),
                    Utc.with_ymd_and_hms(2020, 9, 14, 12, 0, 0).unwrap(),
                )
            })
            .collect()
    }

    /// Serves scripted pages and records every request.
    struct ScriptedSource {
        pages: HashMap<u32, Result<VisitPage, ()>>,
        delay: Duration,
        slow: HashMap<u32, Duration>,
        calls: Mutex<Vec<u32>>,
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    impl ScriptedSource {
        fn new(pages: Vec<(u32, VisitPage)>) -> Self {
            Self {
                pages: pages.into_iter().map(|(n, p)| (n, Ok(p))).collect(),
                delay: Duration::from_millis(5),
                slow: HashMap::new(),
                calls: Mutex::new(Vec::new()),
                active: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }

        fn failing_on(mut self, page: u32) -> Self {
            self.pages.insert(page, Err(()));
            self
        }

        fn slow_on(mut self, page: u32, delay: Duration) -> Self {
            self.slow.insert(page, delay);
            self
        }

        fn calls(&self) -> Vec<u32> {
            let mut calls = self.calls.lock().unwrap().clone();
            calls.sort_unstable();
            calls
        }
    }

    #[async_trait]
    impl PageSource for ScriptedSource {
        async fn fetch_page(&self, page: u32, _token: &Token) -> Result<VisitPage, FetchError> {
            self.calls.lock().unwrap().push(page);
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            tokio::time::sleep(self.slow.get(&page).copied().unwrap_or(self.delay)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);

            match self.pages.get(&page) {
                Some(Ok(p)) => Ok(p.clone()),
                Some(Err(())) => Err(FetchError::Exhausted {
                    url: format!("scripted://visits?page={page}"),
                    attempts: 4,
                    last_error: "scripted failure".to_string(),
                }),
                None => Ok(VisitPage::default()),
            }
        }
    }

    async fn pull(source: &Arc<ScriptedSource>, parallelism: usize) -> Result<Vec<Visit>, FetchError> {
        let fetcher = PaginatedFetcher::new(EngineConfig::new(parallelism));
        let source: Arc<dyn PageSource> = source.clone();
        fetcher.fetch_all(&Token::new("t"), source).await
    }

    fn sorted_ids(visits: &[Visit]) -> Vec<String> {
        let mut ids: Vec<String> = visits.iter().map(|v| v.id.to_string()).collect();
        ids.sort();
        ids
    }

    #[tokio::test]
    async fn test_stable_total_fetches_each_page_once() {
        let source = Arc::new(ScriptedSource::new(vec![
            (1, VisitPage::new(25, visits(1, 10))),
            (2, VisitPage::new(25, visits(11, 10))),
            (3, VisitPage::new(25, visits(21, 5))),
        ]));

        let result = pull(&source, 5).await.unwrap();

        assert_eq!(result.len(), 25);
        assert_eq!(source.calls(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_growth_plans_new_pages_once() {
        let source = Arc::new(ScriptedSource::new(vec![
            (1, VisitPage::new(20, visits(1, 10))),
            (2, VisitPage::new(40, visits(11, 10))),
            (3, VisitPage::new(40, visits(21, 10))),
            (4, VisitPage::new(40, visits(31, 10))),
        ]));

        let result = pull(&source, 5).await.unwrap();

        assert_eq!(result.len(), 40);
        assert_eq!(source.calls(), vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_concurrent_growth_reports_do_not_double_enqueue() {
        // Pages 2 and 3 run together and both report the same growth.
        let source = Arc::new(ScriptedSource::new(vec![
            (1, VisitPage::new(30, visits(1, 10))),
            (2, VisitPage::new(50, visits(11, 10))),
            (3, VisitPage::new(50, visits(21, 10))),
            (4, VisitPage::new(60, visits(31, 10))),
            (5, VisitPage::new(60, visits(41, 10))),
            (6, VisitPage::new(60, visits(51, 10))),
        ]));

        let result = pull(&source, 5).await.unwrap();

        assert_eq!(result.len(), 60);
        assert_eq!(source.calls(), vec![1, 2, 3, 4, 5, 6]);
    }

    #[tokio::test]
    async fn test_smaller_total_is_ignored() {
        let source = Arc::new(ScriptedSource::new(vec![
            (1, VisitPage::new(30, visits(1, 10))),
            (2, VisitPage::new(10, visits(11, 10))),
            (3, VisitPage::new(30, visits(21, 10))),
        ]));

        let result = pull(&source, 2).await.unwrap();

        assert_eq!(result.len(), 30);
        assert_eq!(source.calls(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_zero_total_fetches_only_first_page() {
        let source = Arc::new(ScriptedSource::new(vec![(1, VisitPage::new(0, Vec::new()))]));

        let result = pull(&source, 5).await.unwrap();

        assert!(result.is_empty());
        assert_eq!(source.calls(), vec![1]);
    }

    #[tokio::test]
    async fn test_empty_first_page_uses_unit_page_size() {
        // An empty first page sets the page size to one; a total of two then
        // plans exactly one more page.
        let source = Arc::new(ScriptedSource::new(vec![
            (1, VisitPage::new(2, Vec::new())),
            (2, VisitPage::new(2, visits(1, 1))),
        ]));

        let result = pull(&source, 3).await.unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(source.calls(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_duplicates_are_kept() {
        let source = Arc::new(ScriptedSource::new(vec![
            (1, VisitPage::new(4, visits(1, 2))),
            (2, VisitPage::new(4, visits(1, 2))),
        ]));

        let result = pull(&source, 2).await.unwrap();

        assert_eq!(sorted_ids(&result), vec!["1", "1", "2", "2"]);
    }

    #[tokio::test]
    async fn test_page_failure_fails_whole_pull() {
        let source = Arc::new(
            ScriptedSource::new(vec![
                (1, VisitPage::new(50, visits(1, 10))),
                (2, VisitPage::new(50, visits(11, 10))),
                (4, VisitPage::new(50, visits(31, 10))),
                (5, VisitPage::new(50, visits(41, 10))),
            ])
            .failing_on(3)
            .slow_on(2, Duration::from_secs(10))
            .slow_on(4, Duration::from_secs(10))
            .slow_on(5, Duration::from_secs(10)),
        );

        // The slow pages are still in flight when page 3 fails; they must be
        // cancelled rather than awaited.
        let result = tokio::time::timeout(Duration::from_secs(1), pull(&source, 5))
            .await
            .expect("in-flight pages were not cancelled");

        match result {
            Err(FetchError::Page { page, source }) => {
                assert_eq!(page, 3);
                assert!(matches!(*source, FetchError::Exhausted { attempts: 4, .. }));
            }
            other => panic!("expected page failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_same_script_twice_gives_same_set() {
        let script = vec![
            (1, VisitPage::new(20, visits(1, 10))),
            (2, VisitPage::new(35, visits(11, 10))),
            (3, VisitPage::new(35, visits(21, 10))),
            (4, VisitPage::new(35, visits(31, 5))),
        ];

        let first = pull(&Arc::new(ScriptedSource::new(script.clone())), 3).await.unwrap();
        let second = pull(&Arc::new(ScriptedSource::new(script)), 3).await.unwrap();

        assert_eq!(sorted_ids(&first), sorted_ids(&second));
        assert_eq!(first.len(), 35);
    }

    #[tokio::test]
    async fn test_parallelism_bounds_concurrency() {
        let script = (1..=12)
            .map(|n| (n, VisitPage::new(120, visits(u64::from(n) * 10, 10))))
            .collect();
        let source = Arc::new(ScriptedSource::new(script));

        let result = pull(&source, 3).await.unwrap();

        assert_eq!(result.len(), 120);
        assert!(source.peak.load(Ordering::SeqCst) <= 3);
        assert_eq!(source.calls(), (1..=12).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_single_worker_drains() {
        let source = Arc::new(ScriptedSource::new(vec![
            (1, VisitPage::new(15, visits(1, 10))),
            (2, VisitPage::new(15, visits(11, 5))),
        ]));

        let result = pull(&source, 1).await.unwrap();

        assert_eq!(result.len(), 15);
    }

    #[tokio::test]
    async fn test_zero_parallelism_rejected() {
        let source = Arc::new(ScriptedSource::new(Vec::new()));
        let result = pull(&source, 0).await;
        assert!(matches!(result, Err(FetchError::InvalidConfig(_))));
        assert!(source.calls().is_empty());
    }

    // ------------------------------------------------------------------------
    // FetchState bookkeeping
    // ------------------------------------------------------------------------

    #[test]
    fn test_state_plans_from_first_page() {
        let mut state = FetchState::new();
        assert_eq!(state.next(), Next::Page(1));
        assert_eq!(state.next(), Next::Wait);

        let planned = state.complete(1, VisitPage::new(31, visits(1, 15)));

        assert_eq!(planned, vec![2, 3]);
        assert_eq!(state.page_size, Some(15));
        assert_eq!(state.known_total, 31);
        assert_eq!(state.outstanding, BTreeSet::from([2, 3]));
        assert_eq!(state.next(), Next::Page(2));
    }

    #[test]
    fn test_state_drains_when_nothing_outstanding() {
        let mut state = FetchState::new();
        assert_eq!(state.next(), Next::Page(1));

        let planned = state.complete(1, VisitPage::new(5, visits(1, 5)));

        assert!(planned.is_empty());
        assert!(state.outstanding.is_empty());
        assert_eq!(state.next(), Next::Drained);
    }

    #[test]
    fn test_state_growth_only_beyond_planned() {
        let mut state = FetchState::new();
        state.next();
        state.complete(1, VisitPage::new(20, visits(1, 10)));
        state.next();

        let planned = state.complete(2, VisitPage::new(45, visits(11, 10)));
        assert_eq!(planned, vec![3, 4, 5]);

        state.next();
        let again = state.complete(3, VisitPage::new(45, visits(21, 10)));
        assert!(again.is_empty());
        assert_eq!(state.planned_pages, 5);
    }
}
