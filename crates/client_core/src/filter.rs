use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use std::time::Duration;

use shared::domain::Order;
use tokio::{
    sync::{broadcast, mpsc},
    task::JoinHandle,
    time::{sleep_until, Instant},
};
use tracing::{debug, warn};

use crate::{error::ApiClientError, orders::OrderQueryService};

/// Quiet period before a raw filter change becomes a query.
pub const FILTER_DEBOUNCE_QUIET_PERIOD: Duration = Duration::from_millis(400);

const QUERY_CHANNEL_CAPACITY: usize = 64;

/// One issued list query. `seq` increases monotonically with issue order
/// and is the staleness key: a completed response is only worth showing if
/// no newer query has been issued meanwhile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterQuery {
    pub seq: u64,
    pub date_filter: String,
    pub search_term: String,
}

enum FilterInput {
    Search(String),
    Date(String),
    Clear,
    Refresh,
}

/// Per-stream debounce state. `raw` tracks every keystroke immediately;
/// `last_flushed` is the value that most recently survived the quiet
/// period, used to suppress no-op re-emissions.
struct DebouncedStream {
    raw: String,
    deadline: Option<Instant>,
    last_flushed: String,
}

impl DebouncedStream {
    fn new() -> Self {
        Self {
            raw: String::new(),
            deadline: None,
            last_flushed: String::new(),
        }
    }

    fn accept(&mut self, value: String, quiet: Duration) {
        self.raw = value;
        self.deadline = Some(Instant::now() + quiet);
    }

    /// Ends the quiet period; true when the settled value differs from the
    /// previously flushed one and a query should fire.
    fn flush(&mut self) -> bool {
        self.deadline = None;
        if self.raw == self.last_flushed {
            return false;
        }
        self.last_flushed = self.raw.clone();
        true
    }

    /// Marks the current raw value as flushed without waiting, for paths
    /// that bypass the quiet period.
    fn settle(&mut self) {
        self.deadline = None;
        self.last_flushed = self.raw.clone();
    }

    fn reset(&mut self) {
        self.raw.clear();
        self.deadline = None;
        self.last_flushed.clear();
    }
}

/// Converts raw search-term and date-filter change events into debounced,
/// deduplicated, sequence-numbered queries. Both input streams debounce
/// independently; either one settling triggers a query built from the
/// current values of both.
pub struct OrderFilterPipeline {
    input: mpsc::UnboundedSender<FilterInput>,
    queries: broadcast::Sender<FilterQuery>,
    issued: Arc<AtomicU64>,
    worker: JoinHandle<()>,
}

impl OrderFilterPipeline {
    pub fn new() -> Self {
        Self::with_quiet_period(FILTER_DEBOUNCE_QUIET_PERIOD)
    }

    pub fn with_quiet_period(quiet: Duration) -> Self {
        let (input, input_rx) = mpsc::unbounded_channel();
        let (queries, _) = broadcast::channel(QUERY_CHANNEL_CAPACITY);
        let issued = Arc::new(AtomicU64::new(0));
        let worker = tokio::spawn(run_pipeline(
            input_rx,
            queries.clone(),
            Arc::clone(&issued),
            quiet,
        ));
        Self {
            input,
            queries,
            issued,
            worker,
        }
    }

    pub fn search_term_changed(&self, term: impl Into<String>) {
        let _ = self.input.send(FilterInput::Search(term.into()));
    }

    pub fn date_filter_changed(&self, date: impl Into<String>) {
        let _ = self.input.send(FilterInput::Date(date.into()));
    }

    /// Resets both streams to empty and immediately issues an unfiltered
    /// query, bypassing the quiet period.
    pub fn clear_filters(&self) {
        let _ = self.input.send(FilterInput::Clear);
    }

    /// Immediately re-issues a query with the current filter values.
    /// Used for the initial load and after mutations that invalidate the
    /// displayed list.
    pub fn refresh(&self) {
        let _ = self.input.send(FilterInput::Refresh);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FilterQuery> {
        self.queries.subscribe()
    }

    /// Sequence number of the most recently issued query.
    pub fn latest_issued_seq(&self) -> u64 {
        self.issued.load(Ordering::SeqCst)
    }

    fn issued_handle(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.issued)
    }

    pub fn shutdown(&self) {
        self.worker.abort();
    }
}

impl Default for OrderFilterPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for OrderFilterPipeline {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

async fn run_pipeline(
    mut input: mpsc::UnboundedReceiver<FilterInput>,
    queries: broadcast::Sender<FilterQuery>,
    issued: Arc<AtomicU64>,
    quiet: Duration,
) {
    let mut search = DebouncedStream::new();
    let mut date = DebouncedStream::new();

    loop {
        tokio::select! {
            message = input.recv() => {
                match message {
                    None => break,
                    Some(FilterInput::Search(value)) => search.accept(value, quiet),
                    Some(FilterInput::Date(value)) => date.accept(value, quiet),
                    Some(FilterInput::Clear) => {
                        search.reset();
                        date.reset();
                        emit(&queries, &issued, &search, &date);
                    }
                    Some(FilterInput::Refresh) => {
                        search.settle();
                        date.settle();
                        emit(&queries, &issued, &search, &date);
                    }
                }
            }
            _ = deadline_elapsed(search.deadline), if search.deadline.is_some() => {
                if search.flush() {
                    emit(&queries, &issued, &search, &date);
                }
            }
            _ = deadline_elapsed(date.deadline), if date.deadline.is_some() => {
                if date.flush() {
                    emit(&queries, &issued, &search, &date);
                }
            }
        }
    }
}

async fn deadline_elapsed(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

fn emit(
    queries: &broadcast::Sender<FilterQuery>,
    issued: &AtomicU64,
    search: &DebouncedStream,
    date: &DebouncedStream,
) {
    let seq = issued.fetch_add(1, Ordering::SeqCst) + 1;
    debug!(seq, search = %search.raw, date = %date.raw, "filters: issuing query");
    let _ = queries.send(FilterQuery {
        seq,
        date_filter: date.raw.clone(),
        search_term: search.raw.clone(),
    });
}

/// The displayed result of one list query.
#[derive(Debug, Clone)]
pub enum OrderListUpdate {
    Loaded { seq: u64, orders: Vec<Order> },
    Failed { seq: u64, error: ApiClientError },
}

impl OrderListUpdate {
    pub fn seq(&self) -> u64 {
        match self {
            OrderListUpdate::Loaded { seq, .. } | OrderListUpdate::Failed { seq, .. } => *seq,
        }
    }
}

/// Applies issued queries against the order API and publishes results,
/// dropping any response that is stale by the time it completes. Requests
/// are not cancelled in flight; the sequence check is what guarantees the
/// display reflects the most recently issued query.
pub struct OrderListFeed {
    updates: broadcast::Sender<OrderListUpdate>,
    worker: JoinHandle<()>,
}

impl OrderListFeed {
    pub fn new(pipeline: &OrderFilterPipeline, orders: OrderQueryService) -> Self {
        let queries = pipeline.subscribe();
        let issued = pipeline.issued_handle();
        let (updates, _) = broadcast::channel(QUERY_CHANNEL_CAPACITY);
        let worker = tokio::spawn(run_feed(queries, issued, orders, updates.clone()));
        Self { updates, worker }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OrderListUpdate> {
        self.updates.subscribe()
    }

    pub fn shutdown(&self) {
        self.worker.abort();
    }
}

impl Drop for OrderListFeed {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

async fn run_feed(
    mut queries: broadcast::Receiver<FilterQuery>,
    issued: Arc<AtomicU64>,
    orders: OrderQueryService,
    updates: broadcast::Sender<OrderListUpdate>,
) {
    let published = Arc::new(AtomicU64::new(0));
    loop {
        let query = match queries.recv().await {
            Ok(query) => query,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "filters: feed lagged behind issued queries");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };

        let orders = orders.clone();
        let updates = updates.clone();
        let issued = Arc::clone(&issued);
        let published = Arc::clone(&published);
        tokio::spawn(async move {
            let result = orders
                .list(Some(&query.date_filter), Some(&query.search_term))
                .await;

            let newest = issued.load(Ordering::SeqCst);
            if query.seq < newest {
                debug!(
                    seq = query.seq,
                    newest, "filters: dropping stale list response"
                );
                return;
            }
            // Responses can also complete out of issue order; never let an
            // older one overwrite a newer published result.
            if published.fetch_max(query.seq, Ordering::SeqCst) > query.seq {
                debug!(seq = query.seq, "filters: dropping out-of-order list response");
                return;
            }

            let update = match result {
                Ok(orders) => OrderListUpdate::Loaded {
                    seq: query.seq,
                    orders,
                },
                Err(error) => OrderListUpdate::Failed {
                    seq: query.seq,
                    error,
                },
            };
            let _ = updates.send(update);
        });
    }
}

#[cfg(test)]
#[path = "tests/filter_tests.rs"]
mod tests;
