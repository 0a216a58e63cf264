//! Debounced search-as-you-type session.
//!
//! Query edits go into a `watch` slot. A worker waits until the slot has been
//! quiet for the debounce window, drops repeats of the previous query and
//! blank input, then runs the lookup. Every run gets a generation number and
//! may only publish its result while it is still the newest run, so a slow
//! stale search can never overwrite a newer state.

use crate::detail::Pokemon;
use crate::fetch::PageFetcher;
use crate::search::{FailureCategory, SearchLookup};
use crate::PageStore;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchState {
    Idle,
    Loading,
    Success(Pokemon),
    Error(String),
}

pub struct SearchSession {
    query_tx: watch::Sender<String>,
    state_tx: Arc<watch::Sender<SearchState>>,
    generation: Arc<AtomicU64>,
    worker: JoinHandle<()>,
}

impl SearchSession {
    /// Must be called from within a tokio runtime.
    pub fn new<S, F>(lookup: Arc<SearchLookup<S, F>>) -> Self
    where
        S: PageStore + 'static,
        F: PageFetcher + 'static,
    {
        Self::with_debounce(lookup, SEARCH_DEBOUNCE)
    }

    pub fn with_debounce<S, F>(lookup: Arc<SearchLookup<S, F>>, debounce: Duration) -> Self
    where
        S: PageStore + 'static,
        F: PageFetcher + 'static,
    {
        let (query_tx, query_rx) = watch::channel(String::new());
        let (state_tx, _) = watch::channel(SearchState::Idle);
        let state_tx = Arc::new(state_tx);
        let generation = Arc::new(AtomicU64::new(0));
        let worker = tokio::spawn(run_worker(
            lookup,
            query_rx,
            state_tx.clone(),
            generation.clone(),
            debounce,
        ));
        Self {
            query_tx,
            state_tx,
            generation,
            worker,
        }
    }

    pub fn on_query_change(&self, query: impl Into<String>) {
        let query = query.into();
        let blank = query.trim().is_empty();
        self.query_tx.send_replace(query);
        if blank {
            // Invalidate whatever is still in flight.
            self.generation.fetch_add(1, Ordering::SeqCst);
            self.state_tx.send_replace(SearchState::Idle);
        }
    }

    pub fn clear(&self) {
        self.on_query_change(String::new());
    }

    pub fn query(&self) -> String {
        self.query_tx.borrow().clone()
    }

    pub fn state(&self) -> SearchState {
        self.state_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SearchState> {
        self.state_tx.subscribe()
    }
}

impl Drop for SearchSession {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

async fn run_worker<S, F>(
    lookup: Arc<SearchLookup<S, F>>,
    mut query_rx: watch::Receiver<String>,
    state_tx: Arc<watch::Sender<SearchState>>,
    generation: Arc<AtomicU64>,
    debounce: Duration,
) where
    S: PageStore + 'static,
    F: PageFetcher + 'static,
{
    let mut last: Option<String> = None;
    loop {
        if query_rx.changed().await.is_err() {
            return;
        }
        // Restart the window on every edit until input goes quiet.
        loop {
            match tokio::time::timeout(debounce, query_rx.changed()).await {
                Ok(Ok(())) => continue,
                Ok(Err(_)) => return,
                Err(_) => break,
            }
        }
        let query = query_rx.borrow_and_update().clone();
        if last.as_deref() == Some(query.as_str()) {
            continue;
        }
        last = Some(query.clone());
        if query.trim().is_empty() {
            continue;
        }

        let run = generation.fetch_add(1, Ordering::SeqCst) + 1;
        state_tx.send_replace(SearchState::Loading);
        tracing::debug!(%query, run, "search started");

        let lookup = lookup.clone();
        let state_tx = state_tx.clone();
        let generation = generation.clone();
        tokio::spawn(async move {
            let next = match lookup.search(&query).await {
                Ok(pokemon) => SearchState::Success(pokemon),
                Err(e) => {
                    let category = FailureCategory::classify(&e.to_string());
                    SearchState::Error(category.user_message(&query))
                }
            };
            let published = state_tx.send_if_modified(|slot| {
                if generation.load(Ordering::SeqCst) == run {
                    *slot = next;
                    true
                } else {
                    false
                }
            });
            if !published {
                tracing::debug!(%query, run, "dropped stale search result");
            }
        });
    }
}
