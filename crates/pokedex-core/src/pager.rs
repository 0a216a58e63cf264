//! Pull-based scrolling session on top of [`PageSynchronizer`].
//!
//! The consumer asks for more rows at either edge. Past the tail the pager
//! serves rows from the local store when it can and only falls back to a
//! remote load when the store has nothing left. The window always begins at
//! the first stored row, so rows before it only come from a remote prepend.

use crate::fetch::PageFetcher;
use crate::sync::{LoadResult, LoadType, PageSynchronizer, PagingState, SessionState};
use crate::{ListItem, PageStore, StoreError, PAGE_SIZE};
use std::sync::Arc;

pub use crate::sync::LoadedPage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagingConfig {
    pub page_size: u32,
    pub prefetch_distance: usize,
    /// Rows read for the first window after a refresh.
    pub initial_load_size: usize,
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            page_size: PAGE_SIZE,
            prefetch_distance: 5,
            initial_load_size: PAGE_SIZE as usize * 2,
        }
    }
}

pub struct Pager<S, F> {
    sync: PageSynchronizer<S, F>,
    config: PagingConfig,
    pages: Vec<LoadedPage>,
    anchor: Option<usize>,
}

impl<S: PageStore, F: PageFetcher> Pager<S, F> {
    pub fn new(store: Arc<S>, fetcher: Arc<F>, config: PagingConfig) -> Self {
        Self {
            sync: PageSynchronizer::with_page_size(store, fetcher, config.page_size),
            config,
            pages: Vec::new(),
            anchor: None,
        }
    }

    pub fn config(&self) -> &PagingConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.sync.state()
    }

    pub fn pages(&self) -> &[LoadedPage] {
        &self.pages
    }

    pub fn items(&self) -> impl Iterator<Item = &ListItem> {
        self.pages.iter().flat_map(|p| p.items.iter())
    }

    pub fn len(&self) -> usize {
        self.pages.iter().map(|p| p.items.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn anchor(&self) -> Option<usize> {
        self.anchor
    }

    pub fn set_anchor(&mut self, position: usize) {
        self.anchor = Some(position);
    }

    pub fn end_reached(&self) -> bool {
        self.sync.end_reached()
    }

    pub fn start_reached(&self) -> bool {
        self.sync.start_reached()
    }

    /// Which edge, if any, the consumer is close enough to that it should
    /// load more after scrolling to `position`.
    pub fn prefetch_hint(&self, position: usize) -> Option<LoadType> {
        let len = self.len();
        if len == 0 {
            return Some(LoadType::Refresh);
        }
        if position + self.config.prefetch_distance >= len && !self.sync.end_reached() {
            Some(LoadType::Append)
        } else if position < self.config.prefetch_distance && !self.sync.start_reached() {
            Some(LoadType::Prepend)
        } else {
            None
        }
    }

    /// Rebuild the window from whatever the store already holds, e.g. when a
    /// new session opens over a warm cache.
    pub fn restore(&mut self) -> Result<usize, StoreError> {
        let store = self.sync.store();
        let total = store.count()?;
        let items = store.query_page(0, total)?;
        self.pages.clear();
        if !items.is_empty() {
            self.pages.push(LoadedPage { offset: 0, items });
        }
        Ok(total)
    }

    pub async fn refresh(&mut self) -> LoadResult {
        let res = {
            let state = PagingState::new(&self.pages, self.anchor);
            self.sync.load(LoadType::Refresh, &state).await
        };
        if res.is_success() {
            self.pages.clear();
            if let Err(e) = self.read_tail(self.config.initial_load_size) {
                return LoadResult::Error(e.into());
            }
        }
        res
    }

    pub async fn load_next(&mut self) -> LoadResult {
        let read = if self.pages.is_empty() {
            self.config.initial_load_size
        } else {
            self.config.page_size as usize
        };
        match self.read_tail(read) {
            Ok(true) => {
                return LoadResult::Success {
                    end_of_pagination_reached: false,
                }
            }
            Ok(false) => {}
            Err(e) => return LoadResult::Error(e.into()),
        }
        let res = {
            let state = PagingState::new(&self.pages, self.anchor);
            self.sync.load(LoadType::Append, &state).await
        };
        if res.is_success() {
            if let Err(e) = self.read_tail(read) {
                return LoadResult::Error(e.into());
            }
        }
        res
    }

    pub async fn load_previous(&mut self) -> LoadResult {
        let before = match self.sync.store().count() {
            Ok(n) => n,
            Err(e) => return LoadResult::Error(e.into()),
        };
        let res = {
            let state = PagingState::new(&self.pages, self.anchor);
            self.sync.load(LoadType::Prepend, &state).await
        };
        if res.is_success() {
            let added = match self.sync.store().count() {
                Ok(after) => after.saturating_sub(before),
                Err(e) => return LoadResult::Error(e.into()),
            };
            if added > 0 {
                // Earlier pages sort first, so every held row moved down by `added`.
                for page in &mut self.pages {
                    page.offset += added;
                }
                if let Some(anchor) = self.anchor.as_mut() {
                    *anchor += added;
                }
                if let Err(e) = self.read_head(added) {
                    return LoadResult::Error(e.into());
                }
            }
        }
        res
    }

    fn window_end(&self) -> usize {
        self.pages
            .last()
            .map(|p| p.offset + p.items.len())
            .unwrap_or(0)
    }

    /// Append up to `limit` stored rows past the window. `Ok(false)` when the
    /// store has none.
    fn read_tail(&mut self, limit: usize) -> Result<bool, StoreError> {
        let offset = self.window_end();
        let items = self.sync.store().query_page(offset, limit)?;
        if items.is_empty() {
            return Ok(false);
        }
        self.pages.push(LoadedPage { offset, items });
        Ok(true)
    }

    /// Prepend the first `limit` stored rows as a new head page.
    fn read_head(&mut self, limit: usize) -> Result<(), StoreError> {
        let items = self.sync.store().query_page(0, limit)?;
        if !items.is_empty() {
            self.pages.insert(0, LoadedPage { offset: 0, items });
        }
        Ok(())
    }
}
