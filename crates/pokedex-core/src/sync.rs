//! Page synchronizer: reconciles the remote paged listing with the local
//! item and cursor tables.
//!
//! Every [`PageSynchronizer::load`] call resolves which page to fetch from
//! the stored [`PageCursor`] of the relevant window edge, fetches it, and
//! writes items plus cursors in one [`PageStore::merge_page`] unit. The
//! synchronizer never retries; callers decide when to call again.
//!
//! Two different "no page" outcomes are kept apart:
//! - the edge cursor says there is nothing beyond it (`prev_page`/`next_page`
//!   is `None`): the direction terminates with `end_of_pagination_reached`;
//! - there is no cursor to go on at all: success without termination, so a
//!   later call can try again.

use crate::fetch::{PageFetcher, RemoteEntry};
use crate::{Error, ListItem, PageCursor, PageMerge, PageStore, PAGE_SIZE, STARTING_PAGE};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadType {
    Refresh,
    Prepend,
    Append,
}

impl fmt::Display for LoadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LoadType::Refresh => "refresh",
            LoadType::Prepend => "prepend",
            LoadType::Append => "append",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Refreshing,
    Steady,
    AppendingForward,
    AppendingBackward,
    Terminated(Direction),
}

#[derive(Debug)]
pub enum LoadResult {
    Success { end_of_pagination_reached: bool },
    Error(Error),
}

impl LoadResult {
    pub fn is_success(&self) -> bool {
        matches!(self, LoadResult::Success { .. })
    }

    /// `Some(reached)` on success, `None` on error.
    pub fn end_of_pagination_reached(&self) -> Option<bool> {
        match self {
            LoadResult::Success {
                end_of_pagination_reached,
            } => Some(*end_of_pagination_reached),
            LoadResult::Error(_) => None,
        }
    }
}

/// A contiguous run of rows the consumer currently holds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadedPage {
    /// Row offset of `items[0]` in the store's page ordering.
    pub offset: usize,
    pub items: Vec<ListItem>,
}

/// What the consumer is looking at when it asks for a load.
#[derive(Debug, Clone, Copy)]
pub struct PagingState<'a> {
    pub anchor_position: Option<usize>,
    pub pages: &'a [LoadedPage],
}

impl<'a> PagingState<'a> {
    pub fn new(pages: &'a [LoadedPage], anchor_position: Option<usize>) -> Self {
        Self {
            anchor_position,
            pages,
        }
    }

    pub fn empty() -> PagingState<'static> {
        PagingState {
            anchor_position: None,
            pages: &[],
        }
    }

    pub fn item_count(&self) -> usize {
        self.pages.iter().map(|p| p.items.len()).sum()
    }

    pub fn first_item(&self) -> Option<&'a ListItem> {
        self.pages
            .iter()
            .find(|p| !p.items.is_empty())
            .and_then(|p| p.items.first())
    }

    pub fn last_item(&self) -> Option<&'a ListItem> {
        self.pages
            .iter()
            .rev()
            .find(|p| !p.items.is_empty())
            .and_then(|p| p.items.last())
    }

    /// Item at `position` in the flattened window, clamped to the window.
    pub fn closest_item_to_position(&self, position: usize) -> Option<&'a ListItem> {
        let mut remaining = position;
        for page in self.pages {
            if remaining < page.items.len() {
                return page.items.get(remaining);
            }
            remaining -= page.items.len();
        }
        self.last_item()
    }
}

/// Cursor bounds for items fetched on `page`.
pub fn page_bounds(page: u32, empty: bool) -> (Option<u32>, Option<u32>) {
    let prev = if page == STARTING_PAGE {
        None
    } else {
        Some(page - 1)
    };
    let next = if empty { None } else { page.checked_add(1) };
    (prev, next)
}

/// The merge unit for one fetched page.
pub fn build_merge(clear: bool, page: u32, entries: &[RemoteEntry]) -> PageMerge {
    let (prev_page, next_page) = page_bounds(page, entries.is_empty());
    PageMerge {
        clear,
        cursors: entries
            .iter()
            .map(|e| PageCursor {
                natural_key: e.name.clone(),
                prev_page,
                next_page,
            })
            .collect(),
        items: entries
            .iter()
            .map(|e| ListItem::new(e.name.clone(), e.url.clone(), page))
            .collect(),
    }
}

enum Plan {
    Fetch(u32),
    Done { end_of_pagination_reached: bool },
}

/// One pagination session. Not re-entrant: `load` takes `&mut self`.
pub struct PageSynchronizer<S, F> {
    store: Arc<S>,
    fetcher: Arc<F>,
    page_size: u32,
    state: SessionState,
    start_reached: bool,
    end_reached: bool,
}

impl<S: PageStore, F: PageFetcher> PageSynchronizer<S, F> {
    pub fn new(store: Arc<S>, fetcher: Arc<F>) -> Self {
        Self::with_page_size(store, fetcher, PAGE_SIZE)
    }

    pub fn with_page_size(store: Arc<S>, fetcher: Arc<F>, page_size: u32) -> Self {
        Self {
            store,
            fetcher,
            page_size: page_size.max(1),
            state: SessionState::Idle,
            start_reached: false,
            end_reached: false,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn start_reached(&self) -> bool {
        self.start_reached
    }

    pub fn end_reached(&self) -> bool {
        self.end_reached
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub async fn load(&mut self, load_type: LoadType, paging: &PagingState<'_>) -> LoadResult {
        tracing::debug!(%load_type, state = ?self.state, "load requested");
        let before = self.state;
        let plan = match self.plan(load_type, paging) {
            Ok(plan) => plan,
            Err(e) => {
                tracing::error!(%load_type, error = %e, "cursor lookup failed");
                self.state = before;
                return LoadResult::Error(e);
            }
        };
        let page = match plan {
            Plan::Fetch(page) => page,
            Plan::Done {
                end_of_pagination_reached,
            } => {
                self.settle(load_type, end_of_pagination_reached);
                return LoadResult::Success {
                    end_of_pagination_reached,
                };
            }
        };

        let Some(offset) = page.checked_mul(self.page_size) else {
            tracing::error!(%load_type, page, "page offset overflows");
            self.state = before;
            return LoadResult::Error(Error::PageOutOfRange(page));
        };
        tracing::debug!(%load_type, page, offset, "fetching page");
        let remote = match self.fetcher.list_page(self.page_size, offset).await {
            Ok(remote) => remote,
            Err(e) => {
                tracing::error!(%load_type, page, error = %e, "page fetch failed");
                self.state = before;
                return LoadResult::Error(e.into());
            }
        };
        let empty = remote.is_end();
        tracing::info!(%load_type, page, fetched = remote.results.len(), "fetched page");

        let merge = build_merge(load_type == LoadType::Refresh, page, &remote.results);
        if let Err(e) = self.store.merge_page(merge) {
            tracing::error!(%load_type, page, error = %e, "page merge failed");
            self.state = before;
            return LoadResult::Error(e.into());
        }
        self.settle(load_type, empty);
        LoadResult::Success {
            end_of_pagination_reached: empty,
        }
    }

    fn plan(&mut self, load_type: LoadType, paging: &PagingState<'_>) -> Result<Plan, Error> {
        match load_type {
            LoadType::Refresh => {
                self.state = SessionState::Refreshing;
                self.start_reached = false;
                self.end_reached = false;
                let cursor = match paging
                    .anchor_position
                    .and_then(|pos| paging.closest_item_to_position(pos))
                {
                    Some(item) => self.store.cursor(&item.natural_key)?,
                    None => None,
                };
                let page = cursor
                    .and_then(|c| c.next_page)
                    .map(|next| next.saturating_sub(1))
                    .unwrap_or(STARTING_PAGE);
                Ok(Plan::Fetch(page))
            }
            LoadType::Prepend => {
                self.state = SessionState::AppendingBackward;
                if self.start_reached {
                    return Ok(Plan::Done {
                        end_of_pagination_reached: true,
                    });
                }
                let Some(first) = paging.first_item() else {
                    return Ok(Plan::Done {
                        end_of_pagination_reached: false,
                    });
                };
                Ok(match self.store.cursor(&first.natural_key)? {
                    None => {
                        tracing::warn!(key = %first.natural_key, "first item has no cursor");
                        Plan::Done {
                            end_of_pagination_reached: false,
                        }
                    }
                    Some(PageCursor {
                        prev_page: None, ..
                    }) => Plan::Done {
                        end_of_pagination_reached: true,
                    },
                    Some(PageCursor {
                        prev_page: Some(prev),
                        ..
                    }) => Plan::Fetch(prev),
                })
            }
            LoadType::Append => {
                self.state = SessionState::AppendingForward;
                if self.end_reached {
                    return Ok(Plan::Done {
                        end_of_pagination_reached: true,
                    });
                }
                // Nothing loaded yet: start the catalog from its first page.
                let Some(last) = paging.last_item() else {
                    return Ok(Plan::Fetch(STARTING_PAGE));
                };
                Ok(match self.store.cursor(&last.natural_key)? {
                    None => {
                        tracing::warn!(key = %last.natural_key, "last item has no cursor");
                        Plan::Done {
                            end_of_pagination_reached: false,
                        }
                    }
                    Some(PageCursor {
                        next_page: None, ..
                    }) => Plan::Done {
                        end_of_pagination_reached: true,
                    },
                    Some(PageCursor {
                        next_page: Some(next),
                        ..
                    }) => Plan::Fetch(next),
                })
            }
        }
    }

    fn settle(&mut self, load_type: LoadType, end_of_pagination_reached: bool) {
        if !end_of_pagination_reached {
            self.state = SessionState::Steady;
            return;
        }
        let direction = match load_type {
            LoadType::Prepend => {
                self.start_reached = true;
                Direction::Backward
            }
            LoadType::Refresh | LoadType::Append => {
                self.end_reached = true;
                Direction::Forward
            }
        };
        self.state = SessionState::Terminated(direction);
    }
}
