//! pokedex-core: catalog types, page/cursor storage, and the remote-backed
//! page synchronizer that keeps the local cache in step with the catalog API.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

pub mod detail;
pub mod error;
pub mod fetch;
#[cfg(feature = "http")]
pub mod http;
pub mod pager;
pub mod search;
pub mod session;
#[cfg(feature = "sqlite")]
mod sqlite;
pub mod sync;

pub use detail::{DetailLookup, Pokemon, PokemonDetail, PokemonStat};
pub use error::{Error, FetchError, Result, StoreError};
pub use fetch::{PageFetcher, RemoteEntry, RemotePage};
pub use pager::{LoadedPage, Pager, PagingConfig};
pub use search::{FailureCategory, SearchLookup};
pub use session::{SearchSession, SearchState};
pub use sync::{LoadResult, LoadType, PageSynchronizer, PagingState, SessionState};

/// Items per remote page.
pub const PAGE_SIZE: u32 = 20;
/// First page of the catalog.
pub const STARTING_PAGE: u32 = 0;

/// One catalog entry as cached locally, tagged with the page it arrived on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListItem {
    pub natural_key: String,
    pub source_url: String,
    pub page_index: u32,
}

impl ListItem {
    pub fn new<K: Into<String>, U: Into<String>>(natural_key: K, source_url: U, page_index: u32) -> Self {
        Self {
            natural_key: natural_key.into(),
            source_url: source_url.into(),
            page_index,
        }
    }
}

/// Paging anchor stored per item: which pages surround the page the item
/// came from. `prev_page == None` means the item sits on the first page,
/// `next_page == None` means the catalog ended there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageCursor {
    pub natural_key: String,
    pub prev_page: Option<u32>,
    pub next_page: Option<u32>,
}

/// Everything one fetched page writes. Applied as a single atomic unit.
#[derive(Debug, Clone, Default)]
pub struct PageMerge {
    /// Drop every item and cursor before writing (refresh).
    pub clear: bool,
    pub cursors: Vec<PageCursor>,
    pub items: Vec<ListItem>,
}

pub trait CursorStore: Send + Sync {
    fn cursor(&self, natural_key: &str) -> Result<Option<PageCursor>, StoreError>;
    fn put_cursors(&self, cursors: &[PageCursor]) -> Result<(), StoreError>;
    fn clear_cursors(&self) -> Result<(), StoreError>;
}

pub trait ItemStore: Send + Sync {
    fn put_items(&self, items: &[ListItem]) -> Result<(), StoreError>;
    fn clear_items(&self) -> Result<(), StoreError>;
    /// Rows `offset..offset + limit` ordered by ascending page, then arrival.
    fn query_page(&self, offset: usize, limit: usize) -> Result<Vec<ListItem>, StoreError>;
    /// First case-insensitive substring match on the natural key; ties go
    /// to the lexically smallest key. Case folding is ASCII only, the same
    /// as SQLite's `LIKE`, so every backend matches the same rows.
    fn find_one(&self, needle: &str) -> Result<Option<ListItem>, StoreError>;
    /// All case-insensitive substring matches, ordered by natural key.
    fn find_all(&self, needle: &str) -> Result<Vec<ListItem>, StoreError>;
    fn count(&self) -> Result<usize, StoreError>;
}

/// Item and cursor tables sharing one transactional primitive.
pub trait PageStore: ItemStore + CursorStore {
    fn init(&self) -> Result<(), StoreError> {
        Ok(())
    }
    /// Optionally clear, then upsert cursors, then upsert items, all or
    /// nothing. Readers observe either the state before or after.
    fn merge_page(&self, merge: PageMerge) -> Result<(), StoreError>;
    fn clear(&self) -> Result<(), StoreError> {
        self.merge_page(PageMerge {
            clear: true,
            ..PageMerge::default()
        })
    }
}

#[derive(Default)]
struct Tables {
    // natural key -> (arrival sequence, item)
    items: HashMap<String, (u64, ListItem)>,
    cursors: HashMap<String, PageCursor>,
    seq: u64,
}

impl Tables {
    fn upsert_items(&mut self, items: &[ListItem]) {
        for item in items {
            // Replace-on-conflict re-inserts, so the replaced row moves to the back.
            self.seq += 1;
            self.items
                .insert(item.natural_key.clone(), (self.seq, item.clone()));
        }
    }

    fn upsert_cursors(&mut self, cursors: &[PageCursor]) {
        for c in cursors {
            self.cursors.insert(c.natural_key.clone(), c.clone());
        }
    }

    fn matching(&self, needle: &str) -> Vec<ListItem> {
        let needle = needle.to_ascii_lowercase();
        let mut out: Vec<ListItem> = self
            .items
            .values()
            .filter(|(_, it)| it.natural_key.to_ascii_lowercase().contains(&needle))
            .map(|(_, it)| it.clone())
            .collect();
        out.sort_by(|a, b| a.natural_key.cmp(&b.natural_key));
        out
    }
}

/// In-memory store; both tables sit behind one lock so a merge is a single
/// critical section.
#[derive(Default)]
pub struct MemStore {
    inner: RwLock<Tables>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CursorStore for MemStore {
    fn cursor(&self, natural_key: &str) -> Result<Option<PageCursor>, StoreError> {
        let t = self.inner.read()?;
        Ok(t.cursors.get(natural_key).cloned())
    }

    fn put_cursors(&self, cursors: &[PageCursor]) -> Result<(), StoreError> {
        self.inner.write()?.upsert_cursors(cursors);
        Ok(())
    }

    fn clear_cursors(&self) -> Result<(), StoreError> {
        self.inner.write()?.cursors.clear();
        Ok(())
    }
}

impl ItemStore for MemStore {
    fn put_items(&self, items: &[ListItem]) -> Result<(), StoreError> {
        self.inner.write()?.upsert_items(items);
        Ok(())
    }

    fn clear_items(&self) -> Result<(), StoreError> {
        self.inner.write()?.items.clear();
        Ok(())
    }

    fn query_page(&self, offset: usize, limit: usize) -> Result<Vec<ListItem>, StoreError> {
        let t = self.inner.read()?;
        let mut rows: Vec<&(u64, ListItem)> = t.items.values().collect();
        rows.sort_by_key(|(seq, it)| (it.page_index, *seq));
        Ok(rows
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|(_, it)| it.clone())
            .collect())
    }

    fn find_one(&self, needle: &str) -> Result<Option<ListItem>, StoreError> {
        let t = self.inner.read()?;
        Ok(t.matching(needle).into_iter().next())
    }

    fn find_all(&self, needle: &str) -> Result<Vec<ListItem>, StoreError> {
        let t = self.inner.read()?;
        Ok(t.matching(needle))
    }

    fn count(&self) -> Result<usize, StoreError> {
        Ok(self.inner.read()?.items.len())
    }
}

impl PageStore for MemStore {
    fn merge_page(&self, merge: PageMerge) -> Result<(), StoreError> {
        let mut t = self.inner.write()?;
        if merge.clear {
            t.items.clear();
            t.cursors.clear();
        }
        t.upsert_cursors(&merge.cursors);
        t.upsert_items(&merge.items);
        Ok(())
    }
}

#[cfg(feature = "sqlite")]
pub use sqlite::{MigrationStatus, SqliteStore, SqliteStore as StoreImpl};

#[cfg(not(feature = "sqlite"))]
pub use MemStore as StoreImpl;

#[cfg_attr(not(feature = "sqlite"), allow(dead_code))]
pub(crate) fn parse_version_prefix(name: &str) -> Option<u32> {
    let digits: String = name.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        None
    } else {
        digits.parse::<u32>().ok()
    }
}
