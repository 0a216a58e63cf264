use crate::{CursorStore, ItemStore, ListItem, PageCursor, PageMerge, PageStore, StoreError};
use include_dir::{include_dir, Dir};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

static MIGRATIONS: Dir = include_dir!("$CARGO_MANIFEST_DIR/migrations");

#[derive(Debug, Clone)]
pub struct MigrationStatus {
    pub current: i64,
    pub latest: i64,
    pub pending: Vec<String>,
}

/// SQLite-backed item and cursor tables (`pokemon`, `remote_keys`).
pub struct SqliteStore {
    path: Option<PathBuf>,
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        Self::new_with(path, true)
    }

    pub fn new_with<P: AsRef<Path>>(path: P, auto_migrate: bool) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open(&path)?;
        let _ = conn.pragma_update(None, "journal_mode", "WAL");
        let store = Self {
            path: Some(path),
            conn: Mutex::new(conn),
        };
        store.init_with(auto_migrate)?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let store = Self {
            path: None,
            conn: Mutex::new(Connection::open_in_memory()?),
        };
        store.init_with(true)?;
        Ok(store)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn migration_files() -> Vec<&'static include_dir::File<'static>> {
        let mut files: Vec<_> = MIGRATIONS
            .files()
            .filter(|f| f.path().extension().map(|e| e == "sql").unwrap_or(false))
            .collect();
        files.sort_by_key(|f| f.path().to_path_buf());
        files
    }

    fn file_version(file: &include_dir::File<'_>) -> i64 {
        file.path()
            .file_stem()
            .and_then(|s| crate::parse_version_prefix(&s.to_string_lossy()))
            .unwrap_or(0) as i64
    }

    fn run_migrations(&self, conn: &Connection, auto: bool) -> Result<(), StoreError> {
        let current: i64 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
        for file in Self::migration_files() {
            let name = file.path().to_string_lossy().to_string();
            let ver = Self::file_version(file);
            if ver <= current {
                continue;
            }
            // A fresh database always gets the base schema, even without auto-migrate.
            if !auto && !(current == 0 && ver == 1) {
                continue;
            }
            let sql = file.contents_utf8().ok_or_else(|| StoreError::Migration {
                name: name.clone(),
                reason: "invalid utf-8".into(),
            })?;
            let tx = conn.unchecked_transaction()?;
            tx.execute_batch(sql)?;
            tx.execute_batch(&format!("PRAGMA user_version = {}", ver))?;
            tx.commit()?;
            tracing::debug!(migration = %name, version = ver, "applied migration");
        }
        Ok(())
    }

    fn init_with(&self, auto_migrate: bool) -> Result<(), StoreError> {
        let conn = self.conn.lock()?;
        let _ = conn.busy_timeout(std::time::Duration::from_millis(5000));
        self.run_migrations(&conn, auto_migrate)
    }

    pub fn migrate_all(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock()?;
        self.run_migrations(&conn, true)
    }

    pub fn migration_status(&self) -> Result<MigrationStatus, StoreError> {
        let conn = self.conn.lock()?;
        let current: i64 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
        let files = Self::migration_files();
        let latest = files.last().map(|f| Self::file_version(f)).unwrap_or(0);
        let pending = files
            .iter()
            .filter(|f| Self::file_version(f) > current)
            .filter_map(|f| Some(f.path().file_name()?.to_string_lossy().to_string()))
            .collect();
        Ok(MigrationStatus {
            current,
            latest,
            pending,
        })
    }
}

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<ListItem> {
    Ok(ListItem {
        natural_key: row.get(0)?,
        source_url: row.get(1)?,
        page_index: row.get(2)?,
    })
}

/// Escape `%`, `_` and the escape char itself for a `LIKE ... ESCAPE '\'`.
fn like_pattern(needle: &str) -> String {
    let mut out = String::with_capacity(needle.len() + 2);
    out.push('%');
    for ch in needle.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('%');
    out
}

fn insert_cursors(conn: &Connection, cursors: &[PageCursor]) -> rusqlite::Result<()> {
    let mut stmt = conn.prepare_cached(
        "INSERT OR REPLACE INTO remote_keys(pokemon_name, prev_key, next_key) VALUES(?1, ?2, ?3)",
    )?;
    for c in cursors {
        stmt.execute(params![
            c.natural_key,
            c.prev_page.map(i64::from),
            c.next_page.map(i64::from)
        ])?;
    }
    Ok(())
}

fn insert_items(conn: &Connection, items: &[ListItem]) -> rusqlite::Result<()> {
    let mut stmt =
        conn.prepare_cached("INSERT OR REPLACE INTO pokemon(name, url, page) VALUES(?1, ?2, ?3)")?;
    for it in items {
        stmt.execute(params![it.natural_key, it.source_url, i64::from(it.page_index)])?;
    }
    Ok(())
}

impl CursorStore for SqliteStore {
    fn cursor(&self, natural_key: &str) -> Result<Option<PageCursor>, StoreError> {
        let conn = self.conn.lock()?;
        let mut stmt = conn.prepare_cached(
            "SELECT pokemon_name, prev_key, next_key FROM remote_keys WHERE pokemon_name = ?",
        )?;
        let opt = stmt
            .query_row([natural_key], |row| {
                Ok(PageCursor {
                    natural_key: row.get(0)?,
                    prev_page: row.get(1)?,
                    next_page: row.get(2)?,
                })
            })
            .optional()?;
        Ok(opt)
    }

    fn put_cursors(&self, cursors: &[PageCursor]) -> Result<(), StoreError> {
        let conn = self.conn.lock()?;
        let tx = conn.unchecked_transaction()?;
        insert_cursors(&tx, cursors)?;
        tx.commit()?;
        Ok(())
    }

    fn clear_cursors(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock()?;
        conn.execute("DELETE FROM remote_keys", [])?;
        Ok(())
    }
}

impl ItemStore for SqliteStore {
    fn put_items(&self, items: &[ListItem]) -> Result<(), StoreError> {
        let conn = self.conn.lock()?;
        let tx = conn.unchecked_transaction()?;
        insert_items(&tx, items)?;
        tx.commit()?;
        Ok(())
    }

    fn clear_items(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock()?;
        conn.execute("DELETE FROM pokemon", [])?;
        Ok(())
    }

    fn query_page(&self, offset: usize, limit: usize) -> Result<Vec<ListItem>, StoreError> {
        let conn = self.conn.lock()?;
        let mut stmt = conn.prepare_cached(
            "SELECT name, url, page FROM pokemon ORDER BY page ASC, rowid ASC LIMIT ?1 OFFSET ?2",
        )?;
        let rows = stmt.query_map(params![limit as i64, offset as i64], item_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn find_one(&self, needle: &str) -> Result<Option<ListItem>, StoreError> {
        let conn = self.conn.lock()?;
        let mut stmt = conn.prepare_cached(
            "SELECT name, url, page FROM pokemon WHERE name LIKE ?1 ESCAPE '\\' ORDER BY name ASC LIMIT 1",
        )?;
        let opt = stmt
            .query_row([like_pattern(needle)], item_from_row)
            .optional()?;
        Ok(opt)
    }

    fn find_all(&self, needle: &str) -> Result<Vec<ListItem>, StoreError> {
        let conn = self.conn.lock()?;
        let mut stmt = conn.prepare_cached(
            "SELECT name, url, page FROM pokemon WHERE name LIKE ?1 ESCAPE '\\' ORDER BY name ASC",
        )?;
        let rows = stmt.query_map([like_pattern(needle)], item_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn count(&self) -> Result<usize, StoreError> {
        let conn = self.conn.lock()?;
        let n: i64 = conn.query_row("SELECT COUNT(1) FROM pokemon", [], |r| r.get(0))?;
        Ok(n as usize)
    }
}

impl PageStore for SqliteStore {
    fn merge_page(&self, merge: PageMerge) -> Result<(), StoreError> {
        let conn = self.conn.lock()?;
        let tx = conn.unchecked_transaction()?;
        if merge.clear {
            tx.execute("DELETE FROM pokemon", [])?;
            tx.execute("DELETE FROM remote_keys", [])?;
        }
        insert_cursors(&tx, &merge.cursors)?;
        insert_items(&tx, &merge.items)?;
        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("mr_mime"), "%mr\\_mime%");
        assert_eq!(like_pattern("100%"), "%100\\%%");
    }

    #[test]
    fn underscore_is_literal_in_search() {
        let s = SqliteStore::open_in_memory().unwrap();
        s.put_items(&[
            ListItem::new("mr-mime", "u1", 6),
            ListItem::new("type_null", "u2", 38),
        ])
        .unwrap();
        let hits = s.find_all("e_n").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].natural_key, "type_null");
    }
}
