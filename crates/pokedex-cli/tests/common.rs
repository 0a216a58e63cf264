#![allow(dead_code)]
use assert_cmd::Command;
use pokedex_core::{ListItem, PageCursor, PageMerge, PageStore, SqliteStore};
use std::path::PathBuf;
use tempfile::TempDir;

/// Closed loopback port: any remote call fails fast instead of hitting the network.
pub const OFFLINE_API: &str = "http://127.0.0.1:9/api/v2/";

pub struct TestEnv {
    _dir: TempDir,
    pub db: PathBuf,
    pub cfg: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = dir.path().join("config");
        std::fs::create_dir_all(cfg.join("pokedex")).expect("cfg dir");
        std::fs::write(
            cfg.join("pokedex").join("settings.toml"),
            format!("[api]\nbase_url = \"{OFFLINE_API}\"\ntimeout_ms = 2000\n"),
        )
        .expect("settings");
        let db = dir.path().join("pokedex.db");
        Self { _dir: dir, db, cfg }
    }

    pub fn bin(&self) -> Command {
        let mut cmd = Command::cargo_bin("pokedex").unwrap();
        cmd.env("XDG_CONFIG_HOME", &self.cfg);
        cmd.env_remove("RUST_LOG");
        cmd.arg("--db").arg(&self.db);
        cmd
    }

    /// Write `names` as page 0 followed by page 1, twenty per page, with
    /// cursors, the way a sync would have left them.
    pub fn seed(&self, names: &[&str]) {
        let store = SqliteStore::new_with(&self.db, true).expect("store");
        for (page, chunk) in names.chunks(20).enumerate() {
            let page = page as u32;
            let base = page as usize * 20;
            store
                .merge_page(PageMerge {
                    clear: false,
                    cursors: chunk
                        .iter()
                        .map(|n| PageCursor {
                            natural_key: n.to_string(),
                            prev_page: page.checked_sub(1),
                            next_page: Some(page + 1),
                        })
                        .collect(),
                    items: chunk
                        .iter()
                        .enumerate()
                        .map(|(i, n)| {
                            ListItem::new(*n, format!("{OFFLINE_API}pokemon/{}/", base + i + 1), page)
                        })
                        .collect(),
                })
                .expect("seed");
        }
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}
