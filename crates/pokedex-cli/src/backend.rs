use crate::config::{self, Settings, Storage};
use anyhow::Result;
use clap::ValueEnum;
use pokedex_core::{MemStore, SqliteStore};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Sqlite,
    Memory,
}

/// Where the cache lives once flags and settings are combined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolved {
    pub backend: BackendKind,
    pub db_path: Option<PathBuf>,
}

/// `--store` beats the settings file; `--db` implies sqlite unless
/// `--store memory` was given explicitly.
pub fn resolve(settings: &Settings, db: Option<PathBuf>, store: Option<BackendKind>) -> Resolved {
    let from_settings = match &settings.storage {
        Storage::Sqlite { db_path } => (BackendKind::Sqlite, db_path.clone()),
        Storage::Memory => (BackendKind::Memory, None),
    };
    let backend = match (store, &db) {
        (Some(kind), _) => kind,
        (None, Some(_)) => BackendKind::Sqlite,
        (None, None) => from_settings.0,
    };
    let db_path = match backend {
        BackendKind::Memory => None,
        BackendKind::Sqlite => Some(
            db.or(from_settings.1)
                .unwrap_or_else(config::default_db_path),
        ),
    };
    Resolved { backend, db_path }
}

pub fn open_sqlite(path: &std::path::Path) -> Result<SqliteStore> {
    if let Some(dir) = path.parent() {
        let _ = std::fs::create_dir_all(dir);
    }
    let store = SqliteStore::new_with(path, true)?;
    tracing::debug!(path = %path.display(), "opened sqlite cache");
    Ok(store)
}

pub fn open_memory() -> MemStore {
    tracing::debug!("using in-memory cache");
    MemStore::new()
}
