use pokedex_core::detail::DEFAULT_IMAGE_BASE_URL;
use pokedex_core::http::DEFAULT_BASE_URL;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub storage: Storage,
    #[serde(default)]
    pub api: Api,
    /// Tracing filter used when `RUST_LOG` is unset, e.g. "info" or "pokedex_core=debug".
    pub log_level: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum Storage {
    Sqlite { db_path: Option<PathBuf> },
    Memory,
}

impl Default for Storage {
    fn default() -> Self {
        Storage::Sqlite { db_path: None }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Api {
    pub base_url: String,
    pub image_base_url: String,
    pub timeout_ms: u64,
}

impl Default for Api {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            image_base_url: DEFAULT_IMAGE_BASE_URL.to_string(),
            timeout_ms: 15_000,
        }
    }
}

impl Api {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

pub fn config_dir() -> PathBuf {
    if let Some(bd) = directories::BaseDirs::new() {
        bd.config_dir().join("pokedex")
    } else {
        PathBuf::from("./.config/pokedex")
    }
}

pub fn settings_path() -> PathBuf {
    config_dir().join("settings.toml")
}

pub fn default_db_path() -> PathBuf {
    config_dir().join("pokedex.db")
}

/// A missing file yields the defaults; an unparsable one is an error the
/// caller may choose to ignore.
pub fn load_settings() -> Result<Settings, toml::de::Error> {
    match std::fs::read_to_string(settings_path()) {
        Ok(s) => toml::from_str(&s),
        Err(_) => Ok(Settings::default()),
    }
}
