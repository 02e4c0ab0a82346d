use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::db::DB_FILE;
use crate::error::{Igreja360Error, Result};

/// Per-user configuration: which church this install serves and where its
/// database lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub data_dir: String,
    #[serde(default)]
    pub church_name: String,
}

fn home() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: home().join("Documents").join("igreja360").to_string_lossy().into_owned(),
            church_name: String::new(),
        }
    }
}

impl Settings {
    pub fn db_path(&self) -> PathBuf {
        Path::new(&self.data_dir).join(DB_FILE)
    }

    /// A missing or unreadable file falls back to defaults.
    pub fn read_from(path: &Path) -> Settings {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Settings::default(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "cannot read settings, using defaults");
                return Settings::default();
            }
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "malformed settings, using defaults");
            Settings::default()
        })
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json =
            serde_json::to_string_pretty(self).map_err(|e| Igreja360Error::Settings(e.to_string()))?;
        std::fs::write(path, json + "\n")?;
        tracing::debug!(path = %path.display(), "settings saved");
        Ok(())
    }
}

/// `~/.config/igreja360/settings.json`
pub fn settings_file() -> PathBuf {
    home().join(".config").join("igreja360").join("settings.json")
}

pub fn load_settings() -> Settings {
    Settings::read_from(&settings_file())
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    settings.write_to(&settings_file())
}

pub fn get_db_path() -> PathBuf {
    load_settings().db_path()
}

/// Expand a leading `~` and anchor relative paths at the working directory.
pub fn expand_path(raw: &str) -> String {
    let expanded = match raw.strip_prefix('~') {
        Some(rest) => home().join(rest.trim_start_matches('/')),
        None => PathBuf::from(raw),
    };
    let absolute = if expanded.is_relative() {
        std::env::current_dir().map(|cwd| cwd.join(&expanded)).unwrap_or(expanded)
    } else {
        expanded
    };
    absolute.to_string_lossy().into_owned()
}
