/// Data root and persisted preferences.
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::leaderboard::DEFAULT_LIMIT;

/// Environment variable overriding the data root.
pub const DATA_DIR_ENV: &str = "POETRY_ADMIN_DATA_DIR";

const DEFAULT_DATA_DIR: &str = ".poetry-admin";

pub fn resolve_data_root() -> Result<PathBuf> {
    if let Some(dir) = env::var_os(DATA_DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }
    Ok(PathBuf::from(DEFAULT_DATA_DIR))
}

fn default_leaderboard_limit() -> usize {
    DEFAULT_LIMIT
}

/// Preferences stored globally under the data root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    /// SQLite document store used when no source is given on the command line
    #[serde(default)]
    pub store_path: Option<PathBuf>,

    /// Rows per leaderboard when `--limit` is not given
    #[serde(default = "default_leaderboard_limit")]
    pub leaderboard_limit: usize,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            store_path: None,
            leaderboard_limit: DEFAULT_LIMIT,
        }
    }
}

impl Preferences {
    fn file_in(data_root: &Path) -> PathBuf {
        data_root.join("global").join("preferences.json")
    }

    pub fn load_from(data_root: &Path) -> Result<Self> {
        let prefs_file = Self::file_in(data_root);
        if !prefs_file.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&prefs_file).context("Failed to read preferences file")?;
        let prefs: Self =
            serde_json::from_str(&contents).context("Failed to parse preferences file")?;
        Ok(prefs)
    }

    /// Save preferences to the global preferences file
    pub fn save_to(&self, data_root: &Path) -> Result<()> {
        let global_dir = data_root.join("global");
        fs::create_dir_all(&global_dir).context("Failed to create global directory")?;

        let contents =
            serde_json::to_string_pretty(self).context("Failed to serialize preferences")?;
        fs::write(Self::file_in(data_root), contents).context("Failed to write preferences file")?;
        Ok(())
    }

    /// Store path from preferences, or `{data_root}/store.db`.
    pub fn store_path_or_default(&self, data_root: &Path) -> PathBuf {
        self.store_path
            .clone()
            .unwrap_or_else(|| data_root.join("store.db"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let prefs = Preferences::load_from(dir.path()).unwrap();
        assert_eq!(prefs, Preferences::default());
        assert_eq!(prefs.leaderboard_limit, 5);
        assert_eq!(prefs.store_path_or_default(dir.path()), dir.path().join("store.db"));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let prefs = Preferences {
            store_path: Some(PathBuf::from("/srv/poetry/store.db")),
            leaderboard_limit: 10,
        };
        prefs.save_to(dir.path()).unwrap();

        assert!(dir.path().join("global/preferences.json").exists());
        assert_eq!(Preferences::load_from(dir.path()).unwrap(), prefs);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("global")).unwrap();
        std::fs::write(dir.path().join("global/preferences.json"), "{}").unwrap();

        let prefs = Preferences::load_from(dir.path()).unwrap();
        assert_eq!(prefs.leaderboard_limit, DEFAULT_LIMIT);
        assert_eq!(prefs.store_path, None);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("global")).unwrap();
        std::fs::write(dir.path().join("global/preferences.json"), "not json").unwrap();

        let err = Preferences::load_from(dir.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse preferences file"));
    }
}
