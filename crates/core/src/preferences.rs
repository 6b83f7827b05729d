//! Persisted UI preferences.
//!
//! The frontend keeps a single `theme` key (`light` or `dark`). When the key
//! has never been written the system color scheme decides. Values live in a
//! small JSON object on disk so they survive a process restart.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{AppError, AppResult};

/// Storage key for the theme preference.
pub const THEME_KEY: &str = "theme";

/// Color theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    /// Theme implied by the system color-scheme preference.
    pub fn from_system(prefers_dark: bool) -> Self {
        if prefers_dark {
            Theme::Dark
        } else {
            Theme::Light
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(AppError::Config(format!(
                "Unknown theme '{}'. Supported: light, dark",
                other
            ))),
        }
    }
}

/// String key/value store backed by a JSON file.
#[derive(Debug)]
pub struct PreferenceStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl PreferenceStore {
    /// Open the store, reading existing values if the file exists.
    pub fn open(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref().to_path_buf();
        let values = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            if contents.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&contents)?
            }
        } else {
            BTreeMap::new()
        };

        Ok(Self { path, values })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Set a value and write the whole store back to disk.
    ///
    /// The in-memory value only changes once the write succeeds.
    pub fn set(&mut self, key: &str, value: &str) -> AppResult<()> {
        let mut values = self.values.clone();
        values.insert(key.to_string(), value.to_string());
        self.persist(&values)?;
        self.values = values;
        Ok(())
    }

    fn persist(&self, values: &BTreeMap<String, String>) -> AppResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(values)?;
        std::fs::write(&self.path, json)?;
        tracing::debug!(path = ?self.path, "Saved preferences");
        Ok(())
    }

    /// The stored theme, if any. An unreadable value counts as unset.
    pub fn stored_theme(&self) -> Option<Theme> {
        let raw = self.get(THEME_KEY)?;
        match raw.parse() {
            Ok(theme) => Some(theme),
            Err(_) => {
                tracing::warn!(value = raw, "Ignoring invalid stored theme");
                None
            }
        }
    }

    /// Effective theme: the stored value, else the system preference.
    pub fn load_theme(&self, system_prefers_dark: bool) -> Theme {
        self.stored_theme()
            .unwrap_or_else(|| Theme::from_system(system_prefers_dark))
    }

    pub fn set_theme(&mut self, theme: Theme) -> AppResult<()> {
        self.set(THEME_KEY, theme.as_str())
    }

    /// Flip the effective theme and persist the result.
    pub fn toggle_theme(&mut self, system_prefers_dark: bool) -> AppResult<Theme> {
        let next = self.load_theme(system_prefers_dark).toggled();
        self.set_theme(next)?;
        Ok(next)
    }
}
