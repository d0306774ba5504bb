//! Tool settings, loaded from TOML.
//!
//! Resolution order:
//! 1. an explicit `--config <path>` (must exist)
//! 2. `<config dir>/coref-markup/config.toml` when present
//! 3. built-in defaults
//!
//! Every field is optional in the file; missing fields keep their default.
//!
//! ```toml
//! context_len = 48
//! comment_separator = " | "
//! ```

use crate::error::{Error, Result};
use crate::merge::MergeConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings shared by every command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Characters of context shown on each side of a span in reports
    pub context_len: usize,
    /// Spans shown when naming an entity
    pub label_max_spans: usize,
    /// Width of report section separators
    pub separator_width: usize,
    /// Smoothing term of LEA divisions
    pub epsilon: f64,
    /// Joins several comments on one span in the output `diff`
    pub comment_separator: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            context_len: 32,
            label_max_spans: 3,
            separator_width: 120,
            epsilon: crate::eval::EPSILON,
            comment_separator: "; ".to_string(),
        }
    }
}

impl Settings {
    /// Parse settings from TOML text.
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::config(e.to_string()))
    }

    /// Read settings from a TOML file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("Failed to read {}: {}", path.display(), e)))?;
        Self::from_toml(&text).map_err(|e| Error::config(format!("{}: {}", path.display(), e)))
    }

    /// `<config dir>/coref-markup/config.toml`, if the platform has a config dir.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut dir| {
            dir.push("coref-markup");
            dir.push("config.toml");
            dir
        })
    }

    /// Load from `explicit`, else from the default location, else defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            log::debug!("Loading settings from {}", path.display());
            return Self::from_path(path);
        }
        match Self::default_path() {
            Some(path) if path.is_file() => {
                log::debug!("Loading settings from {}", path.display());
                Self::from_path(path)
            }
            _ => Ok(Self::default()),
        }
    }

    /// Serialize as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| Error::config(e.to_string()))
    }

    /// Merge engine settings.
    #[must_use]
    pub fn merge_config(&self) -> MergeConfig {
        MergeConfig {
            label_max_spans: self.label_max_spans,
        }
    }
}
