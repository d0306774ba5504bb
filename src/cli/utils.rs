//! Utility functions for CLI commands

use std::path::{Path, PathBuf};

use crate::config::Settings;
use crate::provenance::DiffCollector;
use coref_markup_core::Markup;

/// Load settings from `--config` or the default location.
pub fn load_settings(path: Option<&Path>) -> Result<Settings, String> {
    Settings::load(path).map_err(|e| e.to_string())
}

/// Read and validate one markup file.
pub fn read_markup(path: &Path) -> Result<Markup, String> {
    Markup::from_path(path).map_err(|e| format!("Failed to read {}: {}", path.display(), e))
}

/// Read every version, in argument order.
pub fn read_markups(paths: &[PathBuf]) -> Result<Vec<Markup>, String> {
    paths.iter().map(|p| read_markup(p)).collect()
}

/// Attach the surviving provenance comments and write the markup.
pub fn write_with_diff(
    mut markup: Markup,
    diff: &DiffCollector,
    settings: &Settings,
    path: &Path,
) -> Result<(), String> {
    markup.diff = diff.entries_for(&markup, &settings.comment_separator);
    log::debug!("Writing {} entities, {} diff entries to {}", markup.len(), markup.diff.len(), path.display());
    markup
        .write_to_path(path)
        .map_err(|e| format!("Failed to write to {}: {}", path.display(), e))
}
