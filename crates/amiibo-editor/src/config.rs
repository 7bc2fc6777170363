//! Persisted editor configuration, stored as plain JSON.
//!
//! Only paths and display choices live here. Key bytes and region
//! descriptors are always passed to the core explicitly; this module just
//! tells the caller where to find them.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::keystore;
use crate::session::SaveOptions;

// ── Configuration ──────────────────────────────────────────────────

/// Editor configuration.
///
/// Persisted to `{config_dir}/config.json`. Every field has a default, so
/// partial or missing files load cleanly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EditorConfig {
    /// Explicit key files (one combined file or two separate files).
    #[serde(default)]
    pub key_paths: Vec<PathBuf>,

    /// Region definition file (`.txt` or `.json`).
    #[serde(default)]
    pub region_path: Option<PathBuf>,

    /// Front-end colour theme name.
    #[serde(default = "default_theme")]
    pub theme: String,

    /// Whether saving shuffles the serial number by default.
    #[serde(default = "default_shuffle")]
    pub shuffle_serial_on_save: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            key_paths: Vec::new(),
            region_path: None,
            theme: default_theme(),
            shuffle_serial_on_save: default_shuffle(),
        }
    }
}

fn default_theme() -> String {
    "DarkBlue3".into()
}
const fn default_shuffle() -> bool {
    true
}

/// Format of a region definition file, by extension.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum RegionFormat {
    /// Plain-text region list.
    Txt,
    /// JSON region list.
    Json,
}

/// Region files looked for in the resources directory, in order.
const DEFAULT_REGION_FILES: [&str; 2] = ["regions.json", "regions.txt"];

// ── Resolution ─────────────────────────────────────────────────────

impl EditorConfig {
    /// Key files to load: the configured ones if they all exist, otherwise
    /// the default layout in `resources_dir`.
    #[must_use]
    pub fn resolve_key_paths(&self, resources_dir: &Path) -> Option<Vec<PathBuf>> {
        if !self.key_paths.is_empty() && self.key_paths.iter().all(|p| p.is_file()) {
            return Some(self.key_paths.clone());
        }
        keystore::default_key_paths(resources_dir)
    }

    /// Region file to load: the configured one if it exists, otherwise
    /// `regions.json` or `regions.txt` in `resources_dir`.
    #[must_use]
    pub fn resolve_region_path(&self, resources_dir: &Path) -> Option<PathBuf> {
        if let Some(path) = self.region_path.as_ref().filter(|p| p.is_file()) {
            return Some(path.clone());
        }
        DEFAULT_REGION_FILES
            .iter()
            .map(|name| resources_dir.join(name))
            .find(|p| p.is_file())
    }

    /// Format of the configured region file.
    #[must_use]
    pub fn region_format(&self) -> Option<RegionFormat> {
        let ext = self.region_path.as_ref()?.extension()?.to_str()?;
        if ext.eq_ignore_ascii_case("json") {
            Some(RegionFormat::Json)
        } else if ext.eq_ignore_ascii_case("txt") {
            Some(RegionFormat::Txt)
        } else {
            None
        }
    }

    /// Save options implied by this configuration.
    #[must_use]
    pub const fn save_options(&self) -> SaveOptions {
        SaveOptions {
            shuffle_serial: self.shuffle_serial_on_save,
        }
    }
}

// ── File I/O ───────────────────────────────────────────────────────

const CONFIG_FILE: &str = "config.json";

impl EditorConfig {
    /// Load configuration from `{config_dir}/config.json`.
    ///
    /// Returns [`Default::default()`] when the file is missing or
    /// contains invalid JSON.
    #[must_use]
    pub fn load(config_dir: &Path) -> Self {
        let path = config_dir.join(CONFIG_FILE);
        fs::read_to_string(&path).map_or_else(
            |_| Self::default(),
            |contents| {
                serde_json::from_str(&contents).unwrap_or_else(|err| {
                    tracing::warn!(path = %path.display(), %err, "config unreadable, using defaults");
                    Self::default()
                })
            },
        )
    }

    /// Persist configuration to `{config_dir}/config.json`.
    ///
    /// Writes to `.config.json.tmp`, then renames over the target.
    ///
    /// # Errors
    ///
    /// Returns an `io::Error` if the directory does not exist or the
    /// file system rejects the write/rename.
    pub fn save(&self, config_dir: &Path) -> std::io::Result<()> {
        let path = config_dir.join(CONFIG_FILE);
        let tmp = config_dir.join(".config.json.tmp");

        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        fs::write(&tmp, &json)?;
        fs::rename(&tmp, &path)?;

        Ok(())
    }
}

// ── Tests ──────────────────────────────────────────────────────────
