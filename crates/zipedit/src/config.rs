//! Persisted settings.

use crate::error::PipelineError;
use crate::reader::DEFAULT_CONFIDENCE_THRESHOLD;
use crate::safety::DEFAULT_EDITABLE_EXTENSIONS;
use crate::tool::SevenZip;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use ts_rs::TS;

const APP_DIR: &str = "zipedit";
const SETTINGS_FILE: &str = "settings.json";

/// Settings structure for persistence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export_to = "../../bindings/")]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Archiving tool binary; located automatically when unset
    #[ts(optional, type = "string")]
    pub seven_zip_path: Option<PathBuf>,

    /// Parent of the scratch directories; the OS temp dir when unset
    #[ts(optional, type = "string")]
    pub scratch_root: Option<PathBuf>,

    /// Detector confidence an entry must exceed to open as text
    pub confidence_threshold: f32,

    /// Extensions (without the dot) that may be edited
    pub editable_extensions: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            seven_zip_path: None,
            scratch_root: None,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            editable_extensions: DEFAULT_EDITABLE_EXTENSIONS
                .iter()
                .map(|e| e.to_string())
                .collect(),
        }
    }
}

impl Settings {
    pub fn scratch_root(&self) -> PathBuf {
        self.scratch_root
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }

    /// Resolve the archiving tool: this file, then `ZIPEDIT_7Z`, then `PATH`.
    pub fn tool(&self) -> Option<SevenZip> {
        SevenZip::locate(self.seven_zip_path.as_deref())
    }
}

/// Default location: `<config dir>/zipedit/settings.json`.
pub fn settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(SETTINGS_FILE))
}

/// Load settings from disk. A missing file yields defaults, as does a file
/// that fails to parse (logged).
pub async fn load_settings(path: &Path) -> Result<Settings, PipelineError> {
    if !tokio::fs::try_exists(path).await? {
        debug!(path = %path.display(), "No settings file, using defaults");
        return Ok(Settings::default());
    }

    let contents = tokio::fs::read_to_string(path).await?;

    let settings = serde_json::from_str(&contents).unwrap_or_else(|e| {
        warn!(path = %path.display(), error = %e, "Failed to parse settings file, using defaults");
        Settings::default()
    });

    Ok(settings)
}

/// Save settings to disk as pretty JSON, creating the directory.
pub async fn save_settings(path: &Path, settings: &Settings) -> Result<(), PipelineError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| PipelineError::Io(std::io::Error::other(e)))?;
    tokio::fs::write(path, json).await?;

    Ok(())
}
