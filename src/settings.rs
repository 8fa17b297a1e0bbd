//! Settings document: typed sections, load with default back-fill, save with
//! timestamped backup rotation.
//!
//! Every container carries `#[serde(default)]`, so a document missing a key at
//! any nesting depth deserializes with that key filled from the defaults. A
//! missing or unreadable file falls back to the full default document.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::error::StoreError;

pub const SETTINGS_FILE: &str = "settings.json";
const BACKUP_PREFIX: &str = "settings.backup_";
const MAX_BACKUPS: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub api_url: String,
    pub model_settings: ModelSettings,
    pub chat_display: ChatDisplay,
    pub memory_settings: MemorySettings,
    pub ui_settings: UiSettings,
    pub backup_settings: BackupSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:11434/v1".to_string(),
            model_settings: ModelSettings::default(),
            chat_display: ChatDisplay::default(),
            memory_settings: MemorySettings::default(),
            ui_settings: UiSettings::default(),
            backup_settings: BackupSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ModelSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u16,
    pub top_p: f32,
    pub frequency_penalty: f32,
    pub presence_penalty: f32,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            model: "qwen2.5:14b".to_string(),
            temperature: 0.7,
            max_tokens: 2000,
            top_p: 0.9,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChatDisplay {
    pub message_spacing: u32,
    pub max_width: u32,
    pub animate_messages: bool,
    pub show_timestamps: bool,
    pub compact_mode: bool,
}

impl Default for ChatDisplay {
    fn default() -> Self {
        Self {
            message_spacing: 20,
            max_width: 800,
            animate_messages: true,
            show_timestamps: true,
            compact_mode: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MemorySettings {
    pub buffer_size: u32,
    pub summary_enabled: bool,
    pub summary_interval: u32,
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self {
            buffer_size: 8,
            summary_enabled: true,
            summary_interval: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UiSettings {
    pub font_size: u32,
    pub show_avatars: bool,
    pub theme: String,
    pub custom_css: String,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            font_size: 13,
            show_avatars: true,
            theme: "cyberpunk".to_string(),
            custom_css: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BackupSettings {
    pub auto_backup: bool,
    /// Minutes between automatic backups.
    pub backup_interval: u32,
    pub max_backups: u32,
}

impl Default for BackupSettings {
    fn default() -> Self {
        Self {
            auto_backup: true,
            backup_interval: 30,
            max_backups: 5,
        }
    }
}

/// File-backed settings store. The path is handed in at startup so tests and
/// the app share the same code with different roots.
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the settings document, back-filling missing keys from defaults.
    /// A missing file is created with the defaults; any failure falls back to
    /// the default document.
    pub fn load(&self) -> Settings {
        if !self.path.exists() {
            info!("no settings file found, creating default settings");
            let defaults = Settings::default();
            if let Err(e) = self.save(&defaults) {
                error!("failed to write default settings: {e}");
            }
            return defaults;
        }
        match fs::read_to_string(&self.path) {
            Ok(content) => match serde_json::from_str::<Settings>(&content) {
                Ok(settings) => {
                    info!("settings loaded successfully");
                    settings
                }
                Err(e) => {
                    error!("error parsing settings: {e}");
                    Settings::default()
                }
            },
            Err(e) => {
                error!("error reading settings: {e}");
                Settings::default()
            }
        }
    }

    /// Saves the document, rotating the previous file into a timestamped
    /// backup and keeping only the 5 most recent backups. Write and rename
    /// failures propagate; cleanup failures are logged only.
    pub fn save(&self, settings: &Settings) -> Result<(), StoreError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        if self.path.exists() {
            let stamp = Local::now().format("%Y%m%d_%H%M%S");
            let backup = self
                .path
                .with_file_name(format!("{BACKUP_PREFIX}{stamp}.json"));
            fs::rename(&self.path, &backup)?;
        }
        let content = serde_json::to_string_pretty(settings)?;
        fs::write(&self.path, content)?;
        info!("settings saved successfully");
        if let Err(e) = self.cleanup_backups() {
            error!("error cleaning up backup files: {e}");
        }
        Ok(())
    }

    /// Deletes all but the `MAX_BACKUPS` most-recently-modified backups.
    fn cleanup_backups(&self) -> Result<(), StoreError> {
        let dir = match self.path.parent() {
            Some(dir) => dir,
            None => return Ok(()),
        };
        let mut backups: Vec<(PathBuf, std::time::SystemTime)> = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with(BACKUP_PREFIX) && name.ends_with(".json") {
                let modified = entry.metadata()?.modified()?;
                backups.push((entry.path(), modified));
            }
        }
        backups.sort_by(|a, b| b.1.cmp(&a.1));
        for (path, _) in backups.into_iter().skip(MAX_BACKUPS) {
            if let Err(e) = fs::remove_file(&path) {
                warn!("failed to remove old backup {}: {e}", path.display());
            }
        }
        Ok(())
    }
}

/// Structural and range checks. Not invoked by `save`; the settings panel
/// calls this explicitly before committing.
pub fn validate(settings: &Settings) -> bool {
    if settings.api_url.trim().is_empty() {
        error!("invalid api_url: empty");
        return false;
    }
    let model = &settings.model_settings;
    if model.model.trim().is_empty() {
        error!("invalid model: empty");
        return false;
    }
    if !(0.0..=2.0).contains(&model.temperature) {
        error!("invalid temperature value: {}", model.temperature);
        return false;
    }
    if model.max_tokens == 0 {
        error!("invalid max_tokens value: 0");
        return false;
    }
    if !(0.0..=1.0).contains(&model.top_p) {
        error!("invalid top_p value: {}", model.top_p);
        return false;
    }
    if settings.memory_settings.buffer_size == 0 {
        error!("invalid buffer_size value: 0");
        return false;
    }
    true
}
