//! Editor settings: defaults, JSON load/save, validation, and file discovery.

use std::path::{Path, PathBuf};

use anyhow::Result;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::file_system::FileSystem;
use crate::layout::Vec2;

pub const CONFIG_FILE_NAME: &str = "palimpsest.json";
pub const CONFIG_PATH_ENV: &str = "PALIMPSEST_CONFIG_PATH";
pub const CONFIG_DIR_ENV: &str = "PALIMPSEST_CONFIG_DIR";

const DEFAULT_FADE_SECONDS: f32 = 60.0;
const MAX_MARGIN: f32 = 64.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EditorStyle {
    #[default]
    Normal,
    Minimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// 0 = never, 1 = when needed, 2 = always.
    pub show_scroll_bar: u32,
    pub style: EditorStyle,
    pub line_margins: Vec2,
    pub widget_margins: Vec2,
    pub show_line_numbers: bool,
    pub short_tab_names: bool,
    pub show_indicator_region: bool,
    pub auto_hide_command_region: bool,
    pub cursor_line_solid: bool,
    pub background_fade_time: f32,
    pub background_fade_wait: f32,
    pub syntax_theme: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            show_scroll_bar: 1,
            style: EditorStyle::Normal,
            line_margins: Vec2::splat(1.0),
            widget_margins: Vec2::splat(1.0),
            show_line_numbers: true,
            short_tab_names: true,
            show_indicator_region: true,
            auto_hide_command_region: true,
            cursor_line_solid: false,
            background_fade_time: DEFAULT_FADE_SECONDS,
            background_fade_wait: DEFAULT_FADE_SECONDS,
            syntax_theme: hlcore::DEFAULT_THEME.to_string(),
        }
    }
}

fn valid_margin(v: f32) -> bool {
    v.is_finite() && (0.0..=MAX_MARGIN).contains(&v)
}

fn valid_seconds(v: f32) -> bool {
    v.is_finite() && v >= 0.0
}

impl EditorConfig {
    /// Reads a config table. Keys that are missing keep their defaults; a
    /// table that does not parse yields the defaults.
    pub fn from_table(table: &Value) -> Self {
        match serde_json::from_value::<Self>(table.clone()) {
            Ok(mut config) => {
                config.validate();
                config
            }
            Err(e) => {
                log::error!("Failed to parse config table: {}", e);
                Self::default()
            }
        }
    }

    pub fn to_table(&self) -> Value {
        match serde_json::to_value(self) {
            Ok(value) => value,
            Err(e) => {
                log::error!("Failed to serialize config: {}", e);
                Value::Null
            }
        }
    }

    /// Loads from `path`. Missing, empty, or unreadable files give defaults;
    /// a file that does not parse is copied to `.bak` first.
    pub fn load(fs: &dyn FileSystem, path: &Path) -> Self {
        if !fs.exists(path) {
            log::info!("Config file does not exist, using defaults: {}", path.display());
            return Self::default();
        }

        let content = match fs.read(path) {
            Ok(content) => content,
            Err(e) => {
                log::error!("Failed to read config file: {}", e);
                return Self::default();
            }
        };

        if content.trim().is_empty() {
            log::warn!("Config file is empty, using defaults");
            return Self::default();
        }

        match serde_json::from_str::<Self>(&content) {
            Ok(mut config) => {
                config.validate();
                log::info!("Successfully loaded config from: {}", path.display());
                config
            }
            Err(json_err) => {
                log::error!("Failed to parse config file: {}", json_err);

                let backup_path = path.with_extension("bak");
                if let Err(e) = fs.write(&backup_path, &content) {
                    log::warn!("Failed to backup broken config: {}", e);
                } else {
                    log::info!("Backed up broken config to: {}", backup_path.display());
                }
                Self::default()
            }
        }
    }

    pub fn save(&self, fs: &dyn FileSystem, path: &Path) -> Result<()> {
        let mut config = self.clone();
        config.validate();
        let content = serde_json::to_string_pretty(&config)
            .map_err(|e| anyhow::anyhow!("Failed to serialize config: {}", e))?;
        fs.write(path, &content).map_err(|e| {
            anyhow::anyhow!("Failed to write config file: {} - {}", path.display(), e)
        })?;
        log::info!("Successfully saved config to: {}", path.display());
        Ok(())
    }

    /// Replaces out-of-range values with defaults. Returns whether anything
    /// was corrected.
    pub fn validate(&mut self) -> bool {
        let defaults = Self::default();
        let mut has_issues = false;

        if self.show_scroll_bar > 2 {
            log::warn!("Invalid show_scroll_bar: {}, using default", self.show_scroll_bar);
            self.show_scroll_bar = defaults.show_scroll_bar;
            has_issues = true;
        }

        for (name, margins) in [
            ("line_margins", &mut self.line_margins),
            ("widget_margins", &mut self.widget_margins),
        ] {
            if !valid_margin(margins.x) || !valid_margin(margins.y) {
                log::warn!("Invalid {}: {:?}, using default", name, margins);
                *margins = Vec2::splat(1.0);
                has_issues = true;
            }
        }

        if !valid_seconds(self.background_fade_time) {
            log::warn!("Invalid background_fade_time: {}, using default", self.background_fade_time);
            self.background_fade_time = DEFAULT_FADE_SECONDS;
            has_issues = true;
        }

        if !valid_seconds(self.background_fade_wait) {
            log::warn!("Invalid background_fade_wait: {}, using default", self.background_fade_wait);
            self.background_fade_wait = DEFAULT_FADE_SECONDS;
            has_issues = true;
        }

        if self.syntax_theme.trim().is_empty() {
            log::warn!("Empty syntax theme, using default");
            self.syntax_theme = defaults.syntax_theme;
            has_issues = true;
        }

        if has_issues {
            log::info!("Configuration validation completed with corrections");
        }
        has_issues
    }
}

/// Where the config lives: `PALIMPSEST_CONFIG_PATH`, else
/// `PALIMPSEST_CONFIG_DIR/palimpsest.json`, else the platform config dir,
/// else `root/palimpsest.json`.
pub fn config_path(root: &Path) -> PathBuf {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        return PathBuf::from(path);
    }

    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
        return PathBuf::from(dir).join(CONFIG_FILE_NAME);
    }

    ProjectDirs::from("com", "palimpsest", "palimpsest")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
        .unwrap_or_else(|| root.join(CONFIG_FILE_NAME))
}
