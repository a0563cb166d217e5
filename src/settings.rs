use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::highlights::HighlightColor;
use crate::theme::ThemeId;

pub const CURRENT_VERSION: u32 = 2;
pub const TUTOR_ENABLED_ENV: &str = "LECTIO_TUTOR_ENABLED";
const SETTINGS_FILENAME: &str = "config.yaml";
const APP_NAME: &str = "lectio";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default = "default_theme")]
    pub theme: String,

    /// Version 1 files called this `llm_enabled`.
    #[serde(default = "default_true", alias = "llm_enabled")]
    pub tutor_enabled: bool,

    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    #[serde(default = "default_language")]
    pub default_language: String,

    #[serde(default)]
    pub default_highlight_color: HighlightColor,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations_dir: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

fn default_version() -> u32 {
    CURRENT_VERSION
}

fn default_theme() -> String {
    ThemeId::default().name().to_string()
}

fn default_api_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_language() -> String {
    "grc".to_string()
}

fn default_request_timeout_secs() -> u64 {
    120
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            theme: default_theme(),
            tutor_enabled: true,
            api_base_url: default_api_base_url(),
            default_language: default_language(),
            default_highlight_color: HighlightColor::default(),
            request_timeout_secs: default_request_timeout_secs(),
            annotations_dir: None,
        }
    }
}

impl Settings {
    pub fn theme_id(&self) -> ThemeId {
        ThemeId::from_name(&self.theme).unwrap_or_else(|| {
            warn!("Unknown theme {:?}, using {}", self.theme, ThemeId::default().name());
            ThemeId::default()
        })
    }

    /// Applies environment overrides on top of the file values.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(value) = std::env::var(TUTOR_ENABLED_ENV) {
            match parse_flag(&value) {
                Some(enabled) => self.tutor_enabled = enabled,
                None => warn!("Ignoring {TUTOR_ENABLED_ENV}={value:?}: not a boolean"),
            }
        }
        if let Ok(dir) = std::env::var(crate::annotation_store::ANNOTATIONS_DIR_ENV) {
            if !dir.trim().is_empty() {
                self.annotations_dir = Some(PathBuf::from(dir));
            }
        }
    }
}

/// Reads a boolean-like value: `true/false`, `1/0`, `yes/no`, `on/off`.
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub fn preferred_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|config| config.join(APP_NAME).join(SETTINGS_FILENAME))
}

/// Loads settings from `path`, or the default location. A missing file is
/// created with defaults; an unreadable one is reported and defaults are used.
pub fn load_settings(path: Option<&Path>) -> Settings {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => match preferred_config_path() {
            Some(path) => path,
            None => {
                warn!("Could not determine config directory, using default settings");
                return Settings::default();
            }
        },
    };

    if path.exists() {
        load_settings_from_path(&path)
    } else {
        info!("Settings file not found, creating with defaults at {path:?}");
        let settings = Settings::default();
        save_settings_to_file(&settings, &path);
        settings
    }
}

fn load_settings_from_path(path: &Path) -> Settings {
    match fs::read_to_string(path) {
        Ok(content) => match serde_yaml::from_str::<Settings>(&content) {
            Ok(mut settings) => {
                debug!("Loaded settings from {path:?}");

                if settings.version < CURRENT_VERSION {
                    migrate_settings(&mut settings);
                    save_settings_to_file(&settings, path);
                }
                settings
            }
            Err(e) => {
                error!("Failed to parse settings file {path:?}: {e}");
                Settings::default()
            }
        },
        Err(e) => {
            error!("Failed to read settings file {path:?}: {e}");
            Settings::default()
        }
    }
}

fn migrate_settings(settings: &mut Settings) {
    info!(
        "Migrating settings from v{} to v{}",
        settings.version, CURRENT_VERSION
    );

    // v1 -> v2: `llm_enabled` became `tutor_enabled` (read through the serde
    // alias), written back under the new name.

    settings.version = CURRENT_VERSION;
}

pub fn save_settings_to_file(settings: &Settings, path: &Path) {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            if let Err(e) = fs::create_dir_all(parent) {
                error!("Failed to create config directory {parent:?}: {e}");
                return;
            }
        }
    }

    let content = generate_settings_yaml(settings);

    match fs::write(path, content) {
        Ok(()) => debug!("Saved settings to {path:?}"),
        Err(e) => error!("Failed to save settings to {path:?}: {e}"),
    }
}

fn generate_settings_yaml(settings: &Settings) -> String {
    let mut content = String::new();

    content.push_str(&format!("version: {}\n", settings.version));
    content.push_str(&format!("theme: \"{}\"\n", settings.theme));
    content.push_str(&format!("tutor_enabled: {}\n", settings.tutor_enabled));
    content.push_str(&format!("api_base_url: \"{}\"\n", settings.api_base_url));
    content.push_str(&format!(
        "default_language: \"{}\"\n",
        settings.default_language
    ));
    content.push_str(&format!(
        "default_highlight_color: {}\n",
        settings.default_highlight_color
    ));
    content.push_str(&format!(
        "request_timeout_secs: {}\n",
        settings.request_timeout_secs
    ));
    if let Some(dir) = &settings.annotations_dir {
        content.push_str(&format!("annotations_dir: \"{}\"\n", dir.display()));
    }
    content.push('\n');

    content.push_str(SETTINGS_HELP);

    content
}

const SETTINGS_HELP: &str = r#"# ============================================================================
# Notes
# ============================================================================
# theme:                    "Oceanic Next" or "Catppuccin Mocha"
# default_highlight_color:  yellow, green, blue or pink
# annotations_dir:          where highlight files are kept
#                           (default: <data dir>/lectio/annotations)
#
# Environment overrides:
#   LECTIO_TUTOR_ENABLED     true/false, 1/0, yes/no, on/off
#   LECTIO_API_TOKEN         bearer token for the tutor API
#   LECTIO_ANNOTATIONS_DIR   replaces annotations_dir
"#;
