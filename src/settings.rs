//! User settings and their persistent store
//!
//! Settings are read through a `SettingsStore` at the start of every
//! translation run, so edits take effect on the next hotkey press
//! without restarting the listener.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash-lite";

/// Value written by earlier setups in place of a real key
pub const PLACEHOLDER_API_KEY: &str = "YOUR_GEMINI_API_KEY_HERE";

/// Models offered to the presentation layer
pub const GEMINI_MODELS: [&str; 4] = [
    "gemini-2.0-flash-lite",
    "gemini-1.5-flash",
    "gemini-1.5-pro",
    "gemini-1.0-pro",
];

/// Languages a translation can target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    English,
    Vietnamese,
    Japanese,
}

impl Language {
    /// Used when the configured-language hotkey has an unknown code
    pub const FALLBACK: Language = Language::Vietnamese;

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "EN" => Some(Language::English),
            "VN" => Some(Language::Vietnamese),
            "JP" => Some(Language::Japanese),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Language::English => "EN",
            Language::Vietnamese => "VN",
            Language::Japanese => "JP",
        }
    }

    /// Full name passed to the translation service
    pub fn name(&self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Vietnamese => "Vietnamese",
            Language::Japanese => "Japanese",
        }
    }
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_languages() -> Vec<String> {
    vec![Language::English.code().to_string()]
}

fn default_g_language() -> String {
    Language::FALLBACK.code().to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub gemini_api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Target codes for the multi-language hotkey, in output order
    #[serde(default = "default_languages")]
    pub selected_languages: Vec<String>,
    #[serde(default)]
    pub include_prefix: bool,
    /// Target code for the configured-language hotkey
    #[serde(default = "default_g_language")]
    pub g_language: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            gemini_api_key: String::new(),
            model: default_model(),
            selected_languages: default_languages(),
            include_prefix: false,
            g_language: default_g_language(),
        }
    }
}

impl Settings {
    /// True when a key that could plausibly authenticate is configured
    pub fn has_api_key(&self) -> bool {
        let key = self.gemini_api_key.trim();
        !key.is_empty() && key != PLACEHOLDER_API_KEY
    }

    /// Language for the configured-language hotkey, falling back to Vietnamese
    pub fn configured_language(&self) -> Language {
        Language::from_code(&self.g_language).unwrap_or(Language::FALLBACK)
    }

    /// Fill blank fields with their defaults
    fn normalized(mut self) -> Self {
        if self.model.trim().is_empty() {
            self.model = default_model();
        }
        if self.g_language.trim().is_empty() {
            self.g_language = default_g_language();
        }
        self
    }

    /// Reject language codes the translator cannot target
    pub fn validate(&self) -> Result<(), SettingsError> {
        for code in self.selected_languages.iter().chain(Some(&self.g_language)) {
            if Language::from_code(code).is_none() {
                return Err(SettingsError::UnknownLanguage(code.clone()));
            }
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to write settings to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode settings: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("unknown language code: {0}")]
    UnknownLanguage(String),
}

/// Read/write access to the persisted settings
pub trait SettingsStore: Send + Sync {
    /// Current settings; never fails, falling back to defaults
    fn load(&self) -> Settings;

    fn save(&self, settings: &Settings) -> Result<(), SettingsError>;
}

/// Settings kept in a JSON file, with environment fallback for the API key
#[derive(Debug, Clone)]
pub struct JsonSettingsStore {
    path: PathBuf,
}

impl JsonSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_file(&self) -> Option<Settings> {
        let content = std::fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str::<Settings>(&content) {
            Ok(settings) => Some(settings.normalized()),
            Err(e) => {
                warn!(path = ?self.path, error = %e, "ignoring malformed settings file");
                None
            }
        }
    }
}

impl SettingsStore for JsonSettingsStore {
    fn load(&self) -> Settings {
        if let Some(settings) = self.load_file() {
            debug!(path = ?self.path, "settings loaded from file");
            return settings;
        }

        // Development fallback: .env then the process environment
        let _ = dotenvy::dotenv();
        match std::env::var("GEMINI_API_KEY") {
            Ok(key) if !key.trim().is_empty() => {
                debug!("API key loaded from environment");
                Settings {
                    gemini_api_key: key,
                    ..Settings::default()
                }
            }
            _ => Settings::default(),
        }
    }

    fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        let write_err = |source| SettingsError::Write {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(write_err)?;
            }
        }

        let json = serde_json::to_string_pretty(settings)?;
        std::fs::write(&self.path, json).map_err(write_err)?;

        info!(path = ?self.path, "settings saved");
        Ok(())
    }
}
