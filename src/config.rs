//! Configuration loading and management

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

pub const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// JSON file holding the user settings
    pub settings_path: PathBuf,

    /// Path to the Unix domain socket for IPC
    pub socket_path: PathBuf,

    /// Directory for runtime data
    pub data_dir: PathBuf,

    /// Base URL of the Gemini models endpoint
    pub api_base_url: String,

    /// Timeout for a single translation request
    pub request_timeout: Duration,
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> Result<Self> {
        let home = std::env::var("HOME").context("HOME is not set")?;
        let data_dir = PathBuf::from(&home)
            .join(".local")
            .join("share")
            .join("hotkey-translator");

        let socket_path = data_dir.join("daemon.sock");

        let settings_path = match std::env::var_os("HOTKEY_TRANSLATOR_CONFIG") {
            Some(path) => PathBuf::from(path),
            None => default_settings_path(),
        };

        let api_base_url = std::env::var("GEMINI_API_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string());

        Ok(Self {
            settings_path,
            socket_path,
            data_dir,
            api_base_url,
            request_timeout: Duration::from_secs(120),
        })
    }

    /// Ensure data directory exists
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)
            .with_context(|| format!("failed to create {}", self.data_dir.display()))?;
        Ok(())
    }
}

/// `config.json` next to the executable, or in the working directory
fn default_settings_path() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("config.json")))
        .unwrap_or_else(|| PathBuf::from("config.json"))
}
