//! IPC message protocol definitions
//!
//! All messages are JSON-encoded, prefixed with a 4-byte little-endian length.

use serde::{Deserialize, Serialize};

use crate::pipeline::RunOutcome;
use crate::settings::Settings;

/// Requests from UI to daemon
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Ping to check connectivity
    Ping,

    /// Request current daemon status
    GetStatus,

    /// Install the hotkey listener
    StartListening,

    GetSettings,

    /// Validate and persist new settings
    UpdateSettings { settings: Settings },

    /// Known translation models
    GetModels,
}

/// Responses from daemon to UI
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Pong response to ping
    Pong,

    /// Current daemon status
    Status(DaemonStatus),

    /// Listener is installed
    Listening,

    Settings { settings: Settings },

    Models { models: Vec<String> },

    /// Error response
    Error { code: String, message: String },
}

impl Response {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Response::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

/// Full daemon status snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonStatus {
    /// Daemon version
    pub version: String,

    /// Whether the hotkey listener is installed
    pub listening: bool,

    /// Whether the process may observe global input
    pub accessibility_granted: bool,

    /// Uptime in seconds
    pub uptime_secs: u64,

    pub runs_completed: u64,

    pub runs_aborted: u64,

    /// Outcome of the most recent finished run
    pub last_outcome: Option<RunOutcome>,
}

impl Default for DaemonStatus {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            listening: false,
            accessibility_granted: false,
            uptime_secs: 0,
            runs_completed: 0,
            runs_aborted: 0,
            last_outcome: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let req = Request::UpdateSettings {
            settings: Settings::default(),
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("update_settings"));
        assert!(json.contains("selected_languages"));
    }

    #[test]
    fn test_request_deserialization() {
        let req: Request = serde_json::from_str(r#"{"type":"start_listening"}"#).unwrap();
        assert!(matches!(req, Request::StartListening));
    }

    #[test]
    fn test_response_serialization() {
        let resp = Response::Status(DaemonStatus::default());
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"type\":\"status\""));
        assert!(json.contains("\"last_outcome\":null"));
        assert!(json.contains("\"accessibility_granted\":false"));

        let resp = Response::error("missing_api_key", "no key");
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"code\":\"missing_api_key\""));
    }
}
