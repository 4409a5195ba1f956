//! OS automation primitives
//!
//! Key simulation, clipboard access, modal alerts and the notification
//! sound, each a discrete fallible operation. The adapter does no
//! locking; concurrent runs may interleave their clipboard access.

mod system;

use std::time::Duration;

use async_trait::async_trait;

pub use system::SystemAutomation;

/// Keystrokes the pipeline needs to simulate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCombo {
    SelectAll,
    Copy,
    Paste,
}

impl KeyCombo {
    /// Letter pressed together with the platform's primary modifier
    #[cfg_attr(target_os = "macos", allow(dead_code))]
    pub fn letter(&self) -> char {
        match self {
            KeyCombo::SelectAll => 'a',
            KeyCombo::Copy => 'c',
            KeyCombo::Paste => 'v',
        }
    }

    /// ANSI virtual keycode of the letter, independent of keyboard layout
    #[cfg_attr(not(target_os = "macos"), allow(dead_code))]
    pub fn virtual_keycode(&self) -> u16 {
        match self {
            KeyCombo::SelectAll => 0x00,
            KeyCombo::Copy => 0x08,
            KeyCombo::Paste => 0x09,
        }
    }
}

impl std::fmt::Display for KeyCombo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyCombo::SelectAll => write!(f, "select-all"),
            KeyCombo::Copy => write!(f, "copy"),
            KeyCombo::Paste => write!(f, "paste"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AutomationError {
    #[error("key simulation failed: {0}")]
    Simulate(String),

    #[error("clipboard access failed: {0}")]
    Clipboard(String),

    #[error("alert failed: {0}")]
    Alert(String),

    #[error("{0} is not supported on this platform")]
    Unsupported(&'static str),
}

/// Fixed waits after simulated keystrokes.
///
/// The OS gives no completion signal for simulated input, so the pipeline
/// sleeps for a fixed worst case before reading the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettleDelays {
    /// Before the first keystroke, so the hotkey itself is fully released
    pub before_copy: Duration,
    /// After select-all, before copy
    pub after_select: Duration,
    /// After copy, before reading the clipboard
    pub after_copy: Duration,
}

impl SettleDelays {
    pub const BEFORE_COPY: Duration = Duration::from_millis(150);
    pub const AFTER_SELECT: Duration = Duration::from_millis(200);
    pub const AFTER_COPY: Duration = Duration::from_millis(300);

    pub fn zero() -> Self {
        Self {
            before_copy: Duration::ZERO,
            after_select: Duration::ZERO,
            after_copy: Duration::ZERO,
        }
    }
}

impl Default for SettleDelays {
    fn default() -> Self {
        Self {
            before_copy: Self::BEFORE_COPY,
            after_select: Self::AFTER_SELECT,
            after_copy: Self::AFTER_COPY,
        }
    }
}

#[async_trait]
pub trait Automation: Send + Sync {
    async fn simulate_key_combo(&self, combo: KeyCombo) -> Result<(), AutomationError>;

    /// Current clipboard text; an empty clipboard reads as an empty string
    async fn read_clipboard(&self) -> Result<String, AutomationError>;

    async fn write_clipboard(&self, text: &str) -> Result<(), AutomationError>;

    /// Show a modal alert and wait for it to be dismissed
    async fn show_alert(&self, title: &str, message: &str) -> Result<(), AutomationError>;

    /// Best effort, never waits
    fn play_notification_sound(&self);
}
