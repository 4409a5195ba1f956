//! Key, modifier and hotkey class definitions
//!
//! Provides the platform-neutral `KeyEvent` consumed by the recognizer,
//! the modifier state it carries, and the fixed table of recognized
//! Control+Option signatures.

use serde::{Deserialize, Serialize};

/// Modifier key flag masks from macOS CGEventFlags
#[cfg(target_os = "macos")]
pub mod flags {
    use core_graphics::event::CGEventFlags;

    /// Control key modifier flag
    pub const CONTROL: CGEventFlags = CGEventFlags::CGEventFlagControl;
    /// Option/Alt key modifier flag
    pub const OPTION: CGEventFlags = CGEventFlags::CGEventFlagAlternate;
    /// Command key modifier flag
    pub const COMMAND: CGEventFlags = CGEventFlags::CGEventFlagCommand;
    /// Shift key modifier flag
    pub const SHIFT: CGEventFlags = CGEventFlags::CGEventFlagShift;
}

/// Which modifier keys were held when a key event fired
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModifierState {
    /// Control key is held
    pub control: bool,
    /// Option/Alt key is held
    pub option: bool,
    /// Command key is held
    pub command: bool,
    /// Shift key is held
    pub shift: bool,
}

impl ModifierState {
    /// The exact mask every recognized hotkey requires
    pub const CONTROL_OPTION: Self = Self {
        control: true,
        option: true,
        command: false,
        shift: false,
    };

    /// Create a new ModifierState from CGEventFlags
    #[cfg(target_os = "macos")]
    pub fn from_flags(event_flags: core_graphics::event::CGEventFlags) -> Self {
        Self {
            control: event_flags.contains(flags::CONTROL),
            option: event_flags.contains(flags::OPTION),
            command: event_flags.contains(flags::COMMAND),
            shift: event_flags.contains(flags::SHIFT),
        }
    }

    /// True only when Control and Option are held and nothing else
    pub fn is_control_option(&self) -> bool {
        *self == Self::CONTROL_OPTION
    }
}

/// Platform virtual key code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyCode(pub u16);

impl KeyCode {
    // kVK_ANSI_* values from HIToolbox/Events.h
    pub const H: KeyCode = KeyCode(0x04);
    pub const G: KeyCode = KeyCode(0x05);
    pub const J: KeyCode = KeyCode(0x26);
}

/// Whether a key went down or came up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    Press,
    Release,
}

/// One raw keyboard notification from the input source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub kind: KeyKind,
    pub key: KeyCode,
    pub modifiers: ModifierState,
}

impl KeyEvent {
    pub fn press(key: KeyCode, modifiers: ModifierState) -> Self {
        Self {
            kind: KeyKind::Press,
            key,
            modifiers,
        }
    }

    pub fn release(key: KeyCode, modifiers: ModifierState) -> Self {
        Self {
            kind: KeyKind::Release,
            key,
            modifiers,
        }
    }
}

/// The recognized global hotkey behaviors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HotkeyClass {
    /// Control+Option+H: translate the selection to English and paste
    SingleLanguage,
    /// Control+Option+J: select all, translate to every configured language and paste
    MultiLanguage,
    /// Control+Option+G: translate the selection to the configured language and show it
    ConfiguredLanguage,
}

/// How a finished translation reaches the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Simulate a paste over the original selection
    Paste,
    /// Show a modal alert with the translated text
    Alert,
}

/// Key code → class table for Control+Option combinations
const SIGNATURES: [(KeyCode, HotkeyClass); 3] = [
    (KeyCode::H, HotkeyClass::SingleLanguage),
    (KeyCode::J, HotkeyClass::MultiLanguage),
    (KeyCode::G, HotkeyClass::ConfiguredLanguage),
];

impl HotkeyClass {
    pub const ALL: [HotkeyClass; 3] = [
        HotkeyClass::SingleLanguage,
        HotkeyClass::MultiLanguage,
        HotkeyClass::ConfiguredLanguage,
    ];

    /// Look up the class bound to a key, if any
    pub fn from_key(key: KeyCode) -> Option<Self> {
        SIGNATURES
            .iter()
            .find(|(code, _)| *code == key)
            .map(|(_, class)| *class)
    }

    /// Whether the run selects everything before copying
    pub fn selects_all(&self) -> bool {
        matches!(self, HotkeyClass::MultiLanguage)
    }

    pub fn delivery(&self) -> Delivery {
        match self {
            HotkeyClass::SingleLanguage | HotkeyClass::MultiLanguage => Delivery::Paste,
            HotkeyClass::ConfiguredLanguage => Delivery::Alert,
        }
    }
}

impl std::fmt::Display for HotkeyClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HotkeyClass::SingleLanguage => write!(f, "SingleLanguage"),
            HotkeyClass::MultiLanguage => write!(f, "MultiLanguage"),
            HotkeyClass::ConfiguredLanguage => write!(f, "ConfiguredLanguage"),
        }
    }
}
