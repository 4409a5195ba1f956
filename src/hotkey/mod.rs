//! Hotkey module for global keyboard event listening
//!
//! Uses macOS CGEventTap to watch key presses, recognizes the fixed
//! Control+Option signatures and debounces repeated firings.

// Key decoding and recognition only run inside the macOS event tap
#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
mod keys;
mod listener;
#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
mod recognizer;

pub use keys::{Delivery, HotkeyClass};
pub use listener::{accessibility_granted, HotkeyError, HotkeyListener, ACCESSIBILITY_HELP};
pub use recognizer::RecognizedTrigger;
