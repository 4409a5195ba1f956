//! Automation backed by the real desktop
//!
//! Clipboard through `arboard`. Keystrokes are posted CGEvents on macOS
//! and go through `enigo` elsewhere. Alerts and the notification sound use
//! `osascript` on macOS.

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{Automation, AutomationError, KeyCombo};

#[derive(Debug, Default, Clone)]
pub struct SystemAutomation;

impl SystemAutomation {
    pub fn new() -> Self {
        Self
    }
}

/// Command+letter posted as raw CGEvents.
///
/// Uses fixed virtual keycodes so no keyboard layout lookup happens; the
/// layout APIs are only safe on the main thread.
#[cfg(target_os = "macos")]
fn press_combo(combo: KeyCombo) -> Result<(), AutomationError> {
    use core_graphics::event::{CGEvent, CGEventFlags, CGEventTapLocation};
    use core_graphics::event_source::{CGEventSource, CGEventSourceStateID};

    let source = CGEventSource::new(CGEventSourceStateID::HIDSystemState)
        .map_err(|()| AutomationError::Simulate("failed to create event source".to_string()))?;
    let keycode = combo.virtual_keycode();

    for key_down in [true, false] {
        let event = CGEvent::new_keyboard_event(source.clone(), keycode, key_down)
            .map_err(|()| AutomationError::Simulate(format!("failed to create {combo} event")))?;
        event.set_flags(CGEventFlags::CGEventFlagCommand);
        event.post(CGEventTapLocation::HID);
    }

    Ok(())
}

/// Control+letter through enigo
#[cfg(not(target_os = "macos"))]
fn press_combo(combo: KeyCombo) -> Result<(), AutomationError> {
    use enigo::{Direction, Enigo, Key, Keyboard, Settings};

    let simulate_err = |e: enigo::InputError| AutomationError::Simulate(e.to_string());

    let mut enigo = Enigo::new(&Settings::default())
        .map_err(|e| AutomationError::Simulate(e.to_string()))?;

    enigo.key(Key::Control, Direction::Press).map_err(simulate_err)?;
    let clicked = enigo.key(Key::Unicode(combo.letter()), Direction::Click);
    // Always release the modifier, even if the letter failed
    let released = enigo.key(Key::Control, Direction::Release);

    clicked.map_err(simulate_err)?;
    released.map_err(simulate_err)?;
    Ok(())
}

/// Escape a string for use inside an AppleScript string literal
pub(crate) fn applescript_escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

fn alert_script(title: &str, message: &str) -> String {
    format!(
        "tell application \"System Events\" to display dialog \"{}\" buttons {{\"OK\"}} default button \"OK\" with title \"{}\"",
        applescript_escape(message),
        applescript_escape(title)
    )
}

#[async_trait]
impl Automation for SystemAutomation {
    async fn simulate_key_combo(&self, combo: KeyCombo) -> Result<(), AutomationError> {
        debug!(%combo, "simulating key combo");
        tokio::task::spawn_blocking(move || press_combo(combo))
            .await
            .map_err(|e| AutomationError::Simulate(e.to_string()))?
    }

    async fn read_clipboard(&self) -> Result<String, AutomationError> {
        tokio::task::spawn_blocking(|| {
            let mut clipboard = arboard::Clipboard::new()
                .map_err(|e| AutomationError::Clipboard(e.to_string()))?;
            match clipboard.get_text() {
                Ok(text) => Ok(text),
                Err(arboard::Error::ContentNotAvailable) => Ok(String::new()),
                Err(e) => Err(AutomationError::Clipboard(e.to_string())),
            }
        })
        .await
        .map_err(|e| AutomationError::Clipboard(e.to_string()))?
    }

    async fn write_clipboard(&self, text: &str) -> Result<(), AutomationError> {
        let text = text.to_string();
        tokio::task::spawn_blocking(move || {
            let mut clipboard = arboard::Clipboard::new()
                .map_err(|e| AutomationError::Clipboard(e.to_string()))?;
            clipboard
                .set_text(text)
                .map_err(|e| AutomationError::Clipboard(e.to_string()))
        })
        .await
        .map_err(|e| AutomationError::Clipboard(e.to_string()))?
    }

    async fn show_alert(&self, title: &str, message: &str) -> Result<(), AutomationError> {
        if !cfg!(target_os = "macos") {
            warn!(title, message, "alert not supported on this platform");
            return Err(AutomationError::Unsupported("alert"));
        }

        let output = tokio::process::Command::new("osascript")
            .arg("-e")
            .arg(alert_script(title, message))
            .output()
            .await
            .map_err(|e| AutomationError::Alert(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AutomationError::Alert(stderr.trim().to_string()));
        }

        debug!(title, "alert dismissed");
        Ok(())
    }

    fn play_notification_sound(&self) {
        if !cfg!(target_os = "macos") {
            return;
        }

        tokio::spawn(async {
            let status = tokio::process::Command::new("osascript")
                .arg("-e")
                .arg("beep")
                .status()
                .await;
            if let Err(e) = status {
                debug!(error = %e, "notification sound failed");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_applescript_escape() {
        assert_eq!(applescript_escape(r#"say "hi""#), r#"say \"hi\""#);
        assert_eq!(applescript_escape(r"a\b"), r"a\\b");
        assert_eq!(applescript_escape("plain"), "plain");
    }

    #[test]
    fn test_alert_script_escapes_both_fields() {
        let script = alert_script("Translation (\"EN\")", "He said \"hello\"");
        assert!(script.contains(r#"display dialog "He said \"hello\"""#));
        assert!(script.contains(r#"with title "Translation (\"EN\")""#));
    }
}
