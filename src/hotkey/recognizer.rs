//! Debounced hotkey recognition
//!
//! Turns raw key events into recognized triggers. A single cooldown clock
//! is shared by every hotkey class.

use std::time::{Duration, Instant};

use tracing::debug;

use super::keys::{HotkeyClass, KeyEvent, KeyKind};

/// Minimum time between two accepted triggers
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(200);

/// A hotkey that matched a signature and passed the debounce check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecognizedTrigger {
    pub class: HotkeyClass,
    pub at: Instant,
}

/// Matches key events against the signature table with a shared cooldown
#[derive(Debug)]
pub struct Recognizer {
    window: Duration,
    last_accepted: Option<Instant>,
}

impl Recognizer {
    pub fn new() -> Self {
        Self::with_window(DEBOUNCE_WINDOW)
    }

    pub fn with_window(window: Duration) -> Self {
        Self {
            window,
            last_accepted: None,
        }
    }

    /// Feed one event observed at `now`.
    ///
    /// Returns a trigger when the event is a Control+Option press of a
    /// recognized key and at least one debounce window has passed since
    /// the previous accepted trigger.
    pub fn observe(&mut self, event: &KeyEvent, now: Instant) -> Option<RecognizedTrigger> {
        if event.kind != KeyKind::Press || !event.modifiers.is_control_option() {
            return None;
        }

        let class = HotkeyClass::from_key(event.key)?;

        if let Some(last) = self.last_accepted {
            let elapsed = now.saturating_duration_since(last);
            if elapsed < self.window {
                debug!(%class, elapsed_ms = elapsed.as_millis() as u64, "hotkey debounced");
                return None;
            }
        }

        self.last_accepted = Some(now);
        Some(RecognizedTrigger { class, at: now })
    }
}

impl Default for Recognizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hotkey::keys::{KeyCode, ModifierState};

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn hotkey(key: KeyCode) -> KeyEvent {
        KeyEvent::press(key, ModifierState::CONTROL_OPTION)
    }

    #[test]
    fn test_recognizes_each_signature() {
        let t0 = Instant::now();
        let mut recognizer = Recognizer::new();

        let h = recognizer.observe(&hotkey(KeyCode::H), t0).unwrap();
        let j = recognizer.observe(&hotkey(KeyCode::J), t0 + ms(250)).unwrap();
        let g = recognizer.observe(&hotkey(KeyCode::G), t0 + ms(500)).unwrap();

        assert_eq!(h.class, HotkeyClass::SingleLanguage);
        assert_eq!(j.class, HotkeyClass::MultiLanguage);
        assert_eq!(g.class, HotkeyClass::ConfiguredLanguage);
        assert_eq!(g.at, t0 + ms(500));
    }

    #[test]
    fn test_other_modifier_masks_never_trigger() {
        let t0 = Instant::now();
        let mut recognizer = Recognizer::new();

        for control in [false, true] {
            for option in [false, true] {
                for command in [false, true] {
                    for shift in [false, true] {
                        let modifiers = ModifierState {
                            control,
                            option,
                            command,
                            shift,
                        };
                        if modifiers.is_control_option() {
                            continue;
                        }
                        let event = KeyEvent::press(KeyCode::H, modifiers);
                        assert_eq!(recognizer.observe(&event, t0), None);
                    }
                }
            }
        }
    }

    #[test]
    fn test_release_and_unknown_keys_ignored() {
        let t0 = Instant::now();
        let mut recognizer = Recognizer::new();

        let release = KeyEvent::release(KeyCode::H, ModifierState::CONTROL_OPTION);
        assert_eq!(recognizer.observe(&release, t0), None);
        assert_eq!(recognizer.observe(&hotkey(KeyCode(0x00)), t0), None);

        // Neither of the ignored events started the cooldown
        assert!(recognizer.observe(&hotkey(KeyCode::H), t0 + ms(1)).is_some());
    }

    #[test]
    fn test_same_class_within_window_dropped() {
        let t0 = Instant::now();
        let mut recognizer = Recognizer::new();

        assert!(recognizer.observe(&hotkey(KeyCode::H), t0).is_some());
        assert!(recognizer.observe(&hotkey(KeyCode::H), t0 + ms(199)).is_none());
    }

    #[test]
    fn test_cooldown_is_shared_across_classes() {
        let t0 = Instant::now();
        let mut recognizer = Recognizer::new();

        assert!(recognizer.observe(&hotkey(KeyCode::H), t0).is_some());
        assert!(recognizer.observe(&hotkey(KeyCode::J), t0 + ms(120)).is_none());
        assert!(recognizer.observe(&hotkey(KeyCode::G), t0 + ms(150)).is_none());
    }

    #[test]
    fn test_dropped_event_does_not_reset_clock() {
        let t0 = Instant::now();
        let mut recognizer = Recognizer::new();

        assert!(recognizer.observe(&hotkey(KeyCode::H), t0).is_some());
        assert!(recognizer.observe(&hotkey(KeyCode::H), t0 + ms(150)).is_none());
        // 200ms after the first accepted event, not after the dropped one
        assert!(recognizer.observe(&hotkey(KeyCode::H), t0 + ms(200)).is_some());
    }
}
