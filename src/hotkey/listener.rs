//! Global hotkey listener using macOS CGEventTap
//!
//! Monitors system-wide key presses, runs them through the debounced
//! recognizer and hands accepted triggers to the dispatcher.
//! Runs on a dedicated thread with its own CFRunLoop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use tracing::{error, info};

use crate::dispatch::Dispatcher;

/// Global hotkey listener that feeds recognized triggers to the dispatcher
#[derive(Debug, Clone)]
pub struct HotkeyListener {
    dispatcher: Dispatcher,
    running: Arc<AtomicBool>,
}

impl HotkeyListener {
    /// Create a new hotkey listener
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start the hotkey listener
    ///
    /// Spawns a dedicated thread that runs the input hook and waits until
    /// the hook is either installed or has failed, so a setup failure is
    /// reported to the caller exactly once.
    pub fn start(&self) -> Result<(), HotkeyError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(HotkeyError::AlreadyRunning);
        }

        let dispatcher = self.dispatcher.clone();
        let running = Arc::clone(&self.running);
        let (ready_tx, ready_rx) = std::sync::mpsc::channel::<Result<(), HotkeyError>>();

        let spawned = thread::Builder::new()
            .name("hotkey-listener".to_string())
            .spawn(move || {
                info!("hotkey listener thread started");

                // On setup failure start() clears the flag
                if let Err(e) = platform::run_event_loop(dispatcher, running, ready_tx) {
                    error!(?e, "hotkey listener error");
                }

                info!("hotkey listener thread stopped");
            });

        if let Err(e) = spawned {
            self.running.store(false, Ordering::SeqCst);
            return Err(HotkeyError::ThreadSpawn(e.to_string()));
        }

        let result = ready_rx.recv().unwrap_or(Err(HotkeyError::EventTapCreation));
        if result.is_err() {
            // Cleared before returning so an immediate retry is not AlreadyRunning
            self.running.store(false, Ordering::SeqCst);
        }
        result
    }

    /// Stop the hotkey listener; the run loop exits on its next poll
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Check if the listener is currently running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Whether this process may observe global input (macOS Accessibility).
///
/// Always `false` where the listener is unsupported.
pub fn accessibility_granted() -> bool {
    platform::accessibility_granted()
}

/// Steps shown to the user when Accessibility permission is missing
pub const ACCESSIBILITY_HELP: &str = "Accessibility permission required: open System Settings > Privacy & Security > Accessibility, add this app and enable it, then start listening again.";

/// Errors that can occur in the hotkey listener
#[derive(Debug, thiserror::Error)]
pub enum HotkeyError {
    #[error("hotkey listener is already running")]
    AlreadyRunning,

    #[error("failed to create event tap - check Accessibility permissions")]
    EventTapCreation,

    #[error("failed to spawn listener thread: {0}")]
    ThreadSpawn(String),

    #[error("global hotkeys are not supported on this platform")]
    Unsupported,
}

#[cfg(target_os = "macos")]
mod platform {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use core_foundation::runloop::{kCFRunLoopCommonModes, kCFRunLoopDefaultMode, CFRunLoop};
    use core_graphics::event::{
        CGEvent, CGEventTap, CGEventTapLocation, CGEventTapOptions, CGEventTapPlacement,
        CGEventTapProxy, CGEventType, EventField,
    };
    use tracing::{debug, error, info, warn};

    use super::HotkeyError;
    use crate::dispatch::Dispatcher;
    use crate::hotkey::keys::{KeyCode, KeyEvent, ModifierState};
    use crate::hotkey::recognizer::Recognizer;

    #[link(name = "ApplicationServices", kind = "framework")]
    extern "C" {
        fn AXIsProcessTrusted() -> bool;
    }

    pub(super) fn accessibility_granted() -> bool {
        unsafe { AXIsProcessTrusted() }
    }

    /// Run the CFRunLoop with the event tap
    pub(super) fn run_event_loop(
        dispatcher: Dispatcher,
        running: Arc<AtomicBool>,
        ready_tx: std::sync::mpsc::Sender<Result<(), HotkeyError>>,
    ) -> Result<(), HotkeyError> {
        let mut recognizer = Recognizer::new();

        // Events are converted in the callback and processed outside it
        let (callback_tx, callback_rx) = std::sync::mpsc::channel::<KeyEvent>();

        // CGEventTap callback - must be fast and non-blocking
        let callback = move |_proxy: CGEventTapProxy,
                             event_type: CGEventType,
                             event: &CGEvent|
              -> Option<CGEvent> {
            let key = KeyCode(event.get_integer_value_field(EventField::KEYBOARD_EVENT_KEYCODE) as u16);
            let modifiers = ModifierState::from_flags(event.get_flags());
            match event_type {
                CGEventType::KeyDown => {
                    let _ = callback_tx.send(KeyEvent::press(key, modifiers));
                }
                CGEventType::KeyUp => {
                    let _ = callback_tx.send(KeyEvent::release(key, modifiers));
                }
                CGEventType::TapDisabledByTimeout | CGEventType::TapDisabledByUserInput => {
                    warn!("event tap disabled, will re-enable");
                }
                _ => {}
            }
            Some(event.clone())
        };

        let tap = match CGEventTap::new(
            CGEventTapLocation::Session,
            CGEventTapPlacement::HeadInsertEventTap,
            CGEventTapOptions::ListenOnly,
            vec![CGEventType::KeyDown, CGEventType::KeyUp],
            callback,
        ) {
            Ok(tap) => tap,
            Err(()) => {
                error!("failed to create event tap - is Accessibility permission granted?");
                let _ = ready_tx.send(Err(HotkeyError::EventTapCreation));
                return Err(HotkeyError::EventTapCreation);
            }
        };

        tap.enable();

        let run_loop_source = match tap.mach_port.create_runloop_source(0) {
            Ok(source) => source,
            Err(()) => {
                let _ = ready_tx.send(Err(HotkeyError::EventTapCreation));
                return Err(HotkeyError::EventTapCreation);
            }
        };
        let run_loop = CFRunLoop::get_current();

        unsafe {
            run_loop.add_source(&run_loop_source, kCFRunLoopCommonModes);
        }

        info!("event tap created and enabled");
        let _ = ready_tx.send(Ok(()));

        while running.load(Ordering::SeqCst) {
            CFRunLoop::run_in_mode(
                unsafe { kCFRunLoopDefaultMode },
                Duration::from_millis(100),
                true,
            );

            while let Ok(event) = callback_rx.try_recv() {
                if let Some(trigger) = recognizer.observe(&event, Instant::now()) {
                    info!(class = %trigger.class, "hotkey recognized");
                    dispatcher.try_enqueue(trigger);
                } else {
                    debug!(?event, "key event ignored");
                }
            }
        }

        Ok(())
    }
}

#[cfg(not(target_os = "macos"))]
mod platform {
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    use super::HotkeyError;
    use crate::dispatch::Dispatcher;

    pub(super) fn accessibility_granted() -> bool {
        false
    }

    pub(super) fn run_event_loop(
        _dispatcher: Dispatcher,
        _running: Arc<AtomicBool>,
        ready_tx: std::sync::mpsc::Sender<Result<(), HotkeyError>>,
    ) -> Result<(), HotkeyError> {
        let _ = ready_tx.send(Err(HotkeyError::Unsupported));
        Err(HotkeyError::Unsupported)
    }
}
