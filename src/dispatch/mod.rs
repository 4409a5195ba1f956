//! Per-class request dispatch
//!
//! Each hotkey class owns a single-slot channel. A trigger is accepted
//! only while its class has nothing pending, so at most one undelivered
//! request exists per class.

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

use crate::hotkey::{HotkeyClass, RecognizedTrigger};

/// Create the dispatcher and its matching trigger queue
pub fn channel() -> (Dispatcher, TriggerQueue) {
    let (single_tx, single_rx) = mpsc::channel(1);
    let (multi_tx, multi_rx) = mpsc::channel(1);
    let (configured_tx, configured_rx) = mpsc::channel(1);

    (
        Dispatcher {
            single: single_tx,
            multi: multi_tx,
            configured: configured_tx,
        },
        TriggerQueue {
            single: single_rx,
            multi: multi_rx,
            configured: configured_rx,
        },
    )
}

/// Producer side, used by the hotkey listener
#[derive(Debug, Clone)]
pub struct Dispatcher {
    single: mpsc::Sender<RecognizedTrigger>,
    multi: mpsc::Sender<RecognizedTrigger>,
    configured: mpsc::Sender<RecognizedTrigger>,
}

impl Dispatcher {
    /// Store the trigger if its class slot is empty.
    ///
    /// Never blocks. Returns `false` when the trigger was dropped because
    /// a request of the same class is already pending.
    #[cfg_attr(not(any(target_os = "macos", test)), allow(dead_code))]
    pub fn try_enqueue(&self, trigger: RecognizedTrigger) -> bool {
        let class = trigger.class;
        match self.slot(class).try_send(trigger) {
            Ok(()) => {
                debug!(%class, "trigger enqueued");
                true
            }
            Err(TrySendError::Full(_)) => {
                warn!(%class, "trigger dropped, request already pending");
                false
            }
            Err(TrySendError::Closed(_)) => {
                warn!(%class, "trigger dropped, dispatch loop is gone");
                false
            }
        }
    }

    #[cfg_attr(not(any(target_os = "macos", test)), allow(dead_code))]
    fn slot(&self, class: HotkeyClass) -> &mpsc::Sender<RecognizedTrigger> {
        match class {
            HotkeyClass::SingleLanguage => &self.single,
            HotkeyClass::MultiLanguage => &self.multi,
            HotkeyClass::ConfiguredLanguage => &self.configured,
        }
    }
}

/// Consumer side, owned by the dispatch loop
#[derive(Debug)]
pub struct TriggerQueue {
    single: mpsc::Receiver<RecognizedTrigger>,
    multi: mpsc::Receiver<RecognizedTrigger>,
    configured: mpsc::Receiver<RecognizedTrigger>,
}

impl TriggerQueue {
    /// Wait until any class has a pending trigger and take it.
    ///
    /// Taking frees the slot immediately. Returns `None` once every
    /// dispatcher handle has been dropped.
    pub async fn take(&mut self) -> Option<RecognizedTrigger> {
        tokio::select! {
            Some(trigger) = self.single.recv() => Some(trigger),
            Some(trigger) = self.multi.recv() => Some(trigger),
            Some(trigger) = self.configured.recv() => Some(trigger),
            else => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;

    fn trigger(class: HotkeyClass) -> RecognizedTrigger {
        RecognizedTrigger {
            class,
            at: Instant::now(),
        }
    }

    #[tokio::test]
    async fn test_second_pending_trigger_dropped() {
        let (dispatcher, mut queue) = channel();

        assert!(dispatcher.try_enqueue(trigger(HotkeyClass::SingleLanguage)));
        assert!(!dispatcher.try_enqueue(trigger(HotkeyClass::SingleLanguage)));
        assert!(!dispatcher.try_enqueue(trigger(HotkeyClass::SingleLanguage)));

        let taken = queue.take().await.unwrap();
        assert_eq!(taken.class, HotkeyClass::SingleLanguage);

        // Only one was ever stored
        let nothing = tokio::time::timeout(Duration::from_millis(20), queue.take()).await;
        assert!(nothing.is_err());
    }

    #[tokio::test]
    async fn test_classes_are_independent() {
        let (dispatcher, mut queue) = channel();

        assert!(dispatcher.try_enqueue(trigger(HotkeyClass::SingleLanguage)));
        assert!(dispatcher.try_enqueue(trigger(HotkeyClass::MultiLanguage)));
        assert!(dispatcher.try_enqueue(trigger(HotkeyClass::ConfiguredLanguage)));

        let mut classes = Vec::new();
        for _ in 0..3 {
            classes.push(queue.take().await.unwrap().class);
        }
        for class in HotkeyClass::ALL {
            assert!(classes.contains(&class));
        }
    }

    #[tokio::test]
    async fn test_take_frees_slot() {
        let (dispatcher, mut queue) = channel();

        assert!(dispatcher.try_enqueue(trigger(HotkeyClass::MultiLanguage)));
        queue.take().await.unwrap();
        assert!(dispatcher.try_enqueue(trigger(HotkeyClass::MultiLanguage)));
    }

    #[tokio::test]
    async fn test_take_ends_when_dispatcher_dropped() {
        let (dispatcher, mut queue) = channel();
        drop(dispatcher);
        assert!(queue.take().await.is_none());
    }

    #[tokio::test]
    async fn test_enqueue_after_queue_dropped() {
        let (dispatcher, queue) = channel();
        drop(queue);
        assert!(!dispatcher.try_enqueue(trigger(HotkeyClass::ConfiguredLanguage)));
    }
}
