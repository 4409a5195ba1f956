//! Translation orchestrator
//!
//! Owns the dispatch loop and drives every accepted trigger through the
//! select/copy → read → translate → compose → write → deliver sequence.
//! Each run is an independent task; a failing or panicking run never
//! affects the listener, the dispatch loop or sibling runs.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::broadcast;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use super::compose::{compose, TranslationResult};
use super::stage::{RunOutcome, RunStage, RunStateMachine};
use crate::automation::{Automation, KeyCombo, SettleDelays};
use crate::dispatch::TriggerQueue;
use crate::events::RunEvent;
use crate::hotkey::{Delivery, HotkeyClass, RecognizedTrigger};
use crate::settings::{Language, Settings, SettingsStore};
use crate::translate::{TranslateError, Translator};

const EMPTY_CLIPBOARD_TITLE: &str = "Notification";
const EMPTY_CLIPBOARD_MESSAGE: &str = "No content in clipboard!";
const ERROR_TITLE: &str = "Error";

/// Abort reason reported for a run that panicked
const PANICKED: &str = "panicked";

/// Why a stage failed, and what an alert-delivery run should tell the user
#[derive(Debug)]
struct StageFailure {
    reason: String,
    alert: Option<String>,
}

impl StageFailure {
    fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            alert: None,
        }
    }

    fn with_alert(mut self, message: impl Into<String>) -> Self {
        self.alert = Some(message.into());
        self
    }
}

pub struct Orchestrator {
    automation: Arc<dyn Automation>,
    translator: Arc<dyn Translator>,
    settings: Arc<dyn SettingsStore>,
    delays: SettleDelays,
    event_tx: broadcast::Sender<RunEvent>,
}

impl Orchestrator {
    pub fn new(
        automation: Arc<dyn Automation>,
        translator: Arc<dyn Translator>,
        settings: Arc<dyn SettingsStore>,
        delays: SettleDelays,
        event_tx: broadcast::Sender<RunEvent>,
    ) -> Self {
        Self {
            automation,
            translator,
            settings,
            delays,
            event_tx,
        }
    }

    /// Take triggers until the dispatcher goes away, one task per run
    pub async fn serve(self: Arc<Self>, mut queue: TriggerQueue) {
        info!("dispatch loop started");

        while let Some(trigger) = queue.take().await {
            let class = trigger.class;
            info!(%class, "translation request received");

            let orchestrator = Arc::clone(&self);
            let run = tokio::spawn(async move { orchestrator.run(trigger).await });

            // Supervise without holding up the loop
            let event_tx = self.event_tx.clone();
            tokio::spawn(async move {
                let started_at = Instant::now();
                match run.await {
                    Ok(_) => {}
                    Err(e) if e.is_panic() => {
                        error!(%class, "translation run panicked");
                        let _ = event_tx.send(RunEvent::RunFinished {
                            class,
                            outcome: RunOutcome::Aborted {
                                stage: RunStage::Aborted,
                                reason: PANICKED.to_string(),
                            },
                            duration_ms: started_at.elapsed().as_millis() as u64,
                        });
                    }
                    Err(e) => warn!(%class, ?e, "translation run cancelled"),
                }
            });
        }

        info!("dispatch loop stopped");
    }

    /// Execute one run to completion
    pub async fn run(&self, trigger: RecognizedTrigger) -> RunOutcome {
        let class = trigger.class;
        let _ = self.event_tx.send(RunEvent::RunStarted { class });

        // Read per run so edits apply to the next trigger
        let settings = self.settings.load();
        let mut machine = RunStateMachine::new(class);

        let outcome = match self.execute(&mut machine, &settings).await {
            Ok(outcome) => outcome,
            Err(failure) => {
                if class.delivery() == Delivery::Alert {
                    if let Some(message) = &failure.alert {
                        self.alert(ERROR_TITLE, message).await;
                    }
                }
                machine.abort(failure.reason)
            }
        };

        let duration_ms = machine.elapsed_ms();
        info!(%class, ?outcome, duration_ms, "translation run finished");
        let _ = self.event_tx.send(RunEvent::RunFinished {
            class,
            outcome: outcome.clone(),
            duration_ms,
        });

        outcome
    }

    async fn execute(
        &self,
        machine: &mut RunStateMachine,
        settings: &Settings,
    ) -> Result<RunOutcome, StageFailure> {
        let class = machine.class();

        // Let the hotkey finish before simulating keystrokes of our own
        sleep(self.delays.before_copy).await;

        let source = self.capture_source(machine).await?;
        if source.is_empty() {
            info!(%class, "no text in clipboard");
            if class.delivery() == Delivery::Alert {
                self.alert(EMPTY_CLIPBOARD_TITLE, EMPTY_CLIPBOARD_MESSAGE).await;
            }
            return Ok(machine.finish_empty());
        }
        debug!(%class, chars = source.chars().count(), "source text captured");

        machine.advance();
        let results = self.translate_source(class, &source, settings).await?;

        machine.advance();
        let (code, output) = match class {
            HotkeyClass::MultiLanguage => {
                let combined = compose(&results, settings.include_prefix)
                    .ok_or_else(|| StageFailure::new("no successful translations"))?;
                (None, combined)
            }
            HotkeyClass::SingleLanguage | HotkeyClass::ConfiguredLanguage => {
                let result = results
                    .into_iter()
                    .next()
                    .ok_or_else(|| StageFailure::new("no successful translations"))?;
                (Some(result.code), result.text)
            }
        };

        machine.advance();
        self.automation
            .write_clipboard(&output)
            .await
            .map_err(|e| {
                StageFailure::new(format!("clipboard write failed: {e}"))
                    .with_alert(format!("Error copying to clipboard: {e}"))
            })?;

        machine.advance();
        match class.delivery() {
            Delivery::Paste => self
                .automation
                .simulate_key_combo(KeyCombo::Paste)
                .await
                .map_err(|e| StageFailure::new(format!("paste failed: {e}")))?,
            Delivery::Alert => {
                let title = format!("Translation ({})", code.unwrap_or_default());
                self.automation
                    .show_alert(&title, &output)
                    .await
                    .map_err(|e| StageFailure::new(format!("alert failed: {e}")))?
            }
        }

        machine.advance();
        Ok(RunOutcome::Delivered)
    }

    /// SelectSource (if the class needs it), CopySource and ReadClipboard
    async fn capture_source(&self, machine: &mut RunStateMachine) -> Result<String, StageFailure> {
        if machine.advance() == RunStage::SelectSource {
            self.automation
                .simulate_key_combo(KeyCombo::SelectAll)
                .await
                .map_err(|e| {
                    StageFailure::new(format!("select failed: {e}"))
                        .with_alert(format!("Error selecting text: {e}"))
                })?;
            sleep(self.delays.after_select).await;
            machine.advance();
        }

        self.automation
            .simulate_key_combo(KeyCombo::Copy)
            .await
            .map_err(|e| {
                StageFailure::new(format!("copy failed: {e}"))
                    .with_alert(format!("Error copying text: {e}"))
            })?;
        sleep(self.delays.after_copy).await;

        machine.advance();
        self.automation.read_clipboard().await.map_err(|e| {
            StageFailure::new(format!("clipboard read failed: {e}"))
                .with_alert(format!("Error reading clipboard: {e}"))
        })
    }

    async fn translate_source(
        &self,
        class: HotkeyClass,
        source: &str,
        settings: &Settings,
    ) -> Result<Vec<TranslationResult>, StageFailure> {
        match class {
            HotkeyClass::SingleLanguage => {
                let language = Language::English;
                let text = self
                    .translate_one(source, language)
                    .await
                    .map_err(|e| StageFailure::new(format!("translation failed: {e}")))?;
                Ok(vec![TranslationResult::new(language.code(), text)])
            }
            HotkeyClass::ConfiguredLanguage => {
                let language = settings.configured_language();
                if language.code() != settings.g_language {
                    warn!(
                        configured = %settings.g_language,
                        fallback = language.code(),
                        "unknown language code, using fallback"
                    );
                }
                let text = self.translate_one(source, language).await.map_err(|e| {
                    StageFailure::new(format!("translation failed: {e}"))
                        .with_alert(format!("Translate error: {e}"))
                })?;
                Ok(vec![TranslationResult::new(language.code(), text)])
            }
            HotkeyClass::MultiLanguage => {
                let mut results = Vec::new();
                for code in &settings.selected_languages {
                    let Some(language) = Language::from_code(code) else {
                        warn!(%code, "skipping unknown language code");
                        continue;
                    };
                    match self.translate_one(source, language).await {
                        Ok(text) => results.push(TranslationResult::new(language.code(), text)),
                        Err(e) => {
                            warn!(%code, error = %e, "translation failed, skipping language");
                        }
                    }
                }
                Ok(results)
            }
        }
    }

    async fn translate_one(&self, source: &str, language: Language) -> Result<String, TranslateError> {
        info!(language = language.name(), "translating");
        self.automation.play_notification_sound();
        self.translator.translate(source, language.name()).await
    }

    async fn alert(&self, title: &str, message: &str) {
        if let Err(e) = self.automation.show_alert(title, message).await {
            warn!(title, error = %e, "failed to show alert");
        }
    }
}
