//! hotkey-translator: background daemon that translates selected text
//!
//! Runs as a LaunchAgent and provides:
//! - Global Control+Option hotkeys via CGEventTap
//! - A per-run state machine driving copy → translate → paste/alert
//! - Gemini translation client
//! - IPC server for settings and listener control

mod automation;
mod config;
mod dispatch;
mod events;
mod hotkey;
mod ipc;
mod lifecycle;
mod pipeline;
mod settings;
mod translate;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::automation::{SettleDelays, SystemAutomation};
use crate::config::Config;
use crate::events::RunEvent;
use crate::hotkey::HotkeyListener;
use crate::ipc::Server;
use crate::lifecycle::ShutdownSignal;
use crate::pipeline::Orchestrator;
use crate::settings::{JsonSettingsStore, SettingsStore};
use crate::translate::GeminiClient;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "hotkey-translator starting");

    let config = Config::load()?;
    config.ensure_dirs()?;
    info!(?config.socket_path, ?config.settings_path, "configuration loaded");

    let settings: Arc<dyn SettingsStore> = Arc::new(JsonSettingsStore::new(&config.settings_path));
    let shutdown = ShutdownSignal::new();

    // Listener -> dispatcher slots -> orchestrator
    let (dispatcher, queue) = dispatch::channel();
    // Orchestrator -> IPC status
    let (event_tx, _event_rx) = broadcast::channel::<RunEvent>(64);

    let translator = Arc::new(GeminiClient::new(
        &config.api_base_url,
        config.request_timeout,
        Arc::clone(&settings),
    ));
    let orchestrator = Arc::new(Orchestrator::new(
        Arc::new(SystemAutomation::new()),
        translator,
        Arc::clone(&settings),
        SettleDelays::default(),
        event_tx.clone(),
    ));

    let hotkey_listener = HotkeyListener::new(dispatcher);

    if cfg!(target_os = "macos") && !hotkey::accessibility_granted() {
        warn!(help = hotkey::ACCESSIBILITY_HELP, "accessibility permission not granted");
    }

    // Auto-start when a usable key is configured; otherwise wait for the UI
    if settings.load().has_api_key() {
        match hotkey_listener.start() {
            Ok(()) => info!("hotkey listener started"),
            Err(e) => {
                error!(?e, "failed to start hotkey listener");
                warn!("continuing without hotkey support - check Accessibility permissions");
            }
        }
    } else {
        warn!("no Gemini API key configured, waiting for start_listening");
    }

    let server = Server::new(&config.socket_path, hotkey_listener.clone(), Arc::clone(&settings))
        .context("failed to start IPC server")?;

    let mut status_rx = event_tx.subscribe();
    let server_for_events = &server;

    info!("daemon initialized, entering main loop");

    tokio::select! {
        _ = Arc::clone(&orchestrator).serve(queue) => {
            info!("dispatch loop exited");
        }

        result = server.run() => {
            if let Err(e) = result {
                error!(?e, "IPC server error");
            }
        }

        _ = async {
            loop {
                match status_rx.recv().await {
                    Ok(event) => {
                        info!(%event, "run event");
                        server_for_events.record_event(&event).await;
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "run event receiver lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        } => {
            info!("run event handler exited");
        }

        result = shutdown.wait() => {
            if let Err(e) = result {
                error!(?e, "failed to register signal handlers");
            }
        }
    }

    info!("shutting down...");

    hotkey_listener.stop();
    server.shutdown().await;

    info!("hotkey-translator stopped");

    Ok(())
}
