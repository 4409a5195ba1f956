//! Unix domain socket server for IPC
//!
//! Serves the presentation layer: listener start, settings access and a
//! status snapshot fed by run events.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, error, info, warn};

use crate::events::RunEvent;
use crate::hotkey::{accessibility_granted, HotkeyError, HotkeyListener, ACCESSIBILITY_HELP};
use crate::pipeline::RunOutcome;
use crate::settings::{SettingsStore, GEMINI_MODELS};

use super::protocol::{DaemonStatus, Request, Response};

const MAX_FRAME_LEN: usize = 1024 * 1024;

/// IPC Server handling client connections
pub struct Server {
    socket_path: PathBuf,
    listener: Option<UnixListener>,
    context: Arc<ServerContext>,
    shutdown_tx: broadcast::Sender<()>,
}

/// What request handlers act on
struct ServerContext {
    hotkeys: HotkeyListener,
    settings: Arc<dyn SettingsStore>,
    state: RwLock<ServerState>,
}

struct ServerState {
    status: DaemonStatus,
    start_time: Instant,
}

impl Server {
    /// Create a new IPC server
    pub fn new(
        socket_path: &Path,
        hotkeys: HotkeyListener,
        settings: Arc<dyn SettingsStore>,
    ) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent).context("failed to create socket directory")?;
        }

        // Remove stale socket if it exists
        if socket_path.exists() {
            std::fs::remove_file(socket_path).context("failed to remove stale socket")?;
        }

        let listener = UnixListener::bind(socket_path).context("failed to bind Unix socket")?;

        // Owner-only access
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o600))
                .context("failed to restrict socket permissions")?;
        }

        let (shutdown_tx, _) = broadcast::channel(1);

        info!(?socket_path, "IPC server listening");

        Ok(Self {
            socket_path: socket_path.to_owned(),
            listener: Some(listener),
            context: Arc::new(ServerContext::new(hotkeys, settings)),
            shutdown_tx,
        })
    }

    /// Fold a run event into the status snapshot
    pub async fn record_event(&self, event: &RunEvent) {
        self.context.record_event(event).await;
    }

    /// Run the server, accepting connections
    pub async fn run(&self) -> Result<()> {
        let listener = self.listener.as_ref().context("server not initialized")?;

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    debug!("client connected");
                    let context = Arc::clone(&self.context);
                    let mut shutdown_rx = self.shutdown_tx.subscribe();

                    tokio::spawn(async move {
                        tokio::select! {
                            result = handle_client(stream, context) => {
                                if let Err(e) = result {
                                    warn!(?e, "client handler error");
                                }
                            }
                            _ = shutdown_rx.recv() => {
                                debug!("client handler shutting down");
                            }
                        }
                    });
                }
                Err(e) => {
                    error!(?e, "accept error");
                }
            }
        }
    }

    /// Gracefully shutdown the server
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());

        if self.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.socket_path) {
                warn!(?e, "failed to remove socket file");
            }
        }

        info!("IPC server shutdown complete");
    }
}

impl ServerContext {
    fn new(hotkeys: HotkeyListener, settings: Arc<dyn SettingsStore>) -> Self {
        Self {
            hotkeys,
            settings,
            state: RwLock::new(ServerState {
                status: DaemonStatus::default(),
                start_time: Instant::now(),
            }),
        }
    }

    async fn record_event(&self, event: &RunEvent) {
        let RunEvent::RunFinished { outcome, .. } = event else {
            return;
        };

        let mut state = self.state.write().await;
        match outcome {
            RunOutcome::Delivered | RunOutcome::EmptyClipboard => state.status.runs_completed += 1,
            RunOutcome::Aborted { .. } => state.status.runs_aborted += 1,
        }
        state.status.last_outcome = Some(outcome.clone());
    }

    async fn process_request(&self, request: Request) -> Response {
        match request {
            Request::Ping => Response::Pong,

            Request::GetStatus => {
                let mut state = self.state.write().await;
                state.status.uptime_secs = state.start_time.elapsed().as_secs();
                state.status.listening = self.hotkeys.is_running();
                state.status.accessibility_granted = accessibility_granted();
                Response::Status(state.status.clone())
            }

            Request::StartListening => self.start_listening().await,

            Request::GetSettings => Response::Settings {
                settings: self.settings.load(),
            },

            Request::UpdateSettings { settings } => {
                if let Err(e) = settings.validate() {
                    return Response::error("invalid_settings", e.to_string());
                }
                match self.settings.save(&settings) {
                    Ok(()) => {
                        info!("settings updated via IPC");
                        Response::Settings { settings }
                    }
                    Err(e) => {
                        error!(?e, "failed to save settings");
                        Response::error("save_failed", e.to_string())
                    }
                }
            }

            Request::GetModels => Response::Models {
                models: GEMINI_MODELS.iter().map(|model| model.to_string()).collect(),
            },
        }
    }

    async fn start_listening(&self) -> Response {
        if !self.settings.load().has_api_key() {
            return Response::error("missing_api_key", "configure a Gemini API key first");
        }

        if cfg!(target_os = "macos") && !self.hotkeys.is_running() && !accessibility_granted() {
            warn!("accessibility permission not granted");
            return Response::error("accessibility_denied", ACCESSIBILITY_HELP);
        }

        // start() blocks until the input hook is installed
        let hotkeys = self.hotkeys.clone();
        match tokio::task::spawn_blocking(move || hotkeys.start()).await {
            Ok(Ok(())) => {
                info!("hotkey listener started via IPC");
                Response::Listening
            }
            Ok(Err(HotkeyError::AlreadyRunning)) => Response::Listening,
            Ok(Err(e)) => {
                error!(?e, "failed to start hotkey listener");
                Response::error("listener_failed", e.to_string())
            }
            Err(e) => {
                error!(?e, "hotkey listener start task failed");
                Response::error("listener_failed", e.to_string())
            }
        }
    }
}

/// Handle a single client connection
async fn handle_client(mut stream: UnixStream, context: Arc<ServerContext>) -> Result<()> {
    while let Some(frame) = read_frame(&mut stream).await? {
        let response = match serde_json::from_slice::<Request>(&frame) {
            Ok(request) => {
                debug!(?request, "received request");
                context.process_request(request).await
            }
            Err(e) => {
                warn!(?e, "failed to parse request");
                Response::error("invalid_request", e.to_string())
            }
        };

        write_frame(&mut stream, &response).await?;
    }

    debug!("client disconnected");
    Ok(())
}

/// Read one length-prefixed frame; `None` on clean disconnect
async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Option<Vec<u8>>> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_FRAME_LEN {
        anyhow::bail!("message too large: {len} bytes");
    }

    let mut msg_buf = vec![0u8; len];
    reader
        .read_exact(&mut msg_buf)
        .await
        .context("truncated message body")?;
    Ok(Some(msg_buf))
}

/// Send a length-prefixed JSON message
async fn write_frame<W: AsyncWrite + Unpin, T: Serialize>(writer: &mut W, msg: &T) -> Result<()> {
    let msg_bytes = serde_json::to_vec(msg)?;
    let msg_len = (msg_bytes.len() as u32).to_le_bytes();

    writer.write_all(&msg_len).await?;
    writer.write_all(&msg_bytes).await?;
    writer.flush().await?;

    Ok(())
}
