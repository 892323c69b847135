//! Unix domain socket server for IPC
//!
//! Provides request-response access to the voice controller and pushes
//! voice events to subscribed clients.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::protocol::{Notification, Request, Response, MAX_FRAME_LEN};
use crate::controller::ControllerHandle;
use crate::error::VoiceError;
use crate::events::VoiceEvent;

/// IPC Server handling client connections
pub struct Server {
    socket_path: PathBuf,
    listener: UnixListener,
    controller: ControllerHandle,
    shutdown_tx: broadcast::Sender<()>,
}

impl Server {
    /// Bind the socket, replacing a stale one left by a previous run
    pub fn new(socket_path: &Path, controller: ControllerHandle) -> Result<Self> {
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent).context("failed to create socket directory")?;
        }

        if socket_path.exists() {
            std::fs::remove_file(socket_path).context("failed to remove stale socket")?;
        }

        let listener = UnixListener::bind(socket_path).context("failed to bind Unix socket")?;

        // Owner-only
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
            listener,
            controller,
            shutdown_tx,
        })
    }

    /// Run the server, accepting connections
    pub async fn run(&self) -> Result<()> {
        loop {
            match self.listener.accept().await {
                Ok((stream, _addr)) => {
                    debug!("client connected");
                    let controller = self.controller.clone();
                    let mut shutdown_rx = self.shutdown_tx.subscribe();

                    tokio::spawn(async move {
                        tokio::select! {
                            result = handle_client(stream, controller) => {
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

    /// Disconnect clients and remove the socket file
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

/// Serve one client until it disconnects
///
/// Responses and notifications share one writer task so frames never
/// interleave.
async fn handle_client(stream: UnixStream, controller: ControllerHandle) -> Result<()> {
    let (mut reader, mut writer) = stream.into_split();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Vec<u8>>();

    let writer_task = tokio::spawn(async move {
        while let Some(frame) = out_rx.recv().await {
            if let Err(e) = write_frame(&mut writer, &frame).await {
                debug!(?e, "client write failed");
                break;
            }
        }
    });

    // Dropped with this future, so a cancelled client cannot leak the relay
    let mut forwarder: Option<AbortOnDrop> = None;

    let result = loop {
        let body = match read_frame(&mut reader).await {
            Ok(Some(body)) => body,
            Ok(None) => {
                debug!("client disconnected");
                break Ok(());
            }
            Err(e) => break Err(e),
        };

        let response = match serde_json::from_slice::<Request>(&body) {
            Ok(Request::Subscribe) => {
                if forwarder.is_none() {
                    debug!("client subscribed to notifications");
                    forwarder = Some(AbortOnDrop(tokio::spawn(forward_events(
                        controller.subscribe(),
                        out_tx.clone(),
                    ))));
                }
                Response::Subscribed
            }
            Ok(request) => {
                debug!(?request, "received request");
                process_request(request, &controller).await
            }
            Err(e) => {
                warn!(error = %e, "unparseable request");
                Response::error("bad_request", e.to_string())
            }
        };

        if out_tx.send(encode(&response)?).is_err() {
            break Ok(());
        }
    };

    drop(forwarder);
    drop(out_tx);
    let _ = writer_task.await;
    result
}

/// Aborts the wrapped task when dropped
struct AbortOnDrop(JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Process a request and return a response
async fn process_request(request: Request, controller: &ControllerHandle) -> Response {
    let result = match request {
        Request::Ping => Ok(Response::Pong),
        Request::GetStatus => controller.status().await.map(Response::Status),
        Request::GetSettings => controller.settings().await.map(Response::Settings),
        Request::ListVoices => controller
            .voices()
            .await
            .map(|voices| Response::Voices { voices }),
        Request::ToggleListening => {
            let result = controller.toggle_listening().await;
            if let Ok(listening) = result {
                info!(listening, "listening toggled via IPC");
            }
            result.map(|listening| Response::Listening { listening })
        }
        Request::Speak { text } => controller.speak(text).map(|()| Response::Accepted),
        Request::UpdateSettings { settings } => controller
            .update_settings(settings)
            .await
            .map(Response::Settings),
        Request::Subscribe => Ok(Response::Subscribed),
    };

    result.unwrap_or_else(|e| {
        let code = match &e {
            VoiceError::ControllerStopped => "controller_stopped",
            _ => "internal",
        };
        Response::error(code, e.to_string())
    })
}

/// Relay published events to one subscribed client
async fn forward_events(
    mut events: broadcast::Receiver<VoiceEvent>,
    out_tx: mpsc::UnboundedSender<Vec<u8>>,
) {
    loop {
        let notification = match events.recv().await {
            Ok(event) => Notification::Event { event },
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "subscriber lagged");
                Notification::Lagged { skipped }
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };

        let Ok(frame) = encode(&notification) else {
            continue;
        };
        if out_tx.send(frame).is_err() {
            break;
        }
    }
}

fn encode<T: Serialize>(msg: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(msg).context("failed to encode message")
}

/// Read one length-prefixed frame; `None` on a clean disconnect
async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Option<Vec<u8>>> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_FRAME_LEN {
        warn!(len, "message too large, disconnecting");
        return Ok(None);
    }

    let mut body = vec![0u8; len];
    reader
        .read_exact(&mut body)
        .await
        .context("truncated message")?;
    Ok(Some(body))
}

/// Send a length-prefixed frame
async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, body: &[u8]) -> Result<()> {
    let len = u32::try_from(body.len()).context("message too large")?;
    writer.write_all(&len.to_le_bytes()).await?;
    writer.write_all(body).await?;
    Ok(())
}
