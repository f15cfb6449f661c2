//! Connection lifecycle shell with the tokio mpsc command/notification
//! pattern.
//!
//! The session event loop runs in a dedicated tokio task.  The transport
//! feeds decoded [`ServerEvent`]s into one channel and drains outbound
//! [`ClientEvent`]s from another; application code steers the session
//! through typed commands and observes it through notifications.  The
//! connect-time parameter snapshot is assembled before the loop starts and
//! handed back for the transport to send on connect.

use std::path::PathBuf;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use gara_shared::{ClientEvent, ConnectParams, RoomId, ServerEvent};
use gara_store::Database;

use crate::env::ClientEnv;
use crate::preview::PreviewRegistry;
use crate::session::{LeavePolicy, SessionSync};
use crate::upload::{CaptureInput, UploadConfig, UploadController};

// ---------------------------------------------------------------------------
// Command / notification types
// ---------------------------------------------------------------------------

/// Commands sent *into* the session task.
#[derive(Debug)]
pub enum SessionCommand {
    /// Stage a plain file attachment from disk.
    CaptureFile { path: PathBuf },
    /// Stage an image attachment from disk, normalizing it first.
    CaptureImage { path: PathBuf },
    /// Discard the staged attachment and release its preview.
    ClearAttachment,
    /// Request the list of previously visited rooms.
    ListKnownRooms(oneshot::Sender<Vec<RoomId>>),
    /// Tear the session down.
    Disconnect,
}

/// Notifications sent *from* the session task to the UI layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SessionNotification {
    /// Channel establishment started; show the loading affordance.
    LoadingStarted,
    /// The session loop is live.
    Connected,
    /// Channel establishment finished; hide the loading affordance.
    LoadingStopped,
    /// An attachment was captured and announced to the server.
    AttachmentReady {
        size: u64,
        url: String,
        name: Option<String>,
    },
    /// The staged attachment was discarded.
    AttachmentCleared,
    /// A capture failed; the controller is back to idle.
    CaptureFailed { reason: String },
    /// The session loop ended.
    Disconnected { reason: DisconnectReason },
}

/// Why the session loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DisconnectReason {
    /// The server pushed a `leave` event.
    Leave,
    /// A `Disconnect` command was issued locally.
    Requested,
    /// The transport dropped its end of the event channel.
    TransportClosed,
    /// Every command sender was dropped.
    Shutdown,
}

/// Configuration for spawning a session.
pub struct SessionConfig {
    /// The room this session is bound to; `None` on the landing surface.
    pub room: Option<RoomId>,
    /// Token handling on leave.
    pub leave_policy: LeavePolicy,
    /// Attachment pipeline tunables.
    pub upload: UploadConfig,
    /// Environment values baked into the connect snapshot.
    pub env: ClientEnv,
}

impl SessionConfig {
    /// Defaults for a given room, probing the live environment.
    pub fn new(room: Option<RoomId>) -> Self {
        Self {
            room,
            leave_policy: LeavePolicy::default(),
            upload: UploadConfig::default(),
            env: ClientEnv::detect(),
        }
    }
}

/// Handles returned by [`spawn_session`].
pub struct SessionHandle {
    /// Steer the session.
    pub commands: mpsc::Sender<SessionCommand>,
    /// Observe the session.
    pub notifications: mpsc::Receiver<SessionNotification>,
    /// The one-shot snapshot the transport sends on connect.
    pub connect_params: ConnectParams,
    /// Resolve preview URLs for local display.
    pub previews: PreviewRegistry,
}

// ---------------------------------------------------------------------------
// Spawn / event loop
// ---------------------------------------------------------------------------

/// Spawn the session event loop in a background tokio task.
///
/// `server_rx` carries events pushed by the server; `client_tx` carries
/// events to publish.  Both sides are owned by the transport.
pub fn spawn_session(
    db: Database,
    config: SessionConfig,
    server_rx: mpsc::Receiver<ServerEvent>,
    client_tx: mpsc::Sender<ClientEvent>,
) -> SessionHandle {
    let (cmd_tx, cmd_rx) = mpsc::channel::<SessionCommand>(64);
    let (notif_tx, notif_rx) = mpsc::channel::<SessionNotification>(256);

    let previews = PreviewRegistry::new();
    let sync = SessionSync::new(db, config.room.clone(), config.leave_policy);

    // Built exactly once, before the channel connects.
    let connect_params = sync.connect_params(&config.env);

    let uploader = UploadController::new(
        previews.clone(),
        client_tx,
        notif_tx.clone(),
        config.upload,
    );

    let _ = notif_tx.try_send(SessionNotification::LoadingStarted);

    tokio::spawn(run_session(sync, uploader, cmd_rx, server_rx, notif_tx));

    SessionHandle {
        commands: cmd_tx,
        notifications: notif_rx,
        connect_params,
        previews,
    }
}

/// Main loop: dispatches server events to the two controllers and commands
/// from the application, until one of them ends the session.
async fn run_session(
    sync: SessionSync,
    uploader: UploadController,
    mut cmd_rx: mpsc::Receiver<SessionCommand>,
    mut server_rx: mpsc::Receiver<ServerEvent>,
    notif_tx: mpsc::Sender<SessionNotification>,
) {
    info!(room = ?sync.room(), "session loop started");
    let _ = notif_tx.send(SessionNotification::Connected).await;
    let _ = notif_tx.send(SessionNotification::LoadingStopped).await;

    let reason = loop {
        tokio::select! {
            event = server_rx.recv() => {
                match event {
                    Some(event) => {
                        if let Some(reason) =
                            dispatch_server_event(&sync, &uploader, &notif_tx, event).await
                        {
                            break reason;
                        }
                    }
                    None => break DisconnectReason::TransportClosed,
                }
            }

            command = cmd_rx.recv() => {
                match command {
                    Some(command) => {
                        if let Some(reason) =
                            handle_command(&sync, &uploader, &notif_tx, command).await
                        {
                            break reason;
                        }
                    }
                    None => break DisconnectReason::Shutdown,
                }
            }
        }
    };

    // Disconnect releases preview handles and stops accepting pulls;
    // nothing object-URL-backed may outlive the session.
    uploader.clear().await;

    info!(reason = ?reason, "session loop terminated");
    let _ = notif_tx
        .send(SessionNotification::Disconnected { reason })
        .await;
}

async fn dispatch_server_event(
    sync: &SessionSync,
    uploader: &UploadController,
    notif_tx: &mpsc::Sender<SessionNotification>,
    event: ServerEvent,
) -> Option<DisconnectReason> {
    match event {
        ServerEvent::SetToken { token } => {
            sync.on_set_token(token.as_deref());
            None
        }

        ServerEvent::SetPreferredNick { nick } => {
            sync.on_set_preferred_nick(&nick);
            None
        }

        ServerEvent::Leave { reason } => {
            debug!(reason = ?reason, "server requested leave");
            sync.on_leave();
            Some(DisconnectReason::Leave)
        }

        ServerEvent::ClearAttachment {} => {
            uploader.clear().await;
            let _ = notif_tx.send(SessionNotification::AttachmentCleared).await;
            None
        }

        ServerEvent::ReadAttachment { offset } => {
            uploader.on_pull(offset).await;
            None
        }
    }
}

async fn handle_command(
    sync: &SessionSync,
    uploader: &UploadController,
    notif_tx: &mpsc::Sender<SessionNotification>,
    command: SessionCommand,
) -> Option<DisconnectReason> {
    match command {
        SessionCommand::CaptureFile { path } => {
            capture_from_disk(uploader, notif_tx, path, false).await;
            None
        }

        SessionCommand::CaptureImage { path } => {
            capture_from_disk(uploader, notif_tx, path, true).await;
            None
        }

        SessionCommand::ClearAttachment => {
            uploader.clear().await;
            let _ = notif_tx.send(SessionNotification::AttachmentCleared).await;
            None
        }

        SessionCommand::ListKnownRooms(reply) => {
            let _ = reply.send(sync.list_known_rooms());
            None
        }

        SessionCommand::Disconnect => Some(DisconnectReason::Requested),
    }
}

/// Read the picked file and hand it to the upload controller.  Read
/// failures are reportable, non-fatal capture errors.
async fn capture_from_disk(
    uploader: &UploadController,
    notif_tx: &mpsc::Sender<SessionNotification>,
    path: PathBuf,
    as_image: bool,
) {
    let data = match tokio::fs::read(&path).await {
        Ok(data) => data,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read attachment");
            let _ = notif_tx
                .send(SessionNotification::CaptureFailed {
                    reason: e.to_string(),
                })
                .await;
            return;
        }
    };

    let input = if as_image {
        CaptureInput::Image { data }
    } else {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();
        CaptureInput::File { name, data }
    };

    let _ = uploader.capture(input).await;
}
