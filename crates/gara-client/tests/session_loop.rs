//! End-to-end session loop tests: a scripted server drives the event loop
//! through capture, chunked transfer, state sync, and teardown.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;

use gara_client::{
    spawn_session, ClientEnv, DisconnectReason, LeavePolicy, SessionCommand, SessionConfig,
    SessionHandle, SessionNotification, UploadConfig,
};
use gara_shared::{ClientEvent, RoomId, ServerEvent};
use gara_store::Database;

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

struct Harness {
    handle: SessionHandle,
    server_tx: mpsc::Sender<ServerEvent>,
    client_rx: mpsc::Receiver<ClientEvent>,
}

fn start_session(dir: &tempfile::TempDir, config: SessionConfig) -> Harness {
    let db = Database::open_at(&dir.path().join("session.db")).expect("should open");

    let (server_tx, server_rx) = mpsc::channel(16);
    let (client_tx, client_rx) = mpsc::channel(16);

    let handle = spawn_session(db, config, server_rx, client_tx);

    Harness {
        handle,
        server_tx,
        client_rx,
    }
}

fn test_config(room: &str) -> SessionConfig {
    SessionConfig {
        room: Some(RoomId::new(room)),
        leave_policy: LeavePolicy::default(),
        upload: UploadConfig::default(),
        env: ClientEnv {
            timezone_offset: -120,
            language: "fr-FR".into(),
        },
    }
}

async fn next_client_event(harness: &mut Harness) -> ClientEvent {
    timeout(RECV_TIMEOUT, harness.client_rx.recv())
        .await
        .expect("timed out waiting for client event")
        .expect("client event channel closed")
}

async fn wait_for_notification<F>(harness: &mut Harness, mut pred: F) -> SessionNotification
where
    F: FnMut(&SessionNotification) -> bool,
{
    loop {
        let notification = timeout(RECV_TIMEOUT, harness.handle.notifications.recv())
            .await
            .expect("timed out waiting for notification")
            .expect("notification channel closed");
        if pred(&notification) {
            return notification;
        }
    }
}

#[tokio::test]
async fn snapshot_is_seeded_from_the_store() {
    let dir = tempfile::tempdir().unwrap();
    let room = RoomId::new("kitchen");

    {
        let db = Database::open_at(&dir.path().join("session.db")).unwrap();
        db.set_token(&room, Some("secret")).unwrap();
        db.set_preferred_nick("ada").unwrap();
    }

    let harness = start_session(&dir, test_config("kitchen"));

    let params = &harness.handle.connect_params;
    assert_eq!(params.timezone_offset, -120);
    assert_eq!(params.language, "fr-FR");
    assert_eq!(params.token.as_deref(), Some("secret"));
    assert_eq!(params.preferred_nick.as_deref(), Some("ada"));

    // The wire field names match what the server expects.
    let json = serde_json::to_value(params).unwrap();
    assert_eq!(json["timezoneOffset"], -120);
}

#[tokio::test]
async fn capture_transfer_clear_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let mut harness = start_session(&dir, test_config("kitchen"));

    let data: Vec<u8> = (0..40_000u32).map(|i| (i % 251) as u8).collect();
    let file_path = dir.path().join("payload.bin");
    std::fs::write(&file_path, &data).unwrap();

    harness
        .handle
        .commands
        .send(SessionCommand::CaptureFile {
            path: file_path.clone(),
        })
        .await
        .unwrap();

    let url = match next_client_event(&mut harness).await {
        ClientEvent::Attach { size, url, name } => {
            assert_eq!(size, 40_000);
            assert_eq!(name.as_deref(), Some("payload.bin"));
            url
        }
        other => panic!("expected attach, got {other:?}"),
    };
    assert!(harness.handle.previews.resolve(&url).is_some());

    // Server-driven pulls at 0, 16384, 32768 reconstruct the file.
    let mut reassembled = Vec::new();
    let mut chunk_lens = Vec::new();
    for offset in [0u64, 16_384, 32_768] {
        harness
            .server_tx
            .send(ServerEvent::ReadAttachment { offset })
            .await
            .unwrap();
        match next_client_event(&mut harness).await {
            ClientEvent::AttachmentChunk { chunk } => {
                let bytes = STANDARD.decode(chunk).unwrap();
                chunk_lens.push(bytes.len());
                reassembled.extend_from_slice(&bytes);
            }
            other => panic!("expected chunk, got {other:?}"),
        }
    }

    assert_eq!(chunk_lens, vec![16_384, 16_384, 7_232]);
    assert_eq!(reassembled, data);

    // Clearing releases the preview handle.
    harness
        .server_tx
        .send(ServerEvent::ClearAttachment {})
        .await
        .unwrap();
    wait_for_notification(&mut harness, |n| *n == SessionNotification::AttachmentCleared).await;
    assert!(harness.handle.previews.is_empty());
}

#[tokio::test]
async fn token_pushes_persist_and_leave_disconnects() {
    let dir = tempfile::tempdir().unwrap();
    let mut harness = start_session(&dir, test_config("kitchen"));

    harness
        .server_tx
        .send(ServerEvent::SetToken {
            token: Some("fresh".into()),
        })
        .await
        .unwrap();
    harness
        .server_tx
        .send(ServerEvent::SetPreferredNick { nick: "ada".into() })
        .await
        .unwrap();
    harness
        .server_tx
        .send(ServerEvent::Leave { reason: None })
        .await
        .unwrap();

    let disconnected = wait_for_notification(&mut harness, |n| {
        matches!(n, SessionNotification::Disconnected { .. })
    })
    .await;
    assert_eq!(
        disconnected,
        SessionNotification::Disconnected {
            reason: DisconnectReason::Leave
        }
    );

    // Server events are processed in order, so the pushes have landed.
    let db = Database::open_at(&dir.path().join("session.db")).unwrap();
    assert_eq!(
        db.get_token(&RoomId::new("kitchen")).unwrap().as_deref(),
        Some("fresh")
    );
    assert_eq!(db.get_preferred_nick().unwrap().as_deref(), Some("ada"));
}

#[tokio::test]
async fn clearing_token_removes_the_room_from_listing() {
    let dir = tempfile::tempdir().unwrap();
    let mut harness = start_session(&dir, test_config("kitchen"));

    harness
        .server_tx
        .send(ServerEvent::SetToken {
            token: Some("secret".into()),
        })
        .await
        .unwrap();
    harness
        .server_tx
        .send(ServerEvent::SetToken { token: None })
        .await
        .unwrap();
    harness
        .server_tx
        .send(ServerEvent::Leave { reason: None })
        .await
        .unwrap();
    wait_for_notification(&mut harness, |n| {
        matches!(n, SessionNotification::Disconnected { .. })
    })
    .await;

    let db = Database::open_at(&dir.path().join("session.db")).unwrap();
    assert!(db.list_known_rooms().unwrap().is_empty());
}

#[tokio::test]
async fn known_rooms_are_listed_through_the_loop() {
    let dir = tempfile::tempdir().unwrap();

    {
        let db = Database::open_at(&dir.path().join("session.db")).unwrap();
        db.set_token(&RoomId::new("kitchen"), Some("a")).unwrap();
        db.set_token(&RoomId::new("lounge"), Some("b")).unwrap();
    }

    let harness = start_session(&dir, test_config("kitchen"));

    let (reply_tx, reply_rx) = oneshot::channel();
    harness
        .handle
        .commands
        .send(SessionCommand::ListKnownRooms(reply_tx))
        .await
        .unwrap();

    let mut rooms = timeout(RECV_TIMEOUT, reply_rx).await.unwrap().unwrap();
    rooms.sort_by(|a, b| a.as_str().cmp(b.as_str()));
    assert_eq!(rooms, vec![RoomId::new("kitchen"), RoomId::new("lounge")]);
}

#[tokio::test]
async fn leave_clears_token_under_clear_policy() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config("kitchen");
    config.leave_policy = LeavePolicy::ClearToken;
    let mut harness = start_session(&dir, config);

    harness
        .server_tx
        .send(ServerEvent::SetToken {
            token: Some("secret".into()),
        })
        .await
        .unwrap();
    harness
        .server_tx
        .send(ServerEvent::Leave { reason: None })
        .await
        .unwrap();
    wait_for_notification(&mut harness, |n| {
        matches!(n, SessionNotification::Disconnected { .. })
    })
    .await;

    let db = Database::open_at(&dir.path().join("session.db")).unwrap();
    assert_eq!(db.get_token(&RoomId::new("kitchen")).unwrap(), None);
}

#[tokio::test]
async fn transport_close_tears_the_session_down() {
    let dir = tempfile::tempdir().unwrap();
    let file_path = dir.path().join("payload.bin");
    std::fs::write(&file_path, vec![0u8; 64]).unwrap();

    let mut harness = start_session(&dir, test_config("kitchen"));

    harness
        .handle
        .commands
        .send(SessionCommand::CaptureFile { path: file_path })
        .await
        .unwrap();
    wait_for_notification(&mut harness, |n| {
        matches!(n, SessionNotification::AttachmentReady { .. })
    })
    .await;

    // Dropping the server side closes the inbound event stream.
    let Harness {
        mut handle,
        server_tx,
        client_rx: _client_rx,
    } = harness;
    drop(server_tx);

    let disconnected = loop {
        let notification = timeout(RECV_TIMEOUT, handle.notifications.recv())
            .await
            .expect("timed out waiting for notification")
            .expect("notification channel closed");
        if let SessionNotification::Disconnected { .. } = notification {
            break notification;
        }
    };
    assert_eq!(
        disconnected,
        SessionNotification::Disconnected {
            reason: DisconnectReason::TransportClosed
        }
    );

    // Disconnect released the preview handle.
    assert!(handle.previews.is_empty());
}
