//! # gara-client
//!
//! Client-resident room session logic: the chunked attachment upload
//! pipeline and the session-state synchronization protocol, tied together
//! by a connection lifecycle shell that runs as a tokio event loop over
//! the persistent room channel.
//!
//! The transport itself is not here.  The shell consumes a stream of
//! [`ServerEvent`]s and emits [`ClientEvent`]s over plain mpsc channels;
//! whatever owns the socket adapts both ends and sends the
//! [`ConnectParams`] snapshot when it connects.
//!
//! [`ServerEvent`]: gara_shared::ServerEvent
//! [`ClientEvent`]: gara_shared::ClientEvent
//! [`ConnectParams`]: gara_shared::ConnectParams

pub mod connection;
pub mod encoder;
pub mod env;
pub mod preview;
pub mod session;
pub mod upload;

mod error;

pub use connection::{
    spawn_session, DisconnectReason, SessionCommand, SessionConfig, SessionHandle,
    SessionNotification,
};
pub use env::ClientEnv;
pub use error::ClientError;
pub use preview::PreviewRegistry;
pub use session::{LeavePolicy, SessionSync};
pub use upload::{CaptureInput, TailPull, UploadConfig, UploadController, UploadState};

use tracing_subscriber::{fmt, EnvFilter};

/// Install the default tracing subscriber for a client process.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("gara_client=debug,gara_store=info,gara_media=info,warn"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
