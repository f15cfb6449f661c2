//! Events exchanged with the server over the persistent room channel.
//!
//! Each event is a tagged union keyed by the event name, with a fixed
//! payload schema per variant. The wire encoding is JSON:
//! `{"event": "<name>", "payload": {...}}`.

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// Events pushed by the server into the client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event", content = "payload", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Persist or clear the current room's auth token. An absent token
    /// clears the stored entry.
    SetToken {
        #[serde(default)]
        token: Option<String>,
    },

    /// Persist the global preferred nickname.
    SetPreferredNick { nick: String },

    /// The server is ending this room session.
    Leave {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },

    /// Discard the in-flight attachment and release its preview.
    ClearAttachment {},

    /// Pull one attachment chunk starting at the given byte offset.
    ReadAttachment { offset: u64 },
}

/// Events emitted by the client toward the server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event", content = "payload", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Announce a freshly captured attachment. `name` is present for plain
    /// file attachments and absent for normalized images.
    Attach {
        size: u64,
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },

    /// One base64-encoded chunk, answering a `read_attachment` pull.
    AttachmentChunk { chunk: String },
}

/// Parameters sent once when the persistent channel is established.
///
/// A pure projection of the local session store and the client environment
/// at the moment of connection; discarded after the transport takes it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConnectParams {
    #[serde(rename = "timezoneOffset")]
    pub timezone_offset: i32,

    pub language: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_nick: Option<String>,
}

impl ServerEvent {
    pub fn to_bytes(&self) -> Result<Vec<u8>, ProtocolError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_slice(data)?)
    }
}

impl ClientEvent {
    pub fn to_bytes(&self) -> Result<Vec<u8>, ProtocolError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_slice(data)?)
    }
}
