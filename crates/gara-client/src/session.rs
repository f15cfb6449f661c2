//! The session-state synchronization controller.
//!
//! Reconciles ephemeral per-room identity (auth token, preferred nickname,
//! locale) between the durable local store and the live server session.
//! The connect-time snapshot is assembled once, before the channel opens;
//! afterwards the controller only reacts to server pushes.
//!
//! Storage write failures degrade to logged no-ops: persistence simply
//! does not take effect, the session itself keeps running.

use tracing::{debug, info, warn};

use gara_shared::{ConnectParams, RoomId};
use gara_store::Database;

use crate::env::ClientEnv;

/// Whether leaving a room also wipes its stored token.
///
/// Earlier protocol revisions cleared the token on leave (sign-out
/// semantics); later ones treat leave as pure navigation and rely on an
/// explicit absent `set_token` push instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LeavePolicy {
    /// Clear the current room's token when the server says leave.
    ClearToken,
    /// Leave the token alone; only `set_token` with an absent value clears.
    #[default]
    KeepToken,
}

/// Synchronizes durable session state with server pushes.
pub struct SessionSync {
    db: std::sync::Mutex<Database>,
    room: Option<RoomId>,
    leave_policy: LeavePolicy,
}

impl SessionSync {
    pub fn new(db: Database, room: Option<RoomId>, leave_policy: LeavePolicy) -> Self {
        Self {
            db: std::sync::Mutex::new(db),
            room,
            leave_policy,
        }
    }

    /// The room this session is bound to, if any.
    pub fn room(&self) -> Option<&RoomId> {
        self.room.as_ref()
    }

    /// Assemble the one-shot parameter snapshot for channel establishment:
    /// live environment values plus whatever the store has for this room.
    pub fn connect_params(&self, env: &ClientEnv) -> ConnectParams {
        let db = self.db.lock().unwrap();

        let token = self.room.as_ref().and_then(|room| {
            db.get_token(room).unwrap_or_else(|e| {
                warn!(room = %room, error = %e, "failed to read stored token");
                None
            })
        });

        let preferred_nick = db.get_preferred_nick().unwrap_or_else(|e| {
            warn!(error = %e, "failed to read preferred nickname");
            None
        });

        ConnectParams {
            timezone_offset: env.timezone_offset,
            language: env.language.clone(),
            token,
            preferred_nick,
        }
    }

    /// Persist or clear the current room's token.  Idempotent; a push
    /// outside any room context is ignored.
    pub fn on_set_token(&self, token: Option<&str>) {
        let Some(room) = self.room.as_ref() else {
            debug!("set_token outside a room, ignoring");
            return;
        };

        if let Err(e) = self.db.lock().unwrap().set_token(room, token) {
            warn!(room = %room, error = %e, "failed to persist token");
        } else {
            debug!(room = %room, cleared = token.is_none(), "token updated");
        }
    }

    /// Persist the global preferred nickname.  Idempotent.
    pub fn on_set_preferred_nick(&self, nick: &str) {
        if let Err(e) = self.db.lock().unwrap().set_preferred_nick(nick) {
            warn!(error = %e, "failed to persist preferred nickname");
        }
    }

    /// React to the server ending the room session.  Token handling
    /// follows the configured [`LeavePolicy`]; actual disconnection is the
    /// lifecycle shell's business.
    pub fn on_leave(&self) {
        info!(room = ?self.room, policy = ?self.leave_policy, "leaving room");
        if self.leave_policy == LeavePolicy::ClearToken {
            self.on_set_token(None);
        }
    }

    /// Previously visited rooms, for the landing surface.
    pub fn list_known_rooms(&self) -> Vec<RoomId> {
        self.db.lock().unwrap().list_known_rooms().unwrap_or_else(|e| {
            warn!(error = %e, "failed to list known rooms");
            Vec::new()
        })
    }
}
